//! In-memory stand-ins for the Postgres store and the nutrition API.
//!
//! `MemoryStore` mirrors the constraints the schema enforces: case-insensitive
//! unique food names, `ON DELETE RESTRICT` from diet entries to foods, and
//! unique user emails.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewProfile, User, UserProfile},
    },
    diet::{
        repo::DietRepo,
        repo_types::{DietEntry, DietRecord, EntryFilter, NewDietEntry},
    },
    error::AppError,
    food::{
        external::NutritionSource,
        repo::FoodRepo,
        repo_types::{Food, NewFood, PopularFood},
    },
    state::AppState,
};

#[derive(Default)]
struct Tables {
    foods: Vec<Food>,
    entries: Vec<DietEntry>,
    users: Vec<User>,
    profiles: Vec<UserProfile>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_food_writes: AtomicBool,
}

impl MemoryStore {
    /// Makes every food insert fail as if the database were down.
    pub fn fail_food_writes(&self, fail: bool) {
        self.fail_food_writes.store(fail, Ordering::SeqCst);
    }

    fn check_food_writes(&self) -> Result<(), AppError> {
        if self.fail_food_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("connection refused".into()));
        }
        Ok(())
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn name_taken() -> AppError {
    AppError::DuplicateName("a record with this name already exists".into())
}

fn new_food(new: &NewFood) -> Food {
    let now = OffsetDateTime::now_utc();
    Food {
        id: Uuid::new_v4(),
        name: new.name.clone(),
        calories_per_unit: new.calories_per_unit,
        unit: new.unit.clone(),
        description: new.description.clone(),
        created_at: now,
        updated_at: now,
    }
}

fn sort_foods(foods: &mut [Food]) {
    foods.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}

#[async_trait]
impl FoodRepo for MemoryStore {
    async fn insert(&self, new: &NewFood) -> Result<Food, AppError> {
        self.check_food_writes()?;
        let mut t = self.tables.lock().unwrap();
        if t.foods.iter().any(|f| same_name(&f.name, &new.name)) {
            return Err(name_taken());
        }
        let food = new_food(new);
        t.foods.push(food.clone());
        Ok(food)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Food>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.foods.iter().find(|f| f.id == id).cloned())
    }

    async fn find_by_name(
        &self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<Food>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t
            .foods
            .iter()
            .find(|f| same_name(&f.name, name) && Some(f.id) != exclude)
            .cloned())
    }

    async fn find_name_containing(&self, text: &str) -> Result<Option<Food>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut hits: Vec<Food> = t
            .foods
            .iter()
            .filter(|f| contains_ci(&f.name, text))
            .cloned()
            .collect();
        sort_foods(&mut hits);
        Ok(hits.into_iter().next())
    }

    async fn update(&self, food: &Food) -> Result<Food, AppError> {
        let mut t = self.tables.lock().unwrap();
        if t
            .foods
            .iter()
            .any(|f| f.id != food.id && same_name(&f.name, &food.name))
        {
            return Err(name_taken());
        }
        let slot = t
            .foods
            .iter_mut()
            .find(|f| f.id == food.id)
            .ok_or_else(|| AppError::not_found("food not found"))?;
        *slot = Food {
            updated_at: OffsetDateTime::now_utc(),
            ..food.clone()
        };
        Ok(slot.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut t = self.tables.lock().unwrap();
        if t.entries.iter().any(|e| e.food_id == id) {
            return Err(AppError::ReferentialIntegrity(
                "record is still referenced by other records".into(),
            ));
        }
        let before = t.foods.len();
        t.foods.retain(|f| f.id != id);
        Ok(t.foods.len() < before)
    }

    async fn reference_count(&self, id: Uuid) -> Result<i64, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.entries.iter().filter(|e| e.food_id == id).count() as i64)
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Food>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut foods: Vec<Food> = t
            .foods
            .iter()
            .filter(|f| match search {
                None => true,
                Some(s) => {
                    contains_ci(&f.name, s)
                        || f.description.as_deref().is_some_and(|d| contains_ci(d, s))
                }
            })
            .cloned()
            .collect();
        sort_foods(&mut foods);
        Ok(foods)
    }

    async fn popular(&self, limit: i64) -> Result<Vec<PopularFood>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<PopularFood> = t
            .foods
            .iter()
            .filter_map(|f| {
                let usage_count = t.entries.iter().filter(|e| e.food_id == f.id).count() as i64;
                (usage_count > 0).then(|| PopularFood {
                    id: f.id,
                    name: f.name.clone(),
                    calories_per_unit: f.calories_per_unit,
                    unit: f.unit.clone(),
                    usage_count,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then(a.id.cmp(&b.id)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn get_or_create(&self, new: &NewFood) -> Result<(Food, bool), AppError> {
        self.check_food_writes()?;
        let mut t = self.tables.lock().unwrap();
        if let Some(existing) = t.foods.iter().find(|f| same_name(&f.name, &new.name)) {
            return Ok((existing.clone(), false));
        }
        let food = new_food(new);
        t.foods.push(food.clone());
        Ok((food, true))
    }
}

fn join(t: &Tables, entry: &DietEntry) -> Option<DietRecord> {
    t.foods
        .iter()
        .find(|f| f.id == entry.food_id)
        .map(|food| DietRecord {
            entry: entry.clone(),
            food: food.clone(),
        })
}

#[async_trait]
impl DietRepo for MemoryStore {
    async fn insert(&self, new: &NewDietEntry) -> Result<DietEntry, AppError> {
        let mut t = self.tables.lock().unwrap();
        if !t.foods.iter().any(|f| f.id == new.food_id) {
            return Err(AppError::ReferentialIntegrity(
                "record is still referenced by other records".into(),
            ));
        }
        let now = OffsetDateTime::now_utc();
        let entry = DietEntry {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            food_id: new.food_id,
            meal_slot: new.meal_slot,
            quantity: new.quantity,
            date: new.date,
            memo: new.memo.clone(),
            created_at: now,
            updated_at: now,
        };
        t.entries.push(entry.clone());
        Ok(entry)
    }

    async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> Result<Option<DietRecord>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t
            .entries
            .iter()
            .find(|e| e.id == id && e.user_id == user_id)
            .and_then(|e| join(&t, e)))
    }

    async fn update(&self, entry: &DietEntry) -> Result<DietEntry, AppError> {
        let mut t = self.tables.lock().unwrap();
        if !t.foods.iter().any(|f| f.id == entry.food_id) {
            return Err(AppError::ReferentialIntegrity(
                "record is still referenced by other records".into(),
            ));
        }
        let slot = t
            .entries
            .iter_mut()
            .find(|e| e.id == entry.id && e.user_id == entry.user_id)
            .ok_or_else(|| AppError::not_found("diet entry not found"))?;
        *slot = DietEntry {
            updated_at: OffsetDateTime::now_utc(),
            ..entry.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut t = self.tables.lock().unwrap();
        let before = t.entries.len();
        t.entries.retain(|e| !(e.id == id && e.user_id == user_id));
        Ok(t.entries.len() < before)
    }

    async fn list(&self, user_id: Uuid, filter: &EntryFilter) -> Result<Vec<DietRecord>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<DietRecord> = t
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| filter.date_from.map_or(true, |from| e.date >= from))
            .filter(|e| filter.date_to.map_or(true, |to| e.date <= to))
            .filter(|e| filter.meal_slot.map_or(true, |slot| e.meal_slot == slot))
            .filter_map(|e| join(&t, e))
            .collect();
        rows.sort_by(|a, b| {
            b.entry
                .date
                .cmp(&a.entry.date)
                .then(a.entry.meal_slot.as_str().cmp(b.entry.meal_slot.as_str()))
                .then(a.entry.created_at.cmp(&b.entry.created_at))
        });
        Ok(rows)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == email) {
            return Err(name_taken());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut t = self.tables.lock().unwrap();
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        if t.users.len() == before {
            return Ok(false);
        }
        t.profiles.retain(|p| p.user_id != id);
        t.entries.retain(|e| e.user_id != id);
        Ok(true)
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn upsert_profile(
        &self,
        user_id: Uuid,
        profile: &NewProfile,
    ) -> Result<UserProfile, AppError> {
        let mut t = self.tables.lock().unwrap();
        let now = OffsetDateTime::now_utc();
        if let Some(existing) = t.profiles.iter_mut().find(|p| p.user_id == user_id) {
            existing.gender = profile.gender;
            existing.age = profile.age;
            existing.height_cm = profile.height_cm;
            existing.weight_kg = profile.weight_kg;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let created = UserProfile {
            user_id,
            gender: profile.gender,
            age: profile.age,
            height_cm: profile.height_cm,
            weight_kg: profile.weight_kg,
            created_at: now,
            updated_at: now,
        };
        t.profiles.push(created.clone());
        Ok(created)
    }
}

#[derive(Clone)]
enum Reply {
    Body(Value),
    Timeout,
}

/// Scripted nutrition API that counts how often it is asked.
#[derive(Clone)]
pub struct FakeNutrition {
    reply: Reply,
    calls: Arc<AtomicUsize>,
}

impl FakeNutrition {
    pub fn returning(body: Value) -> Self {
        Self {
            reply: Reply::Body(body),
            calls: Arc::default(),
        }
    }

    pub fn timing_out() -> Self {
        Self {
            reply: Reply::Timeout,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NutritionSource for FakeNutrition {
    async fn lookup(&self, _query: &str) -> Result<Value, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Body(body) => Ok(body.clone()),
            Reply::Timeout => Err(AppError::Timeout),
        }
    }
}

/// State backed by a fresh `MemoryStore`, returned alongside it.
pub fn fake_state(nutrition: FakeNutrition) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let state = AppState::from_parts(
        Arc::new(AppState::test_config()),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(nutrition),
    );
    (state, store)
}
