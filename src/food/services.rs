use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateFoodRequest, UpdateFoodRequest};
use super::repo_types::{Food, NewFood, PopularFood};
use crate::{db::check_numeric, error::AppError, state::AppState};

const NAME_MAX_CHARS: usize = 100;
const UNIT_MAX_CHARS: usize = 20;
pub const DEFAULT_POPULAR_LIMIT: i64 = 10;
const MAX_POPULAR_LIMIT: i64 = 100;

fn required_text(value: &str, field: &str, max_chars: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AppError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn positive_calories(value: Decimal) -> Result<Decimal, AppError> {
    if value <= Decimal::ZERO {
        return Err(AppError::validation("calories_per_unit must be greater than 0"));
    }
    check_numeric(value, "calories_per_unit")
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn duplicate(name: &str) -> AppError {
    AppError::DuplicateName(format!("food '{name}' already exists"))
}

#[instrument(skip(st, req), fields(name = %req.name))]
pub async fn create_food(st: &AppState, req: CreateFoodRequest) -> Result<Food, AppError> {
    let new = NewFood {
        name: required_text(&req.name, "name", NAME_MAX_CHARS)?,
        calories_per_unit: positive_calories(req.calories_per_unit)?,
        unit: required_text(&req.unit, "unit", UNIT_MAX_CHARS)?,
        description: optional_text(req.description.as_deref()),
    };

    if st.foods.find_by_name(&new.name, None).await?.is_some() {
        warn!(name = %new.name, "duplicate food name");
        return Err(duplicate(&new.name));
    }

    let food = st.foods.insert(&new).await.map_err(|e| match e {
        AppError::DuplicateName(_) => duplicate(&new.name),
        other => other,
    })?;
    info!(food_id = %food.id, "food created");
    Ok(food)
}

pub async fn get_food(st: &AppState, id: Uuid) -> Result<Food, AppError> {
    st.foods
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("food not found"))
}

#[instrument(skip(st, req))]
pub async fn update_food(
    st: &AppState,
    id: Uuid,
    req: UpdateFoodRequest,
) -> Result<Food, AppError> {
    let mut food = get_food(st, id).await?;

    if let Some(name) = req.name.as_deref() {
        let name = required_text(name, "name", NAME_MAX_CHARS)?;
        if st.foods.find_by_name(&name, Some(id)).await?.is_some() {
            warn!(name = %name, "duplicate food name on update");
            return Err(duplicate(&name));
        }
        food.name = name;
    }
    if let Some(calories) = req.calories_per_unit {
        food.calories_per_unit = positive_calories(calories)?;
    }
    if let Some(unit) = req.unit.as_deref() {
        food.unit = required_text(unit, "unit", UNIT_MAX_CHARS)?;
    }
    if let Some(description) = req.description.as_deref() {
        food.description = optional_text(Some(description));
    }

    let name = food.name.clone();
    let updated = st.foods.update(&food).await.map_err(|e| match e {
        AppError::DuplicateName(_) => duplicate(&name),
        other => other,
    })?;
    info!(food_id = %updated.id, "food updated");
    Ok(updated)
}

#[instrument(skip(st))]
pub async fn delete_food(st: &AppState, id: Uuid) -> Result<(), AppError> {
    get_food(st, id).await?;

    let references = st.foods.reference_count(id).await?;
    if references > 0 {
        warn!(food_id = %id, references, "food still referenced by diet entries");
        return Err(AppError::ReferentialIntegrity(format!(
            "food is referenced by {references} diet entries and cannot be deleted"
        )));
    }

    if !st.foods.delete(id).await? {
        return Err(AppError::not_found("food not found"));
    }
    info!(food_id = %id, "food deleted");
    Ok(())
}

pub async fn list_foods(st: &AppState, search: Option<&str>) -> Result<Vec<Food>, AppError> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    st.foods.list(search).await
}

pub async fn popular_foods(st: &AppState, limit: Option<i64>) -> Result<Vec<PopularFood>, AppError> {
    let limit = limit
        .unwrap_or(DEFAULT_POPULAR_LIMIT)
        .clamp(1, MAX_POPULAR_LIMIT);
    st.foods.popular(limit).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diet::repo_types::{MealSlot, NewDietEntry};
    use time::macros::date;

    fn req(name: &str, kcal: i64, unit: &str) -> CreateFoodRequest {
        CreateFoodRequest {
            name: name.into(),
            calories_per_unit: Decimal::from(kcal),
            unit: unit.into(),
            description: None,
        }
    }

    async fn log_entry(st: &AppState, food_id: Uuid) {
        st.diets
            .insert(&NewDietEntry {
                user_id: Uuid::new_v4(),
                food_id,
                meal_slot: MealSlot::Lunch,
                quantity: Decimal::ONE,
                date: date!(2024 - 01 - 01),
                memo: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_trims_fields() {
        let st = AppState::fake();
        let food = create_food(
            &st,
            CreateFoodRequest {
                name: "  Apple ".into(),
                calories_per_unit: Decimal::from(52),
                unit: " 100g ".into(),
                description: Some("  red  ".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(food.name, "Apple");
        assert_eq!(food.unit, "100g");
        assert_eq!(food.description.as_deref(), Some("red"));
    }

    #[tokio::test]
    async fn create_rejects_case_insensitive_duplicate() {
        let st = AppState::fake();
        create_food(&st, req("Apple", 52, "100g")).await.unwrap();
        let err = create_food(&st, req("APPLE", 60, "100g")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let st = AppState::fake();
        assert!(matches!(
            create_food(&st, req("   ", 52, "g")).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            create_food(&st, req("Rice", 52, " ")).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            create_food(&st, req("Rice", 0, "g")).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            create_food(&st, req("Rice", -3, "g")).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn calories_must_fit_two_decimal_column() {
        let st = AppState::fake();
        let with_kcal = |kcal: Decimal| CreateFoodRequest {
            calories_per_unit: kcal,
            ..req("Broth", 1, "100ml")
        };
        for kcal in [Decimal::new(1, 3), Decimal::from(10_000_000), Decimal::new(12_345, 3)] {
            let err = create_food(&st, with_kcal(kcal)).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{kcal} accepted");
        }
        assert!(st.foods.list(None).await.unwrap().is_empty());

        let food = create_food(&st, with_kcal(Decimal::new(1, 2))).await.unwrap();
        let err = update_food(
            &st,
            food.id,
            UpdateFoodRequest {
                calories_per_unit: Some(Decimal::from(10_000_000)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let st = AppState::fake();
        let food = create_food(&st, req("Apple", 52, "100g")).await.unwrap();
        let updated = update_food(
            &st,
            food.id,
            UpdateFoodRequest {
                calories_per_unit: Some(Decimal::from(55)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Apple");
        assert_eq!(updated.unit, "100g");
        assert_eq!(updated.calories_per_unit, Decimal::from(55));
    }

    #[tokio::test]
    async fn update_allows_own_name_but_not_anothers() {
        let st = AppState::fake();
        let apple = create_food(&st, req("Apple", 52, "100g")).await.unwrap();
        create_food(&st, req("Banana", 89, "100g")).await.unwrap();

        let renamed = update_food(
            &st,
            apple.id,
            UpdateFoodRequest {
                name: Some("apple".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "apple");

        let err = update_food(
            &st,
            apple.id,
            UpdateFoodRequest {
                name: Some("banana".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn update_missing_food_is_not_found() {
        let st = AppState::fake();
        let err = update_food(&st, Uuid::new_v4(), UpdateFoodRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_blocked_by_references() {
        let st = AppState::fake();
        let used = create_food(&st, req("Kimchi", 20, "100g")).await.unwrap();
        let unused = create_food(&st, req("Tofu", 76, "100g")).await.unwrap();
        log_entry(&st, used.id).await;

        let err = delete_food(&st, used.id).await.unwrap_err();
        assert!(matches!(err, AppError::ReferentialIntegrity(_)));
        assert!(st.foods.get(used.id).await.unwrap().is_some());

        delete_food(&st, unused.id).await.unwrap();
        assert!(st.foods.get(unused.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_searches_name_and_description() {
        let st = AppState::fake();
        create_food(&st, req("Rice", 130, "100g")).await.unwrap();
        create_food(
            &st,
            CreateFoodRequest {
                description: Some("made with rice flour".into()),
                ..req("Tteok", 230, "100g")
            },
        )
        .await
        .unwrap();
        create_food(&st, req("Apple", 52, "100g")).await.unwrap();

        let all = list_foods(&st, None).await.unwrap();
        let names: Vec<_> = all.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Rice", "Tteok"]);

        let hits = list_foods(&st, Some("RICE")).await.unwrap();
        let names: Vec<_> = hits.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Rice", "Tteok"]);
    }

    #[tokio::test]
    async fn popular_orders_by_usage_and_skips_unused() {
        let st = AppState::fake();
        let a = create_food(&st, req("A", 1, "g")).await.unwrap();
        let b = create_food(&st, req("B", 1, "g")).await.unwrap();
        create_food(&st, req("C", 1, "g")).await.unwrap();
        log_entry(&st, a.id).await;
        log_entry(&st, b.id).await;
        log_entry(&st, b.id).await;

        let popular = popular_foods(&st, None).await.unwrap();
        let ids: Vec<_> = popular.iter().map(|f| (f.id, f.usage_count)).collect();
        assert_eq!(ids, vec![(b.id, 2), (a.id, 1)]);

        let top = popular_foods(&st, Some(1)).await.unwrap();
        assert_eq!(top.len(), 1);
    }
}
