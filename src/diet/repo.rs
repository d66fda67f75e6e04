use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{
    DietEntry, DietEntryRow, DietRecord, DietRecordRow, EntryFilter, NewDietEntry,
};
use crate::{db::PgStore, error::AppError};

#[async_trait]
pub trait DietRepo: Send + Sync {
    async fn insert(&self, new: &NewDietEntry) -> Result<DietEntry, AppError>;
    /// Ownership is part of the predicate: another user's id reads as absent.
    async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> Result<Option<DietRecord>, AppError>;
    async fn update(&self, entry: &DietEntry) -> Result<DietEntry, AppError>;
    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;
    /// Ordered by date desc, slot name asc.
    async fn list(&self, user_id: Uuid, filter: &EntryFilter) -> Result<Vec<DietRecord>, AppError>;
}

const RECORD_SELECT: &str = r#"
    SELECT d.id, d.user_id, d.food_id, d.meal_slot, d.quantity, d.date, d.memo,
           d.created_at, d.updated_at,
           f.name AS food_name, f.calories_per_unit AS food_calories_per_unit,
           f.unit AS food_unit, f.description AS food_description,
           f.created_at AS food_created_at, f.updated_at AS food_updated_at
    FROM diet_entries d
    JOIN foods f ON f.id = d.food_id
"#;

#[async_trait]
impl DietRepo for PgStore {
    async fn insert(&self, new: &NewDietEntry) -> Result<DietEntry, AppError> {
        let row = sqlx::query_as::<_, DietEntryRow>(
            r#"
            INSERT INTO diet_entries (user_id, food_id, meal_slot, quantity, date, memo)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, food_id, meal_slot, quantity, date, memo, created_at, updated_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.food_id)
        .bind(new.meal_slot.as_str())
        .bind(new.quantity)
        .bind(new.date)
        .bind(&new.memo)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> Result<Option<DietRecord>, AppError> {
        let sql = format!("{RECORD_SELECT} WHERE d.id = $1 AND d.user_id = $2");
        let row = sqlx::query_as::<_, DietRecordRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(DietRecord::try_from).transpose()
    }

    async fn update(&self, entry: &DietEntry) -> Result<DietEntry, AppError> {
        let row = sqlx::query_as::<_, DietEntryRow>(
            r#"
            UPDATE diet_entries
               SET food_id = $3, meal_slot = $4, quantity = $5, date = $6, memo = $7,
                   updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, food_id, meal_slot, quantity, date, memo, created_at, updated_at
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.food_id)
        .bind(entry.meal_slot.as_str())
        .bind(entry.quantity)
        .bind(entry.date)
        .bind(&entry.memo)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("diet entry not found"))?;
        row.try_into()
    }

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM diet_entries WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list(&self, user_id: Uuid, filter: &EntryFilter) -> Result<Vec<DietRecord>, AppError> {
        let sql = format!(
            r#"{RECORD_SELECT}
            WHERE d.user_id = $1
              AND ($2::date IS NULL OR d.date >= $2)
              AND ($3::date IS NULL OR d.date <= $3)
              AND ($4::text IS NULL OR d.meal_slot = $4)
            ORDER BY d.date DESC, d.meal_slot ASC, d.created_at ASC
            "#
        );
        let rows = sqlx::query_as::<_, DietRecordRow>(&sql)
            .bind(user_id)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .bind(filter.meal_slot.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(DietRecord::try_from).collect()
    }
}
