use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{Food, NewFood, PopularFood};
use crate::{db::PgStore, error::AppError};

#[async_trait]
pub trait FoodRepo: Send + Sync {
    async fn insert(&self, new: &NewFood) -> Result<Food, AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Food>, AppError>;
    /// Case-insensitive exact name lookup, optionally ignoring one id.
    async fn find_by_name(&self, name: &str, exclude: Option<Uuid>)
        -> Result<Option<Food>, AppError>;
    /// First food (by name) whose name contains `text`, case-insensitive.
    async fn find_name_containing(&self, text: &str) -> Result<Option<Food>, AppError>;
    async fn update(&self, food: &Food) -> Result<Food, AppError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
    async fn reference_count(&self, id: Uuid) -> Result<i64, AppError>;
    async fn list(&self, search: Option<&str>) -> Result<Vec<Food>, AppError>;
    async fn popular(&self, limit: i64) -> Result<Vec<PopularFood>, AppError>;
    /// Inserts unless a food with the same name exists; returns `(food, created)`.
    async fn get_or_create(&self, new: &NewFood) -> Result<(Food, bool), AppError>;
}

#[async_trait]
impl FoodRepo for PgStore {
    async fn insert(&self, new: &NewFood) -> Result<Food, AppError> {
        let food = sqlx::query_as::<_, Food>(
            r#"
            INSERT INTO foods (name, calories_per_unit, unit, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, calories_per_unit, unit, description, created_at, updated_at
            "#,
        )
        .bind(&new.name)
        .bind(new.calories_per_unit)
        .bind(&new.unit)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(food)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Food>, AppError> {
        let food = sqlx::query_as::<_, Food>(
            r#"
            SELECT id, name, calories_per_unit, unit, description, created_at, updated_at
            FROM foods
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(food)
    }

    async fn find_by_name(
        &self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<Food>, AppError> {
        let food = sqlx::query_as::<_, Food>(
            r#"
            SELECT id, name, calories_per_unit, unit, description, created_at, updated_at
            FROM foods
            WHERE lower(name) = lower($1)
              AND ($2::uuid IS NULL OR id <> $2)
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;
        Ok(food)
    }

    async fn find_name_containing(&self, text: &str) -> Result<Option<Food>, AppError> {
        let food = sqlx::query_as::<_, Food>(
            r#"
            SELECT id, name, calories_per_unit, unit, description, created_at, updated_at
            FROM foods
            WHERE strpos(lower(name), lower($1)) > 0
            ORDER BY name, id
            LIMIT 1
            "#,
        )
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(food)
    }

    async fn update(&self, food: &Food) -> Result<Food, AppError> {
        sqlx::query_as::<_, Food>(
            r#"
            UPDATE foods
               SET name = $2, calories_per_unit = $3, unit = $4, description = $5,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, name, calories_per_unit, unit, description, created_at, updated_at
            "#,
        )
        .bind(food.id)
        .bind(&food.name)
        .bind(food.calories_per_unit)
        .bind(&food.unit)
        .bind(&food.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("food not found"))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM foods WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn reference_count(&self, id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM diet_entries WHERE food_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Food>, AppError> {
        let rows = sqlx::query_as::<_, Food>(
            r#"
            SELECT id, name, calories_per_unit, unit, description, created_at, updated_at
            FROM foods
            WHERE $1::text IS NULL
               OR strpos(lower(name), lower($1)) > 0
               OR strpos(lower(coalesce(description, '')), lower($1)) > 0
            ORDER BY name, id
            "#,
        )
        .bind(search)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn popular(&self, limit: i64) -> Result<Vec<PopularFood>, AppError> {
        let rows = sqlx::query_as::<_, PopularFood>(
            r#"
            SELECT f.id, f.name, f.calories_per_unit, f.unit, COUNT(d.id) AS usage_count
            FROM foods f
            JOIN diet_entries d ON d.food_id = f.id
            GROUP BY f.id
            ORDER BY usage_count DESC, f.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_or_create(&self, new: &NewFood) -> Result<(Food, bool), AppError> {
        // A concurrent insert of the same name loses on the unique index
        // and falls through to the lookup below.
        let inserted = sqlx::query_as::<_, Food>(
            r#"
            INSERT INTO foods (name, calories_per_unit, unit, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            RETURNING id, name, calories_per_unit, unit, description, created_at, updated_at
            "#,
        )
        .bind(&new.name)
        .bind(new.calories_per_unit)
        .bind(&new.unit)
        .bind(&new.description)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(food) = inserted {
            return Ok((food, true));
        }

        let existing = self
            .find_by_name(&new.name, None)
            .await?
            .ok_or_else(|| AppError::Persistence("food vanished after insert conflict".into()))?;
        Ok((existing, false))
    }
}
