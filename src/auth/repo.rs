use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{NewProfile, User, UserProfile, UserProfileRow};
use crate::{db::PgStore, error::AppError};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, AppError>;
    /// Deletes the user along with its profile and diet entries.
    /// Returns `false` when no such user exists.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError>;
    /// Creates the profile or replaces every metric of the existing one.
    async fn upsert_profile(
        &self,
        user_id: Uuid,
        profile: &NewProfile,
    ) -> Result<UserProfile, AppError>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        // user_profiles and diet_entries cascade.
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query_as::<_, UserProfileRow>(
            r#"
            SELECT user_id, gender, age, height_cm, weight_kg, created_at, updated_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserProfile::try_from).transpose()
    }

    async fn upsert_profile(
        &self,
        user_id: Uuid,
        profile: &NewProfile,
    ) -> Result<UserProfile, AppError> {
        let row = sqlx::query_as::<_, UserProfileRow>(
            r#"
            INSERT INTO user_profiles (user_id, gender, age, height_cm, weight_kg)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
               SET gender = EXCLUDED.gender,
                   age = EXCLUDED.age,
                   height_cm = EXCLUDED.height_cm,
                   weight_kg = EXCLUDED.weight_kg,
                   updated_at = now()
            RETURNING user_id, gender, age, height_cm, weight_kg, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(profile.gender.as_str())
        .bind(profile.age)
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }
}
