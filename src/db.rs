use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::AppError;

/// Postgres-backed store. Repository traits for each module are
/// implemented on this type in the module's `repo.rs`.
#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) {
        if let Err(e) = sqlx::migrate!("./migrations").run(&self.pool).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
    }
}

/// Smallest and largest value a `NUMERIC(8, 2)` column with a `> 0` check accepts.
pub fn numeric_bounds() -> (Decimal, Decimal) {
    (Decimal::new(1, 2), Decimal::new(99_999_999, 2))
}

/// Checks `value` fits a positive `NUMERIC(8, 2)` column without rounding.
pub fn check_numeric(value: Decimal, field: &str) -> Result<Decimal, AppError> {
    let (min, max) = numeric_bounds();
    if value.normalize().scale() > 2 {
        return Err(AppError::validation(format!(
            "{field} must have at most 2 decimal places"
        )));
    }
    if value < min || value > max {
        return Err(AppError::validation(format!(
            "{field} must be between {min} and {max}"
        )));
    }
    Ok(value)
}
