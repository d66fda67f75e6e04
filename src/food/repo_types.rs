use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Catalog food record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Food {
    pub id: Uuid,
    pub name: String,                 // unique, case-insensitive
    pub calories_per_unit: Decimal,   // kcal per `unit`, always > 0
    pub unit: String,                 // e.g. "g", "100g", "ea"
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated input for a catalog insert.
#[derive(Debug, Clone)]
pub struct NewFood {
    pub name: String,
    pub calories_per_unit: Decimal,
    pub unit: String,
    pub description: Option<String>,
}

/// Food together with how many diet entries reference it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PopularFood {
    pub id: Uuid,
    pub name: String,
    pub calories_per_unit: Decimal,
    pub unit: String,
    pub usage_count: i64,
}
