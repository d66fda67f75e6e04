use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateFoodRequest {
    pub name: String,
    #[serde(alias = "kcal_per_unit")]
    pub calories_per_unit: Decimal,
    pub unit: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateFoodRequest {
    pub name: Option<String>,
    #[serde(alias = "kcal_per_unit")]
    pub calories_per_unit: Option<Decimal>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    pub query: Option<String>,
}

/// Where an import result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSource {
    Catalog,
    External,
}

/// Normalized nutrition figures. Macros are informational and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionRecord {
    pub name: String,
    pub calories_per_unit: Decimal,
    pub unit: String,
    pub serving: Option<String>,
    pub carbohydrate: Option<Decimal>,
    pub protein: Option<Decimal>,
    pub fat: Option<Decimal>,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ImportOutcome {
    pub created: bool,
    pub source: ImportSource,
    pub food_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub data: NutritionRecord,
}
