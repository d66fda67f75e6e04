use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{DietRecord, MealSlot};
use super::stats::total_calories;
use crate::dates::iso_date;

#[derive(Debug, Deserialize)]
pub struct CreateDietRequest {
    #[serde(alias = "foodId")]
    pub food_id: Uuid,
    #[serde(alias = "mealSlot", alias = "meal_slot")]
    pub time_slot: String,
    pub quantity: Decimal,
    #[serde(default, with = "iso_date::option")]
    pub date: Option<Date>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDietRequest {
    #[serde(alias = "foodId")]
    pub food_id: Option<Uuid>,
    #[serde(alias = "mealSlot", alias = "meal_slot")]
    pub time_slot: Option<String>,
    pub quantity: Option<Decimal>,
    #[serde(default, with = "iso_date::option")]
    pub date: Option<Date>,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListDietQuery {
    pub date: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(alias = "meal_slot")]
    pub time_slot: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    pub start: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub year: Option<i32>,
    pub month: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct FoodSummary {
    pub id: Uuid,
    pub name: String,
    pub calories_per_unit: Decimal,
    pub unit: String,
}

#[derive(Debug, Serialize)]
pub struct DietEntryResponse {
    pub id: Uuid,
    pub food: FoodSummary,
    pub time_slot: MealSlot,
    pub time_slot_display: &'static str,
    pub quantity: Decimal,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub memo: Option<String>,
    pub total_calories: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<DietRecord> for DietEntryResponse {
    fn from(r: DietRecord) -> Self {
        let total = total_calories(&r.entry, &r.food);
        Self {
            id: r.entry.id,
            food: FoodSummary {
                id: r.food.id,
                name: r.food.name,
                calories_per_unit: r.food.calories_per_unit,
                unit: r.food.unit,
            },
            time_slot: r.entry.meal_slot,
            time_slot_display: r.entry.meal_slot.label(),
            quantity: r.entry.quantity,
            date: r.entry.date,
            memo: r.entry.memo,
            total_calories: total,
            created_at: r.entry.created_at,
            updated_at: r.entry.updated_at,
        }
    }
}
