use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{dates::iso_date, error::AppError, food::repo_types::Food};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealSlot {
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snack => "snack",
        }
    }

    /// Display label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "아침",
            MealSlot::Lunch => "점심",
            MealSlot::Dinner => "저녁",
            MealSlot::Snack => "간식",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MealSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s.trim())
            .ok_or_else(|| {
                AppError::validation(format!(
                    "invalid time_slot '{s}', expected breakfast, lunch, dinner or snack"
                ))
            })
    }
}

/// Row shape of `diet_entries`.
#[derive(Debug, FromRow)]
pub struct DietEntryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_id: Uuid,
    pub meal_slot: String,
    pub quantity: Decimal,
    pub date: Date,
    pub memo: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A user's record of eating `quantity` units of a food.
#[derive(Debug, Clone, Serialize)]
pub struct DietEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_id: Uuid,
    pub meal_slot: MealSlot,
    pub quantity: Decimal,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub memo: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<DietEntryRow> for DietEntry {
    type Error = AppError;

    fn try_from(r: DietEntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            food_id: r.food_id,
            meal_slot: r.meal_slot.parse()?,
            quantity: r.quantity,
            date: r.date,
            memo: r.memo,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// `diet_entries` joined with its food.
#[derive(Debug, FromRow)]
pub struct DietRecordRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_id: Uuid,
    pub meal_slot: String,
    pub quantity: Decimal,
    pub date: Date,
    pub memo: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub food_name: String,
    pub food_calories_per_unit: Decimal,
    pub food_unit: String,
    pub food_description: Option<String>,
    pub food_created_at: OffsetDateTime,
    pub food_updated_at: OffsetDateTime,
}

/// Entry plus the food as it is now; calories are derived from this pair.
#[derive(Debug, Clone)]
pub struct DietRecord {
    pub entry: DietEntry,
    pub food: Food,
}

impl TryFrom<DietRecordRow> for DietRecord {
    type Error = AppError;

    fn try_from(r: DietRecordRow) -> Result<Self, Self::Error> {
        let food = Food {
            id: r.food_id,
            name: r.food_name,
            calories_per_unit: r.food_calories_per_unit,
            unit: r.food_unit,
            description: r.food_description,
            created_at: r.food_created_at,
            updated_at: r.food_updated_at,
        };
        let entry = DietEntry {
            id: r.id,
            user_id: r.user_id,
            food_id: r.food_id,
            meal_slot: r.meal_slot.parse()?,
            quantity: r.quantity,
            date: r.date,
            memo: r.memo,
            created_at: r.created_at,
            updated_at: r.updated_at,
        };
        Ok(Self { entry, food })
    }
}

#[derive(Debug, Clone)]
pub struct NewDietEntry {
    pub user_id: Uuid,
    pub food_id: Uuid,
    pub meal_slot: MealSlot,
    pub quantity: Decimal,
    pub date: Date,
    pub memo: Option<String>,
}

/// Optional filters for listing; date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
    pub meal_slot: Option<MealSlot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_slot_parses_and_labels() {
        assert_eq!("breakfast".parse::<MealSlot>().unwrap(), MealSlot::Breakfast);
        assert_eq!(" snack ".parse::<MealSlot>().unwrap(), MealSlot::Snack);
        assert!(matches!("brunch".parse::<MealSlot>(), Err(AppError::Validation(_))));
        assert_eq!(MealSlot::Dinner.label(), "저녁");
        assert_eq!(serde_json::to_string(&MealSlot::Lunch).unwrap(), r#""lunch""#);
    }
}
