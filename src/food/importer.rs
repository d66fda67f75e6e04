//! Fetch-and-normalize import from the external nutrition dataset.
//!
//! The upstream schema names the same figure differently across dataset
//! versions, so each logical field is resolved from an ordered alias list.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::dto::{ImportOutcome, ImportSource, NutritionRecord};
use super::external::NO_RECORD;
use super::repo_types::{Food, NewFood};
use crate::{db::numeric_bounds, error::AppError, state::AppState};

const NAME_KEYS: &[&str] = &["DESC_KOR", "FOOD_NM_KR", "foodNm", "NAME"];
const CALORIE_KEYS: &[&str] = &["NUTR_CONT1", "AMT_NUM1", "enerc"];
const SERVING_KEYS: &[&str] = &["SERVING_WT", "SERVING_SIZE", "servSize"];
const CARBOHYDRATE_KEYS: &[&str] = &["NUTR_CONT2", "chocdf"];
const PROTEIN_KEYS: &[&str] = &["NUTR_CONT3", "prot"];
const FAT_KEYS: &[&str] = &["NUTR_CONT4", "fatce"];

/// Imported figures are per 100g in every dataset version.
const IMPORT_UNIT: &str = "100g";
const SUCCESS_CODE: &str = "00";

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && s != "-").then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn resolve(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| item.get(*k).and_then(field_text))
}

/// Parses a figure such as `"1,234.5"`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim().replace(',', "").as_str()).ok()
}

/// Extracts the first item from a response envelope, checking the header
/// result code when one is present.
pub fn first_item(body: &Value) -> Result<&Value, AppError> {
    let envelope = body.get("response").unwrap_or(body);

    if let Some(header) = envelope.get("header") {
        if let Some(code) = header.get("resultCode").and_then(field_text) {
            if code != SUCCESS_CODE {
                let msg = header
                    .get("resultMsg")
                    .and_then(field_text)
                    .unwrap_or_else(|| "unknown error".into());
                return Err(AppError::ExternalService(format!("{code}: {msg}")));
            }
        }
    }

    let items = envelope
        .get("body")
        .and_then(|b| b.get("items"))
        .ok_or_else(|| AppError::not_found(NO_RECORD))?;
    let items = items.get("item").unwrap_or(items);

    let first = match items {
        Value::Array(list) => list.first(),
        Value::Object(_) => Some(items),
        _ => None,
    };
    first.ok_or_else(|| AppError::not_found(NO_RECORD))
}

fn describe_serving(serving: Option<&str>) -> String {
    match serving {
        Some(s) if s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') => {
            format!("per {s}g serving")
        }
        Some(s) => format!("per {s} serving"),
        None => "imported from external nutrition source".to_string(),
    }
}

/// Maps one upstream item onto a `NutritionRecord`.
pub fn normalize(item: &Value) -> Result<NutritionRecord, AppError> {
    let name = resolve(item, NAME_KEYS)
        .ok_or_else(|| AppError::InvalidResponse("item has no food name".into()))?;
    let raw_calories = resolve(item, CALORIE_KEYS)
        .ok_or_else(|| AppError::InvalidResponse("item has no calorie value".into()))?;
    let calories = parse_amount(&raw_calories).ok_or_else(|| {
        AppError::InvalidResponse(format!("calorie value is not numeric: {raw_calories}"))
    })?;
    // NUMERIC rounds half away from zero.
    let calories = calories.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let (min, max) = numeric_bounds();
    if calories < min || calories > max {
        return Err(AppError::InvalidResponse(format!(
            "calorie value out of range: {raw_calories}"
        )));
    }

    let serving = resolve(item, SERVING_KEYS);
    let macro_value = |keys: &[&str]| resolve(item, keys).and_then(|raw| parse_amount(&raw));

    Ok(NutritionRecord {
        description: describe_serving(serving.as_deref()),
        name,
        calories_per_unit: calories,
        unit: IMPORT_UNIT.to_string(),
        serving,
        carbohydrate: macro_value(CARBOHYDRATE_KEYS),
        protein: macro_value(PROTEIN_KEYS),
        fat: macro_value(FAT_KEYS),
    })
}

fn from_catalog(food: Food) -> ImportOutcome {
    ImportOutcome {
        created: false,
        source: ImportSource::Catalog,
        food_id: Some(food.id),
        warning: None,
        data: NutritionRecord {
            name: food.name,
            calories_per_unit: food.calories_per_unit,
            unit: food.unit,
            serving: None,
            carbohydrate: None,
            protein: None,
            fat: None,
            description: food.description.unwrap_or_default(),
        },
    }
}

#[instrument(skip(st))]
pub async fn import_from_external_source(
    st: &AppState,
    query: &str,
) -> Result<ImportOutcome, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::validation("query is required"));
    }

    if let Some(existing) = st.foods.find_name_containing(query).await? {
        debug!(food_id = %existing.id, "import satisfied from catalog");
        return Ok(from_catalog(existing));
    }

    // No transaction is open while the remote call is in flight.
    let body = st.nutrition.lookup(query).await?;
    let record = normalize(first_item(&body)?)?;

    let new = NewFood {
        name: record.name.clone(),
        calories_per_unit: record.calories_per_unit,
        unit: record.unit.clone(),
        description: Some(record.description.clone()),
    };

    match st.foods.get_or_create(&new).await {
        Ok((food, created)) => {
            info!(food_id = %food.id, created, "external food imported");
            Ok(ImportOutcome {
                created,
                source: ImportSource::External,
                food_id: Some(food.id),
                warning: None,
                data: record,
            })
        }
        Err(e) => {
            warn!(error = %e, name = %record.name, "catalog save failed after external fetch");
            Ok(ImportOutcome {
                created: false,
                source: ImportSource::External,
                food_id: None,
                warning: Some(format!("catalog save failed: {e}")),
                data: record,
            })
        }
    }
}
