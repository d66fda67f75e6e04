use rust_decimal::Decimal;
use time::Date;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateDietRequest, UpdateDietRequest};
use super::repo_types::{DietRecord, EntryFilter, MealSlot, NewDietEntry};
use super::stats::{self, DailySummary, MonthlySummary, WeeklySummary};
use crate::{
    dates, db::check_numeric, error::AppError, food::repo_types::Food, state::AppState,
};

const MEMO_MAX_CHARS: usize = 200;

fn validate_quantity(quantity: Decimal) -> Result<Decimal, AppError> {
    check_numeric(quantity, "quantity")
}

fn clean_memo(memo: Option<&str>) -> Result<Option<String>, AppError> {
    let memo = memo.map(str::trim).filter(|s| !s.is_empty());
    if let Some(m) = memo {
        if m.chars().count() > MEMO_MAX_CHARS {
            return Err(AppError::validation(format!(
                "memo must be at most {MEMO_MAX_CHARS} characters"
            )));
        }
    }
    Ok(memo.map(str::to_string))
}

async fn resolve_food(st: &AppState, food_id: Uuid) -> Result<Food, AppError> {
    st.foods
        .get(food_id)
        .await?
        .ok_or_else(|| AppError::not_found("food not found"))
}

fn entry_not_found() -> AppError {
    AppError::not_found("diet entry not found")
}

#[instrument(skip(st, req))]
pub async fn create_entry(
    st: &AppState,
    user_id: Uuid,
    req: CreateDietRequest,
) -> Result<DietRecord, AppError> {
    let meal_slot: MealSlot = req.time_slot.parse()?;
    let quantity = validate_quantity(req.quantity)?;
    let memo = clean_memo(req.memo.as_deref())?;
    let food = resolve_food(st, req.food_id).await?;

    let new = NewDietEntry {
        user_id,
        food_id: food.id,
        meal_slot,
        quantity,
        date: req.date.unwrap_or_else(dates::today),
        memo,
    };
    let entry = st.diets.insert(&new).await?;
    info!(entry_id = %entry.id, %user_id, food_id = %food.id, "diet entry created");
    Ok(DietRecord { entry, food })
}

pub async fn get_entry(st: &AppState, user_id: Uuid, id: Uuid) -> Result<DietRecord, AppError> {
    st.diets
        .get_for_user(user_id, id)
        .await?
        .ok_or_else(entry_not_found)
}

#[instrument(skip(st, req))]
pub async fn update_entry(
    st: &AppState,
    user_id: Uuid,
    id: Uuid,
    req: UpdateDietRequest,
) -> Result<DietRecord, AppError> {
    let DietRecord { mut entry, mut food } = get_entry(st, user_id, id).await?;

    if let Some(food_id) = req.food_id {
        food = resolve_food(st, food_id).await?;
        entry.food_id = food.id;
    }
    if let Some(slot) = req.time_slot.as_deref() {
        entry.meal_slot = slot.parse()?;
    }
    if let Some(quantity) = req.quantity {
        entry.quantity = validate_quantity(quantity)?;
    }
    if let Some(date) = req.date {
        entry.date = date;
    }
    if let Some(memo) = req.memo.as_deref() {
        entry.memo = clean_memo(Some(memo))?;
    }

    let entry = st.diets.update(&entry).await?;
    info!(entry_id = %entry.id, %user_id, "diet entry updated");
    Ok(DietRecord { entry, food })
}

#[instrument(skip(st))]
pub async fn delete_entry(st: &AppState, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    if !st.diets.delete_for_user(user_id, id).await? {
        warn!(entry_id = %id, %user_id, "delete of missing or foreign diet entry");
        return Err(entry_not_found());
    }
    info!(entry_id = %id, %user_id, "diet entry deleted");
    Ok(())
}

pub async fn list_entries(
    st: &AppState,
    user_id: Uuid,
    filter: EntryFilter,
) -> Result<Vec<DietRecord>, AppError> {
    if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
        if from > to {
            return Err(AppError::validation("date_from must not be after date_to"));
        }
    }
    st.diets.list(user_id, &filter).await
}

async fn records_between(
    st: &AppState,
    user_id: Uuid,
    from: Date,
    to: Date,
) -> Result<Vec<DietRecord>, AppError> {
    let filter = EntryFilter {
        date_from: Some(from),
        date_to: Some(to),
        meal_slot: None,
    };
    st.diets.list(user_id, &filter).await
}

#[instrument(skip(st))]
pub async fn daily_calories(
    st: &AppState,
    user_id: Uuid,
    date: Date,
) -> Result<DailySummary, AppError> {
    let records = records_between(st, user_id, date, date).await?;
    Ok(stats::daily_summary(date, &records))
}

#[instrument(skip(st))]
pub async fn weekly_calories(
    st: &AppState,
    user_id: Uuid,
    start: Date,
) -> Result<WeeklySummary, AppError> {
    let (start, end) = stats::week_window(start)?;
    let records = records_between(st, user_id, start, end).await?;
    stats::weekly_summary(start, &records)
}

#[instrument(skip(st))]
pub async fn monthly_calories(
    st: &AppState,
    user_id: Uuid,
    year: i32,
    month: u8,
) -> Result<MonthlySummary, AppError> {
    let (first, last, _) = stats::month_bounds(year, month)?;
    let records = records_between(st, user_id, first, last).await?;
    stats::monthly_summary(year, month, &records)
}
