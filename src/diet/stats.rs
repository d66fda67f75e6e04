//! Calorie aggregation over diet entries joined with their foods.
//!
//! Everything here is a pure function of `DietRecord`s. Calories are derived
//! from the food's current `calories_per_unit` on every call, so editing a
//! food changes the totals of every entry that references it.
//!
//! Weekly and monthly averages use different denominators: the weekly
//! average is over all 7 calendar days, the monthly one only over days that
//! have at least one entry.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use time::{Date, Duration, Month};
use uuid::Uuid;

use super::repo_types::{DietEntry, DietRecord, MealSlot};
use crate::{dates::iso_date, error::AppError, food::repo_types::Food};

pub const WEEK_DAYS: i64 = 7;

/// Calories for one entry: quantity × the food's calories per unit.
pub fn total_calories(entry: &DietEntry, food: &Food) -> Decimal {
    entry.quantity * food.calories_per_unit
}

pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Per-slot subtotals, all starting at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlotTotals {
    pub breakfast_calories: Decimal,
    pub lunch_calories: Decimal,
    pub dinner_calories: Decimal,
    pub snack_calories: Decimal,
}

impl SlotTotals {
    pub fn add(&mut self, slot: MealSlot, kcal: Decimal) {
        let target = match slot {
            MealSlot::Breakfast => &mut self.breakfast_calories,
            MealSlot::Lunch => &mut self.lunch_calories,
            MealSlot::Dinner => &mut self.dinner_calories,
            MealSlot::Snack => &mut self.snack_calories,
        };
        *target += kcal;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryCalories {
    pub id: Uuid,
    pub food_name: String,
    pub food_unit: String,
    pub quantity: Decimal,
    pub calories_per_unit: Decimal,
    pub total_calories: Decimal,
    pub time_slot: MealSlot,
    pub time_slot_display: &'static str,
    pub memo: Option<String>,
}

impl From<&DietRecord> for EntryCalories {
    fn from(r: &DietRecord) -> Self {
        Self {
            id: r.entry.id,
            food_name: r.food.name.clone(),
            food_unit: r.food.unit.clone(),
            quantity: r.entry.quantity,
            calories_per_unit: r.food.calories_per_unit,
            total_calories: total_calories(&r.entry, &r.food),
            time_slot: r.entry.meal_slot,
            time_slot_display: r.entry.meal_slot.label(),
            memo: r.entry.memo.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub total_calories: Decimal,
    #[serde(flatten)]
    pub slots: SlotTotals,
    pub meal_count: usize,
    pub entries: Vec<EntryCalories>,
}

/// One day inside a weekly summary.
#[derive(Debug, Clone, Serialize)]
pub struct DayBucket {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub total_calories: Decimal,
    #[serde(flatten)]
    pub slots: SlotTotals,
    pub meal_count: usize,
}

impl DayBucket {
    fn empty(date: Date) -> Self {
        Self {
            date,
            total_calories: Decimal::ZERO,
            slots: SlotTotals::default(),
            meal_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    #[serde(with = "iso_date")]
    pub week_start: Date,
    #[serde(with = "iso_date")]
    pub week_end: Date,
    pub daily_data: Vec<DayBucket>,
    pub week_total: Decimal,
    pub daily_average: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u8,
    pub total_calories: Decimal,
    pub daily_average: Decimal,
    pub recorded_days: usize,
    pub total_days: u8,
    /// Day of month → calories; only days with entries appear.
    pub daily_calories: BTreeMap<u8, Decimal>,
}

pub fn daily_summary(date: Date, records: &[DietRecord]) -> DailySummary {
    let mut total = Decimal::ZERO;
    let mut slots = SlotTotals::default();
    let mut entries = Vec::new();

    for record in records.iter().filter(|r| r.entry.date == date) {
        let kcal = total_calories(&record.entry, &record.food);
        total += kcal;
        slots.add(record.entry.meal_slot, kcal);
        entries.push(EntryCalories::from(record));
    }

    DailySummary {
        date,
        total_calories: total,
        slots,
        meal_count: entries.len(),
        entries,
    }
}

/// Inclusive 7-day window starting at `start`.
pub fn week_window(start: Date) -> Result<(Date, Date), AppError> {
    let end = start
        .checked_add(Duration::days(WEEK_DAYS - 1))
        .ok_or_else(|| AppError::validation("week start is out of range"))?;
    Ok((start, end))
}

pub fn weekly_summary(start: Date, records: &[DietRecord]) -> Result<WeeklySummary, AppError> {
    let (start, end) = week_window(start)?;

    let mut buckets = Vec::with_capacity(WEEK_DAYS as usize);
    let mut day = start;
    loop {
        buckets.push(DayBucket::empty(day));
        if day == end {
            break;
        }
        day = day
            .next_day()
            .ok_or_else(|| AppError::validation("week start is out of range"))?;
    }

    for record in records {
        let offset = (record.entry.date - start).whole_days();
        if !(0..WEEK_DAYS).contains(&offset) {
            continue;
        }
        let bucket = &mut buckets[offset as usize];
        let kcal = total_calories(&record.entry, &record.food);
        bucket.total_calories += kcal;
        bucket.slots.add(record.entry.meal_slot, kcal);
        bucket.meal_count += 1;
    }

    let week_total: Decimal = buckets.iter().map(|b| b.total_calories).sum();
    let daily_average = round2(week_total / Decimal::from(WEEK_DAYS));

    Ok(WeeklySummary {
        week_start: start,
        week_end: end,
        daily_data: buckets,
        week_total,
        daily_average,
    })
}

/// First day, last day and length of a calendar month.
pub fn month_bounds(year: i32, month: u8) -> Result<(Date, Date, u8), AppError> {
    let m = Month::try_from(month)
        .map_err(|_| AppError::validation(format!("invalid month {month}, expected 1-12")))?;
    let last_day = m.length(year);
    let first = Date::from_calendar_date(year, m, 1)
        .map_err(|_| AppError::validation(format!("invalid year {year}")))?;
    let last = Date::from_calendar_date(year, m, last_day)
        .map_err(|_| AppError::validation(format!("invalid year {year}")))?;
    Ok((first, last, last_day))
}

pub fn monthly_summary(
    year: i32,
    month: u8,
    records: &[DietRecord],
) -> Result<MonthlySummary, AppError> {
    let (first, last, total_days) = month_bounds(year, month)?;

    let mut daily_calories: BTreeMap<u8, Decimal> = BTreeMap::new();
    let mut total = Decimal::ZERO;

    for record in records {
        let date = record.entry.date;
        if date < first || date > last {
            continue;
        }
        let kcal = total_calories(&record.entry, &record.food);
        *daily_calories.entry(date.day()).or_insert(Decimal::ZERO) += kcal;
        total += kcal;
    }

    let recorded_days = daily_calories.len();
    let daily_average = if recorded_days > 0 {
        round2(total / Decimal::from(recorded_days))
    } else {
        Decimal::ZERO
    };

    Ok(MonthlySummary {
        year,
        month,
        total_calories: total,
        daily_average,
        recorded_days,
        total_days,
        daily_calories,
    })
}
