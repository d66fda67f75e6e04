use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::Duration;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    CreateDietRequest, DailyQuery, DietEntryResponse, ListDietQuery, MonthlyQuery,
    UpdateDietRequest, WeeklyQuery,
};
use super::repo_types::{EntryFilter, MealSlot};
use super::services;
use super::stats::{DailySummary, MonthlySummary, WeeklySummary};
use crate::{
    auth::jwt::AuthUser,
    dates::{parse_optional_date, today},
    error::AppError,
    state::AppState,
};

pub fn diet_routes() -> Router<AppState> {
    Router::new()
        .route("/diet", get(list_entries).post(create_entry))
        .route("/diet/calories", get(daily_calories))
        .route("/diet/calories/weekly", get(weekly_calories))
        .route("/diet/calories/monthly", get(monthly_calories))
        .route(
            "/diet/:id",
            get(get_entry).put(update_entry).patch(update_entry).delete(delete_entry),
        )
}

fn list_filter(q: &ListDietQuery) -> Result<EntryFilter, AppError> {
    let meal_slot = q
        .time_slot
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<MealSlot>)
        .transpose()?;

    // `date` pins both bounds to one day.
    if let Some(day) = parse_optional_date(q.date.as_deref())? {
        return Ok(EntryFilter {
            date_from: Some(day),
            date_to: Some(day),
            meal_slot,
        });
    }
    Ok(EntryFilter {
        date_from: parse_optional_date(q.date_from.as_deref())?,
        date_to: parse_optional_date(q.date_to.as_deref())?,
        meal_slot,
    })
}

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<ListDietQuery>, QueryRejection>,
) -> Result<Json<Vec<DietEntryResponse>>, AppError> {
    let Query(q) = query?;
    let filter = list_filter(&q)?;
    let records = services::list_entries(&state, user_id, filter).await?;
    Ok(Json(records.into_iter().map(DietEntryResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateDietRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DietEntryResponse>), AppError> {
    let Json(body) = payload?;
    let record = services::create_entry(&state, user_id, body).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[instrument(skip(state))]
pub async fn get_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DietEntryResponse>, AppError> {
    let record = services::get_entry(&state, user_id, id).await?;
    Ok(Json(record.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateDietRequest>, JsonRejection>,
) -> Result<Json<DietEntryResponse>, AppError> {
    let Json(body) = payload?;
    let record = services::update_entry(&state, user_id, id, body).await?;
    Ok(Json(record.into()))
}

#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_entry(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn daily_calories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<DailyQuery>, QueryRejection>,
) -> Result<Json<DailySummary>, AppError> {
    let Query(q) = query?;
    let date = parse_optional_date(q.date.as_deref())?.unwrap_or_else(today);
    Ok(Json(services::daily_calories(&state, user_id, date).await?))
}

#[instrument(skip(state))]
pub async fn weekly_calories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<WeeklyQuery>, QueryRejection>,
) -> Result<Json<WeeklySummary>, AppError> {
    let Query(q) = query?;
    // Without a start, the window ends today.
    let start = match parse_optional_date(q.start.as_deref())? {
        Some(start) => start,
        None => today()
            .checked_sub(Duration::days(6))
            .ok_or_else(|| AppError::validation("week start is out of range"))?,
    };
    Ok(Json(services::weekly_calories(&state, user_id, start).await?))
}

#[instrument(skip(state))]
pub async fn monthly_calories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<MonthlyQuery>, QueryRejection>,
) -> Result<Json<MonthlySummary>, AppError> {
    let Query(q) = query?;
    let now = today();
    let year = q.year.unwrap_or_else(|| now.year());
    let month = q.month.unwrap_or_else(|| u8::from(now.month()));
    Ok(Json(services::monthly_calories(&state, user_id, year, month).await?))
}
