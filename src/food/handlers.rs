use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    CreateFoodRequest, ImportOutcome, ImportQuery, PopularQuery, SearchQuery, UpdateFoodRequest,
};
use super::repo_types::{Food, PopularFood};
use super::{importer, services};
use crate::{auth::jwt::AuthUser, error::AppError, state::AppState};

pub fn food_routes() -> Router<AppState> {
    Router::new()
        .route("/food", get(list_foods).post(create_food))
        .route("/food/popular", get(popular_foods))
        .route("/food/import-external", get(import_external))
        .route(
            "/food/:id",
            get(get_food).put(update_food).patch(update_food).delete(delete_food),
        )
}

#[instrument(skip(state))]
pub async fn list_foods(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Food>>, AppError> {
    let Query(q) = query?;
    let foods = services::list_foods(&state, q.search.as_deref()).await?;
    Ok(Json(foods))
}

#[instrument(skip(state, payload))]
pub async fn create_food(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    payload: Result<Json<CreateFoodRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Food>), AppError> {
    let Json(body) = payload?;
    let food = services::create_food(&state, body).await?;
    Ok((StatusCode::CREATED, Json(food)))
}

#[instrument(skip(state))]
pub async fn get_food(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Food>, AppError> {
    Ok(Json(services::get_food(&state, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_food(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateFoodRequest>, JsonRejection>,
) -> Result<Json<Food>, AppError> {
    let Json(body) = payload?;
    Ok(Json(services::update_food(&state, id, body).await?))
}

#[instrument(skip(state))]
pub async fn delete_food(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_food(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn popular_foods(
    State(state): State<AppState>,
    query: Result<Query<PopularQuery>, QueryRejection>,
) -> Result<Json<Vec<PopularFood>>, AppError> {
    let Query(q) = query?;
    Ok(Json(services::popular_foods(&state, q.limit).await?))
}

#[instrument(skip(state))]
pub async fn import_external(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    query: Result<Query<ImportQuery>, QueryRejection>,
) -> Result<Json<ImportOutcome>, AppError> {
    let Query(q) = query?;
    let term = q
        .query
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::validation("query is required"))?;
    Ok(Json(importer::import_from_external_source(&state, &term).await?))
}
