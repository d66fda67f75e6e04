use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{AuthResponse, LoginRequest, ProfileRequest, PublicUser, RegisterRequest};
use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password};
use super::repo_types::{NewProfile, User, UserProfile};
use crate::{error::AppError, state::AppState};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_AGE: i32 = 150;

lazy_static! {
    static ref EMAIL_RE: Option<Regex> = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    match &*EMAIL_RE {
        Some(re) => re.is_match(email),
        None => false,
    }
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("invalid email"));
    }
    Ok(email)
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("invalid credentials".into())
}

fn issue_tokens(keys: &JwtKeys, user: User) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user: user.into(),
    })
}

#[instrument(skip(st, keys, req))]
pub async fn register(
    st: &AppState,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let taken = || AppError::DuplicateName("email already registered".into());
    if st.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(taken());
    }

    let hash = hash_password(&req.password)?;
    let user = st.users.create(&email, &hash).await.map_err(|e| match e {
        AppError::DuplicateName(_) => taken(),
        other => other,
    })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue_tokens(keys, user)
}

#[instrument(skip(st, keys, req))]
pub async fn login(
    st: &AppState,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email)?;

    let Some(user) = st.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    info!(user_id = %user.id, "user logged in");
    issue_tokens(keys, user)
}

#[instrument(skip_all)]
pub async fn refresh(
    st: &AppState,
    keys: &JwtKeys,
    refresh_token: &str,
) -> Result<AuthResponse, AppError> {
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized("invalid refresh token".into())
    })?;
    let user = st
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user not found".into()))?;
    issue_tokens(keys, user)
}

pub async fn me(st: &AppState, user_id: Uuid) -> Result<PublicUser, AppError> {
    let user = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user not found".into()))?;
    Ok(user.into())
}

/// Removes the account; its profile and diet entries go with it.
#[instrument(skip(st))]
pub async fn delete_account(st: &AppState, user_id: Uuid) -> Result<(), AppError> {
    if !st.users.delete(user_id).await? {
        warn!(%user_id, "delete of unknown account");
        return Err(AppError::Unauthorized("user not found".into()));
    }
    info!(%user_id, "account deleted");
    Ok(())
}

pub async fn get_profile(st: &AppState, user_id: Uuid) -> Result<UserProfile, AppError> {
    st.users
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("profile not found"))
}

fn positive_metric(value: f64, field: &str) -> Result<f64, AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::validation(format!("{field} must be greater than 0")));
    }
    Ok(value)
}

#[instrument(skip(st, req))]
pub async fn save_profile(
    st: &AppState,
    user_id: Uuid,
    req: ProfileRequest,
) -> Result<UserProfile, AppError> {
    if !(1..=MAX_AGE).contains(&req.age) {
        return Err(AppError::validation(format!(
            "age must be between 1 and {MAX_AGE}"
        )));
    }
    let profile = NewProfile {
        gender: req.gender,
        age: req.age,
        height_cm: positive_metric(req.height_cm, "height_cm")?,
        weight_kg: positive_metric(req.weight_kg, "weight_kg")?,
    };
    let saved = st.users.upsert_profile(user_id, &profile).await?;
    info!(%user_id, "profile saved");
    Ok(saved)
}
