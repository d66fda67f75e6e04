use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_FOOD_API_URL: &str =
    "https://api.data.go.kr/openapi/tn_pubr_public_nutri_food_info_api";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Settings for the public nutrition lookup service.
#[derive(Debug, Clone, Deserialize)]
pub struct NutritionApiConfig {
    pub base_url: String,
    pub service_key: String,
    pub timeout_secs: u64,
}

impl NutritionApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(1, 30))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub nutrition_api: NutritionApiConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "careeat".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "careeat-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let nutrition_api = NutritionApiConfig {
            base_url: std::env::var("FOOD_API_URL").unwrap_or_else(|_| DEFAULT_FOOD_API_URL.into()),
            service_key: std::env::var("FOOD_API_KEY").unwrap_or_default(),
            timeout_secs: std::env::var("FOOD_API_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10),
        };
        if nutrition_api.service_key.is_empty() {
            tracing::warn!("FOOD_API_KEY not set; external food import will be rejected upstream");
        }
        Ok(Self {
            database_url,
            jwt,
            nutrition_api,
        })
    }
}
