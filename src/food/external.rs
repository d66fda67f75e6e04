use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{config::NutritionApiConfig, error::AppError};

pub const NO_RECORD: &str = "no matching nutrition record";

/// Remote nutrition lookup returning the raw JSON envelope for a query.
#[async_trait]
pub trait NutritionSource: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Value, AppError>;
}

/// Client for the public food nutrition dataset on data.go.kr.
///
/// `service_key` must be the decoded key; it is URL-encoded on the way out.
pub struct DataGoKrClient {
    http: reqwest::Client,
    config: NutritionApiConfig,
}

impl DataGoKrClient {
    pub fn new(config: NutritionApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("careeat/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build nutrition http client")?;
        Ok(Self { http, config })
    }
}

fn classify(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        warn!(error = %e, "nutrition api timed out");
        AppError::Timeout
    } else {
        warn!(error = %e, "nutrition api request failed");
        AppError::ExternalService(e.to_string())
    }
}

#[async_trait]
impl NutritionSource for DataGoKrClient {
    async fn lookup(&self, query: &str) -> Result<Value, AppError> {
        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[
                ("serviceKey", self.config.service_key.as_str()),
                ("desc_kor", query),
                ("numOfRows", "1"),
                ("pageNo", "1"),
                ("type", "json"),
            ])
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        debug!(%status, query, "nutrition api responded");
        if !status.is_success() {
            return Err(AppError::ExternalService(format!("upstream returned HTTP {status}")));
        }

        let body = response.text().await.map_err(classify)?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "nutrition api body is not json");
            AppError::not_found(NO_RECORD)
        })
    }
}
