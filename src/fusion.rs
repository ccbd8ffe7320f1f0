//! Subtitle fusion service client
//!
//! Talks to the remote fusion service that merges a target-language and a
//! native-language SRT into one vocabulary-graded track. The service is
//! slow by nature (it runs a full alignment pass), hence the long default
//! request timeout.

use crate::config::EngineConfig;
use crate::error::FusionError;
use crate::types::{FusionStats, SmartSubSettings};
use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Wire response of the fusion endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FusionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub output_srt: Option<String>,
    #[serde(default)]
    pub stats: Option<FusionStats>,
    #[serde(default)]
    pub error: Option<String>,
}

#[async_trait]
pub trait FusionApi: Send + Sync {
    /// Submit one fusion job. The two inputs are complete SRT documents.
    async fn fuse(
        &self,
        target_srt: &str,
        native_srt: &str,
        settings: &SmartSubSettings,
    ) -> Result<FusionResponse, FusionError>;

    /// Probe service availability.
    async fn health(&self) -> bool;
}

pub struct HttpFusionClient {
    client: reqwest::Client,
    base_url: String,
    endpoint: String,
    api_key: String,
    timeout: Duration,
    health_timeout: Duration,
}

impl HttpFusionClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.fusion_base_url.clone(),
            endpoint: config.fusion_endpoint.clone(),
            api_key: config.fusion_api_key.clone(),
            timeout: config.fusion_timeout(),
            health_timeout: config.health_timeout(),
        }
    }

    fn map_status(status: StatusCode) -> FusionError {
        match status {
            StatusCode::UNAUTHORIZED => FusionError::InvalidApiKey,
            StatusCode::BAD_REQUEST => FusionError::InvalidRequest,
            StatusCode::INTERNAL_SERVER_ERROR => FusionError::Server,
            other => FusionError::Status(other.as_u16()),
        }
    }
}

#[async_trait]
impl FusionApi for HttpFusionClient {
    async fn fuse(
        &self,
        target_srt: &str,
        native_srt: &str,
        settings: &SmartSubSettings,
    ) -> Result<FusionResponse, FusionError> {
        if self.api_key.is_empty() {
            return Err(FusionError::MissingApiKey);
        }

        let form = Form::new()
            .text("target_srt", target_srt.to_string())
            .text("native_srt", native_srt.to_string())
            .text("target_language", settings.target_language.clone())
            .text("native_language", settings.native_language.clone())
            .text("top_n_words", settings.vocabulary_level.to_string())
            .text("enable_inline_translation", "false");

        let url = format!("{}{}", self.base_url, self.endpoint);
        tracing::info!(%url, level = settings.vocabulary_level, "submitting fusion job");

        let response = self
            .client
            .post(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FusionError::Timeout
                } else {
                    FusionError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::map_status(response.status()));
        }

        let body: FusionResponse = response
            .json()
            .await
            .map_err(|e| FusionError::Decode(e.to_string()))?;
        if !body.success {
            return Err(FusionError::Rejected(
                body.error
                    .unwrap_or_else(|| "fusion service rejected the request".to_string()),
            ));
        }
        Ok(body)
    }

    async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(%url, error = %e, "fusion health probe failed");
                false
            }
        }
    }
}
