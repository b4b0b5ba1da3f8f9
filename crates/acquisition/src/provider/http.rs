//! Generic HTTP content provider.
//!
//! Covers the common shape of hosted scraping APIs: a JSON `POST` with the
//! target URL and requested formats, bearer authentication, and a JSON body
//! whose `data` field (or the whole body) is the content.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::ProviderError;
use crate::models::{FetchRequest, OutputFormat};
use crate::provider::{ContentProvider, ProviderResponse};

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header some services use to report the credits a call consumed
const COST_HEADER: &str = "x-credits-used";

/// Connection settings for one HTTP provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpProviderConfig {
    pub id: String,
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Formats the service can produce; empty means all
    #[serde(default)]
    pub formats: Vec<OutputFormat>,
}

/// Content provider backed by a hosted scraping API.
pub struct HttpContentProvider {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpContentProvider {
    pub fn new(config: HttpProviderConfig) -> Self {
        Self::with_timeout(config, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(config: HttpProviderConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    fn network_error(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::Network {
            provider: self.config.id.clone(),
            message: message.into(),
        }
    }
}

/// Map a non-success HTTP status onto the failure taxonomy.
///
/// Returns `None` for success statuses.
pub fn classify_status(provider: &str, status: StatusCode) -> Option<ProviderError> {
    if status.is_success() {
        return None;
    }

    let provider = provider.to_string();
    let error = match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { provider },
        StatusCode::PAYMENT_REQUIRED => ProviderError::QuotaExhausted { provider },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth {
            provider,
            message: format!("HTTP {}", status),
        },
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderError::Unsupported {
                provider,
                message: format!("HTTP {}", status),
            }
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::Timeout { provider }
        }
        _ => ProviderError::Network {
            provider,
            message: format!("HTTP error: {}", status),
        },
    };
    Some(error)
}

/// Pull the content out of a response body: the `data` field when present,
/// otherwise the whole body.
fn extract_payload(body: Value) -> Value {
    match body {
        Value::Object(mut fields) if fields.contains_key("data") => {
            fields.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn supports(&self, format: OutputFormat) -> bool {
        self.config.formats.is_empty() || self.config.formats.contains(&format)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<ProviderResponse, ProviderError> {
        let body = json!({
            "url": request.target,
            "formats": [request.format.as_str()],
        });

        let mut builder = self.client.post(&self.config.endpoint).json(&body);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: self.config.id.clone(),
                }
            } else {
                self.network_error(e.to_string())
            }
        })?;

        if let Some(error) = classify_status(&self.config.id, response.status()) {
            return Err(error);
        }

        let cost = response
            .headers()
            .get(COST_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(1);

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: self.config.id.clone(),
                }
            } else {
                self.network_error(e.to_string())
            }
        })?;

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse {
                provider: self.config.id.clone(),
                message: e.to_string(),
            })?;

        debug!(
            "Provider '{}' answered {} bytes for '{}' (cost {})",
            self.config.id,
            text.len(),
            request.target,
            cost
        );

        Ok(ProviderResponse::new(extract_payload(parsed)).with_cost(cost))
    }
}
