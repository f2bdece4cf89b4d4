//! HTTP client for the algo-engine strategy endpoints. The designer core
//! only ever *calls* these; serving them belongs to another service.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::serialize::ExportFormat;

/// Body of `POST <saveEndpoint>`.
#[derive(Debug, Clone, Serialize)]
pub struct SaveRequest {
    pub name: String,
    pub format: ExportFormat,
    pub code: String,
}

/// Body of `POST <importEndpoint>` (AI assistant path).
#[derive(Debug, Clone, Serialize)]
pub struct ImportRequest {
    pub format: ExportFormat,
    pub content: String,
    pub enabled: bool,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Error)]
pub enum EndpointError {
    /// Transport failure — the service never answered.
    #[error("Impossible de contacter le service de stratégies.")]
    Unreachable,
    /// Non-2xx answer; the message is the server `detail` when present.
    #[error("{0}")]
    Rejected(String),
}

/// Seam between the controller and the wire. Tests drive the controller
/// with an in-memory implementation.
#[async_trait]
pub trait StrategyEndpoint: Send + Sync {
    async fn save(&self, request: &SaveRequest) -> Result<(), EndpointError>;
    async fn import(&self, request: &ImportRequest) -> Result<(), EndpointError>;
}

pub struct HttpEndpoint {
    http: reqwest::Client,
    save_url: String,
    import_url: String,
}

impl HttpEndpoint {
    pub fn new(save_url: &str, import_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            save_url: save_url.to_string(),
            import_url: import_url.to_string(),
        }
    }

    async fn post_json<T: Serialize + Sync>(&self, url: &str, body: &T) -> Result<(), EndpointError> {
        let response = self.http.post(url).json(body).send().await.map_err(|e| {
            warn!(error = %e, url, "strategy_endpoint_unreachable");
            EndpointError::Unreachable
        })?;
        let status = response.status();
        if status.is_success() {
            debug!(url, status = status.as_u16(), "strategy_endpoint_ok");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        warn!(url, status = status.as_u16(), "strategy_endpoint_rejected");
        Err(EndpointError::Rejected(extract_detail(status.as_u16(), &body)))
    }
}

#[async_trait]
impl StrategyEndpoint for HttpEndpoint {
    async fn save(&self, request: &SaveRequest) -> Result<(), EndpointError> {
        self.post_json(&self.save_url, request).await
    }

    async fn import(&self, request: &ImportRequest) -> Result<(), EndpointError> {
        self.post_json(&self.import_url, request).await
    }
}

/// Pull a human-readable message out of a failing response body. `detail`
/// may be a string, a list of `{msg|detail}` objects, or arbitrary JSON.
pub(crate) fn extract_detail(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(detail) = json.get("detail") {
            match detail {
                Value::String(s) => return s.clone(),
                Value::Array(items) if !items.is_empty() => {
                    let parts: Vec<String> = items
                        .iter()
                        .map(|item| {
                            item.get("msg")
                                .or_else(|| item.get("detail"))
                                .and_then(Value::as_str)
                                .map(str::to_string)
                                .unwrap_or_else(|| item.to_string())
                        })
                        .collect();
                    return parts.join("; ");
                }
                Value::Null => {}
                other => return other.to_string(),
            }
        }
    }
    format!("Échec de l'enregistrement (HTTP {status}).")
}
