//! HTTP gateway to the integration backend.
//!
//! Async reqwest client. Covers the two endpoints the calculator uses:
//! the connectivity probe and the integral calculation.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BACKEND_URL: &str = "https://area-py-backend.onrender.com";
pub const GENERIC_ERROR_MESSAGE: &str =
  "An error occurred while calculating the integral";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegralRequest {
  pub function_string: String,
  pub start_x: f64,
  pub end_x: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
  pub x: f64,
  pub y: f64,
}

impl From<(f64, f64)> for SamplePoint {
  fn from((x, y): (f64, f64)) -> Self {
    Self { x, y }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegralResponse {
  pub latex_expression: String,
  pub area: f64,
  #[serde(default)]
  pub function_points: Vec<SamplePoint>,
  /// Domain-level problem reported alongside an otherwise successful answer.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
  #[error("Network error: {0}")]
  Network(String),
  #[error("HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
  Http { status: u16, detail: Option<String> },
  #[error("Parse error: {0}")]
  Decode(String),
}

impl ApiError {
  /// Message for the top-level error banner: the backend's `detail` when it
  /// sent one, otherwise the generic text.
  pub fn user_message(&self) -> String {
    match self {
      ApiError::Http {
        detail: Some(detail),
        ..
      } => detail.clone(),
      _ => GENERIC_ERROR_MESSAGE.to_string(),
    }
  }
}

/// The operations the orchestrator needs from a backend.
pub trait IntegralBackend: Send + Sync + 'static {
  /// `true` when the backend answers its probe with a 2xx.
  fn test_connection(&self) -> impl Future<Output = bool> + Send;

  fn calculate_integral(
    &self,
    request: IntegralRequest,
  ) -> impl Future<Output = Result<IntegralResponse, ApiError>> + Send;

  /// Where the backend lives, for user-facing messages.
  fn base_url(&self) -> &str;
}

#[derive(Clone)]
pub struct IntegralClient {
  http: reqwest::Client,
  base_url: String,
}

impl IntegralClient {
  /// Client without a request timeout.
  pub fn new(base_url: &str) -> Result<Self, ApiError> {
    Self::with_timeout(base_url, None)
  }

  pub fn with_timeout(
    base_url: &str,
    timeout: Option<Duration>,
  ) -> Result<Self, ApiError> {
    let mut builder = reqwest::Client::builder().user_agent(format!(
      "integral-calculator/{}",
      env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let http = builder
      .build()
      .map_err(|e| ApiError::Network(e.to_string()))?;

    Ok(Self {
      http,
      base_url: base_url.trim_end_matches('/').to_string(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path)
  }
}

impl IntegralBackend for IntegralClient {
  fn test_connection(&self) -> impl Future<Output = bool> + Send {
    let request = self.http.get(self.url("test"));
    async move {
      match request.send().await {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
          log::warn!("connectivity probe returned {}", response.status());
          false
        }
        Err(e) => {
          log::warn!("connectivity probe failed: {e}");
          false
        }
      }
    }
  }

  fn calculate_integral(
    &self,
    request: IntegralRequest,
  ) -> impl Future<Output = Result<IntegralResponse, ApiError>> + Send {
    let pending = self.http.post(self.url("calculate-integral")).json(&request);
    async move {
      let response = pending
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

      let status = response.status();
      if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Http {
          status: status.as_u16(),
          detail: extract_detail(&body),
        });
      }

      response
        .json::<IntegralResponse>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
    }
  }

  fn base_url(&self) -> &str {
    &self.base_url
  }
}

/// Pull `detail` out of an error body. Strings are taken verbatim, anything
/// else (e.g. a list of validation issues) is kept as JSON text.
pub fn extract_detail(body: &str) -> Option<String> {
  let json: serde_json::Value = serde_json::from_str(body).ok()?;
  match json.get("detail")? {
    serde_json::Value::Null => None,
    serde_json::Value::String(s) if s.is_empty() => None,
    serde_json::Value::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}
