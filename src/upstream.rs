use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound client for the fitness-data provider. One GET per call, no
/// retries; the timeout is enforced by the underlying reqwest client.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches `path` with the given query params and normalizes the response
    /// to a list of JSON values (a non-list success body counts as empty).
    ///
    /// Provider error statuses are passed through with a normalized detail:
    /// a string body verbatim, an object's `error` field, or `fallback`.
    /// Transport failures (timeout, connect, DNS) become `UpstreamUnavailable`
    /// with `unavailable` as the detail so raw errors never leak.
    pub async fn fetch(
        &self,
        path: &str,
        api_key: &str,
        params: &[(String, String)],
        fallback: &str,
        unavailable: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .get(&url)
            .header("X-Api-Key", api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, %url, "upstream request failed");
                ApiError::UpstreamUnavailable(unavailable.to_string())
            })?;

        let status = res.status();
        if status.as_u16() >= 400 {
            let text = res.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<Value>(&text) {
                Ok(Value::String(s)) => s,
                Ok(Value::Object(map)) => match map.get("error") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => fallback.to_string(),
                },
                _ => fallback.to_string(),
            };
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        let body: Value = res.json().await.map_err(|e| {
            warn!(error = %e, %url, "upstream body was not valid JSON");
            ApiError::UpstreamUnavailable(unavailable.to_string())
        })?;
        match body {
            Value::Array(items) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }
}
