use serde_json::{json, Value};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{LogCollection, NewLogEntry, SearchLogRow};

use super::dto::HistoryEntry;

/// Static description of one proxied endpoint: where it forwards, where it
/// logs, and the per-endpoint messages carried to the client.
pub struct ProxyEndpoint {
    pub path: &'static str,
    pub collection: LogCollection,
    /// Nutrition keeps the full item list in its log instead of a count.
    pub log_items: bool,
    pub missing_key_detail: &'static str,
    pub upstream_fallback: &'static str,
    pub unavailable_detail: &'static str,
}

pub const EXERCISES: ProxyEndpoint = ProxyEndpoint {
    path: "/v1/exercises",
    collection: LogCollection::ExerciseSearch,
    log_items: false,
    missing_key_detail:
        "Exercise API key is not configured. Add API_NINJAS_KEY to the environment file.",
    upstream_fallback: "Exercise API returned an error.",
    unavailable_detail: "Failed to fetch exercises. Try again later.",
};

pub const RECIPES: ProxyEndpoint = ProxyEndpoint {
    path: "/v1/recipe",
    collection: LogCollection::RecipeSearch,
    log_items: false,
    missing_key_detail: "Recipe API key is not configured. Set API_NINJAS_KEY in .env.",
    upstream_fallback: "Recipe API returned an error.",
    unavailable_detail: "Failed to fetch recipes. Try again later.",
};

pub const NUTRITION: ProxyEndpoint = ProxyEndpoint {
    path: "/v1/nutrition",
    collection: LogCollection::NutritionLookup,
    log_items: true,
    missing_key_detail: "Nutrition API key is not configured. Set API_NINJAS_KEY in .env.",
    upstream_fallback: "Nutrition API returned an error.",
    unavailable_detail: "Failed to fetch nutrition info. Try again later.",
};

/// The proxy-and-log pipeline shared by the three search endpoints: check
/// the key, forward upstream, record exactly one log entry on success.
/// A failed log write is reported at warn and does not fail the request.
pub async fn proxy_search(
    state: &AppState,
    endpoint: &ProxyEndpoint,
    params: Vec<(String, String)>,
    log_query: Value,
) -> Result<Vec<Value>, ApiError> {
    let api_key = state
        .config
        .api_ninjas_key
        .as_deref()
        .ok_or_else(|| ApiError::Configuration(endpoint.missing_key_detail.to_string()))?;

    let items = state
        .upstream
        .fetch(
            endpoint.path,
            api_key,
            &params,
            endpoint.upstream_fallback,
            endpoint.unavailable_detail,
        )
        .await?;

    let entry = if endpoint.log_items {
        NewLogEntry {
            query: log_query,
            results: None,
            items: Some(Value::Array(items.clone())),
        }
    } else {
        NewLogEntry {
            query: log_query,
            results: Some(items.len() as i32),
            items: None,
        }
    };
    if let Err(e) = state.store.insert(endpoint.collection, entry).await {
        warn!(error = %e, table = endpoint.collection.table(), "failed to record search log");
    }

    Ok(items)
}

/// Stable history shape: stringified id, query always a mapping (a stored
/// scalar gets wrapped), missing results default to 0.
pub fn normalize_history_row(row: SearchLogRow) -> HistoryEntry {
    let query = match row.query {
        Value::Object(_) => row.query,
        other => json!({ "query": other }),
    };
    HistoryEntry {
        id: row.id.to_string(),
        query,
        results: row.results.unwrap_or(0),
        created_at: row.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_query_is_wrapped_into_a_mapping() {
        let entry = normalize_history_row(SearchLogRow {
            id: 7,
            query: json!("push ups"),
            results: None,
            created_at: None,
        });
        assert_eq!(entry.id, "7");
        assert_eq!(entry.query, json!({ "query": "push ups" }));
        assert_eq!(entry.results, 0);
    }

    #[test]
    fn mapping_query_passes_through() {
        let entry = normalize_history_row(SearchLogRow {
            id: 1,
            query: json!({ "muscle": "biceps" }),
            results: Some(4),
            created_at: None,
        });
        assert_eq!(entry.query, json!({ "muscle": "biceps" }));
        assert_eq!(entry.results, 4);
    }
}
