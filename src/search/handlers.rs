use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::{error, instrument};

use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{ExerciseQuery, HistoryEntry, NutritionItem, SearchQuery};
use super::service::{self, proxy_search, EXERCISES, NUTRITION, RECIPES};

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

#[instrument(skip(state))]
pub async fn get_exercises(
    State(state): State<AppState>,
    Query(q): Query<ExerciseQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let muscle = non_empty(q.muscle);
    let kind = non_empty(q.kind);
    let difficulty = non_empty(q.difficulty);
    let name = non_empty(q.name);

    if muscle.is_none() && kind.is_none() && name.is_none() {
        return Err(ApiError::Validation(
            "Provide at least one of muscle, type, or name to search exercises.".into(),
        ));
    }

    let mut params: Vec<(String, String)> = Vec::new();
    let mut log_query = Map::new();
    for (key, value) in [
        ("muscle", muscle),
        ("type", kind),
        ("difficulty", difficulty),
        ("name", name),
    ] {
        if let Some(value) = value {
            params.push((key.to_string(), value.clone()));
            log_query.insert(key.to_string(), Value::String(value));
        }
    }
    if let Some(offset) = non_empty(q.offset) {
        let offset: i64 = offset
            .parse()
            .map_err(|_| ApiError::Validation("offset must be an integer.".into()))?;
        params.push(("offset".into(), offset.to_string()));
        log_query.insert("offset".into(), json!(offset));
    }

    let items = proxy_search(&state, &EXERCISES, params, Value::Object(log_query)).await?;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_recipes(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let query = non_empty(q.query)
        .ok_or_else(|| ApiError::Validation("query is required.".into()))?;

    let params = vec![("query".to_string(), query.clone())];
    let items = proxy_search(&state, &RECIPES, params, json!({ "query": query })).await?;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_nutrition(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<NutritionItem>>, ApiError> {
    let query = non_empty(q.query)
        .ok_or_else(|| ApiError::Validation("query is required.".into()))?;

    let params = vec![("query".to_string(), query.clone())];
    let items = proxy_search(&state, &NUTRITION, params, json!({ "query": query })).await?;
    let items = items
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap_or_default())
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_search_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let rows = state
        .store
        .recent_exercise_searches(10)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to read search history");
            ApiError::Internal("Failed to load search history.".into())
        })?;
    let entries = rows.into_iter().map(service::normalize_history_row).collect();
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use time::OffsetDateTime;
    use tower::ServiceExt;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::app::build_app;
    use crate::state::test_support::fake_state;
    use crate::store::LogCollection;

    async fn send(app: Router, uri: &str) -> (StatusCode, Value) {
        let res = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    #[tokio::test]
    async fn exercises_without_any_filter_is_rejected() {
        let (state, store) = fake_state("http://127.0.0.1:1", Some("test-key"));
        let (status, body) = send(build_app(state), "/api/exercises?difficulty=beginner").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["detail"],
            "Provide at least one of muscle, type, or name to search exercises."
        );
        assert!(store.entries(LogCollection::ExerciseSearch).is_empty());
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_upstream_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let (state, store) = fake_state(&server.uri(), None);
        let app = build_app(state);

        for uri in [
            "/api/exercises?muscle=biceps",
            "/api/recipes?query=pasta",
            "/api/nutrition?query=banana",
        ] {
            let (status, body) = send(app.clone(), uri).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert!(
                body["detail"]
                    .as_str()
                    .expect("detail")
                    .contains("API key is not configured"),
                "{uri}"
            );
        }
        assert!(store.entries(LogCollection::ExerciseSearch).is_empty());
        assert!(store.entries(LogCollection::RecipeSearch).is_empty());
        assert!(store.entries(LogCollection::NutritionLookup).is_empty());
    }

    #[tokio::test]
    async fn successful_exercise_search_logs_exactly_one_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/exercises"))
            .and(query_param("muscle", "biceps"))
            .and(query_param("offset", "10"))
            .and(header("X-Api-Key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "Curl" },
                { "name": "Chin-up" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let (state, store) = fake_state(&server.uri(), Some("test-key"));
        let (status, body) = send(build_app(state), "/api/exercises?muscle=biceps&offset=10").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().expect("list").len(), 2);

        let entries = store.entries(LogCollection::ExerciseSearch);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].results, Some(2));
        assert_eq!(entries[0].query, json!({ "muscle": "biceps", "offset": 10 }));
        assert!(entries[0].created_at.is_some());
    }

    #[tokio::test]
    async fn upstream_error_object_surfaces_its_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/exercises"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "bad request" })),
            )
            .mount(&server)
            .await;

        let (state, store) = fake_state(&server.uri(), Some("test-key"));
        let (status, body) = send(build_app(state), "/api/exercises?name=curl").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "bad request");
        assert!(store.entries(LogCollection::ExerciseSearch).is_empty());
    }

    #[tokio::test]
    async fn upstream_string_body_passes_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/recipe"))
            .respond_with(ResponseTemplate::new(502).set_body_json(json!("backend down")))
            .mount(&server)
            .await;

        let (state, _store) = fake_state(&server.uri(), Some("test-key"));
        let (status, body) = send(build_app(state), "/api/recipes?query=pasta").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["detail"], "backend down");
    }

    #[tokio::test]
    async fn upstream_error_without_message_uses_endpoint_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/nutrition"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let (state, _store) = fake_state(&server.uri(), Some("test-key"));
        let (status, body) = send(build_app(state), "/api/nutrition?query=banana").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Nutrition API returned an error.");
    }

    #[tokio::test]
    async fn network_failure_maps_to_generic_unavailable_message() {
        // Nothing listens here, so the connect fails immediately.
        let (state, store) = fake_state("http://127.0.0.1:1", Some("test-key"));
        let (status, body) = send(build_app(state), "/api/exercises?muscle=biceps").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Failed to fetch exercises. Try again later.");
        assert!(store.entries(LogCollection::ExerciseSearch).is_empty());
    }

    #[tokio::test]
    async fn non_list_success_body_counts_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/exercises"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "hi" })))
            .mount(&server)
            .await;

        let (state, store) = fake_state(&server.uri(), Some("test-key"));
        let (status, body) = send(build_app(state), "/api/exercises?muscle=biceps").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
        let entries = store.entries(LogCollection::ExerciseSearch);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].results, Some(0));
    }

    #[tokio::test]
    async fn nutrition_logs_the_full_item_list() {
        let upstream_items = json!([
            { "name": "banana", "calories": 89.4, "sugar_g": 12.2 }
        ]);
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/nutrition"))
            .and(query_param("query", "banana"))
            .respond_with(ResponseTemplate::new(200).set_body_json(upstream_items.clone()))
            .mount(&server)
            .await;

        let (state, store) = fake_state(&server.uri(), Some("test-key"));
        let (status, body) = send(build_app(state), "/api/nutrition?query=banana").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "banana");
        assert_eq!(body[0]["calories"], 89.4);

        let entries = store.entries(LogCollection::NutritionLookup);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].results, None);
        assert_eq!(entries[0].items, Some(upstream_items));
        assert_eq!(entries[0].query, json!({ "query": "banana" }));
    }

    #[tokio::test]
    async fn recipes_require_a_query() {
        let (state, _store) = fake_state("http://127.0.0.1:1", Some("test-key"));
        let app = build_app(state);
        let (status, body) = send(app.clone(), "/api/recipes").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "query is required.");

        let (status, _) = send(app, "/api/recipes?query=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_returns_at_most_ten_newest_entries() {
        let (state, store) = fake_state("http://127.0.0.1:1", None);
        let base = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp");
        for i in 0..12 {
            store.push_raw(
                LogCollection::ExerciseSearch,
                json!({ "muscle": "biceps", "offset": i }),
                Some(i),
                Some(base + time::Duration::seconds(i64::from(i))),
            );
        }

        let (status, body) = send(build_app(state), "/api/search-history").await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().expect("list");
        assert_eq!(entries.len(), 10);
        // Newest first.
        assert_eq!(entries[0]["id"], "12");
        assert_eq!(entries[0]["results"], 11);
        assert_eq!(entries[9]["id"], "3");
        assert!(entries[0]["createdAt"].is_string());
    }

    #[tokio::test]
    async fn history_falls_back_to_insertion_order_without_timestamps() {
        let (state, store) = fake_state("http://127.0.0.1:1", None);
        for name in ["squat", "bench", "deadlift"] {
            store.push_raw(
                LogCollection::ExerciseSearch,
                json!({ "name": name }),
                None,
                None,
            );
        }

        let (status, body) = send(build_app(state), "/api/search-history").await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().expect("list");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["id"], "3");
        assert_eq!(entries[0]["query"], json!({ "name": "deadlift" }));
        assert_eq!(entries[0]["results"], 0);
        assert!(entries[0]["createdAt"].is_null());
    }
}
