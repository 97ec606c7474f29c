mod dto;
pub mod handlers;
mod service;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/exercises", get(handlers::get_exercises))
        .route("/recipes", get(handlers::get_recipes))
        .route("/nutrition", get(handlers::get_nutrition))
        .route("/search-history", get(handlers::get_search_history))
}
