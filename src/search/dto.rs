use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
pub struct ExerciseQuery {
    pub muscle: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub difficulty: Option<String>,
    pub name: Option<String>,
    // Parsed in the handler so a malformed value still yields the JSON
    // {"detail"} error body instead of an extractor rejection.
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// Passthrough of the provider's nutrition shape. Every field is optional:
/// missing means unknown, not zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NutritionItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat_total_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat_saturated_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sodium_mg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potassium_mg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cholesterol_mg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbohydrates_total_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar_g: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub query: Value,
    pub results: i32,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}
