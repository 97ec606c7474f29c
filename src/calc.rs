use axum::{extract::Query, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/calc", get(calculate))
}

// --- formulas ---

pub fn to_kg(weight: f64, metric: bool) -> f64 {
    if metric {
        weight
    } else {
        weight * 0.45359237
    }
}

pub fn to_cm(height: f64, metric: bool) -> f64 {
    if metric {
        height
    } else {
        height * 2.54
    }
}

pub fn bmi(weight_kg: f64, height_cm: f64) -> Result<f64, ApiError> {
    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return Err(ApiError::InvalidInput("Invalid inputs".into()));
    }
    let h = height_cm / 100.0;
    Ok(weight_kg / (h * h))
}

/// Deurenberg body-fat estimate. Sex factor is 1.0 for male, 0.0 for female.
pub fn bfp_deurenberg(bmi_value: f64, age: i32, is_male: bool) -> Result<f64, ApiError> {
    if bmi_value <= 0.0 || age <= 0 {
        return Err(ApiError::InvalidInput("Invalid inputs".into()));
    }
    let sex = if is_male { 1.0 } else { 0.0 };
    Ok(1.20 * bmi_value + 0.23 * f64::from(age) - 10.8 * sex - 5.4)
}

/// Boundary values belong to the higher tier (18.5 is Normal).
pub fn bmi_category(bmi_value: f64) -> &'static str {
    if bmi_value < 18.5 {
        "Underweight"
    } else if bmi_value < 25.0 {
        "Normal"
    } else if bmi_value < 30.0 {
        "Overweight"
    } else {
        "Obese"
    }
}

/// Tier upper bounds are inclusive except the final catch-all.
pub fn bfp_category(is_male: bool, bfp: f64) -> &'static str {
    if is_male {
        if bfp < 2.0 {
            "Below essential"
        } else if bfp <= 5.0 {
            "Essential"
        } else if bfp <= 13.0 {
            "Athletes"
        } else if bfp <= 17.0 {
            "Fitness"
        } else if bfp <= 24.0 {
            "Average"
        } else {
            "Obese"
        }
    } else if bfp < 10.0 {
        "Below essential"
    } else if bfp <= 13.0 {
        "Essential"
    } else if bfp <= 20.0 {
        "Athletes"
    } else if bfp <= 24.0 {
        "Fitness"
    } else if bfp <= 31.0 {
        "Average"
    } else {
        "Obese"
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// --- handler ---

// Params arrive as strings and are parsed here so malformed input gets the
// same {"detail"} body as every other 400.
#[derive(Debug, Deserialize)]
pub struct CalcQuery {
    pub age: Option<String>,
    pub sex: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub units: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CalcResponse {
    pub bmi: f64,
    #[serde(rename = "bmiCategory")]
    pub bmi_category: &'static str,
    pub bfp: f64,
    #[serde(rename = "bfpCategory")]
    pub bfp_category: &'static str,
}

fn require_positive_int(value: Option<&str>, name: &str) -> Result<i32, ApiError> {
    value
        .and_then(|v| v.parse::<i32>().ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| ApiError::Validation(format!("{name} must be a positive integer.")))
}

fn require_positive_float(value: Option<&str>, name: &str) -> Result<f64, ApiError> {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| *v > 0.0)
        .ok_or_else(|| ApiError::Validation(format!("{name} must be a positive number.")))
}

#[instrument]
pub async fn calculate(Query(q): Query<CalcQuery>) -> Result<Json<CalcResponse>, ApiError> {
    let age = require_positive_int(q.age.as_deref(), "age")?;
    let height = require_positive_float(q.height.as_deref(), "height")?;
    let weight = require_positive_float(q.weight.as_deref(), "weight")?;

    let is_male = match q.sex.as_deref() {
        Some("male") => true,
        Some("female") => false,
        _ => return Err(ApiError::Validation("sex must be 'male' or 'female'.".into())),
    };
    let metric = match q.units.as_deref() {
        None | Some("metric") => true,
        Some("imperial") => false,
        _ => {
            return Err(ApiError::Validation(
                "units must be 'metric' or 'imperial'.".into(),
            ))
        }
    };

    let height_cm = to_cm(height, metric);
    let weight_kg = to_kg(weight, metric);

    let bmi_value = bmi(weight_kg, height_cm)?;
    let bfp_value = bfp_deurenberg(bmi_value, age, is_male)?;

    Ok(Json(CalcResponse {
        bmi: round1(bmi_value),
        bmi_category: bmi_category(bmi_value),
        bfp: round1(bfp_value),
        bfp_category: bfp_category(is_male, bfp_value),
    }))
}
