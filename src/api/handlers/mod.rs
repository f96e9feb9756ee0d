use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::FormConfig;
use crate::models::{FieldError, PredictionResult};
use crate::pipeline::{FormInput, PriceService, SubmitError};

// ============================================================
// Response Types
// ============================================================

/// A per-field validation warning. The field was treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldWarning {
    pub field: String,
    pub message: String,
}

impl From<&FieldError> for FieldWarning {
    fn from(e: &FieldError) -> Self {
        Self {
            field: e.field().as_str().to_string(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub result: PredictionResult,
    #[serde(default)]
    pub warnings: Vec<FieldWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub warnings: Vec<FieldWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutResponse {
    pub title: String,
    pub description: String,
    pub model: String,
    pub log_target: bool,
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Form
// ============================================================

pub async fn form(State(service): State<PriceService>) -> Json<FormConfig> {
    Json(service.form().clone())
}

pub async fn about(State(service): State<PriceService>) -> Json<AboutResponse> {
    Json(AboutResponse {
        title: "Diamond Price Predictor".to_string(),
        description: "Estimates a diamond's price from its carat, cut, color, clarity, \
                      depth, table and measured dimensions."
            .to_string(),
        model: service.description().to_string(),
        log_target: service.log_target(),
    })
}

// ============================================================
// Predict
// ============================================================

/// Submission problems are the client's to fix and come back as 422 (400
/// for a body that is not JSON at all). Model failures are 500s, but the
/// cause is still reported so the form can show it.
pub async fn predict(
    State(service): State<PriceService>,
    payload: Result<Json<FormInput>, JsonRejection>,
) -> Result<Json<PredictResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(input) = payload.map_err(|rejection| {
        tracing::warn!("Rejected predict body: {}", rejection.body_text());
        (
            rejection.status(),
            Json(ErrorResponse {
                error: rejection.body_text(),
                warnings: Vec::new(),
            }),
        )
    })?;

    let submission = service.submit(&input);
    let warnings: Vec<FieldWarning> = submission.warnings.iter().map(Into::into).collect();

    match submission.outcome {
        Ok(result) => Ok(Json(PredictResponse { result, warnings })),
        Err(e) => {
            let status = match &e {
                SubmitError::Assemble(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SubmitError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                    warnings,
                }),
            ))
        }
    }
}
