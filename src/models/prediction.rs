//! Prediction request and lifecycle models

use chrono::{DateTime, Utc};

use crate::api::predictor::PredictionResponse;

/// User-facing text for every failed request. The underlying cause is only logged.
pub const GENERIC_FAILURE_MESSAGE: &str = "Could not fetch prediction. Is the API running?";

/// Price recorded when the service response carries no usable `prediction` field
pub const PLACEHOLDER_PREDICTION: f64 = 200.0;

/// A ticker submitted by the user, normalized to uppercase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub ticker: String,
}

impl PredictionRequest {
    /// No validation: an empty ticker is passed through to the service unchanged
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
        }
    }
}

/// Outcome of one successful fetch
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub ticker: String,
    pub predicted_price: f64,
    /// Closing prices, oldest first
    pub history: Vec<f64>,
    pub fetched_at: DateTime<Utc>,
}

impl PredictionResult {
    pub fn from_response(request: &PredictionRequest, response: PredictionResponse) -> Self {
        Self {
            ticker: request.ticker.clone(),
            predicted_price: response.prediction.unwrap_or(PLACEHOLDER_PREDICTION),
            history: response.history,
            fetched_at: Utc::now(),
        }
    }

    pub fn last_close(&self) -> Option<f64> {
        self.history.last().copied()
    }
}

/// The single source of truth for what a page shows.
///
/// Loading, error and result are variants of one enum, so they can never be
/// visible at the same time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading {
        ticker: String,
    },
    Succeeded(PredictionResult),
    Failed(String),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading { .. })
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            RequestState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Short name used in logs and the status embed
    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "Idle",
            RequestState::Loading { .. } => "Loading",
            RequestState::Succeeded(_) => "Succeeded",
            RequestState::Failed(_) => "Failed",
        }
    }
}
