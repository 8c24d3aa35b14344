use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Body of `GET /predict?ticker=...`
///
/// Decoding is lenient: a missing, null or non-numeric `history` becomes an
/// empty history instead of an error, and a non-numeric `prediction` is
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PredictionResponse {
    #[serde(default, deserialize_with = "lenient_price")]
    pub prediction: Option<f64>,
    #[serde(default, deserialize_with = "lenient_history")]
    pub history: Vec<f64>,
}

impl PredictionResponse {
    /// Parse a response body. Only invalid JSON is an error; any valid JSON
    /// that is not an object degrades to an empty response.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(body)? {
            value @ Value::Object(_) => serde_json::from_value(value),
            other => {
                warn!("Prediction response is not an object ({}), using empty history", kind(&other));
                Ok(Self::default())
            }
        }
    }
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

fn lenient_history<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let history = match value {
        Value::Array(items) => match items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>() {
            Some(history) => history,
            None => {
                warn!("Prediction history contains non-numeric entries, using empty history");
                Vec::new()
            }
        },
        Value::Null => Vec::new(),
        other => {
            warn!("Prediction history is {} instead of an array, using empty history", kind(&other));
            Vec::new()
        }
    };
    Ok(history)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Failures talking to the prediction service
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network/request error
    #[error("Request Error: {0}")]
    Request(String),
    /// Non-2xx status
    #[error("HTTP Error ({code}): {body}")]
    Status { code: u16, body: String },
    /// Body was not valid JSON
    #[error("Deserialization Error: {0}")]
    Deserialization(String),
}
