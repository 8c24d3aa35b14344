pub mod client;
pub mod models;

pub use client::{PredictionSource, PredictorClient};
pub use models::{ApiError, PredictionResponse};
