use std::future::Future;
use std::time::Duration;

use reqwest::Client as HttpClient;
use tracing::{debug, warn};

use super::models::{ApiError, PredictionResponse};

/// Anything that can answer a prediction request for a ticker.
///
/// The request coordinator only depends on this, so tests can script responses.
pub trait PredictionSource: Send + Sync + 'static {
    fn fetch(&self, ticker: &str) -> impl Future<Output = Result<PredictionResponse, ApiError>> + Send;
}

impl<T: PredictionSource> PredictionSource for std::sync::Arc<T> {
    fn fetch(&self, ticker: &str) -> impl Future<Output = Result<PredictionResponse, ApiError>> + Send {
        (**self).fetch(ticker)
    }
}

/// HTTP client for the prediction service
#[derive(Clone)]
pub struct PredictorClient {
    http_client: HttpClient,
    base_url: String,
}

impl PredictorClient {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8080/predict";

    /// Create a new client for the given endpoint, e.g. `http://host:8080/predict`.
    ///
    /// `timeout` bounds the whole exchange so a stalled service cannot keep a
    /// channel in Loading forever.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ApiError> {
        let http_client = HttpClient::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn build_request(&self, ticker: &str) -> Result<reqwest::Request, ApiError> {
        self.http_client
            .get(&self.base_url)
            .query(&[("ticker", ticker)])
            .build()
            .map_err(|e| ApiError::Request(format!("Failed to build request: {}", e)))
    }

    /// GET <base-url>?ticker=<TICKER>
    ///
    /// Exactly one attempt, bounded by the client timeout.
    pub async fn fetch_prediction(&self, ticker: &str) -> Result<PredictionResponse, ApiError> {
        let request = self.build_request(ticker)?;
        debug!("GET {}", request.url());

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| ApiError::Request(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Request(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            warn!("Prediction service returned {} for {}", status, ticker);
            return Err(ApiError::Status {
                code: status.as_u16(),
                body,
            });
        }

        PredictionResponse::from_json(&body)
            .map_err(|e| ApiError::Deserialization(format!("Failed to parse response: {}", e)))
    }
}

impl PredictionSource for PredictorClient {
    fn fetch(&self, ticker: &str) -> impl Future<Output = Result<PredictionResponse, ApiError>> + Send {
        self.fetch_prediction(ticker)
    }
}
