use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::api::predictor::PredictionSource;
use crate::services::prediction_service::RequestCoordinator;

/// One request coordinator per channel, created on first use and kept for the
/// lifetime of the process.
///
/// Growth is bounded by the number of channels the bot can read, and an idle
/// session is one small `watch` value, so entries are never evicted.
pub struct SessionRegistry<S> {
    source: S,
    sessions: Mutex<HashMap<u64, RequestCoordinator<S>>>,
}

impl<S: PredictionSource + Clone> SessionRegistry<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Session for `channel_id`, creating an Idle one if needed
    pub async fn session(&self, channel_id: u64) -> RequestCoordinator<S> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(channel_id)
            .or_insert_with(|| {
                tracing::debug!("Creating prediction session for channel {}", channel_id);
                RequestCoordinator::new(self.source.clone())
            })
            .clone()
    }

    /// Session for `channel_id` without creating one
    pub async fn existing(&self, channel_id: u64) -> Option<RequestCoordinator<S>> {
        self.sessions.lock().await.get(&channel_id).cloned()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
