use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::GenerationError;
use crate::videogen::replicate::{ReplicatePredictionResponse, VideoProvider};

/// Retries transient transport failures of the wrapped provider with a fixed delay.
/// `max_attempts` counts the first call, so 1 means a single call.
///
/// Submits are only repeated while no prediction id came back. Once one did,
/// retries resume waiting on that same prediction, so a request never starts
/// a second remote run.
pub struct RetryingProvider<P> {
    inner: P,
    max_attempts: u32,
    delay: Duration,
}

impl<P> RetryingProvider<P> {
    pub fn new(inner: P, max_attempts: u32, delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(inner: P, conf: &ProviderConfig) -> Self {
        Self::new(
            inner,
            conf.max_attempts,
            Duration::from_millis(conf.retry_delay_ms),
        )
    }

    async fn retry<T, F, Fut>(&self, stage: &str, mut call: F) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, GenerationError>> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    log::warn!(
                        "Provider {stage} attempt {attempt}/{} failed, retrying: {e}",
                        self.max_attempts
                    );
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<P: VideoProvider> VideoProvider for RetryingProvider<P> {
    async fn submit(
        &self,
        credential: &str,
        model: &str,
        input: &Value,
    ) -> Result<ReplicatePredictionResponse, GenerationError> {
        self.retry("submit", || self.inner.submit(credential, model, input))
            .await
    }

    async fn wait(
        &self,
        credential: &str,
        prediction: ReplicatePredictionResponse,
    ) -> Result<Value, GenerationError> {
        self.retry("wait", || self.inner.wait(credential, prediction.clone()))
            .await
    }
}
