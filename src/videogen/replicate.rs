use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::ProviderConfig;
use crate::consts::MIN_POLL_INTERVAL;
use crate::error::GenerationError;

/// A hosted model that turns an input object into a prediction output.
/// A call is split at the point the remote prediction exists, so wrappers can
/// tell a repeatable submit from a wait on work already started.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Starts one prediction of `model` with the caller's credential
    async fn submit(
        &self,
        credential: &str,
        model: &str,
        input: &Value,
    ) -> Result<ReplicatePredictionResponse, GenerationError>;

    /// Waits for a started prediction and returns its raw `output`
    async fn wait(
        &self,
        credential: &str,
        prediction: ReplicatePredictionResponse,
    ) -> Result<Value, GenerationError>;

    async fn run(
        &self,
        credential: &str,
        model: &str,
        input: Value,
    ) -> Result<Value, GenerationError> {
        let prediction = self.submit(credential, model, &input).await?;
        info!("Prediction submitted with ID: {}", prediction.id);
        self.wait(credential, prediction).await
    }
}

#[derive(Serialize)]
pub struct ReplicatePredictionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
    pub input: &'a Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplicatePredictionResponse {
    pub id: String,
    pub status: String,
    pub output: Option<Value>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct ReplicateErrorBody {
    detail: Option<String>,
}

pub struct ReplicateClient {
    client: reqwest::Client,
    api_base: String,
    poll_interval: Duration,
}

impl ReplicateClient {
    pub fn new(conf: &ProviderConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            api_base: conf.api_base.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(conf.poll_interval_secs).max(MIN_POLL_INTERVAL),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// `owner/name` goes through the model endpoint, `owner/name:version` through a pinned version
    fn submit_url<'a>(&self, model: &'a str) -> (String, Option<&'a str>) {
        match model.split_once(':') {
            Some((_, version)) => (format!("{}/predictions", self.api_base), Some(version)),
            None => (format!("{}/models/{model}/predictions", self.api_base), None),
        }
    }

    async fn fetch(
        &self,
        credential: &str,
        prediction_id: &str,
    ) -> Result<ReplicatePredictionResponse, GenerationError> {
        let response = self
            .client
            .get(format!("{}/predictions/{prediction_id}", self.api_base))
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| {
                GenerationError::Network(format!("Failed to check prediction status: {e}"))
            })?;

        parse_prediction(response).await
    }
}

#[async_trait]
impl VideoProvider for ReplicateClient {
    async fn submit(
        &self,
        credential: &str,
        model: &str,
        input: &Value,
    ) -> Result<ReplicatePredictionResponse, GenerationError> {
        let (url, version) = self.submit_url(model);
        let response = self
            .client
            .post(url)
            .bearer_auth(credential)
            .json(&ReplicatePredictionRequest { version, input })
            .send()
            .await
            .map_err(|e| GenerationError::Network(format!("Failed to submit prediction: {e}")))?;

        parse_prediction(response).await
    }

    /// Polls until the prediction reaches a terminal state. The caller bounds the wait.
    async fn wait(
        &self,
        credential: &str,
        mut prediction: ReplicatePredictionResponse,
    ) -> Result<Value, GenerationError> {
        let mut polls: u64 = 0;
        loop {
            match prediction.status.as_str() {
                "succeeded" => return Ok(prediction.output.unwrap_or(Value::Null)),
                "failed" | "canceled" => {
                    let error = prediction
                        .error
                        .filter(|e| !e.is_empty())
                        .unwrap_or_else(|| format!("Prediction {}", prediction.status));
                    return Err(GenerationError::ProviderFailure(format!(
                        "Video generation failed: {error}"
                    )));
                }
                "starting" | "processing" => {}
                other => log::debug!("Unknown prediction status: {other}"),
            }

            polls += 1;
            if polls % 15 == 0 {
                info!(
                    "Prediction {} still {} after {} polls",
                    prediction.id, prediction.status, polls
                );
            }

            tokio::time::sleep(self.poll_interval).await;
            prediction = self.fetch(credential, &prediction.id).await?;
        }
    }
}

async fn parse_prediction(
    response: reqwest::Response,
) -> Result<ReplicatePredictionResponse, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let detail = serde_json::from_str::<ReplicateErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or(body);

        return Err(match status.as_u16() {
            401 | 403 => GenerationError::Unauthorized(detail),
            _ => GenerationError::ProviderFailure(format!("Replicate API error: {detail}")),
        });
    }

    response.json().await.map_err(|e| {
        GenerationError::ProviderFailure(format!("Failed to parse prediction response: {e}"))
    })
}
