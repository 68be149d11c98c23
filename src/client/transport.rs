use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to read image: {0}")]
    Image(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

impl ImageFile {
    pub async fn from_path(path: &Path) -> Result<Self, TransportError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            bytes,
            file_name,
            mime,
        })
    }
}

/// One submission of the generation form
#[derive(Debug, Clone)]
pub struct GenerationForm {
    pub image: Option<ImageFile>,
    pub prompt: String,
    pub api_token: String,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// `Value::Null` when the body is not JSON
    pub body: Value,
}

#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn submit(&self, form: GenerationForm) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: GenerationTransport + ?Sized> GenerationTransport for std::sync::Arc<T> {
    async fn submit(&self, form: GenerationForm) -> Result<TransportResponse, TransportError> {
        (**self).submit(form).await
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl GenerationTransport for HttpTransport {
    async fn submit(&self, form: GenerationForm) -> Result<TransportResponse, TransportError> {
        let mut multipart = Form::new()
            .text("prompt", form.prompt)
            .text("apiToken", form.api_token);

        if let Some(image) = form.image {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.mime)?;
            multipart = multipart.part("image", part);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(multipart)
            .send()
            .await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Ok(TransportResponse { status, body })
    }
}
