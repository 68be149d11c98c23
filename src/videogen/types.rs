use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::GenerationError;

/// Image part of the generation form
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub bytes: Bytes,
    /// Declared content type of the multipart part
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

/// Validated contents of one generation form submission
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub credential: String,
    pub image: Option<UploadedImage>,
}

impl GenerationRequest {
    /// Rejects submissions missing the prompt, the credential, or a required image.
    /// Empty strings count as missing.
    pub fn from_fields(
        prompt: Option<String>,
        credential: Option<String>,
        image: Option<UploadedImage>,
        require_image: bool,
    ) -> Result<Self, GenerationError> {
        let prompt = prompt.filter(|p| !p.trim().is_empty());
        let credential = credential.filter(|c| !c.trim().is_empty());
        let image = image.filter(|i| !i.bytes.is_empty());

        let mut missing = Vec::new();
        if require_image && image.is_none() {
            missing.push("image");
        }
        if prompt.is_none() {
            missing.push("prompt");
        }
        if credential.is_none() {
            missing.push("apiToken");
        }

        match (prompt, credential) {
            (Some(prompt), Some(credential)) if missing.is_empty() => Ok(Self {
                prompt,
                credential: credential.trim().to_string(),
                image,
            }),
            _ => Err(GenerationError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct GenerationResult {
    /// Echo of the submitted prompt
    pub script: String,
    pub video_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct GenerateTrailerResponse {
    pub present: GenerationResult,
}

/// Multipart form accepted by the generation endpoint. Only used for the OpenAPI document.
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct GenerateTrailerForm {
    /// Reference image, required unless the server runs in text-only mode
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
    pub prompt: String,
    /// Replicate API token
    #[serde(rename = "apiToken")]
    pub api_token: String,
}
