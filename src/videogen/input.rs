use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Map, Value};

use crate::config::{GenerationConfig, TextOnlyParams};
use crate::videogen::types::{GenerationRequest, UploadedImage};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Model-specific input for one generation call
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderInput {
    ImageConditioned {
        model: String,
        prompt: String,
        image_field: String,
        /// `data:<mime>;base64,<payload>`
        image: String,
    },
    TextOnly {
        model: String,
        prompt: String,
        params: TextOnlyParams,
    },
}

impl ProviderInput {
    pub fn build(request: &GenerationRequest, conf: &GenerationConfig) -> Self {
        match &request.image {
            Some(image) => ProviderInput::ImageConditioned {
                model: conf.image_model.clone(),
                prompt: request.prompt.clone(),
                image_field: conf.image_field.clone(),
                image: to_data_uri(image),
            },
            None => ProviderInput::TextOnly {
                model: conf.text_only.model.clone(),
                prompt: request.prompt.clone(),
                params: conf.text_only.clone(),
            },
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderInput::ImageConditioned { model, .. } | ProviderInput::TextOnly { model, .. } => {
                model
            }
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            ProviderInput::ImageConditioned { prompt, .. }
            | ProviderInput::TextOnly { prompt, .. } => prompt,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            ProviderInput::ImageConditioned { .. } => "image",
            ProviderInput::TextOnly { .. } => "text_only",
        }
    }

    /// JSON object sent as the prediction's `input`
    pub fn to_json(&self) -> Value {
        match self {
            ProviderInput::ImageConditioned {
                prompt,
                image_field,
                image,
                ..
            } => {
                let mut input = Map::new();
                input.insert("prompt".into(), Value::String(prompt.clone()));
                input.insert(image_field.clone(), Value::String(image.clone()));
                Value::Object(input)
            }
            ProviderInput::TextOnly { prompt, params, .. } => json!({
                "prompt": prompt,
                "num_frames": params.num_frames,
                "fps": params.fps,
                "width": params.width,
                "height": params.height,
                "guidance_scale": params.guidance_scale,
                "num_inference_steps": params.num_inference_steps,
            }),
        }
    }
}

pub fn to_data_uri(image: &UploadedImage) -> String {
    let mime = image
        .content_type
        .as_deref()
        .filter(|ct| !ct.is_empty())
        .unwrap_or(FALLBACK_MIME);
    format!("data:{};base64,{}", mime, BASE64.encode(&image.bytes))
}
