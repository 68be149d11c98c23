use std::net::SocketAddr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::consts::{
    DEFAULT_BODY_LIMIT_BYTES, DEFAULT_IMAGE_FIELD, DEFAULT_IMAGE_MODEL, DEFAULT_MAX_DURATION_SECS,
    DEFAULT_TEXT_ONLY_MODEL, REPLICATE_API_URL,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub body_limit_bytes: usize,
    /// Long-running budget for one generation request
    pub max_duration_secs: u64,
    pub sentry_dsn: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            sentry_dsn: None,
        }
    }
}

impl ServerConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_base: String,
    pub poll_interval_secs: u64,
    /// Total attempts for transient transport failures, 1 disables retries
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: REPLICATE_API_URL.to_string(),
            poll_interval_secs: 2,
            max_attempts: 1,
            retry_delay_ms: 500,
        }
    }
}

/// Fixed parameters used when no image is supplied
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextOnlyParams {
    pub model: String,
    pub num_frames: u32,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub guidance_scale: f64,
    pub num_inference_steps: u32,
}

impl Default for TextOnlyParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_TEXT_ONLY_MODEL.to_string(),
            num_frames: 24,
            fps: 8,
            width: 576,
            height: 320,
            guidance_scale: 7.5,
            num_inference_steps: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub image_model: String,
    /// Name of the model input that receives the uploaded image
    pub image_field: String,
    pub require_image: bool,
    pub text_only: TextOnlyParams,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_field: DEFAULT_IMAGE_FIELD.to_string(),
            require_image: true,
            text_only: TextOnlyParams::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub generation: GenerationConfig,
}

impl AppConfig {
    /// Reads `config.toml` when present, then `TRAILER__*` environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with_env(trailer_env())
    }

    fn load_with_env(env: Environment) -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}

/// `TRAILER__SECTION__KEY=value`, e.g. `TRAILER__PROVIDER__MAX_ATTEMPTS=3`
fn trailer_env() -> Environment {
    Environment::with_prefix("TRAILER")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
