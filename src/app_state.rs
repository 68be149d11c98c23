use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::videogen::replicate::{ReplicateClient, VideoProvider};
use crate::videogen::retry::RetryingProvider;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn VideoProvider>,
}

impl AppState {
    pub fn new(app_config: AppConfig) -> Result<Self> {
        let replicate = ReplicateClient::new(&app_config.provider)
            .context("Failed to build Replicate HTTP client")?;
        let provider = RetryingProvider::from_config(replicate, &app_config.provider);

        Ok(Self::with_provider(app_config, Arc::new(provider)))
    }

    pub fn with_provider(app_config: AppConfig, provider: Arc<dyn VideoProvider>) -> Self {
        AppState {
            config: app_config,
            provider,
        }
    }
}
