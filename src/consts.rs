use std::time::Duration;

// Replicate Constants
pub const REPLICATE_API_URL: &str = "https://api.replicate.com/v1";
pub const DEFAULT_IMAGE_MODEL: &str = "minimax/video-01";
pub const DEFAULT_IMAGE_FIELD: &str = "subject_reference";
pub const DEFAULT_TEXT_ONLY_MODEL: &str = "anotherjesse/zeroscope-v2-xl";

/// Floor for the prediction status poll, whatever the config says
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub const GENERATE_TRAILER_PATH: &str = "/api/generate-trailer";

pub const DEFAULT_BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024; // 50MB
pub const DEFAULT_MAX_DURATION_SECS: u64 = 300; // 5 minutes

/// Used when a failure carries no message of its own
pub const GENERIC_PROVIDER_FAILURE: &str = "Failed to generate video";
pub const GENERIC_CLIENT_FAILURE: &str = "Failed to generate trailer. Please try again.";

/// Client-side storage key for the user's Replicate token
pub const CREDENTIAL_STORE_KEY: &str = "apiToken";

/// Prompts are cut to this many chars in logs
pub const LOG_PROMPT_CHARS: usize = 60;
