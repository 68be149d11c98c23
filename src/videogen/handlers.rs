use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::app_state::AppState;
use crate::consts::LOG_PROMPT_CHARS;
use crate::error::{ErrorEnvelope, GenerationError};
use crate::videogen::input::ProviderInput;
use crate::videogen::output::normalize_output;
use crate::videogen::types::{
    GenerateTrailerResponse, GenerationRequest, GenerationResult, UploadedImage,
};

#[derive(Default)]
struct RawForm {
    prompt: Option<String>,
    api_token: Option<String>,
    image: Option<UploadedImage>,
}

fn invalid_body(e: impl std::fmt::Display) -> GenerationError {
    GenerationError::Validation(format!("Invalid multipart body: {e}"))
}

/// Drains the multipart stream. Unknown fields are skipped, later duplicates win.
async fn read_form(mut multipart: Multipart) -> Result<RawForm, GenerationError> {
    let mut form = RawForm::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_body)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "prompt" => form.prompt = Some(field.text().await.map_err(invalid_body)?),
            "apiToken" => form.api_token = Some(field.text().await.map_err(invalid_body)?),
            "image" => {
                let content_type = field.content_type().map(str::to_owned);
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await.map_err(invalid_body)?;
                form.image = Some(UploadedImage {
                    bytes,
                    content_type,
                    file_name,
                });
            }
            other => log::debug!("Ignoring unknown form field '{other}'"),
        }
    }

    Ok(form)
}

fn truncate_prompt(prompt: &str) -> &str {
    prompt
        .char_indices()
        .nth(LOG_PROMPT_CHARS)
        .map(|(idx, _)| &prompt[..idx])
        .unwrap_or(prompt)
}

pub async fn generate(
    app_state: &AppState,
    request: GenerationRequest,
) -> Result<GenerationResult, GenerationError> {
    let input = ProviderInput::build(&request, &app_state.config.generation);
    let budget = app_state.config.server.max_duration();

    info!(
        "Starting video generation with {} ({} mode) for prompt: {}",
        input.model(),
        input.mode(),
        truncate_prompt(input.prompt())
    );

    let output = tokio::time::timeout(
        budget,
        app_state
            .provider
            .run(&request.credential, input.model(), input.to_json()),
    )
    .await
    .map_err(|_| GenerationError::Timeout(budget.as_secs()))??;

    let video_url = normalize_output(output)?;
    info!("Generation complete: {video_url}");

    Ok(GenerationResult {
        script: request.prompt,
        video_url,
    })
}

/// Generate a video from a prompt and an optional reference image
#[utoipa::path(
    post,
    path = "/generate-trailer",
    request_body(
        content = crate::videogen::types::GenerateTrailerForm,
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 200, description = "Video generated", body = GenerateTrailerResponse),
        (status = 400, description = "Missing required fields", body = ErrorEnvelope),
        (status = 500, description = "Provider error", body = ErrorEnvelope),
    ),
    tag = "VideoGen"
)]
#[instrument(skip_all)]
pub async fn generate_trailer(
    State(app_state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerateTrailerResponse>, (StatusCode, Json<ErrorEnvelope>)> {
    let multipart = multipart.map_err(|e| invalid_body(e.body_text()))?;
    let form = read_form(multipart).await?;

    let request = GenerationRequest::from_fields(
        form.prompt,
        form.api_token,
        form.image,
        app_state.config.generation.require_image,
    )?;

    match generate(&app_state, request).await {
        Ok(present) => Ok(Json(GenerateTrailerResponse { present })),
        Err(e) => {
            log::error!("API Error: {e}");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::videogen::replicate::{ReplicatePredictionResponse, VideoProvider};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "trailer-test-boundary";

    struct FakeProvider {
        output: Result<Value, fn() -> GenerationError>,
        delay: Duration,
        calls: Mutex<Vec<(String, String, Value)>>,
    }

    impl FakeProvider {
        fn returning(output: Value) -> Arc<Self> {
            Arc::new(Self {
                output: Ok(output),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: fn() -> GenerationError) -> Arc<Self> {
            Arc::new(Self {
                output: Err(error),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl VideoProvider for FakeProvider {
        async fn submit(
            &self,
            credential: &str,
            model: &str,
            input: &Value,
        ) -> Result<ReplicatePredictionResponse, GenerationError> {
            self.calls
                .lock()
                .unwrap()
                .push((credential.to_string(), model.to_string(), input.clone()));
            Ok(ReplicatePredictionResponse {
                id: "pred-fake".into(),
                status: "starting".into(),
                output: None,
                error: None,
            })
        }

        async fn wait(
            &self,
            _: &str,
            _: ReplicatePredictionResponse,
        ) -> Result<Value, GenerationError> {
            tokio::time::sleep(self.delay).await;
            match &self.output {
                Ok(value) => Ok(value.clone()),
                Err(error) => Err(error()),
            }
        }
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File(name, mime, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"me.png\"\r\nContent-Type: {mime}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post_form(
        config: AppConfig,
        provider: Arc<FakeProvider>,
        parts: &[Part<'_>],
    ) -> (StatusCode, Value) {
        let state = Arc::new(AppState::with_provider(config, provider));
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate-trailer")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();

        let response = crate::app_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn text_only_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.generation.require_image = false;
        config
    }

    #[tokio::test]
    async fn test_image_generation_returns_first_url() {
        let provider = FakeProvider::returning(json!(["https://x/video.mp4"]));
        let (status, body) = post_form(
            AppConfig::default(),
            provider.clone(),
            &[
                Part::File("image", "image/png", b"png-bytes"),
                Part::Text("prompt", "me as an astronaut"),
                Part::Text("apiToken", "r8_user"),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "present": {
                    "script": "me as an astronaut",
                    "video_url": "https://x/video.mp4"
                }
            })
        );

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (credential, model, input) = &calls[0];
        assert_eq!(credential, "r8_user");
        assert_eq!(model, "minimax/video-01");
        assert_eq!(
            input["subject_reference"],
            json!("data:image/png;base64,cG5nLWJ5dGVz")
        );
    }

    #[tokio::test]
    async fn test_structured_output_is_unwrapped() {
        let provider = FakeProvider::returning(json!({ "output": "https://x/video.mp4" }));
        let (status, body) = post_form(
            text_only_config(),
            provider,
            &[Part::Text("prompt", "a cat"), Part::Text("apiToken", "r8_user")],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["present"]["video_url"], json!("https://x/video.mp4"));
    }

    #[tokio::test]
    async fn test_missing_fields_never_reach_provider() {
        for parts in [
            vec![Part::Text("apiToken", "r8_user")],
            vec![Part::Text("prompt", "a cat")],
            vec![Part::Text("prompt", ""), Part::Text("apiToken", "r8_user")],
        ] {
            let provider = FakeProvider::returning(json!("https://x/video.mp4"));
            let (status, body) = post_form(text_only_config(), provider.clone(), &parts).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().starts_with("Missing required fields"));
            assert_eq!(provider.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_required_image_absent_is_rejected() {
        let provider = FakeProvider::returning(json!("https://x/video.mp4"));
        let (status, body) = post_form(
            AppConfig::default(),
            provider.clone(),
            &[Part::Text("prompt", "a cat"), Part::Text("apiToken", "r8_user")],
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing required fields: image" }));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_text_only_mode_sends_fixed_parameters() {
        let provider = FakeProvider::returning(json!("https://x/video.mp4"));
        let (status, _) = post_form(
            text_only_config(),
            provider.clone(),
            &[Part::Text("prompt", "a cat"), Part::Text("apiToken", "r8_user")],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let calls = provider.calls.lock().unwrap();
        let (_, model, input) = &calls[0];
        assert_eq!(model, "anotherjesse/zeroscope-v2-xl");
        assert_eq!(input["num_frames"], json!(24));
        assert_eq!(input["fps"], json!(8));
        assert!(input.get("subject_reference").is_none());
    }

    #[tokio::test]
    async fn test_non_string_output_is_server_error() {
        let provider = FakeProvider::returning(json!(42));
        let (status, body) = post_form(
            text_only_config(),
            provider,
            &[Part::Text("prompt", "a cat"), Part::Text("apiToken", "r8_user")],
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("provider returned an unusable result"));
        assert!(body.get("present").is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_message_is_relayed() {
        let provider =
            FakeProvider::failing(|| GenerationError::ProviderFailure("Invalid token".into()));
        let (status, body) = post_form(
            text_only_config(),
            provider,
            &[Part::Text("prompt", "a cat"), Part::Text("apiToken", "r8_user")],
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Invalid token" }));
    }

    #[tokio::test]
    async fn test_budget_expiry_is_reported() {
        let mut config = text_only_config();
        config.server.max_duration_secs = 1;
        let provider = Arc::new(FakeProvider {
            output: Ok(json!("https://x/video.mp4")),
            delay: Duration::from_secs(5),
            calls: Mutex::new(Vec::new()),
        });

        let (status, body) = post_form(
            config,
            provider,
            &[Part::Text("prompt", "a cat"), Part::Text("apiToken", "r8_user")],
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "video generation timed out after 1 seconds" })
        );
    }

    #[tokio::test]
    async fn test_non_multipart_body_gets_error_envelope() {
        let state = Arc::new(AppState::with_provider(
            AppConfig::default(),
            FakeProvider::returning(json!("https://x/video.mp4")),
        ));
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate-trailer")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = crate::app_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("Invalid multipart body"));
    }

    #[tokio::test]
    async fn test_oversized_upload_gets_error_envelope() {
        let mut config = AppConfig::default();
        config.server.body_limit_bytes = 1024;
        let provider = FakeProvider::returning(json!("https://x/video.mp4"));
        let state = Arc::new(AppState::with_provider(config, provider.clone()));

        let image = vec![0u8; 4096];
        let body = multipart_body(&[
            Part::File("image", "image/png", &image),
            Part::Text("prompt", "a cat"),
            Part::Text("apiToken", "r8_user"),
        ]);
        let request = Request::builder()
            .method("POST")
            .uri("/api/generate-trailer")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let response = crate::app_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("Invalid multipart body"));
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_truncate_prompt_respects_char_boundaries() {
        let prompt = "é".repeat(100);
        assert_eq!(truncate_prompt(&prompt).chars().count(), LOG_PROMPT_CHARS);
        assert_eq!(truncate_prompt("short"), "short");
    }
}
