use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use std::collections::BTreeMap;
use std::time::Instant;

/// Error bodies longer than this are cut before they become breadcrumbs
const ERROR_BODY_LIMIT: usize = 2 * 1024;

/// Headers that may carry the user's credential
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
];

/// Logs every request and leaves a Sentry breadcrumb.
/// Request bodies are never captured since the form carries the user's token.
pub async fn http_logging_middleware(
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_headers = extract_safe_headers(req.headers());

    let res = next.run(req).await;

    let status = res.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status.as_u16() < 400 {
        log::info!("{} {} {} ({}ms)", method, path, status.as_u16(), duration_ms);
        add_lightweight_breadcrumb(method.as_str(), &path, status.as_u16(), duration_ms);
        return Ok(res);
    }

    let (res, body) = match buffer_response_body_bytes(res).await {
        Ok(result) => result,
        Err(e) => {
            log::warn!("Failed to buffer response body: {}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process response".to_string(),
            ));
        }
    };
    let body_preview = body.as_ref().map(preview_bytes);

    log::warn!(
        "{} {} {} ({}ms): {}",
        method,
        path,
        status.as_u16(),
        duration_ms,
        body_preview.as_deref().unwrap_or("")
    );
    add_error_breadcrumb(
        method.as_str(),
        &path,
        status.as_u16(),
        duration_ms,
        &request_headers,
        body_preview.as_deref(),
    );

    Ok(res)
}

/// Buffer response body bytes and reconstruct the response
async fn buffer_response_body_bytes(
    res: Response,
) -> Result<(Response, Option<Bytes>), Box<dyn std::error::Error>> {
    let (parts, body) = res.into_parts();

    let bytes = body
        .collect()
        .await
        .map_err(|e| format!("Failed to read response body: {}", e))?
        .to_bytes();

    let stored = if bytes.is_empty() {
        None
    } else if bytes.len() > ERROR_BODY_LIMIT {
        Some(bytes.slice(0..ERROR_BODY_LIMIT))
    } else {
        Some(bytes.clone())
    };

    Ok((Response::from_parts(parts, Body::from(bytes)), stored))
}

fn preview_bytes(bytes: &Bytes) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => format!("[Binary data, {} bytes]", bytes.len()),
    }
}

/// Extract safe headers (excluding sensitive ones)
fn extract_safe_headers(headers: &http::HeaderMap) -> BTreeMap<String, serde_json::Value> {
    let mut safe_headers = BTreeMap::new();

    for (name, value) in headers.iter() {
        let name_lower = name.as_str().to_lowercase();

        if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
            safe_headers.insert(name.as_str().to_string(), serde_json::json!("[REDACTED]"));
        } else if let Ok(value_str) = value.to_str() {
            safe_headers.insert(name.as_str().to_string(), serde_json::json!(value_str));
        }
    }

    safe_headers
}

fn add_lightweight_breadcrumb(method: &str, path: &str, status: u16, duration_ms: u64) {
    let mut data = BTreeMap::new();
    data.insert("method".to_string(), serde_json::json!(method));
    data.insert("url".to_string(), serde_json::json!(path));
    data.insert("status_code".to_string(), serde_json::json!(status));
    data.insert("duration_ms".to_string(), serde_json::json!(duration_ms));

    sentry::add_breadcrumb(sentry::Breadcrumb {
        ty: "http".to_string(),
        category: Some("http.request".to_string()),
        message: Some(format!("{} {} {} ({}ms)", method, path, status, duration_ms)),
        data: data.into_iter().collect(),
        level: sentry::Level::Info,
        ..Default::default()
    });
}

fn add_error_breadcrumb(
    method: &str,
    path: &str,
    status: u16,
    duration_ms: u64,
    headers: &BTreeMap<String, serde_json::Value>,
    body_preview: Option<&str>,
) {
    let mut data = BTreeMap::new();
    data.insert("method".to_string(), serde_json::json!(method));
    data.insert("url".to_string(), serde_json::json!(path));
    data.insert("status_code".to_string(), serde_json::json!(status));
    data.insert("duration_ms".to_string(), serde_json::json!(duration_ms));

    if !headers.is_empty() {
        data.insert("request_headers".to_string(), serde_json::json!(headers));
    }
    if let Some(body) = body_preview {
        data.insert("response_body".to_string(), serde_json::json!(body));
    }

    let level = if status >= 500 {
        sentry::Level::Error
    } else {
        sentry::Level::Warning
    };

    sentry::add_breadcrumb(sentry::Breadcrumb {
        ty: "http".to_string(),
        category: Some("http.response".to_string()),
        message: Some(format!("{} {} {} ({}ms)", method, path, status, duration_ms)),
        data: data.into_iter().collect(),
        level,
        ..Default::default()
    });
}
