use sentry::protocol::{Event, Request as SentryRequest};
use std::sync::Arc;

/// Field names that may hold the user's Replicate token
const SENSITIVE_FIELDS: &[&str] = &[
    "apitoken",
    "api_token",
    "authorization",
    "bearer",
    "token",
    "api_key",
    "secret",
    "password",
];

/// Checks if a field name contains sensitive data
fn is_sensitive_field(field_name: &str) -> bool {
    let field_lower = field_name.to_lowercase();
    SENSITIVE_FIELDS
        .iter()
        .any(|sensitive| field_lower.contains(sensitive))
}

fn contains_sensitive_field(text: &str) -> bool {
    let text_lower = text.to_lowercase();
    SENSITIVE_FIELDS.iter().any(|field| text_lower.contains(field))
}

/// Scrubs sensitive data from Sentry events before sending
pub fn scrub_sensitive_data(mut event: Event<'static>) -> Option<Event<'static>> {
    if let Some(request) = &mut event.request {
        scrub_request(request);
    }

    event.extra.retain(|k, _| !is_sensitive_field(k));

    for (_key, context) in event.contexts.iter_mut() {
        if let sentry::protocol::Context::Other(map) = context {
            map.retain(|k, _| !is_sensitive_field(k));
        }
    }

    for breadcrumb in event.breadcrumbs.values.iter_mut() {
        breadcrumb.data.retain(|k, _| !is_sensitive_field(k));
    }

    Some(event)
}

fn scrub_request(request: &mut SentryRequest) {
    for (key, value) in request.headers.iter_mut() {
        if is_sensitive_field(key) {
            *value = "[REDACTED]".to_string();
        }
    }

    if request
        .query_string
        .as_deref()
        .is_some_and(contains_sensitive_field)
    {
        request.query_string = Some("[REDACTED]".to_string());
    }

    // Multipart form bodies always carry the apiToken field
    if request.data.is_some() {
        request.data = Some("[REDACTED - Form data]".to_string());
    }
}

/// Creates the `before_send` hook for Sentry ClientOptions
pub fn create_before_send() -> Arc<dyn Fn(Event<'static>) -> Option<Event<'static>> + Send + Sync> {
    Arc::new(scrub_sensitive_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sensitive_field() {
        assert!(is_sensitive_field("apiToken"));
        assert!(is_sensitive_field("Authorization"));
        assert!(is_sensitive_field("bearer_token"));
        assert!(!is_sensitive_field("prompt"));
        assert!(!is_sensitive_field("video_url"));
    }

    #[test]
    fn test_scrub_request_headers_and_body() {
        let mut event = Event::default();
        let mut request = SentryRequest {
            data: Some("--boundary\r\nname=\"apiToken\"\r\n\r\nr8_secret".to_string()),
            query_string: Some("apiToken=r8_secret".to_string()),
            ..Default::default()
        };
        request
            .headers
            .insert("Authorization".to_string(), "Bearer r8_secret".to_string());
        request
            .headers
            .insert("Content-Type".to_string(), "multipart/form-data".to_string());
        event.request = Some(request);
        event
            .extra
            .insert("apiToken".to_string(), "r8_secret".into());

        let event = scrub_sensitive_data(event).unwrap();
        let request = event.request.unwrap();
        assert_eq!(request.headers["Authorization"], "[REDACTED]");
        assert_eq!(request.headers["Content-Type"], "multipart/form-data");
        assert_eq!(request.query_string.as_deref(), Some("[REDACTED]"));
        assert!(!request.data.unwrap().contains("r8_secret"));
        assert!(event.extra.is_empty());
    }
}
