use std::sync::Arc;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{app_state::AppState, videogen::handlers};

/// Routes for trailer generation. The upload size is bounded by the
/// `DefaultBodyLimit` the app router installs, so oversized forms surface as
/// multipart errors inside the handler.
pub fn videogen_router<S>(state: Arc<AppState>) -> OpenApiRouter<S> {
    OpenApiRouter::new()
        .routes(routes!(handlers::generate_trailer))
        .with_state(state)
}
