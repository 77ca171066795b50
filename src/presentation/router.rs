use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::application::ports::LlmClient;
use crate::infrastructure::observability::{REQUEST_ID_HEADER, request_id_middleware};
use crate::presentation::handlers::{chat_handler, health_handler};
use crate::presentation::state::AppState;

/// Builds the HTTP surface. Cross-origin calls are only allowed from `app_origin`.
pub fn create_router<L>(state: AppState<L>, app_origin: &str) -> Router
where
    L: LlmClient + ?Sized + 'static,
{
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::RETRY_AFTER, header::HeaderName::from_static(REQUEST_ID_HEADER)]);
    match HeaderValue::from_str(app_origin.trim_end_matches('/')) {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => tracing::warn!(error = %e, app_origin, "Invalid app origin, CORS disabled"),
    }

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler::<L>))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
