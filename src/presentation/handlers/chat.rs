use std::net::SocketAddr;

use axum::Json;
use axum::body::to_bytes;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{ORIGIN, REFERER, RETRY_AFTER, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::ports::{LlmClient, RequestFingerprint};
use crate::application::services::{AdmissionError, AdmissionHeaders};
use crate::domain::{RateLimitInfo, TurnRole};
use crate::infrastructure::observability::sanitize_prompt;
use crate::infrastructure::streaming::{UI_MESSAGE_STREAM_HEADER, UI_MESSAGE_STREAM_VERSION};
use crate::presentation::state::AppState;

use super::ui_stream::ui_message_events;

const MAX_BODY_BYTES: usize = 256 * 1024;
const UNKNOWN_CLIENT: &str = "unknown";

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// `POST /chat`: runs the admission pipeline, then relays the model's reply as
/// a UI message stream.
#[tracing::instrument(skip_all, fields(client = tracing::field::Empty))]
pub async fn chat_handler<L>(State(state): State<AppState<L>>, request: Request) -> Response
where
    L: LlmClient + ?Sized + 'static,
{
    let (parts, body) = request.into_parts();
    let headers = &parts.headers;
    let fingerprint = fingerprint(
        headers,
        parts.extensions.get::<ConnectInfo<SocketAddr>>(),
        state.trust_proxy_headers,
    );
    tracing::Span::current().record("client", fingerprint.client_key.as_str());

    let clearance = state
        .admission
        .screen(AdmissionHeaders {
            referer: header_str(headers, &REFERER),
            origin: header_str(headers, &ORIGIN),
            fingerprint,
        })
        .await;
    let clearance = match clearance {
        Ok(clearance) => clearance,
        Err(e) => return rejection(e),
    };

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            return rejection(AdmissionError::MalformedPayload(format!(
                "unreadable body: {}",
                e
            )));
        }
    };

    let admission = match state.admission.accept_payload(clearance, &body) {
        Ok(admission) => admission,
        Err(e) => return rejection(e),
    };

    if let Some(turn) = admission.turns.iter().rev().find(|t| t.role == TurnRole::User) {
        tracing::debug!(
            prompt = %sanitize_prompt(&turn.text()),
            turns = admission.turns.len(),
            "Relaying chat"
        );
    }

    let tokens = match state.llm_client.complete_stream(&admission.turns).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!(error = %e, "Model provider failed before streaming");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        UI_MESSAGE_STREAM_HEADER,
        HeaderValue::from_static(UI_MESSAGE_STREAM_VERSION),
    );
    if let Some(info) = &admission.rate_limit {
        insert_rate_limit_headers(&mut response_headers, info);
    }

    let events = ui_message_events(tokens, state.relay.max_duration);
    let sse = Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.relay.keep_alive)
            .text("keep-alive"),
    );

    (response_headers, sse).into_response()
}

fn rejection(error: AdmissionError) -> Response {
    match error {
        AdmissionError::InvalidReferer => {
            tracing::warn!("Rejected request with foreign referer");
            error_response(StatusCode::FORBIDDEN, "Forbidden")
        }
        AdmissionError::RateLimited(info) => {
            tracing::info!(reset = info.reset_seconds(), "Rate limit exceeded");
            let mut headers = HeaderMap::new();
            insert_rate_limit_headers(&mut headers, &info);
            headers.insert(RETRY_AFTER, HeaderValue::from(info.reset_seconds()));
            (
                StatusCode::TOO_MANY_REQUESTS,
                headers,
                Json(ErrorResponse {
                    error: "Too many requests".to_string(),
                }),
            )
                .into_response()
        }
        AdmissionError::BotDetected => {
            tracing::info!("Rejected automated client");
            error_response(StatusCode::FORBIDDEN, "No bots allowed")
        }
        AdmissionError::Denied(reason) => {
            tracing::info!(%reason, "Admission denied");
            error_response(StatusCode::FORBIDDEN, "Forbidden")
        }
        AdmissionError::MalformedPayload(reason) => {
            tracing::debug!(%reason, "Malformed chat payload");
            error_response(StatusCode::BAD_REQUEST, "Invalid request format")
        }
        AdmissionError::EmptyConversation => {
            error_response(StatusCode::BAD_REQUEST, "Invalid request format")
        }
        AdmissionError::ContentBlocked(violation) => {
            tracing::info!(%violation, "Blocked message content");
            error_response(StatusCode::BAD_REQUEST, "Invalid or suspicious message content")
        }
        AdmissionError::Guard(e) => {
            tracing::error!(error = %e, "Admission guard failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(info.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(info.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(info.reset_seconds()));
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Client address of the socket peer. Proxy headers are honoured only when
/// the server sits behind a proxy that overwrites them.
fn fingerprint(
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> RequestFingerprint {
    let proxied = trust_proxy_headers
        .then(|| forwarded_client(headers))
        .flatten();

    let client_key = proxied
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    RequestFingerprint {
        client_key,
        user_agent: header_str(headers, &USER_AGENT).map(String::from),
    }
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let forwarded = header_str(headers, &X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = header_str(headers, &X_REAL_IP)
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded.or(real_ip).map(String::from)
}
