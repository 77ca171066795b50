use std::time::Duration;

use futures::StreamExt;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatdesk::application::ports::{ChatTransport, TransportError, TransportErrorKind};
use chatdesk::domain::ConversationTurn;
use chatdesk::infrastructure::transport::HttpChatTransport;

use crate::helpers::PAGE_URL;

fn ui_stream(events: &[&str]) -> ResponseTemplate {
    let body: String = events
        .iter()
        .map(|event| format!("data: {}\n\n", event))
        .collect();
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .insert_header("x-vercel-ai-ui-message-stream", "v1")
        .set_body_string(body)
}

fn turns() -> Vec<ConversationTurn> {
    vec![
        ConversationTurn::welcome("Hi!"),
        ConversationTurn::user("Where is my parcel?"),
    ]
}

async fn open_err(transport: &HttpChatTransport) -> TransportError {
    match transport.open(&turns()).await {
        Err(e) => e,
        Ok(_) => panic!("expected the request to fail"),
    }
}

#[tokio::test]
async fn given_ui_message_stream_when_opening_then_yields_text_deltas() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("referer", PAGE_URL))
        .and(header_exists("user-agent"))
        .and(body_partial_json(serde_json::json!({
            "messages": [
                {"id": "welcome", "role": "assistant"},
                {"role": "user", "parts": [{"type": "text", "text": "Where is my parcel?"}]}
            ]
        })))
        .respond_with(ui_stream(&[
            r#"{"type":"start","messageId":"m1"}"#,
            r#"{"type":"start-step"}"#,
            r#"{"type":"text-start","id":"t"}"#,
            r#"{"type":"text-delta","id":"t","delta":"It ships "}"#,
            r#"{"type":"text-delta","id":"t","delta":"tomorrow."}"#,
            r#"{"type":"text-end","id":"t"}"#,
            r#"{"type":"finish-step"}"#,
            r#"{"type":"finish"}"#,
            "[DONE]",
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpChatTransport::new(&server.uri(), PAGE_URL).unwrap();
    let Ok(stream) = transport.open(&turns()).await else {
        panic!("stream did not open");
    };
    let deltas: Vec<String> = stream.map(|d| d.unwrap()).collect().await;

    assert_eq!(deltas, vec!["It ships ", "tomorrow."]);
}

#[tokio::test]
async fn given_error_chunk_mid_stream_when_reading_then_yields_transient_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ui_stream(&[
            r#"{"type":"text-delta","id":"t","delta":"Partial"}"#,
            r#"{"type":"error","errorText":"provider went away"}"#,
            r#"{"type":"text-delta","id":"t","delta":"never seen"}"#,
        ]))
        .mount(&server)
        .await;

    let transport = HttpChatTransport::new(&server.uri(), PAGE_URL).unwrap();
    let Ok(stream) = transport.open(&turns()).await else {
        panic!("stream did not open");
    };
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_deref().unwrap(), "Partial");
    let error = items[1].as_ref().unwrap_err();
    assert_eq!(error.kind, TransportErrorKind::Transient);
    assert_eq!(error.message, "provider went away");
}

#[tokio::test]
async fn given_body_ends_without_finish_when_reading_then_yields_transient_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ui_stream(&[
            r#"{"type":"start"}"#,
            r#"{"type":"text-start","id":"t"}"#,
            r#"{"type":"text-delta","id":"t","delta":"Half a rep"}"#,
        ]))
        .mount(&server)
        .await;

    let transport = HttpChatTransport::new(&server.uri(), PAGE_URL).unwrap();
    let Ok(stream) = transport.open(&turns()).await else {
        panic!("stream did not open");
    };
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_deref().unwrap(), "Half a rep");
    assert_eq!(
        items[1].as_ref().unwrap_err().kind,
        TransportErrorKind::Transient
    );
}

#[tokio::test]
async fn given_finish_without_done_marker_when_reading_then_completes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ui_stream(&[
            r#"{"type":"text-delta","id":"t","delta":"All done."}"#,
            r#"{"type":"finish"}"#,
        ]))
        .mount(&server)
        .await;

    let transport = HttpChatTransport::new(&server.uri(), PAGE_URL).unwrap();
    let Ok(stream) = transport.open(&turns()).await else {
        panic!("stream did not open");
    };
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_deref().unwrap(), "All done.");
}

#[tokio::test]
async fn given_429_with_retry_after_when_opening_then_rate_limit_with_interval() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "12")
                .set_body_string(r#"{"error":"Too many requests"}"#),
        )
        .mount(&server)
        .await;

    let transport = HttpChatTransport::new(&server.uri(), PAGE_URL).unwrap();
    let error = open_err(&transport).await;

    assert_eq!(error.kind, TransportErrorKind::RateLimit);
    assert_eq!(error.status, Some(429));
    assert_eq!(error.retry_after, Some(Duration::from_secs(12)));
}

#[tokio::test]
async fn given_429_with_only_reset_header_when_opening_then_uses_reset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("x-ratelimit-reset", "7"))
        .mount(&server)
        .await;

    let transport = HttpChatTransport::new(&server.uri(), PAGE_URL).unwrap();

    assert_eq!(
        open_err(&transport).await.retry_after,
        Some(Duration::from_secs(7))
    );
}

#[tokio::test]
async fn given_failure_statuses_when_opening_then_kinds_follow_status() {
    let cases = [
        (400, TransportErrorKind::Validation),
        (403, TransportErrorKind::Forbidden),
        (503, TransportErrorKind::Transient),
        (500, TransportErrorKind::Fatal),
    ];

    for (status, kind) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        let transport = HttpChatTransport::new(&server.uri(), PAGE_URL).unwrap();

        let error = open_err(&transport).await;

        assert_eq!(error.kind, kind, "status {status}");
        assert_eq!(error.retry_after, None);
    }
}

#[tokio::test]
async fn given_unreachable_server_when_opening_then_transient() {
    let transport = HttpChatTransport::new("http://127.0.0.1:1/", PAGE_URL).unwrap();

    let error = open_err(&transport).await;

    assert_eq!(error.kind, TransportErrorKind::Transient);
    assert_eq!(error.status, None);
}

#[test]
fn given_server_url_when_building_then_endpoint_is_chat_route() {
    let transport = HttpChatTransport::new("https://api.example.com/", PAGE_URL).unwrap();

    assert_eq!(transport.endpoint().as_str(), "https://api.example.com/chat");
    assert!(HttpChatTransport::new("no scheme", PAGE_URL).is_err());
}
