use futures::StreamExt;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatdesk::application::ports::{LlmClient, LlmClientError};
use chatdesk::domain::ConversationTurn;
use chatdesk::infrastructure::llm::{ProviderKind, create_streaming_llm_client};
use chatdesk::presentation::config::LlmSettings;

const SYSTEM_PROMPT: &str = "You are a helpful shop assistant.";

fn settings(provider: &str, base_url: &str) -> LlmSettings {
    LlmSettings {
        provider: provider.to_string(),
        api_key: "test-key".to_string(),
        base_url: Some(base_url.to_string()),
        chat_model: "test-model".to_string(),
        ..LlmSettings::default()
    }
}

fn sse(events: &[&str]) -> ResponseTemplate {
    let body: String = events
        .iter()
        .map(|event| format!("data: {}\r\n\r\n", event))
        .collect();
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

fn conversation() -> Vec<ConversationTurn> {
    vec![
        ConversationTurn::welcome("Hi! How can I help?"),
        ConversationTurn::user("Do you ship abroad?"),
    ]
}

async fn collect(
    client: &dyn LlmClient,
    turns: &[ConversationTurn],
) -> Vec<Result<String, LlmClientError>> {
    match client.complete_stream(turns).await {
        Ok(stream) => stream.collect().await,
        Err(e) => panic!("stream did not start: {e}"),
    }
}

#[tokio::test]
async fn given_gemini_stream_when_completing_then_yields_text_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/test-model:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "systemInstruction": {"parts": [{"text": SYSTEM_PROMPT}]},
            "contents": [
                {"role": "model", "parts": [{"text": "Hi! How can I help?"}]},
                {"role": "user", "parts": [{"text": "Do you ship abroad?"}]}
            ]
        })))
        .respond_with(sse(&[
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Yes, "}]}}]}"#,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"we do."}]}}]}"#,
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        create_streaming_llm_client(&settings("google", &server.uri()), SYSTEM_PROMPT.into())
            .unwrap();
    let tokens = collect(&client, &conversation()).await;

    let text: String = tokens.into_iter().map(|t| t.unwrap()).collect();
    assert_eq!(text, "Yes, we do.");
}

#[tokio::test]
async fn given_gemini_blocks_prompt_when_completing_then_stream_yields_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse(&[r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#]))
        .mount(&server)
        .await;

    let client =
        create_streaming_llm_client(&settings("gemini", &server.uri()), String::new()).unwrap();
    let tokens = collect(&client, &conversation()).await;

    assert_eq!(tokens.len(), 1);
    assert!(matches!(&tokens[0], Err(LlmClientError::InvalidResponse(msg)) if msg.contains("SAFETY")));
}

#[tokio::test]
async fn given_openai_compatible_stream_when_completing_then_stops_at_done() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-model",
            "stream": true,
            "messages": [{"role": "system", "content": SYSTEM_PROMPT}]
        })))
        .respond_with(sse(&[
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":"Hello"}}]}"#,
            r#"{"choices":[{"delta":{"content":" there"}}]}"#,
            "[DONE]",
            r#"{"choices":[{"delta":{"content":"ignored"}}]}"#,
        ]))
        .mount(&server)
        .await;

    let client =
        create_streaming_llm_client(&settings("openai", &server.uri()), SYSTEM_PROMPT.into())
            .unwrap();
    let tokens = collect(&client, &conversation()).await;

    let text: String = tokens.into_iter().map(|t| t.unwrap()).collect();
    assert_eq!(text, "Hello there");
}

#[tokio::test]
async fn given_provider_returns_429_when_completing_then_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client =
        create_streaming_llm_client(&settings("openai", &server.uri()), String::new()).unwrap();

    assert!(matches!(
        client.complete_stream(&conversation()).await,
        Err(LlmClientError::RateLimited)
    ));
}

#[tokio::test]
async fn given_provider_returns_500_when_completing_then_request_failed_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client =
        create_streaming_llm_client(&settings("google", &server.uri()), String::new()).unwrap();

    match client.complete_stream(&conversation()).await {
        Err(LlmClientError::ApiRequestFailed(msg)) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("upstream exploded"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected failure"),
    }
}

#[test]
fn given_provider_names_when_parsing_then_known_ones_resolve() {
    assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
    assert_eq!("lmstudio".parse::<ProviderKind>().unwrap(), ProviderKind::LmStudio);
    assert!("bard".parse::<ProviderKind>().is_err());
}

#[test]
fn given_lmstudio_without_base_url_when_creating_then_configuration_error() {
    let settings = LlmSettings {
        provider: "lmstudio".to_string(),
        ..LlmSettings::default()
    };

    assert!(matches!(
        create_streaming_llm_client(&settings, String::new()),
        Err(LlmClientError::Configuration(_))
    ));
}
