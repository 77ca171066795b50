use std::str::FromStr;

use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::ports::{LlmClient, LlmClientError, LlmTokenStream};
use crate::domain::{ConversationTurn, TurnRole};
use crate::infrastructure::streaming::SseDecoder;
use crate::presentation::config::LlmSettings;

const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Google,
    OpenAi,
    LmStudio,
    Azure,
}

impl FromStr for ProviderKind {
    type Err = LlmClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" | "gemini" => Ok(Self::Google),
            "openai" => Ok(Self::OpenAi),
            "lmstudio" => Ok(Self::LmStudio),
            "azure" => Ok(Self::Azure),
            other => Err(LlmClientError::Configuration(format!(
                "unknown provider: {}",
                other
            ))),
        }
    }
}

/// Streams replies from a hosted model, either Gemini's `streamGenerateContent`
/// or an OpenAI-compatible `chat/completions` endpoint.
pub struct StreamingLlmClient {
    client: Client,
    provider: ProviderKind,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    system_prompt: String,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

enum ChunkEvent {
    Text(String),
    Skip,
    Done,
    Failed(LlmClientError),
}

impl StreamingLlmClient {
    fn request_url(&self) -> String {
        match self.provider {
            ProviderKind::Google => format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                self.base_url, self.model
            ),
            _ => format!("{}/chat/completions", self.base_url),
        }
    }

    fn build_request(&self, turns: &[ConversationTurn]) -> reqwest::RequestBuilder {
        let request = self.client.post(self.request_url());
        match self.provider {
            ProviderKind::Google => request
                .header("x-goog-api-key", &self.api_key)
                .json(&self.gemini_body(turns)),
            ProviderKind::Azure => request
                .header("api-key", &self.api_key)
                .json(&self.chat_completion_body(turns)),
            ProviderKind::OpenAi | ProviderKind::LmStudio => request
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&self.chat_completion_body(turns)),
        }
    }

    fn gemini_body(&self, turns: &[ConversationTurn]) -> GeminiRequest {
        // Gemini rejects two consecutive turns from the same side.
        let mut contents: Vec<GeminiContent> = Vec::new();
        for turn in turns {
            let text = turn.text();
            if text.is_empty() {
                continue;
            }
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "model",
            };
            let part = GeminiPart { text: Some(text) };
            match contents.last_mut() {
                Some(last) if last.role.as_deref() == Some(role) => last.parts.push(part),
                _ => contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts: vec![part],
                }),
            }
        }

        let system_instruction = (!self.system_prompt.is_empty()).then(|| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: Some(self.system_prompt.clone()),
            }],
        });

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: self.temperature,
            },
        }
    }

    fn chat_completion_body(&self, turns: &[ConversationTurn]) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: self.system_prompt.clone(),
            });
        }
        messages.extend(turns.iter().map(|turn| ChatMessage {
            role: turn.role.as_str(),
            content: turn.text(),
        }));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: true,
        }
    }
}

fn parse_chunk(provider: ProviderKind, data: &str) -> ChunkEvent {
    if data.trim() == "[DONE]" {
        return ChunkEvent::Done;
    }

    match provider {
        ProviderKind::Google => match serde_json::from_str::<GeminiChunk>(data) {
            Ok(chunk) => {
                if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
                    return ChunkEvent::Failed(LlmClientError::InvalidResponse(format!(
                        "prompt blocked by provider: {}",
                        reason
                    )));
                }
                let text: String = chunk
                    .candidates
                    .into_iter()
                    .next()
                    .and_then(|candidate| candidate.content)
                    .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
                    .unwrap_or_default();
                if text.is_empty() {
                    ChunkEvent::Skip
                } else {
                    ChunkEvent::Text(text)
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable Gemini chunk");
                ChunkEvent::Skip
            }
        },
        _ => match serde_json::from_str::<ChatCompletionChunk>(data) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .filter(|content| !content.is_empty())
                .map(ChunkEvent::Text)
                .unwrap_or(ChunkEvent::Skip),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable completion chunk");
                ChunkEvent::Skip
            }
        },
    }
}

#[async_trait]
impl LlmClient for StreamingLlmClient {
    #[tracing::instrument(
        skip(self, turns),
        fields(provider = ?self.provider, model = %self.model, turns = turns.len())
    )]
    async fn complete_stream(
        &self,
        turns: &[ConversationTurn],
    ) -> Result<LlmTokenStream, LlmClientError> {
        let response = self
            .build_request(turns)
            .send()
            .await
            .map_err(|e| LlmClientError::ApiRequestFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmClientError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::ApiRequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let provider = self.provider;
        let mut bytes = response.bytes_stream();

        let token_stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmClientError::ApiRequestFailed(e.to_string()));
                        return;
                    }
                };

                for data in decoder.push(&chunk) {
                    match parse_chunk(provider, &data) {
                        ChunkEvent::Text(text) => yield Ok(text),
                        ChunkEvent::Skip => {}
                        ChunkEvent::Done => return,
                        ChunkEvent::Failed(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            if let Some(data) = decoder.finish() {
                if let ChunkEvent::Text(text) = parse_chunk(provider, &data) {
                    yield Ok(text);
                }
            }
        };

        Ok(Box::pin(token_stream))
    }
}

pub fn create_streaming_llm_client(
    settings: &LlmSettings,
    system_prompt: String,
) -> Result<StreamingLlmClient, LlmClientError> {
    let provider: ProviderKind = settings.provider.parse()?;

    let base_url = match (provider, settings.base_url.as_deref()) {
        (_, Some(url)) if !url.is_empty() => url.trim_end_matches('/').to_string(),
        (ProviderKind::Google, _) => GOOGLE_BASE_URL.to_string(),
        (ProviderKind::OpenAi, _) => OPENAI_BASE_URL.to_string(),
        (ProviderKind::LmStudio, _) => {
            return Err(LlmClientError::Configuration(
                "base_url required for lmstudio provider".to_string(),
            ));
        }
        (ProviderKind::Azure, _) => {
            let endpoint = settings.azure_endpoint.as_ref().ok_or_else(|| {
                LlmClientError::Configuration(
                    "azure_endpoint required for azure provider".to_string(),
                )
            })?;
            format!(
                "{}/openai/deployments/{}",
                endpoint.trim_end_matches('/'),
                settings.chat_model
            )
        }
    };

    Ok(StreamingLlmClient {
        client: Client::new(),
        provider,
        base_url,
        api_key: settings.api_key.clone(),
        model: settings.chat_model.clone(),
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
        system_prompt,
    })
}
