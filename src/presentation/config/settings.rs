use std::sync::Arc;
use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::application::services::{ContentValidator, SessionConfig};
use crate::domain::ProfanityLexicon;

use super::Environment;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub security: SecuritySettings,
    pub llm: LlmSettings,
    pub chatbot: ChatbotSettings,
    pub rate_limit: RateLimitSettings,
    pub moderation: ModerationSettings,
    pub logging: LoggingSettings,
    pub widget: WidgetSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Scheme, host and port that `Referer` must match.
    pub app_origin: String,
    /// Requests per window per client; 0 disables rate limiting.
    pub max_requests: u32,
    pub window_seconds: u64,
    pub allow_automated_clients: bool,
    /// Only enable behind a reverse proxy that overwrites the forwarding headers.
    pub trust_proxy_headers: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            app_origin: "http://localhost:3000".to_string(),
            max_requests: 5,
            window_seconds: 30,
            allow_automated_clients: false,
            trust_proxy_headers: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub azure_endpoint: Option<String>,
    pub chat_model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub sse_keep_alive_seconds: u64,
    pub max_duration_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            api_key: String::new(),
            base_url: None,
            azure_endpoint: None,
            chat_model: "gemini-2.0-flash".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            sse_keep_alive_seconds: 15,
            max_duration_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatbotSettings {
    pub system_prompt: String,
    pub welcome_message: String,
    pub window_title: String,
    pub input_placeholder: String,
}

impl Default for ChatbotSettings {
    fn default() -> Self {
        Self {
            system_prompt: "You are a friendly support assistant. Keep answers short. \
                Offer follow-up options as {{choice:LABEL}} and useful pages as {{link:URL|LABEL}}."
                .to_string(),
            welcome_message: "Hi! How can I help you today?".to_string(),
            window_title: "Chat with us".to_string(),
            input_placeholder: "Type your message...".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Countdown shown after a 429 without `Retry-After`.
    pub interval_seconds: u64,
    pub min_time_between_messages_ms: u64,
    pub max_message_length: usize,
    pub banner_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            min_time_between_messages_ms: 2000,
            max_message_length: 500,
            banner_seconds: 5,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModerationSettings {
    pub max_chars: usize,
    pub add_words: Vec<String>,
    pub remove_words: Vec<String>,
}

impl Default for ModerationSettings {
    fn default() -> Self {
        Self {
            max_chars: crate::application::services::DEFAULT_MAX_MESSAGE_CHARS,
            add_words: Vec::new(),
            remove_words: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: crate::infrastructure::observability::DEFAULT_LOG_FILTER.to_string(),
            enable_json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    pub server_url: String,
    /// Sent as `Referer`, standing in for the page that embeds the widget.
    pub page_url: String,
    pub storage_dir: String,
    pub storage_key: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000/".to_string(),
            page_url: "http://localhost:3000/".to_string(),
            storage_dir: ".chatdesk".to_string(),
            storage_key: crate::application::services::DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl Settings {
    /// Layers `appsettings.{environment}` (optional) under `APP_*` variables,
    /// e.g. `APP_LLM__API_KEY`.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("moderation.add_words")
                    .with_list_parse_key("moderation.remove_words")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Builds the lexicon once; share the validator between session and gate.
    pub fn content_validator(&self) -> ContentValidator {
        let lexicon = ProfanityLexicon::with_overrides(
            &self.moderation.add_words,
            &self.moderation.remove_words,
        );
        ContentValidator::new(Arc::new(lexicon), self.moderation.max_chars)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            welcome_message: self.chatbot.welcome_message.clone(),
            storage_key: self.widget.storage_key.clone(),
            min_time_between_messages: Duration::from_millis(
                self.rate_limit.min_time_between_messages_ms,
            ),
            rate_limit_interval: Duration::from_secs(self.rate_limit.interval_seconds),
            max_message_length: self.rate_limit.max_message_length,
            banner_duration: Duration::from_secs(self.rate_limit.banner_seconds),
            request_timeout: Duration::from_secs(self.rate_limit.request_timeout_seconds),
        }
    }
}
