mod environment;
mod scaffold_config;
mod settings;

pub use environment::Environment;
pub use scaffold_config::ScaffoldConfig;
pub use settings::{
    ChatbotSettings, LlmSettings, LoggingSettings, ModerationSettings, RateLimitSettings,
    SecuritySettings, ServerSettings, Settings, WidgetSettings,
};
