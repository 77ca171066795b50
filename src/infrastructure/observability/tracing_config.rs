pub const DEFAULT_LOG_FILTER: &str = "info,chatdesk=debug,tower_http=debug";

/// Where and how log lines are written.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
    /// Used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// The terminal widget owns stdout, so it logs to stderr.
    pub to_stderr: bool,
}

impl TracingConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.trim().is_empty() {
            self.default_filter = filter;
        }
        self
    }

    pub fn with_json(mut self, json_format: bool) -> Self {
        self.json_format = self.json_format || json_format;
        self
    }

    pub fn on_stderr(mut self) -> Self {
        self.to_stderr = true;
        self
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            environment: std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".to_string()),
            json_format: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            default_filter: DEFAULT_LOG_FILTER.to_string(),
            to_stderr: false,
        }
    }
}
