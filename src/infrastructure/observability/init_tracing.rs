use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use super::TracingConfig;

/// Installs the global subscriber. Call once, first thing in `main`.
pub fn init_tracing(config: &TracingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match (config.json_format, config.to_stderr) {
        (true, false) => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .init(),
        (true, true) => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json().with_writer(std::io::stderr))
            .init(),
        (false, false) => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .init(),
        (false, true) => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.with_writer(std::io::stderr))
            .init(),
    }

    tracing::debug!(
        environment = %config.environment,
        json_format = config.json_format,
        "Tracing initialized"
    );
}
