use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;

use chatdesk::application::ports::LlmClient;
use chatdesk::application::services::AdmissionService;
use chatdesk::infrastructure::admission::FixedWindowGuard;
use chatdesk::infrastructure::llm::{SCAFFOLD_REPLY, ScriptedLlmClient, create_streaming_llm_client};
use chatdesk::infrastructure::observability::{TracingConfig, init_tracing};
use chatdesk::presentation::{
    AppState, Environment, RelayConfig, ScaffoldConfig, Settings, create_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load configuration")?;

    init_tracing(
        &TracingConfig::new(environment.as_str())
            .with_filter(&settings.logging.level)
            .with_json(settings.logging.enable_json),
    );

    let scaffold = ScaffoldConfig::from_env();

    let mut guard = FixedWindowGuard::new(
        settings.security.max_requests,
        Duration::from_secs(settings.security.window_seconds),
    );
    if settings.security.allow_automated_clients {
        guard = guard.allow_automated_clients();
    }

    let admission = AdmissionService::new(
        Arc::new(guard),
        settings.content_validator(),
        &settings.security.app_origin,
    )
    .context("security.app_origin is not a valid URL")?;

    let llm_client: Arc<dyn LlmClient> = if scaffold.enabled {
        tracing::warn!(
            delay_ms = scaffold.mock_response_delay_ms,
            "Scaffold mode: replies are scripted"
        );
        Arc::new(ScriptedLlmClient::new(SCAFFOLD_REPLY, scaffold.token_delay()))
    } else {
        Arc::new(create_streaming_llm_client(
            &settings.llm,
            settings.chatbot.system_prompt.clone(),
        )?)
    };

    let state = AppState {
        admission: Arc::new(admission),
        llm_client,
        relay: RelayConfig::from_settings(&settings.llm),
        trust_proxy_headers: settings.security.trust_proxy_headers,
    };

    let router = create_router(state, &settings.security.app_origin);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        %addr,
        environment = %environment,
        provider = %settings.llm.provider,
        model = %settings.llm.chat_model,
        scaffold = scaffold.enabled,
        "Chat server listening"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Chat server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
