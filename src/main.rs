// src/main.rs

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sre_guardian::config::RouterConfig;
use sre_guardian::gateway::AciClient;
use sre_guardian::handlers::{build_router, AppState};
use sre_guardian::llm::OpenAIClient;
use sre_guardian::routing::{IntentClassifier, ParamExtractor, RepoDefaults};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RouterConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!("Starting SRE Guardian request router");
    info!("Model: {} (intent: {})", config.model, config.intent_model);
    info!("Default repository: {}", config.default_repo_slug());

    let llm = OpenAIClient::new(&config.openai_base_url, config.llm_timeout_secs)?;

    // A missing gateway key puts the service in fallback mode (chat without
    // tools, repository actions rejected) rather than failing startup.
    let gateway = match AciClient::from_env(
        &config.aci_base_url,
        config.aci_timeout_secs,
        &config.linked_account_owner_id,
    ) {
        Ok(client) => {
            info!("Function gateway enabled (account: {})", client.linked_account());
            Some(client)
        }
        Err(e) => {
            warn!("Function gateway disabled: {}", e);
            None
        }
    };

    let classifier = IntentClassifier::new(llm.clone(), &config.intent_model);
    let extractor = ParamExtractor::new(
        Some(llm.clone()),
        &config.intent_model,
        RepoDefaults {
            owner: config.default_repo_owner.clone(),
            name: config.default_repo_name.clone(),
        },
    );

    let bind_address = config.bind_address();
    let state = Arc::new(AppState {
        config,
        llm,
        gateway,
        classifier,
        extractor,
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
