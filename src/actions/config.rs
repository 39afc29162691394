// src/actions/config.rs

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::handlers::AppState;
use crate::routing::dispatcher::ActionResponse;

const CONFIG_REVIEW_PROMPT: &str = "\
You are an expert SRE reviewing a configuration file. Analyze the supplied \
configuration against this rubric and report concrete findings for each area:\n\
1. Resource limits: missing or unbounded CPU/memory requests and limits.\n\
2. Security posture: privileged containers, absent security contexts, exposed \
secrets, overly broad permissions.\n\
3. Image tag hygiene: mutable tags like 'latest', unpinned digests.\n\
4. Cost-bearing resources: replicas, load balancers, volumes, and anything \
else that accrues spend.\n\
For each finding state the risk and the exact change to make. If an area is \
handled well, say so briefly. Use markdown headings per rubric area.";

/// Critique the supplied configuration text. The critique comes back verbatim
/// as the response value.
pub async fn run(state: &AppState, content: &str) -> Result<ActionResponse> {
    info!("Analyzing configuration ({} bytes)", content.len());

    let user_input = format!("Configuration to review:\n```\n{content}\n```");
    let critique = state
        .llm
        .simple_chat(&user_input, CONFIG_REVIEW_PROMPT, &state.config.model)
        .await?;

    Ok(ActionResponse::ok(critique, json!({})))
}
