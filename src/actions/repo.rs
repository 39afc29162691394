// src/actions/repo.rs
// Repository analysis: fetch metadata, probe a fixed list of well-known
// config paths, then ask the completion service to synthesize an SRE review
// from whatever was actually retrieved.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::gateway::AciClient;
use crate::handlers::AppState;
use crate::routing::dispatcher::ActionResponse;
use crate::routing::extractor::RepositoryRef;

/// Paths worth probing in any repository. Most will not exist in a given
/// repo; a miss is skipped, never an error.
const WELL_KNOWN_PATHS: &[&str] = &[
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".github/workflows/ci.yml",
    ".github/workflows/ci.yaml",
    "k8s/deployment.yaml",
    "kubernetes/deployment.yaml",
    "deployment.yaml",
    "helm/values.yaml",
    "Makefile",
    ".env.example",
];

const REPO_REVIEW_PROMPT: &str = "\
You are an expert SRE analyzing a GitHub repository. You are given the \
repository metadata and the contents of whichever infrastructure files could \
be retrieved. Produce an SRE-focused review: deployment and CI/CD setup, \
reliability and observability gaps, security concerns, and concrete \
improvements. Note explicitly when an expected infrastructure file is absent.";

/// Trim a gateway content payload to something worth feeding the model.
fn content_excerpt(payload: &Value) -> Option<String> {
    let text = payload["content"]
        .as_str()
        .or_else(|| payload["data"]["content"].as_str())?;
    Some(text.chars().take(2000).collect())
}

pub async fn run(
    state: &AppState,
    gateway: &AciClient,
    repo: &RepositoryRef,
) -> Result<ActionResponse> {
    info!("Analyzing repository {}", repo.slug());

    let metadata = gateway.get_repository(&repo.owner, &repo.name).await?;

    let mut inspected: Vec<String> = Vec::new();
    let mut file_sections = String::new();
    for path in WELL_KNOWN_PATHS {
        match gateway.get_content(&repo.owner, &repo.name, path).await {
            Ok(payload) => {
                if let Some(excerpt) = content_excerpt(&payload) {
                    inspected.push(path.to_string());
                    file_sections.push_str(&format!("\n--- {path} ---\n{excerpt}\n"));
                }
            }
            Err(e) => {
                // Expected for most paths.
                debug!("Skipping {}: {}", path, e);
            }
        }
    }

    let user_input = format!(
        "Repository: {}\n\nMetadata:\n{}\n\nRetrieved files ({}):\n{}",
        repo.slug(),
        metadata,
        if inspected.is_empty() {
            "none".to_string()
        } else {
            inspected.join(", ")
        },
        if file_sections.is_empty() {
            "(no well-known infrastructure files could be retrieved)".to_string()
        } else {
            file_sections
        },
    );

    let analysis = state
        .llm
        .simple_chat(&user_input, REPO_REVIEW_PROMPT, &state.config.model)
        .await?;

    Ok(ActionResponse::ok(
        analysis,
        json!({
            "repository": repo.slug(),
            "files_inspected": inspected,
        }),
    ))
}
