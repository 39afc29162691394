// src/routing/dispatcher.rs

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::info;

use crate::actions;
use crate::handlers::AppState;
use crate::routing::classifier::Label;
use crate::routing::extractor::{self, ExtractedParams, ExtractionError};

/// One unit of dispatchable work. Constructed by the caller, consumed once.
#[derive(Debug)]
pub struct ActionRequest {
    pub label: Label,
    pub params: ExtractedParams,
    pub message: String,
    pub file_content: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ActionError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl From<ExtractionError> for ActionError {
    fn from(err: ExtractionError) -> Self {
        Self {
            message: err.message,
            suggestion: Some(err.suggestion),
        }
    }
}

/// The uniform envelope every handler produces, whatever its internal shape.
/// `raw` is an object whose fields the HTTP layer merges into the response
/// body (e.g. `repository`, `count`, `issues`).
#[derive(Debug)]
pub struct ActionResponse {
    pub success: bool,
    pub value: String,
    pub raw: Value,
    pub error: Option<ActionError>,
}

impl ActionResponse {
    pub fn ok(value: impl Into<String>, raw: Value) -> Self {
        Self {
            success: true,
            value: value.into(),
            raw,
            error: None,
        }
    }

    pub fn failure(error: ActionError, raw: Value) -> Self {
        Self {
            success: false,
            value: error.message.clone(),
            raw,
            error: Some(error),
        }
    }
}

/// Execute a classified request. Caller-input problems (unresolvable
/// repository) come back as a failure envelope; downstream service failures
/// propagate as errors for the HTTP layer to turn into 500s. Nothing here is
/// retried, and only create-issue makes a mutating call, exactly once.
pub async fn dispatch(state: &AppState, req: ActionRequest) -> Result<ActionResponse> {
    info!("Dispatching '{}'", req.label.as_str());

    match req.label {
        Label::Chat => actions::chat::run(state, &req.message, req.file_content.as_deref()).await,
        Label::ConfigAnalysis => {
            // A file upload wins over the message text as the config source.
            let content = req
                .file_content
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(&req.message);
            actions::config::run(state, content).await
        }
        Label::RepoAnalysis | Label::CreateIssue | Label::ListIssues => {
            let params = extractor::fill_defaults(
                req.params,
                req.label,
                &req.message,
                state.extractor.defaults(),
            );
            let repo = match extractor::require_repo(&params, req.label) {
                Ok(repo) => repo,
                Err(err) => {
                    let partial = serde_json::to_value(&err.partial).unwrap_or_else(|_| json!({}));
                    return Ok(ActionResponse::failure(
                        err.into(),
                        json!({ "extracted_params": partial }),
                    ));
                }
            };

            let gateway = state
                .gateway
                .as_ref()
                .ok_or_else(|| anyhow!("function-execution gateway is not configured"))?;

            match req.label {
                Label::RepoAnalysis => actions::repo::run(state, gateway, &repo).await,
                Label::CreateIssue => {
                    // Defaults guarantee both are present for create-issue.
                    let title = params.title.clone().unwrap_or_else(|| req.message.clone());
                    let body = params.body.clone().unwrap_or_else(|| req.message.clone());
                    actions::issues::create(gateway, &repo, &title, &body).await
                }
                Label::ListIssues => actions::issues::list(gateway, &repo).await,
                _ => unreachable!(),
            }
        }
    }
}
