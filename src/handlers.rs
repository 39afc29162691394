// src/handlers.rs
// Axum routes and the shared application state. Handlers stay thin: parse and
// validate the request, call into the routing pipeline, shape the response.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::HeaderValue,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::actions;
use crate::api::types::{
    ChatRequest, CheckConfigRequest, CreateIssueRequest, ExecuteRequest, FilterRequest,
    FilterResponse, HealthResponse, RepoRequest, ResponseEnvelope,
};
use crate::api::{missing_param_error, ApiError, ApiResult};
use crate::config::RouterConfig;
use crate::gateway::AciClient;
use crate::llm::OpenAIClient;
use crate::routing::{
    dispatch, ActionRequest, ActionResponse, ExtractedParams, IntentClassifier, Label,
    ParamExtractor,
};

pub const SERVICE_NAME: &str = "sre-guardian";

/// Read-only state shared across requests.
pub struct AppState {
    pub config: RouterConfig,
    pub llm: OpenAIClient,
    pub gateway: Option<AciClient>,
    pub classifier: IntentClassifier,
    pub extractor: ParamExtractor,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = match state.config.cors_origin.as_str() {
        "*" => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        origin => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        },
    };

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/filter-request", post(filter_request))
        .route("/api/execute-function", post(execute_function))
        .route("/api/chat", post(chat))
        .route("/check-config", post(check_config))
        .route("/api/analyze-repo", post(analyze_repo))
        .route("/api/create-issue", post(create_issue))
        .route("/api/list-issues", post(list_issues))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(120)))
        .layer(cors)
        .with_state(state)
}

async fn index() -> impl IntoResponse {
    "SRE Guardian request router is running"
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        aci_enabled: state.gateway.is_some(),
        linked_account: state.config.linked_account_owner_id.clone(),
    })
}

/// Classify a message without executing anything. Extraction here is the
/// offline (pattern-only) pass; parameters are re-resolved at execution time.
async fn filter_request(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FilterRequest>,
) -> ApiResult<Json<FilterResponse>> {
    let message = req
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| missing_param_error("message"))?;

    let file_type = req.file_type.as_deref().unwrap_or("");
    let mut classification = state
        .classifier
        .classify(message, req.has_file, file_type)
        .await;

    if classification.function.needs_params() {
        classification.extracted_params = state
            .extractor
            .extract_offline(message, classification.function)
            .await;
    }

    info!(
        "Classified request as '{}' (confidence {:.2})",
        classification.function.as_str(),
        classification.confidence
    );

    Ok(Json(FilterResponse {
        status: "success".to_string(),
        classification,
    }))
}

/// Execute a pre-classified function. The general entry point for callers
/// that already ran filter-request.
async fn execute_function(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteRequest>,
) -> ApiResult<Json<Value>> {
    let function = req
        .function
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| missing_param_error("function"))?;
    let label = Label::parse(function)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown function: {function}")))?;
    let message = req
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| missing_param_error("message"))?
        .to_string();

    let extracted = if label.needs_params() {
        state.extractor.extract(&message, label).await
    } else {
        ExtractedParams::default()
    };
    let params = req.params.unwrap_or_default().merge(extracted);

    let action = ActionRequest {
        label,
        params,
        message,
        file_content: req.file_content,
    };
    let response = run_action(&state, action).await?;
    Ok(Json(success_body(Some(label), response)))
}

/// Direct chat endpoint. Either a message or file content must be present.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<Value>> {
    let message = req.message.unwrap_or_default();
    let has_file = req
        .file_content
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    if message.trim().is_empty() && !has_file {
        return Err(missing_param_error("message"));
    }

    let response = actions::chat::run(&state, &message, req.file_content.as_deref())
        .await
        .map_err(|e| ApiError::downstream("chat completion", e))?;

    Ok(Json(json!({
        "response": ResponseEnvelope::new(response.value),
    })))
}

/// Direct configuration critique. The legacy `Breakdown` key is part of the
/// wire contract.
async fn check_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckConfigRequest>,
) -> ApiResult<Json<Value>> {
    let config = req
        .config
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| missing_param_error("config"))?;

    let response = actions::config::run(&state, config)
        .await
        .map_err(|e| ApiError::downstream("configuration analysis", e))?;

    Ok(Json(json!({
        "status": "success",
        "Breakdown": response.value,
    })))
}

async fn analyze_repo(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RepoRequest>,
) -> ApiResult<Json<Value>> {
    let params = ExtractedParams {
        repo_owner: req.repo_owner,
        repo_name: req.repo_name,
        ..Default::default()
    };
    let action = ActionRequest {
        label: Label::RepoAnalysis,
        params,
        message: "analyze repository".to_string(),
        file_content: None,
    };
    let response = run_action(&state, action).await?;
    Ok(Json(success_body(None, response)))
}

async fn create_issue(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateIssueRequest>,
) -> ApiResult<Json<Value>> {
    let message = req
        .message
        .clone()
        .or_else(|| req.title.clone())
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| missing_param_error("message"))?;

    let params = ExtractedParams {
        repo_owner: req.repo_owner,
        repo_name: req.repo_name,
        title: req.title,
        body: req.body,
    };
    let action = ActionRequest {
        label: Label::CreateIssue,
        params,
        message,
        file_content: None,
    };
    let response = run_action(&state, action).await?;
    Ok(Json(success_body(None, response)))
}

async fn list_issues(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RepoRequest>,
) -> ApiResult<Json<Value>> {
    let params = ExtractedParams {
        repo_owner: req.repo_owner,
        repo_name: req.repo_name,
        ..Default::default()
    };
    let action = ActionRequest {
        label: Label::ListIssues,
        params,
        message: "list issues".to_string(),
        file_content: None,
    };
    let response = run_action(&state, action).await?;
    Ok(Json(success_body(None, response)))
}

/// Dispatch and translate the failure envelope into a 400 with guidance.
async fn run_action(state: &AppState, action: ActionRequest) -> ApiResult<ActionResponse> {
    let label = action.label;
    let response = dispatch(state, action)
        .await
        .map_err(|e| ApiError::downstream(label.as_str(), e))?;

    if !response.success {
        let mut err = ApiError::bad_request(response.value);
        if let Some(action_err) = response.error {
            if let Some(suggestion) = action_err.suggestion {
                err = err.with_suggestion(suggestion);
            }
        }
        if let Some(partial) = response.raw.get("extracted_params") {
            err = err.with_details(partial.clone());
        }
        return Err(err);
    }
    Ok(response)
}

/// Success body: status, optional function echo, the `{value, annotations}`
/// envelope, plus whatever action-specific fields the handler produced
/// (repository, count, issues, issue, files_inspected) merged at top level.
fn success_body(label: Option<Label>, response: ActionResponse) -> Value {
    let mut body = Map::new();
    body.insert("status".to_string(), json!("success"));
    if let Some(label) = label {
        body.insert("function".to_string(), json!(label.as_str()));
    }
    body.insert(
        "response".to_string(),
        json!(ResponseEnvelope::new(response.value)),
    );
    if let Value::Object(extras) = response.raw {
        for (key, value) in extras {
            body.insert(key, value);
        }
    }
    Value::Object(body)
}
