// tests/http_api.rs
// Router-level tests driven through tower's oneshot. Every request here stays
// on a deterministic path (heuristic classification, pattern-only
// extraction), so no outbound service is ever contacted.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use sre_guardian::config::RouterConfig;
use sre_guardian::handlers::{build_router, AppState};
use sre_guardian::llm::OpenAIClient;
use sre_guardian::routing::{IntentClassifier, ParamExtractor, RepoDefaults};

fn test_router() -> axum::Router {
    // Dummy key so client construction succeeds; no test path calls out.
    std::env::set_var("OPENAI_API_KEY", "test-key");
    let config = RouterConfig::from_env();

    let llm = OpenAIClient::new(&config.openai_base_url, 5).unwrap();
    let classifier = IntentClassifier::new(llm.clone(), &config.intent_model);
    let extractor = ParamExtractor::new(
        None,
        &config.intent_model,
        RepoDefaults {
            owner: config.default_repo_owner.clone(),
            name: config.default_repo_name.clone(),
        },
    );

    let state = Arc::new(AppState {
        config,
        llm,
        gateway: None,
        classifier,
        extractor,
    });
    build_router(state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn liveness_and_health() {
    let app = test_router();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "sre-guardian");
    assert_eq!(body["aci_enabled"], false);
}

#[tokio::test]
async fn filter_request_requires_a_message() {
    let app = test_router();
    let response = app
        .oneshot(post_json("/api/filter-request", json!({"has_file": false})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("message"));
}

#[tokio::test]
async fn explicit_slug_classifies_and_extracts_verbatim() {
    let app = test_router();
    let response = app
        .oneshot(post_json(
            "/api/filter-request",
            json!({"message": "list issues from kubernetes/kubernetes"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    let classification = &body["classification"];
    assert_eq!(classification["function"], "list-issues");
    assert_eq!(classification["extracted_params"]["repo_owner"], "kubernetes");
    assert_eq!(classification["extracted_params"]["repo_name"], "kubernetes");
}

#[tokio::test]
async fn file_upload_forces_config_analysis() {
    let app = test_router();
    let response = app
        .oneshot(post_json(
            "/api/filter-request",
            json!({
                "message": "review this",
                "has_file": true,
                "file_type": "application/x-yaml",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["classification"]["function"], "config-analysis");
}

#[tokio::test]
async fn create_issue_without_slug_gets_default_repository() {
    let app = test_router();
    let response = app
        .oneshot(post_json(
            "/api/filter-request",
            json!({"message": "create an issue on TechEurope saying we need load balancing"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let classification = &body["classification"];
    assert_eq!(classification["function"], "create-issue");
    // No owner/name token in the message, so the configured defaults fill in.
    assert_eq!(classification["extracted_params"]["repo_owner"], "ehewes");
    assert_eq!(classification["extracted_params"]["repo_name"], "TechEurope");
    assert!(classification["extracted_params"]["title"]
        .as_str()
        .unwrap()
        .contains("load balancing"));
}

#[tokio::test]
async fn execute_function_validates_its_inputs() {
    let app = test_router();

    let response = app
        .clone()
        .oneshot(post_json("/api/execute-function", json!({"message": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/execute-function",
            json!({"function": "delete-everything", "message": "hi"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Unknown function"));

    let response = app
        .oneshot(post_json(
            "/api/execute-function",
            json!({"function": "chat"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_requires_message_or_file_content() {
    let app = test_router();
    let response = app
        .oneshot(post_json("/api/chat", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn check_config_requires_config_text() {
    let app = test_router();
    let response = app
        .oneshot(post_json("/check-config", json!({"config": "  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repository_action_without_gateway_is_a_downstream_error() {
    // Defaults resolve the repository, so the request passes validation and
    // fails only at the missing gateway.
    let app = test_router();
    let response = app
        .oneshot(post_json("/api/list-issues", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to get response from AI service"));
}
