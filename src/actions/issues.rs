// src/actions/issues.rs

use anyhow::Result;
use serde_json::{json, Value};
use tracing::info;

use crate::actions::format;
use crate::gateway::AciClient;
use crate::routing::dispatcher::ActionResponse;
use crate::routing::extractor::RepositoryRef;

/// Some gateway responses wrap the GitHub object in a `data` envelope.
fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(ref map) if map.contains_key("data") => payload["data"].clone(),
        other => other,
    }
}

/// File one issue. Exactly one mutating gateway call, never retried.
pub async fn create(
    gateway: &AciClient,
    repo: &RepositoryRef,
    title: &str,
    body: &str,
) -> Result<ActionResponse> {
    info!("Creating issue '{}' in {}", title, repo.slug());

    let payload = gateway
        .create_issue(&repo.owner, &repo.name, title, body)
        .await?;
    let issue = unwrap_data(payload);

    let report = format::issue_created_report(repo, title, body, &issue);
    Ok(ActionResponse::ok(
        report,
        json!({
            "repository": repo.slug(),
            "issue": issue,
        }),
    ))
}

/// List open issues and render the report.
pub async fn list(gateway: &AciClient, repo: &RepositoryRef) -> Result<ActionResponse> {
    info!("Listing open issues in {}", repo.slug());

    let payload = gateway.list_issues(&repo.owner, &repo.name).await?;
    let issues = format::issue_array(&payload);
    let report = format::issues_report(repo, &issues);

    let raw_issues: Vec<Value> = issues
        .iter()
        .map(|i| {
            json!({
                "number": i.number,
                "title": i.title,
                "state": i.state,
                "html_url": i.html_url,
            })
        })
        .collect();

    Ok(ActionResponse::ok(
        report,
        json!({
            "repository": repo.slug(),
            "count": issues.len(),
            "issues": raw_issues,
        }),
    ))
}
