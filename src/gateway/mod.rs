// src/gateway/mod.rs
// Client for the external function-execution gateway (ACI). The gateway runs
// the real operations (GitHub mutations, lookups) given a qualified function
// name, a JSON argument object, and the linked account identity.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use tracing::info;

/// Meta-function the completion service can call to discover further
/// executable functions across all connected apps.
pub const SEARCH_FUNCTIONS: &str = "ACI_SEARCH_FUNCTIONS";

pub const GITHUB_GET_REPOSITORY: &str = "GITHUB__GET_REPOSITORY";
pub const GITHUB_GET_CONTENT: &str = "GITHUB__GET_CONTENT";
pub const GITHUB_CREATE_ISSUE: &str = "GITHUB__CREATE_ISSUE";
pub const GITHUB_LIST_ISSUES: &str = "GITHUB__LIST_ISSUES";

/// OpenAI tool schema for the function-discovery meta-call.
pub fn search_functions_schema() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": SEARCH_FUNCTIONS,
            "description": "Search for executable functions across all connected apps. Returns function definitions that can be appended to the tool list and invoked in later turns.",
            "parameters": {
                "type": "object",
                "properties": {
                    "intent": {
                        "type": "string",
                        "description": "Natural language description of the task the function should accomplish"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of functions to return"
                    }
                },
                "required": ["intent"]
            }
        }
    })
}

#[derive(Clone)]
pub struct AciClient {
    client: Client,
    api_key: String,
    base_url: String,
    linked_account_owner_id: String,
}

impl AciClient {
    /// Build the gateway client from the environment. A missing ACI_API_KEY is
    /// an error here; the caller decides whether to run in fallback mode.
    pub fn from_env(base_url: &str, timeout_secs: u64, linked_account_owner_id: &str) -> Result<Self> {
        let api_key = env::var("ACI_API_KEY").context("ACI_API_KEY not set")?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build reqwest client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            linked_account_owner_id: linked_account_owner_id.to_string(),
        })
    }

    pub fn linked_account(&self) -> &str {
        &self.linked_account_owner_id
    }

    /// Execute a qualified function on the gateway. Exactly one outbound call;
    /// failures surface as errors for the caller to absorb or propagate.
    pub async fn handle_function_call(&self, function_name: &str, arguments: &Value) -> Result<Value> {
        info!("Gateway call: {}", function_name);

        let response = self
            .client
            .post(format!("{}/v1/functions/{}/execute", self.base_url, function_name))
            .header("X-API-KEY", &self.api_key)
            .json(&json!({
                "function_input": arguments,
                "linked_account_owner_id": self.linked_account_owner_id,
            }))
            .send()
            .await
            .with_context(|| format!("Failed to reach gateway for {}", function_name))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Gateway error {} for {}: {}", status, function_name, error_text));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse gateway response for {}", function_name))
    }

    pub async fn get_repository(&self, owner: &str, repo: &str) -> Result<Value> {
        self.handle_function_call(
            GITHUB_GET_REPOSITORY,
            &json!({ "path": { "owner": owner, "repo": repo } }),
        )
        .await
    }

    pub async fn get_content(&self, owner: &str, repo: &str, path: &str) -> Result<Value> {
        self.handle_function_call(
            GITHUB_GET_CONTENT,
            &json!({ "path": { "owner": owner, "repo": repo, "path": path } }),
        )
        .await
    }

    pub async fn create_issue(&self, owner: &str, repo: &str, title: &str, body: &str) -> Result<Value> {
        self.handle_function_call(
            GITHUB_CREATE_ISSUE,
            &json!({
                "path": { "owner": owner, "repo": repo },
                "body": { "title": title, "body": body },
            }),
        )
        .await
    }

    pub async fn list_issues(&self, owner: &str, repo: &str) -> Result<Value> {
        self.handle_function_call(
            GITHUB_LIST_ISSUES,
            &json!({
                "path": { "owner": owner, "repo": repo },
                "query": { "state": "open" },
            }),
        )
        .await
    }
}
