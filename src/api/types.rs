// src/api/types.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::routing::classifier::ClassificationResult;
use crate::routing::extractor::ExtractedParams;

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub has_file: bool,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FilterResponse {
    pub status: String,
    pub classification: ClassificationResult,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub params: Option<ExtractedParams>,
    #[serde(default)]
    pub file_content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file_content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckConfigRequest {
    #[serde(default)]
    pub config: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepoRequest {
    #[serde(default)]
    pub repo_owner: Option<String>,
    #[serde(default)]
    pub repo_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateIssueRequest {
    #[serde(default)]
    pub repo_owner: Option<String>,
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub aci_enabled: bool,
    pub linked_account: String,
}

/// The `{value, annotations}` wrapper every action's human-readable result
/// is delivered in, so callers have one shape to parse.
#[derive(Debug, Serialize)]
pub struct ResponseEnvelope {
    pub value: String,
    pub annotations: Vec<Value>,
}

impl ResponseEnvelope {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            annotations: vec![],
        }
    }
}
