// src/routing/classifier.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm::OpenAIClient;
use crate::routing::extractor::ExtractedParams;

/// The discrete intent category assigned to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Label {
    Chat,
    ConfigAnalysis,
    RepoAnalysis,
    CreateIssue,
    ListIssues,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Chat => "chat",
            Label::ConfigAnalysis => "config-analysis",
            Label::RepoAnalysis => "repo-analysis",
            Label::CreateIssue => "create-issue",
            Label::ListIssues => "list-issues",
        }
    }

    pub fn parse(s: &str) -> Option<Label> {
        match s.trim() {
            "chat" => Some(Label::Chat),
            "config-analysis" => Some(Label::ConfigAnalysis),
            "repo-analysis" => Some(Label::RepoAnalysis),
            "create-issue" => Some(Label::CreateIssue),
            "list-issues" => Some(Label::ListIssues),
            _ => None,
        }
    }

    /// Labels that require structured repository parameters before dispatch.
    pub fn needs_params(&self) -> bool {
        matches!(
            self,
            Label::RepoAnalysis | Label::CreateIssue | Label::ListIssues
        )
    }
}

/// Result of classifying one incoming message. Immutable once produced;
/// confidence is informational and never gates execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub function: Label,
    pub confidence: f32,
    pub reasoning: String,
    #[serde(default)]
    pub extracted_params: ExtractedParams,
}

impl ClassificationResult {
    pub fn new(function: Label, confidence: f32, reasoning: impl Into<String>) -> Self {
        Self {
            function,
            confidence,
            reasoning: reasoning.into(),
            extracted_params: ExtractedParams::default(),
        }
    }

    /// The safety net: an unclassifiable request degrades to plain chat, the
    /// only non-mutating action, instead of crashing the pipeline.
    pub fn fallback() -> Self {
        Self::new(Label::Chat, 0.5, "fallback due to parsing error")
    }
}

const CREATE_ISSUE_TRIGGERS: &[&str] = &[
    "create issue",
    "create an issue",
    "create a github issue",
    "file bug",
    "file a bug",
    "open an issue",
    "track problem",
    "track this",
    "report this",
    "log this issue",
    "log this as an issue",
];

const LIST_ISSUES_TRIGGERS: &[&str] = &[
    "list issues",
    "show issues",
    "show me issues",
    "what issues",
    "current issues",
    "open issues",
    "issues in",
    "issues from",
    "view issues",
    "get issues",
];

const REPO_ANALYSIS_TRIGGERS: &[&str] = &[
    "analyze repository",
    "analyse repository",
    "analyze the repository",
    "analyze repo",
    "analyze the repo",
    "repository analysis",
];

const CLASSIFY_PROMPT: &str = "\
You are a request classifier for an SRE assistant. Assign the user message to \
exactly one of five functions:\n\
- \"chat\": general SRE questions, advice, best practices (e.g. \"how do I monitor Kubernetes?\")\n\
- \"config-analysis\": reviewing a configuration or deployment file (e.g. \"review this deployment config\")\n\
- \"repo-analysis\": analyzing a GitHub repository (e.g. \"analyze repository microsoft/vscode\")\n\
- \"create-issue\": filing or tracking a problem on GitHub (e.g. \"create an issue about slow deploys\", \"file a bug\")\n\
- \"list-issues\": enumerating existing GitHub issues (e.g. \"list issues from kubernetes/kubernetes\", \"what issues are open\")\n\
Reply with a JSON object: {\"function\": \"<one of the five>\", \"confidence\": <0.0-1.0>, \"reasoning\": \"<one sentence>\"}.";

/// Deterministic precedence pass. A match here resolves the label without an
/// external call; the order encodes the tie-break policy: file/config wins,
/// then analysis phrasing, then create/list trigger phrases, and a bare
/// `owner/repo` token only counts when nothing stronger matched.
/// File types whose upload forces config-analysis. Anything else (logs,
/// images) classifies on the message text alone.
fn is_structured_config(file_type: &str) -> bool {
    let ft = file_type.to_ascii_lowercase();
    ["yaml", "yml", "json", "toml"].iter().any(|t| ft.contains(t))
}

pub fn heuristic_classification(
    message: &str,
    has_file: bool,
    file_type: &str,
) -> Option<ClassificationResult> {
    let lower = message.to_lowercase();

    let config_upload = has_file && is_structured_config(file_type);
    // "config" also covers "configuration".
    if config_upload || lower.contains("config") {
        return Some(ClassificationResult::new(
            Label::ConfigAnalysis,
            0.95,
            if config_upload {
                "configuration file upload takes precedence"
            } else {
                "message mentions configuration"
            },
        ));
    }

    if let Some(phrase) = first_match(&lower, REPO_ANALYSIS_TRIGGERS) {
        return Some(ClassificationResult::new(
            Label::RepoAnalysis,
            0.9,
            format!("matched trigger phrase '{phrase}'"),
        ));
    }

    if let Some(phrase) = first_match(&lower, CREATE_ISSUE_TRIGGERS) {
        return Some(ClassificationResult::new(
            Label::CreateIssue,
            0.9,
            format!("matched trigger phrase '{phrase}'"),
        ));
    }

    if let Some(phrase) = first_match(&lower, LIST_ISSUES_TRIGGERS) {
        return Some(ClassificationResult::new(
            Label::ListIssues,
            0.9,
            format!("matched trigger phrase '{phrase}'"),
        ));
    }

    if crate::routing::extractor::slash_pattern(message).is_some() {
        return Some(ClassificationResult::new(
            Label::RepoAnalysis,
            0.7,
            "message contains an explicit owner/repo token",
        ));
    }

    None
}

fn first_match<'a>(lower: &str, triggers: &[&'a str]) -> Option<&'a str> {
    triggers.iter().find(|t| lower.contains(*t)).copied()
}

/// Strict parse of the classification service's JSON reply. Anything that does
/// not match the expected structure degrades to the chat fallback.
pub fn parse_classification_reply(reply: &Value) -> ClassificationResult {
    let function = match reply["function"].as_str().and_then(Label::parse) {
        Some(label) => label,
        None => return ClassificationResult::fallback(),
    };
    let confidence = match reply["confidence"].as_f64() {
        Some(c) => c.clamp(0.0, 1.0) as f32,
        None => return ClassificationResult::fallback(),
    };
    let reasoning = reply["reasoning"].as_str().unwrap_or("").to_string();

    ClassificationResult::new(function, confidence, reasoning)
}

pub struct IntentClassifier {
    llm: OpenAIClient,
    intent_model: String,
}

impl IntentClassifier {
    pub fn new(llm: OpenAIClient, intent_model: impl Into<String>) -> Self {
        Self {
            llm,
            intent_model: intent_model.into(),
        }
    }

    /// Classify a message into one of the five labels. Never fails: transport
    /// or parse problems degrade to the chat fallback.
    pub async fn classify(
        &self,
        message: &str,
        has_file: bool,
        file_type: &str,
    ) -> ClassificationResult {
        if let Some(result) = heuristic_classification(message, has_file, file_type) {
            debug!(
                "Heuristic classification: {} ({})",
                result.function.as_str(),
                result.reasoning
            );
            return result;
        }

        match self.llm.chat_json(message, CLASSIFY_PROMPT, &self.intent_model).await {
            Ok(reply) => parse_classification_reply(&reply),
            Err(e) => {
                warn!("Classification call failed, falling back to chat: {}", e);
                ClassificationResult::fallback()
            }
        }
    }
}
