// src/routing/extractor.rs
// Two-step parameter extraction: a cheap deterministic pattern match over the
// raw text, then a narrower classification-service call only when the pattern
// finds nothing. Defaults fill whatever is still missing.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::OpenAIClient;
use crate::routing::classifier::Label;

/// Repository coordinates. Both halves are non-empty by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Configured fallback identity used when extraction comes up short.
#[derive(Debug, Clone)]
pub struct RepoDefaults {
    pub owner: String,
    pub name: String,
}

/// Structured parameters pulled out of a natural-language message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ExtractedParams {
    pub fn is_empty(&self) -> bool {
        self.repo_owner.is_none()
            && self.repo_name.is_none()
            && self.title.is_none()
            && self.body.is_none()
    }

    /// Fill unset fields of `self` from `other`. Existing values win.
    pub fn merge(mut self, other: ExtractedParams) -> Self {
        self.repo_owner = self.repo_owner.or(other.repo_owner);
        self.repo_name = self.repo_name.or(other.repo_name);
        self.title = self.title.or(other.title);
        self.body = self.body.or(other.body);
        self
    }
}

/// Repository coordinates could not be resolved even after defaulting.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExtractionError {
    pub message: String,
    pub suggestion: String,
    pub partial: ExtractedParams,
}

static SLASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9][A-Za-z0-9._-]*)/([A-Za-z0-9][A-Za-z0-9._-]*)").expect("valid regex")
});

/// Find the first `owner/name`-shaped token in the message.
pub fn slash_pattern(message: &str) -> Option<(String, String)> {
    SLASH_RE
        .captures(message)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

/// Title default: first line of the message, or its first 100 characters when
/// there is no line break.
pub fn derive_title(message: &str) -> String {
    let trimmed = message.trim();
    match trimmed.split_once('\n') {
        Some((first, _)) => first.trim().to_string(),
        None => trimmed.chars().take(100).collect::<String>().trim().to_string(),
    }
}

/// One step in the extraction chain. Strategies report "no match" with `None`
/// rather than erroring, so the chain composes and unit-tests independently
/// of any live service.
#[async_trait]
pub trait ExtractStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn extract(&self, message: &str, label: Label) -> Option<ExtractedParams>;
}

/// Step 1: deterministic `owner/name` token match. Preferred because it is
/// unambiguous and needs no external call.
pub struct SlashPattern;

#[async_trait]
impl ExtractStrategy for SlashPattern {
    fn name(&self) -> &'static str {
        "slash-pattern"
    }

    async fn extract(&self, message: &str, _label: Label) -> Option<ExtractedParams> {
        slash_pattern(message).map(|(owner, name)| ExtractedParams {
            repo_owner: Some(owner),
            repo_name: Some(name),
            ..Default::default()
        })
    }
}

const EXTRACT_REPO_PROMPT: &str = "\
Extract GitHub repository coordinates from the user message. Reply with a JSON \
object: {\"repo_owner\": \"<owner or empty>\", \"repo_name\": \"<name or empty>\"}. \
A bare repository name without an owner goes into repo_name with repo_owner empty. \
Use empty strings for anything the message does not state.";

const EXTRACT_ISSUE_PROMPT: &str = "\
Extract GitHub issue parameters from the user message. Reply with a JSON object: \
{\"repo_owner\": \"<owner or empty>\", \"repo_name\": \"<name or empty>\", \
\"title\": \"<short issue title>\", \"body\": \"<issue description>\"}. \
A bare repository name without an owner goes into repo_name with repo_owner empty. \
Use empty strings for anything the message does not state.";

/// Step 2: a second, narrower classification-service call. Parse failure means
/// "nothing extracted", never an error.
pub struct LlmFallback {
    llm: OpenAIClient,
    model: String,
}

impl LlmFallback {
    pub fn new(llm: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ExtractStrategy for LlmFallback {
    fn name(&self) -> &'static str {
        "llm-fallback"
    }

    async fn extract(&self, message: &str, label: Label) -> Option<ExtractedParams> {
        let prompt = if label == Label::CreateIssue {
            EXTRACT_ISSUE_PROMPT
        } else {
            EXTRACT_REPO_PROMPT
        };

        let reply = match self.llm.chat_json(message, prompt, &self.model).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Extraction fallback call failed: {}", e);
                return None;
            }
        };

        let mut params: ExtractedParams = match serde_json::from_value(reply) {
            Ok(params) => params,
            Err(e) => {
                warn!("Extraction fallback reply unparseable: {}", e);
                return None;
            }
        };

        // Empty strings mean "not stated".
        for field in [
            &mut params.repo_owner,
            &mut params.repo_name,
            &mut params.title,
            &mut params.body,
        ] {
            if field.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *field = None;
            }
        }

        if params.is_empty() {
            None
        } else {
            Some(params)
        }
    }
}

/// Default-filling policy, applied after the strategy chain:
/// 1. name without owner -> configured default owner;
/// 2. nothing found -> configured default repository pair;
/// 3. create-issue -> title/body derived from the raw message when absent.
pub fn fill_defaults(
    mut params: ExtractedParams,
    label: Label,
    message: &str,
    defaults: &RepoDefaults,
) -> ExtractedParams {
    if params.repo_name.is_some() && params.repo_owner.is_none() && !defaults.owner.is_empty() {
        params.repo_owner = Some(defaults.owner.clone());
    }

    if params.repo_name.is_none() && params.repo_owner.is_none() {
        if !defaults.owner.is_empty() && !defaults.name.is_empty() {
            params.repo_owner = Some(defaults.owner.clone());
            params.repo_name = Some(defaults.name.clone());
        }
    }

    if label == Label::CreateIssue {
        if params.title.is_none() {
            params.title = Some(derive_title(message));
        }
        if params.body.is_none() {
            params.body = Some(message.to_string());
        }
    }

    params
}

/// Require resolved repository coordinates, or explain how to phrase them.
pub fn require_repo(params: &ExtractedParams, label: Label) -> Result<RepositoryRef, ExtractionError> {
    match (params.repo_owner.as_deref(), params.repo_name.as_deref()) {
        (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => Ok(RepositoryRef {
            owner: owner.to_string(),
            name: name.to_string(),
        }),
        _ => {
            let suggestion = match label {
                Label::CreateIssue => "try: create an issue on owner/repo saying ...",
                Label::ListIssues => "try: list issues from owner/repo",
                _ => "try: analyze repository owner/repo",
            };
            Err(ExtractionError {
                message: "Could not determine the repository owner and name from your request"
                    .to_string(),
                suggestion: suggestion.to_string(),
                partial: params.clone(),
            })
        }
    }
}

/// The ordered extraction chain plus the default-filling policy.
pub struct ParamExtractor {
    strategies: Vec<Box<dyn ExtractStrategy>>,
    defaults: RepoDefaults,
}

impl ParamExtractor {
    /// Build the standard chain: slash pattern first, LLM fallback second
    /// (when a client is available).
    pub fn new(llm: Option<OpenAIClient>, intent_model: &str, defaults: RepoDefaults) -> Self {
        let mut strategies: Vec<Box<dyn ExtractStrategy>> = vec![Box::new(SlashPattern)];
        if let Some(llm) = llm {
            strategies.push(Box::new(LlmFallback::new(llm, intent_model)));
        }
        Self { strategies, defaults }
    }

    pub fn defaults(&self) -> &RepoDefaults {
        &self.defaults
    }

    /// Run the chain until a strategy matches, then apply defaults. The
    /// fallback stage only runs when earlier stages found nothing.
    pub async fn extract(&self, message: &str, label: Label) -> ExtractedParams {
        let mut found = ExtractedParams::default();
        for strategy in &self.strategies {
            if let Some(params) = strategy.extract(message, label).await {
                debug!("Extraction strategy '{}' matched", strategy.name());
                found = params;
                break;
            }
        }
        fill_defaults(found, label, message, &self.defaults)
    }

    /// Like `extract`, but skip strategies that call out to a service. Used by
    /// the filter endpoint, which re-resolves parameters at execution time.
    pub async fn extract_offline(&self, message: &str, label: Label) -> ExtractedParams {
        let found = SlashPattern
            .extract(message, label)
            .await
            .unwrap_or_default();
        fill_defaults(found, label, message, &self.defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> RepoDefaults {
        RepoDefaults {
            owner: "ehewes".to_string(),
            name: "TechEurope".to_string(),
        }
    }

    #[test]
    fn slash_token_is_extracted_verbatim() {
        let (owner, name) = slash_pattern("list issues from kubernetes/kubernetes").unwrap();
        assert_eq!(owner, "kubernetes");
        assert_eq!(name, "kubernetes");
    }

    #[test]
    fn slash_token_allows_dots_and_hyphens() {
        let (owner, name) = slash_pattern("analyze repo my-org/some.repo_name please").unwrap();
        assert_eq!(owner, "my-org");
        assert_eq!(name, "some.repo_name");
    }

    #[test]
    fn no_slash_token_means_no_match() {
        assert!(slash_pattern("create an issue about database problems").is_none());
    }

    #[tokio::test]
    async fn slash_strategy_bypasses_fallback() {
        // The chain stops at the first match, so an explicit owner/name token
        // never reaches the service-backed fallback.
        let extractor = ParamExtractor::new(None, "unused", defaults());
        let params = extractor
            .extract("list issues from kubernetes/kubernetes", Label::ListIssues)
            .await;
        assert_eq!(params.repo_owner.as_deref(), Some("kubernetes"));
        assert_eq!(params.repo_name.as_deref(), Some("kubernetes"));
    }

    #[test]
    fn owner_defaults_when_only_name_found() {
        let params = ExtractedParams {
            repo_name: Some("TechEurope".to_string()),
            ..Default::default()
        };
        let filled = fill_defaults(params, Label::ListIssues, "list issues from TechEurope", &defaults());
        assert_eq!(filled.repo_owner.as_deref(), Some("ehewes"));
        assert_eq!(filled.repo_name.as_deref(), Some("TechEurope"));
    }

    #[test]
    fn create_issue_defaults_to_configured_pair() {
        let msg = "create an issue about database problems";
        let filled = fill_defaults(ExtractedParams::default(), Label::CreateIssue, msg, &defaults());
        assert_eq!(filled.repo_owner.as_deref(), Some("ehewes"));
        assert_eq!(filled.repo_name.as_deref(), Some("TechEurope"));
        assert_eq!(filled.title.as_deref(), Some(msg));
        assert_eq!(filled.body.as_deref(), Some(msg));
    }

    #[test]
    fn list_issues_defaults_to_configured_pair() {
        let filled = fill_defaults(
            ExtractedParams::default(),
            Label::ListIssues,
            "show me the current issues",
            &defaults(),
        );
        assert_eq!(filled.repo_owner.as_deref(), Some("ehewes"));
        assert_eq!(filled.repo_name.as_deref(), Some("TechEurope"));
    }

    #[test]
    fn explicit_pair_is_never_overridden() {
        let params = ExtractedParams {
            repo_owner: Some("kubernetes".to_string()),
            repo_name: Some("kubernetes".to_string()),
            ..Default::default()
        };
        let filled = fill_defaults(params, Label::ListIssues, "msg", &defaults());
        assert_eq!(filled.repo_owner.as_deref(), Some("kubernetes"));
        assert_eq!(filled.repo_name.as_deref(), Some("kubernetes"));
    }

    #[test]
    fn title_defaults_to_first_line() {
        let msg = "the deployment pipeline is broken\nIt fails on every push since Tuesday.";
        assert_eq!(derive_title(msg), "the deployment pipeline is broken");
    }

    #[test]
    fn title_defaults_to_first_100_chars_without_line_break() {
        let msg = "a".repeat(150);
        let title = derive_title(&msg);
        assert_eq!(title.chars().count(), 100);
    }

    #[test]
    fn missing_repo_after_defaulting_is_an_extraction_failure() {
        let empty_defaults = RepoDefaults {
            owner: String::new(),
            name: String::new(),
        };
        let filled = fill_defaults(
            ExtractedParams::default(),
            Label::ListIssues,
            "show issues",
            &empty_defaults,
        );
        let err = require_repo(&filled, Label::ListIssues).unwrap_err();
        assert!(err.suggestion.contains("list issues from owner/repo"));
    }

    #[test]
    fn suggestion_matches_label() {
        let params = ExtractedParams::default();
        let err = require_repo(&params, Label::CreateIssue).unwrap_err();
        assert!(err.suggestion.contains("create an issue on owner/repo"));
        let err = require_repo(&params, Label::RepoAnalysis).unwrap_err();
        assert!(err.suggestion.contains("analyze repository"));
    }

    #[test]
    fn partial_params_are_echoed_in_error() {
        let params = ExtractedParams {
            repo_name: Some("TechEurope".to_string()),
            ..Default::default()
        };
        let err = require_repo(&params, Label::ListIssues).unwrap_err();
        assert_eq!(err.partial.repo_name.as_deref(), Some("TechEurope"));
    }

    #[test]
    fn merge_prefers_existing_values() {
        let provided = ExtractedParams {
            repo_owner: Some("facebook".to_string()),
            ..Default::default()
        };
        let extracted = ExtractedParams {
            repo_owner: Some("ehewes".to_string()),
            repo_name: Some("react".to_string()),
            ..Default::default()
        };
        let merged = provided.merge(extracted);
        assert_eq!(merged.repo_owner.as_deref(), Some("facebook"));
        assert_eq!(merged.repo_name.as_deref(), Some("react"));
    }
}
