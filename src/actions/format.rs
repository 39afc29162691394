// src/actions/format.rs
// Pure rendering of gateway payloads into the markdown the client displays.
// Everything here is deterministic and free of I/O.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::routing::extractor::RepositoryRef;

const BODY_PREVIEW_LIMIT: usize = 200;

/// One issue as returned by the gateway. Every field is optional on the wire;
/// missing values render as sensible blanks rather than failing the report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueRecord {
    pub number: Option<u64>,
    pub title: String,
    pub state: String,
    pub body: Option<String>,
    pub html_url: Option<String>,
    pub created_at: Option<String>,
    pub comments: u64,
    pub user: IssueAuthor,
    pub labels: Vec<IssueLabel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueAuthor {
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueLabel {
    pub name: String,
}

/// Pull the issue array out of a gateway payload. The gateway sometimes wraps
/// the array in a `data` or `items` envelope.
pub fn issue_array(payload: &Value) -> Vec<IssueRecord> {
    let array = payload
        .as_array()
        .or_else(|| payload["data"].as_array())
        .or_else(|| payload["items"].as_array());

    array
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalize an ISO-8601 timestamp to `YYYY-MM-DD`. Unparseable input keeps
/// its first ten characters, which covers the common `2024-01-15T...` shape.
fn short_date(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%Y-%m-%d").to_string(),
        Err(_) => raw.chars().take(10).collect(),
    }
}

fn body_preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > BODY_PREVIEW_LIMIT {
        let cut: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
        format!("{cut}...")
    } else {
        trimmed.to_string()
    }
}

/// Render the open-issues report for one repository.
pub fn issues_report(repo: &RepositoryRef, issues: &[IssueRecord]) -> String {
    let slug = repo.slug();

    if issues.is_empty() {
        return format!(
            "## Open Issues in {slug}\n\n\
             No open issues found. Either the repository is in great shape or \
             issues are tracked elsewhere.\n\n\
             Browse the tracker: https://github.com/{slug}/issues"
        );
    }

    let mut out = format!("## Open Issues in {slug}\n\n");
    out.push_str(&format!("Found {} open issue(s):\n\n", issues.len()));

    for issue in issues {
        let number = issue
            .number
            .map(|n| format!("#{n}"))
            .unwrap_or_else(|| "#?".to_string());
        out.push_str(&format!("### {number}: {}\n", issue.title));
        out.push_str(&format!("- **Status:** {}\n", title_case(&issue.state)));

        if !issue.user.login.is_empty() {
            out.push_str(&format!("- **Author:** {}\n", issue.user.login));
        }
        if let Some(created) = issue.created_at.as_deref() {
            out.push_str(&format!("- **Created:** {}\n", short_date(created)));
        }

        let labels = if issue.labels.is_empty() {
            "none".to_string()
        } else {
            issue
                .labels
                .iter()
                .map(|l| l.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.push_str(&format!("- **Labels:** {labels}\n"));
        out.push_str(&format!("- **Comments:** {}\n", issue.comments));

        if let Some(body) = issue.body.as_deref().filter(|b| !b.trim().is_empty()) {
            out.push_str(&format!("\n{}\n", body_preview(body)));
        }
        if let Some(url) = issue.html_url.as_deref() {
            out.push_str(&format!("\n[View issue]({url})\n"));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "Full tracker: https://github.com/{slug}/issues"
    ));
    out
}

/// Confirmation message after a successful issue creation.
pub fn issue_created_report(repo: &RepositoryRef, title: &str, body: &str, issue: &Value) -> String {
    let slug = repo.slug();
    let mut out = String::from("## GitHub Issue Created Successfully\n\n");

    out.push_str(&format!("- **Repository:** {slug}\n"));
    out.push_str(&format!("- **Title:** {title}\n"));
    if let Some(number) = issue["number"].as_u64() {
        out.push_str(&format!("- **Issue:** #{number}\n"));
    }
    if let Some(url) = issue["html_url"].as_str() {
        out.push_str(&format!("- **Link:** {url}\n"));
    }

    out.push_str("\n**Description:**\n");
    out.push_str(&body_preview(body));
    out.push_str(&format!(
        "\n\nTrack progress at https://github.com/{slug}/issues"
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo() -> RepositoryRef {
        RepositoryRef {
            owner: "ehewes".to_string(),
            name: "TechEurope".to_string(),
        }
    }

    #[test]
    fn empty_list_renders_the_no_issues_message() {
        let report = issues_report(&repo(), &[]);
        assert!(report.contains("No open issues found"));
        assert!(report.contains("https://github.com/ehewes/TechEurope/issues"));
    }

    #[test]
    fn report_includes_number_status_and_labels() {
        let issues = issue_array(&json!([{
            "number": 42,
            "title": "Deploys are slow",
            "state": "open",
            "body": "Rollouts take 20 minutes.",
            "html_url": "https://github.com/ehewes/TechEurope/issues/42",
            "created_at": "2024-01-15T10:30:00Z",
            "comments": 3,
            "user": {"login": "octocat"},
            "labels": [{"name": "bug"}, {"name": "ops"}]
        }]));
        let report = issues_report(&repo(), &issues);

        assert!(report.contains("Found 1 open issue(s)"));
        assert!(report.contains("### #42: Deploys are slow"));
        assert!(report.contains("- **Status:** Open"));
        assert!(report.contains("- **Author:** octocat"));
        assert!(report.contains("- **Created:** 2024-01-15"));
        assert!(report.contains("- **Labels:** bug, ops"));
        assert!(report.contains("- **Comments:** 3"));
        assert!(report.contains("[View issue](https://github.com/ehewes/TechEurope/issues/42)"));
    }

    #[test]
    fn missing_fields_render_as_blanks() {
        let issues = issue_array(&json!([{"title": "bare"}]));
        let report = issues_report(&repo(), &issues);
        assert!(report.contains("### #?: bare"));
        assert!(report.contains("- **Labels:** none"));
    }

    #[test]
    fn body_is_truncated_past_the_preview_limit() {
        let long = "x".repeat(BODY_PREVIEW_LIMIT + 1);
        let preview = body_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 3);

        // At exactly the limit, nothing is cut.
        let exact = "y".repeat(BODY_PREVIEW_LIMIT);
        assert_eq!(body_preview(&exact), exact);
    }

    #[test]
    fn date_falls_back_to_a_prefix_when_unparseable() {
        assert_eq!(short_date("2024-01-15T10:30:00Z"), "2024-01-15");
        assert_eq!(short_date("2024-01-15 weird"), "2024-01-15");
    }

    #[test]
    fn issue_array_unwraps_data_envelope() {
        let wrapped = json!({"data": [{"title": "a"}, {"title": "b"}]});
        assert_eq!(issue_array(&wrapped).len(), 2);
        let bare = json!([{"title": "a"}]);
        assert_eq!(issue_array(&bare).len(), 1);
        assert!(issue_array(&json!({"unexpected": true})).is_empty());
    }

    #[test]
    fn created_report_names_repo_title_and_link() {
        let issue = json!({
            "number": 7,
            "html_url": "https://github.com/ehewes/TechEurope/issues/7"
        });
        let report = issue_created_report(&repo(), "Fix the pager", "It pages at 3am.", &issue);
        assert!(report.starts_with("## GitHub Issue Created Successfully"));
        assert!(report.contains("- **Repository:** ehewes/TechEurope"));
        assert!(report.contains("- **Issue:** #7"));
        assert!(report.contains("It pages at 3am."));
    }

    #[test]
    fn report_is_deterministic() {
        let issues = issue_array(&json!([{"number": 1, "title": "t", "state": "open"}]));
        assert_eq!(issues_report(&repo(), &issues), issues_report(&repo(), &issues));
    }
}
