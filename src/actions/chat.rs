// src/actions/chat.rs
// General chat with dynamic function discovery: the completion service may
// call the gateway's search meta-function, append the functions it finds to
// its own tool list, and invoke them in later rounds. The loop is explicit
// and bounded; termination is guaranteed by the round cap.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::RouterConfig;
use crate::gateway::{search_functions_schema, AciClient, SEARCH_FUNCTIONS};
use crate::handlers::AppState;
use crate::routing::dispatcher::ActionResponse;

const FALLBACK_REPLY: &str = "I apologize, but I encountered an issue processing your request.";

pub fn system_prompt(config: &RouterConfig) -> String {
    format!(
        "You are an expert SRE (Site Reliability Engineering) assistant with access to \
         unlimited tools via {search}. Use {search} to find relevant functions across all \
         connected apps; once you have identified the functions you need, they become \
         available for your next tool calls.\n\
         You can discover and use functions for any task: GitHub operations (repositories, \
         issues, commits, content, PRs), cloud services and infrastructure management, \
         configuration analysis and deployment reviews, monitoring, logging and \
         observability, security analysis and compliance checks, cost optimization, CI/CD \
         pipeline management, database operations, and web research.\n\
         IMPORTANT DEFAULTS:\n\
         - For GitHub operations without a specified repository, default to '{default_repo}'\n\
         - For create issue requests, extract title and description from the user message\n\
         - For list issues requests, format results clearly with issue details\n\
         - For configuration analysis, provide detailed security and best practice recommendations\n\
         Always provide actionable, expert-level SRE recommendations with clear explanations.",
        search = SEARCH_FUNCTIONS,
        default_repo = config.default_repo_slug(),
    )
}

/// Combine the message with any uploaded file content, fenced for the model.
fn compose_user_input(message: &str, file_content: Option<&str>) -> String {
    match file_content.filter(|c| !c.trim().is_empty()) {
        Some(content) => format!("{message}\n\nFile content to analyze:\n```\n{content}\n```"),
        None => message.to_string(),
    }
}

pub async fn run(
    state: &AppState,
    message: &str,
    file_content: Option<&str>,
) -> Result<ActionResponse> {
    let user_input = compose_user_input(message, file_content);
    let system = system_prompt(&state.config);

    // No gateway: degrade to a plain completion without tools.
    let Some(gateway) = state.gateway.as_ref() else {
        let reply = state
            .llm
            .simple_chat(&user_input, &system, &state.config.model)
            .await?;
        return Ok(ActionResponse::ok(reply, json!({})));
    };

    Ok(ActionResponse::ok(
        tool_loop(state, gateway, &system, &user_input).await?,
        json!({}),
    ))
}

async fn tool_loop(
    state: &AppState,
    gateway: &AciClient,
    system: &str,
    user_input: &str,
) -> Result<String> {
    let mut tools: Vec<Value> = vec![search_functions_schema()];
    let mut messages: Vec<Value> = vec![
        json!({"role": "system", "content": system}),
        json!({"role": "user", "content": user_input}),
    ];
    let mut final_content: Option<String> = None;

    for round in 0..state.config.max_tool_rounds {
        info!("Chat tool loop round {}", round + 1);

        let response = state
            .llm
            .chat_with_tools(&messages, &tools, &state.config.model)
            .await?;
        let assistant = &response["choices"][0]["message"];

        if let Some(content) = assistant["content"].as_str().filter(|c| !c.is_empty()) {
            final_content = Some(content.to_string());
            messages.push(json!({"role": "assistant", "content": content}));
        }

        let Some(tool_call) = assistant["tool_calls"].get(0).cloned() else {
            // No further tool-call intent: the loop is done.
            break;
        };

        let call_id = tool_call["id"].as_str().unwrap_or_default().to_string();
        let fn_name = tool_call["function"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let fn_args: Value = tool_call["function"]["arguments"]
            .as_str()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| json!({}));

        messages.push(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [tool_call],
        }));

        // Gateway failures go back to the model as tool output, not upward.
        let tool_output = match gateway.handle_function_call(&fn_name, &fn_args).await {
            Ok(result) => {
                if fn_name == SEARCH_FUNCTIONS {
                    if let Some(found) = result.as_array() {
                        info!("Retrieved {} new functions", found.len());
                        tools.extend(found.iter().cloned());
                    }
                }
                result.to_string()
            }
            Err(e) => {
                warn!("Tool execution failed: {}", e);
                format!("Error executing function: {e}")
            }
        };

        messages.push(json!({
            "role": "tool",
            "tool_call_id": call_id,
            "content": tool_output,
        }));
    }

    Ok(final_content.unwrap_or_else(|| FALLBACK_REPLY.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_input_includes_fenced_file_content() {
        let input = compose_user_input("review this", Some("replicas: 3"));
        assert!(input.starts_with("review this"));
        assert!(input.contains("File content to analyze"));
        assert!(input.contains("```\nreplicas: 3\n```"));
    }

    #[test]
    fn user_input_without_file_is_the_message() {
        assert_eq!(compose_user_input("hello", None), "hello");
        assert_eq!(compose_user_input("hello", Some("   ")), "hello");
    }

    #[test]
    fn system_prompt_names_the_default_repository() {
        let config = crate::config::RouterConfig::from_env();
        let prompt = system_prompt(&config);
        assert!(prompt.contains(&config.default_repo_slug()));
        assert!(prompt.contains(SEARCH_FUNCTIONS));
    }
}
