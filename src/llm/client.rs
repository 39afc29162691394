// src/llm/client.rs

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

/// Thin reqwest wrapper over the OpenAI chat-completions API.
///
/// Every request carries the client-level timeout; no call is retried here.
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl OpenAIClient {
    pub fn new(api_base: &str, timeout_secs: u64) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build reqwest client")?;

        Ok(Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn post_completions(&self, payload: &Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .context("Failed to send chat request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("OpenAI API error {}: {}", status, error_text));
        }

        response
            .json()
            .await
            .context("Failed to parse chat completion response")
    }

    /// Chat completion with function calling support.
    ///
    /// Returns the full API response so the caller can inspect both content
    /// and tool-call intent.
    pub async fn chat_with_tools(
        &self,
        messages: &[Value],
        tools: &[Value],
        model: &str,
    ) -> Result<Value> {
        let mut payload = json!({
            "model": model,
            "messages": messages,
            "temperature": 0.7,
        });

        if !tools.is_empty() {
            payload["tools"] = json!(tools);
            payload["tool_choice"] = json!("auto");
            payload["parallel_tool_calls"] = json!(false);
        }

        self.post_completions(&payload).await
    }

    /// Chat completion that enforces a JSON object reply and returns it parsed.
    pub async fn chat_json(&self, message: &str, system_prompt: &str, model: &str) -> Result<Value> {
        let payload = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": message},
            ],
            "temperature": 0.2,
            "response_format": { "type": "json_object" },
        });

        let resp_json = self.post_completions(&payload).await?;
        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("No content in chat response"))?;

        serde_json::from_str(content)
            .map_err(|e| anyhow!("Failed to parse JSON reply: {}\nRaw content:\n{}", e, content))
    }

    /// Simple chat for utility calls that returns plain text.
    pub async fn simple_chat(
        &self,
        message: &str,
        system_prompt: &str,
        model: &str,
    ) -> Result<String> {
        let payload = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": message},
            ],
            "temperature": 0.2,
        });

        let resp_json = self.post_completions(&payload).await?;
        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("No content in chat response"))?
            .to_string();

        Ok(content)
    }
}
