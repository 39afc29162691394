// src/config/mod.rs
// All values load from the environment (.env supported), with working defaults.

use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    // ── Completion service
    pub openai_base_url: String,
    pub model: String,
    pub intent_model: String,
    pub llm_timeout_secs: u64,
    pub max_tool_rounds: usize,

    // ── Function-execution gateway (ACI)
    pub aci_base_url: String,
    pub aci_timeout_secs: u64,
    pub linked_account_owner_id: String,

    // ── Repository defaults used when extraction comes up short
    pub default_repo_owner: String,
    pub default_repo_name: String,

    // ── Server
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub log_level: String,
}

/// Parse an env var, tolerating trailing comments and whitespace.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl RouterConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("Warning: .env file not found. Using environment variables and defaults.");
        }

        // LINKED_ACCOUNT_OWNER_ID wins, DEFAULT_LINKED_ACCOUNT_OWNER_ID is the
        // legacy name, "peopleagent" the last-resort fallback.
        let linked_account = std::env::var("LINKED_ACCOUNT_OWNER_ID")
            .or_else(|_| std::env::var("DEFAULT_LINKED_ACCOUNT_OWNER_ID"))
            .unwrap_or_else(|_| "peopleagent".to_string());

        Self {
            openai_base_url: env_var_or("OPENAI_BASE_URL", "https://api.openai.com/v1".to_string()),
            model: env_var_or("SRE_MODEL", "gpt-4o".to_string()),
            intent_model: env_var_or("SRE_INTENT_MODEL", "gpt-4o-mini".to_string()),
            llm_timeout_secs: env_var_or("SRE_LLM_TIMEOUT", 60),
            max_tool_rounds: env_var_or("SRE_MAX_TOOL_ROUNDS", 5),
            aci_base_url: env_var_or("ACI_BASE_URL", "https://api.aci.dev".to_string()),
            aci_timeout_secs: env_var_or("ACI_TIMEOUT", 30),
            linked_account_owner_id: linked_account,
            default_repo_owner: env_var_or("DEFAULT_REPO_OWNER", "ehewes".to_string()),
            default_repo_name: env_var_or("DEFAULT_REPO_NAME", "TechEurope".to_string()),
            host: env_var_or("SRE_HOST", "127.0.0.1".to_string()),
            port: env_var_or("SRE_PORT", 5001),
            cors_origin: env_var_or("SRE_CORS_ORIGIN", "*".to_string()),
            log_level: env_var_or("SRE_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The `owner/name` slug of the configured default repository
    pub fn default_repo_slug(&self) -> String {
        format!("{}/{}", self.default_repo_owner, self.default_repo_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RouterConfig::from_env();

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tool_rounds, 5);
        assert_eq!(config.port, 5001);
        assert!(!config.default_repo_owner.is_empty());
        assert!(!config.default_repo_name.is_empty());
    }

    #[test]
    fn test_default_repo_slug() {
        let config = RouterConfig::from_env();
        let slug = config.default_repo_slug();
        assert!(slug.contains('/'));
        assert_eq!(
            slug,
            format!("{}/{}", config.default_repo_owner, config.default_repo_name)
        );
    }

    #[test]
    fn test_env_var_or_strips_comments() {
        std::env::set_var("SRE_TEST_COMMENTED", "42 # rounds");
        assert_eq!(env_var_or("SRE_TEST_COMMENTED", 0usize), 42);
        std::env::remove_var("SRE_TEST_COMMENTED");
    }
}
