//! Environment-driven configuration.
//!
//! Variable names follow the deployment conventions of the mail stack:
//! `IMAP_SERVER`, `SMTP_SERVER`, `EMAIL_ADDRESS`, `EMAIL_PASSWORD`,
//! `CHECK_INTERVAL_SECONDS`, `KNOWLEDGE_BASE_DIR`, plus the LLM key/model
//! variables. Everything is validated up front so the process fails before
//! any network I/O, not on first use.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Default model per backend, overridable via `SUPPORT_TRIAGE_MODEL`.
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Mail transport configuration (IMAP inbound, SMTP outbound).
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub address: String,
    pub password: SecretString,
    pub poll_interval_secs: u64,
}

/// Full agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mail: MailConfig,
    pub knowledge_dir: PathBuf,
    pub llm: LlmConfig,
}

impl Config {
    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let imap_host = require_env("IMAP_SERVER")?;
        let imap_port = parse_env("IMAP_PORT", 993)?;

        // SMTP host is usually the IMAP host with the protocol swapped.
        let smtp_host =
            std::env::var("SMTP_SERVER").unwrap_or_else(|_| imap_host.replace("imap", "smtp"));
        let smtp_port = parse_env("SMTP_PORT", 587)?;

        let address = require_env("EMAIL_ADDRESS")?;
        let password = SecretString::from(require_env("EMAIL_PASSWORD")?);

        let poll_interval_secs = parse_env("CHECK_INTERVAL_SECONDS", 30)?;

        let knowledge_dir = std::env::var("KNOWLEDGE_BASE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("knowledge_base"));

        let llm = llm_from_env()?;

        Ok(Self {
            mail: MailConfig {
                imap_host,
                imap_port,
                smtp_host,
                smtp_port,
                address,
                password,
                poll_interval_secs,
            },
            knowledge_dir,
            llm,
        })
    }
}

/// Pick the LLM backend from whichever API key is present.
///
/// `ANTHROPIC_API_KEY` wins when both are set.
fn llm_from_env() -> Result<LlmConfig, ConfigError> {
    let (backend, key) = if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        (LlmBackend::Anthropic, key)
    } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        (LlmBackend::OpenAi, key)
    } else {
        return Err(ConfigError::MissingEnvVar(
            "ANTHROPIC_API_KEY or OPENAI_API_KEY".to_string(),
        ));
    };

    let model = std::env::var("SUPPORT_TRIAGE_MODEL").unwrap_or_else(|_| {
        match backend {
            LlmBackend::Anthropic => DEFAULT_ANTHROPIC_MODEL,
            LlmBackend::OpenAi => DEFAULT_OPENAI_MODEL,
        }
        .to_string()
    });

    Ok(LlmConfig {
        backend,
        api_key: SecretString::from(key),
        model,
    })
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}' is not a valid value"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_imap_server_is_rejected() {
        // SAFETY: test process does not read these vars concurrently.
        unsafe {
            std::env::remove_var("IMAP_SERVER");
        }
        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn parse_env_uses_default_when_unset() {
        unsafe {
            std::env::remove_var("SUPPORT_TRIAGE_TEST_PORT");
        }
        let port: u16 = parse_env("SUPPORT_TRIAGE_TEST_PORT", 993).unwrap();
        assert_eq!(port, 993);
    }

    #[test]
    fn parse_env_rejects_garbage() {
        unsafe {
            std::env::set_var("SUPPORT_TRIAGE_TEST_BAD", "not-a-number");
        }
        let result: Result<u64, _> = parse_env("SUPPORT_TRIAGE_TEST_BAD", 30);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        unsafe {
            std::env::remove_var("SUPPORT_TRIAGE_TEST_BAD");
        }
    }

    #[test]
    fn require_env_rejects_blank() {
        unsafe {
            std::env::set_var("SUPPORT_TRIAGE_TEST_BLANK", "   ");
        }
        assert!(require_env("SUPPORT_TRIAGE_TEST_BLANK").is_err());
        unsafe {
            std::env::remove_var("SUPPORT_TRIAGE_TEST_BLANK");
        }
    }
}
