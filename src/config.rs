//! Configuration from environment variables.
//!
//! The LLM settings are required; mail is optional (unset host disables the
//! send/poll paths); everything else has defaults tuned for production.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::drafting::Persona;
use crate::error::ConfigError;
use crate::mail::MailConfig;

const DEFAULT_COMPANY: &str = "Hexanova MediaTech";
const DEFAULT_BLURB: &str = "Hexanova MediaTech builds practical and immersive digital systems \
across web, mobile, AI, 3D, and AR/VR. The team works with growing organizations to design \
scalable platforms and interactive experiences, often where execution speed, clarity, and \
long-term maintainability matter.";

/// LLM provider settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: SecretString,
    pub model: String,
    /// Override for testing against a local OpenRouter-compatible endpoint.
    pub base_url: Option<String>,
}

/// Periods, delays, and budgets for the scheduler tasks.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// How often the initial-draft task runs.
    pub initial_draft_period: Duration,
    /// How often the follow-up task runs.
    pub followup_period: Duration,
    /// Minimum quiet time after a send before a follow-up draft.
    pub followup_delay: Duration,
    /// How often the post-reply nudge task runs.
    pub post_reply_period: Duration,
    /// How often the inbox is polled for replies.
    pub reply_poll_period: Duration,
    /// How long to wait on a lead after our AI reply before nudging.
    pub post_reply_wait: Duration,
    /// Lifetime follow-up budget per lead.
    pub max_followups: u32,
    /// Claim lease length. Expired leases self-heal after a crash.
    pub claim_lease: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            initial_draft_period: Duration::from_secs(600),
            followup_period: Duration::from_secs(30),
            followup_delay: Duration::from_secs(300),
            post_reply_period: Duration::from_secs(60),
            reply_poll_period: Duration::from_secs(120),
            post_reply_wait: Duration::from_secs(24 * 60 * 60),
            max_followups: 3,
            claim_lease: Duration::from_secs(120),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct OutreachConfig {
    pub llm: LlmSettings,
    pub persona: Persona,
    pub mail: Option<MailConfig>,
    pub db_path: PathBuf,
    /// Lead feed ingested at startup. Missing file is a skip, not an error.
    pub leads_file: Option<PathBuf>,
    pub engine: EngineSettings,
}

impl OutreachConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let llm = LlmSettings {
            api_key: require("OPENROUTER_API_KEY")?.into(),
            model: require("OPENROUTER_MODEL")?,
            base_url: env_var("OPENROUTER_BASE_URL"),
        };

        let persona = Persona::new(
            env_var("OUTREACH_COMPANY_NAME").unwrap_or_else(|| DEFAULT_COMPANY.to_string()),
            env_var("OUTREACH_COMPANY_BLURB").unwrap_or_else(|| DEFAULT_BLURB.to_string()),
        );

        // Mail credentials must be set together or not at all.
        let has_user = env_var("OUTREACH_MAIL_USERNAME").is_some();
        let has_pass = env_var("OUTREACH_MAIL_PASSWORD").is_some();
        if has_user != has_pass {
            return Err(ConfigError::UnpairedCredentials {
                first: "OUTREACH_MAIL_USERNAME".to_string(),
                second: "OUTREACH_MAIL_PASSWORD".to_string(),
            });
        }

        let engine = EngineSettings {
            initial_draft_period: env_secs("OUTREACH_INITIAL_DRAFT_SECS", 600)?,
            followup_period: env_secs("OUTREACH_FOLLOWUP_SECS", 30)?,
            followup_delay: env_secs("OUTREACH_FOLLOWUP_DELAY_SECS", 300)?,
            post_reply_period: env_secs("OUTREACH_POST_REPLY_SECS", 60)?,
            reply_poll_period: env_secs("OUTREACH_REPLY_POLL_SECS", 120)?,
            post_reply_wait: env_secs("OUTREACH_POST_REPLY_WAIT_SECS", 24 * 60 * 60)?,
            max_followups: env_u32("OUTREACH_MAX_FOLLOWUPS", 3)?,
            claim_lease: env_secs("OUTREACH_CLAIM_LEASE_SECS", 120)?,
        };

        Ok(Self {
            llm,
            persona,
            mail: MailConfig::from_env(),
            db_path: env_var("OUTREACH_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/outreach.db")),
            leads_file: Some(
                env_var("OUTREACH_LEADS_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data/leads.json")),
            ),
            engine,
        })
    }
}

/// Read an env var, treating unset and blank the same.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require(key: &str) -> Result<String, ConfigError> {
    env_var(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn env_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    match env_var(key) {
        None => Ok(Duration::from_secs(default)),
        Some(v) => v
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{v}' is not a number of seconds"),
            }),
    }
}

fn env_u32(key: &str, default: u32) -> Result<u32, ConfigError> {
    match env_var(key) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{v}' is not a valid count"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults_match_production_cadence() {
        let e = EngineSettings::default();
        assert_eq!(e.initial_draft_period, Duration::from_secs(600));
        assert_eq!(e.followup_period, Duration::from_secs(30));
        assert_eq!(e.followup_delay, Duration::from_secs(300));
        assert_eq!(e.reply_poll_period, Duration::from_secs(120));
        assert_eq!(e.post_reply_wait, Duration::from_secs(86_400));
        assert_eq!(e.max_followups, 3);
    }
}
