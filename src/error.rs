//! Error types for the outreach engine.
//!
//! Each external collaborator and subsystem gets its own enum; the scheduler
//! tasks decide per call whether a failure is skip-and-continue (transient,
//! single-record) or ends the whole cycle (store or inbox failure).

use std::time::Duration;

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Gate error: {0}")]
    Gate(#[from] GateError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),
}

/// Ingestion feed errors. Per-record problems (invalid email, duplicate) are
/// not errors — they are skips counted in the `IngestReport`. These cover
/// failures to read the feed at all.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to read leads file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse leads file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("{first} and {second} must be set together")]
    UnpairedCredentials { first: String, second: String },
}

/// Lead store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Lead not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid stored state for lead {id}: {reason}")]
    InvalidState { id: Uuid, reason: String },
}

/// Completion collaborator errors. Every variant collapses to the same
/// fallback behavior in the draft producer; the classifier maps them all to
/// the safe default label.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Completion request failed: {0}")]
    RequestFailed(String),

    #[error("Completion request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Completion HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
}

/// Mail transport / inbox errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SMTP authentication failed")]
    AuthFailed,

    #[error("Recipient rejected: {0}")]
    RecipientRejected(String),

    #[error("Mail server disconnected: {0}")]
    Disconnected(String),

    #[error("Mail operation timed out")]
    Timeout,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Inbox fetch failed: {0}")]
    FetchFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Human gate errors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Lead {0} has no pending draft")]
    NoPendingDraft(Uuid),

    #[error("Lead {0} is claimed by another operation")]
    Claimed(Uuid),

    #[error("Send failed for lead {id}: {source}")]
    SendFailed {
        id: Uuid,
        #[source]
        source: MailError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
