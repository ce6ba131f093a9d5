//! Outreach — human-gated B2B cold-email engagement engine.

pub mod config;
pub mod drafting;
pub mod engine;
pub mod error;
pub mod intent;
pub mod leads;
pub mod llm;
pub mod mail;
pub mod store;

pub use error::{ConfigError, Error, GateError, IngestError, LlmError, MailError, Result, StoreError};
