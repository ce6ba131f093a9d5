//! Lead ingestion — JSON batch feed of candidate contacts.
//!
//! Invalid emails and duplicates are skipped with a warning, never fatal to
//! the batch. Pain points arrive as either a string or a list; lists are
//! joined with `", "` before storage.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::IngestError;
use crate::leads::model::Lead;
use crate::store::LeadStore;
use crate::StoreError;

/// Top-level feed shape: `{ "leads": [...] }`.
#[derive(Debug, Deserialize)]
pub struct LeadFeed {
    #[serde(default)]
    pub leads: Vec<LeadRecord>,
}

/// One candidate lead from the feed.
#[derive(Debug, Deserialize)]
pub struct LeadRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub pain_points: Option<PainPoints>,
    #[serde(default)]
    pub conversation_opener: Option<String>,
    #[serde(default)]
    pub negotiation_angle: Option<String>,
}

/// Pain points may be free text or a list of bullet strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PainPoints {
    Text(String),
    List(Vec<String>),
}

impl PainPoints {
    /// Flatten to the stored representation. Empty input becomes `None`.
    pub fn normalized(&self) -> Option<String> {
        let text = match self {
            PainPoints::Text(s) => s.trim().to_string(),
            PainPoints::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        };
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Trim, lowercase, and validate an email address.
///
/// Validation reuses lettre's address grammar — the same parser the SMTP
/// path uses at send time, so anything ingested here is also sendable.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return None;
    }
    email.parse::<lettre::Address>().ok()?;
    Some(email)
}

/// Outcome of one ingestion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub skipped_invalid: usize,
    pub skipped_duplicate: usize,
    pub failed: usize,
}

/// Ingest a parsed feed. Each record commits individually; one bad record
/// never blocks the rest.
pub async fn ingest_feed(store: &dyn LeadStore, feed: &LeadFeed) -> IngestReport {
    let mut report = IngestReport::default();

    for record in &feed.leads {
        let Some(email) = normalize_email(&record.email) else {
            warn!(email = %record.email, "Skipping lead with invalid email");
            report.skipped_invalid += 1;
            continue;
        };

        let mut lead = Lead::new(&record.name, &email, &record.company, &record.industry);
        lead.pain_points = record.pain_points.as_ref().and_then(PainPoints::normalized);
        lead.conversation_opener = record
            .conversation_opener
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        lead.negotiation_angle = record
            .negotiation_angle
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        match store.insert_lead(&lead).await {
            Ok(()) => report.inserted += 1,
            Err(StoreError::Constraint(_)) => {
                warn!(email = %email, "Skipping duplicate lead");
                report.skipped_duplicate += 1;
            }
            Err(e) => {
                warn!(email = %email, error = %e, "Failed to ingest lead");
                report.failed += 1;
            }
        }
    }

    info!(
        inserted = report.inserted,
        invalid = report.skipped_invalid,
        duplicate = report.skipped_duplicate,
        failed = report.failed,
        "Lead ingestion completed"
    );
    report
}

/// Read and ingest a feed file.
pub async fn ingest_file(store: &dyn LeadStore, path: &Path) -> Result<IngestReport, IngestError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let feed: LeadFeed = serde_json::from_str(&raw)?;
    Ok(ingest_feed(store, &feed).await)
}
