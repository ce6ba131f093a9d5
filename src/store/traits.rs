//! `LeadStore` trait — single async interface for lead persistence.
//!
//! Batch selection uses a claim/lease contract instead of row locks: a claim
//! is a single conditional UPDATE stamping `claimed_by`/`claimed_until`, so
//! two concurrently running claimers can never both obtain the same lead.
//! Rows under an unexpired foreign lease are excluded, not waited on. A
//! crashed claimer's lease simply expires.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::leads::model::{ConversationEntry, EntryKind, Lead};

/// Backend-agnostic lead store covering leads and the conversation log.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Insert a newly ingested lead. A duplicate email surfaces as
    /// `StoreError::Constraint`.
    async fn insert_lead(&self, lead: &Lead) -> Result<(), StoreError>;

    /// Get a lead by ID.
    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, StoreError>;

    /// Look up a lead by its email address (the natural key).
    async fn get_lead_by_email(&self, email: &str) -> Result<Option<Lead>, StoreError>;

    /// All leads, for the review dashboard.
    async fn list_leads(&self) -> Result<Vec<Lead>, StoreError>;

    /// Persist a lead's mutable fields. One statement per lead, so a failure
    /// isolates to that record.
    async fn update_lead(&self, lead: &Lead) -> Result<(), StoreError>;

    // ── Claim/lease batch selection ─────────────────────────────────

    /// Claim leads eligible for an initial draft: Idle at stage `new`.
    async fn claim_new_leads(
        &self,
        claimer: &str,
        lease: Duration,
    ) -> Result<Vec<Lead>, StoreError>;

    /// Claim leads eligible for a timed follow-up draft: Idle at
    /// `email_sent`/`followup_sent`, previously emailed, under the follow-up
    /// budget. The elapsed-time guard is the caller's job — it depends on
    /// "now" and stays in-process.
    async fn claim_followup_candidates(
        &self,
        claimer: &str,
        max_followups: u32,
        lease: Duration,
    ) -> Result<Vec<Lead>, StoreError>;

    /// Claim leads awaiting a reply to our own AI-sent reply.
    async fn claim_awaiting_reply(
        &self,
        claimer: &str,
        lease: Duration,
    ) -> Result<Vec<Lead>, StoreError>;

    /// Claim one lead by email (reply ingestor path). Returns `None` when no
    /// such lead exists or it is under a live foreign claim.
    async fn claim_lead_by_email(
        &self,
        claimer: &str,
        email: &str,
        lease: Duration,
    ) -> Result<Option<Lead>, StoreError>;

    /// Claim one lead by ID (human gate path). Same semantics as
    /// `claim_lead_by_email`.
    async fn claim_lead_by_id(
        &self,
        claimer: &str,
        id: Uuid,
        lease: Duration,
    ) -> Result<Option<Lead>, StoreError>;

    /// Release a claim after commit. A no-op if the claim has already
    /// expired or belongs to someone else.
    async fn release_claim(&self, id: Uuid, claimer: &str) -> Result<(), StoreError>;

    // ── Conversation log ────────────────────────────────────────────

    /// Append an entry to a lead's conversation log. The timestamp is
    /// assigned here, not by the caller.
    async fn append_entry(
        &self,
        lead_id: Uuid,
        kind: EntryKind,
        subject: &str,
        body: &str,
    ) -> Result<ConversationEntry, StoreError>;

    /// A lead's conversation timeline, oldest first.
    async fn list_entries(&self, lead_id: Uuid) -> Result<Vec<ConversationEntry>, StoreError>;
}
