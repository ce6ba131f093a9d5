//! Human gate — the only way a pending draft leaves the building.
//!
//! Approve sends the draft (optionally edited) and advances the state
//! machine; discard drops it. Both claim the lead first, so the gate never
//! races a scheduler task on the same row.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::context::EngineContext;
use crate::error::{GateError, MailError, StoreError};
use crate::leads::model::{EntryKind, Lead};

fn claimer_id() -> String {
    format!("gate-{}", Uuid::new_v4())
}

async fn claim(ctx: &EngineContext, claimer: &str, lead_id: Uuid) -> Result<Lead, GateError> {
    match ctx
        .store
        .claim_lead_by_id(claimer, lead_id, ctx.settings.claim_lease)
        .await?
    {
        Some(lead) => Ok(lead),
        None => match ctx.store.get_lead(lead_id).await? {
            Some(_) => Err(GateError::Claimed(lead_id)),
            None => Err(GateError::Store(StoreError::NotFound(lead_id.to_string()))),
        },
    }
}

async fn release(ctx: &EngineContext, claimer: &str, lead_id: Uuid) {
    if let Err(e) = ctx.store.release_claim(lead_id, claimer).await {
        tracing::warn!(lead_id = %lead_id, error = %e, "Failed to release gate claim");
    }
}

/// Approve the pending draft and send it, with optional last-minute edits.
///
/// A failed send leaves the draft pending and the state untouched; the
/// caller can simply approve again. Returns the updated lead.
pub async fn approve(
    ctx: &EngineContext,
    lead_id: Uuid,
    subject_edit: Option<&str>,
    body_edit: Option<&str>,
) -> Result<Lead, GateError> {
    let claimer = claimer_id();
    let mut lead = claim(ctx, &claimer, lead_id).await?;

    let Some(draft) = lead.engagement.draft().cloned() else {
        release(ctx, &claimer, lead_id).await;
        return Err(GateError::NoPendingDraft(lead_id));
    };
    let draft = draft.edited(subject_edit, body_edit);

    let Some(mailer) = ctx.mailer.as_ref() else {
        release(ctx, &claimer, lead_id).await;
        return Err(GateError::SendFailed {
            id: lead_id,
            source: MailError::SendFailed("outbound mail is not configured".to_string()),
        });
    };

    if let Err(e) = mailer.send(&lead.email, draft.subject(), draft.body()).await {
        release(ctx, &claimer, lead_id).await;
        return Err(GateError::SendFailed {
            id: lead_id,
            source: e,
        });
    }

    let kind = draft.kind();
    lead.record_sent(kind, Utc::now());

    if let Err(e) = ctx
        .store
        .append_entry(lead.id, EntryKind::from_draft(kind), draft.subject(), draft.body())
        .await
    {
        tracing::warn!(lead = %lead.email, error = %e, "Failed to log approved send");
    }

    let result = ctx.store.update_lead(&lead).await;
    release(ctx, &claimer, lead_id).await;
    result?;

    info!(lead = %lead.email, kind = kind.as_str(), "Draft approved and sent");
    Ok(lead)
}

/// Discard the pending draft without sending. The lead returns to its idle
/// stage and becomes eligible for the scheduler tasks again.
pub async fn discard(ctx: &EngineContext, lead_id: Uuid) -> Result<Lead, GateError> {
    let claimer = claimer_id();
    let mut lead = claim(ctx, &claimer, lead_id).await?;

    if !lead.engagement.has_pending_draft() {
        release(ctx, &claimer, lead_id).await;
        return Err(GateError::NoPendingDraft(lead_id));
    }
    lead.clear_draft();

    let result = ctx.store.update_lead(&lead).await;
    release(ctx, &claimer, lead_id).await;
    result?;

    info!(lead = %lead.email, "Draft discarded");
    Ok(lead)
}
