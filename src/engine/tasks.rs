//! Scheduler tasks — initial drafts, timed follow-ups, post-reply nudges.
//!
//! Every task follows the same shape: claim an eligible batch, process each
//! lead independently, release the claim per lead. A per-lead failure is
//! logged and skipped; the next tick retries whatever is still eligible.

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::context::EngineContext;
use crate::leads::model::{DraftKind, EntryKind, Lead};

/// Outcome counters for one task cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskReport {
    pub claimed: usize,
    pub advanced: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn claimer_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

async fn persist_and_release(
    ctx: &EngineContext,
    claimer: &str,
    lead: &Lead,
    report: &mut TaskReport,
) {
    match ctx.store.update_lead(lead).await {
        Ok(()) => report.advanced += 1,
        Err(e) => {
            error!(lead = %lead.email, error = %e, "Failed to persist lead");
            report.failed += 1;
        }
    }
    release(ctx, claimer, lead).await;
}

async fn release(ctx: &EngineContext, claimer: &str, lead: &Lead) {
    if let Err(e) = ctx.store.release_claim(lead.id, claimer).await {
        warn!(lead = %lead.email, error = %e, "Failed to release claim");
    }
}

/// Draft initial outreach emails for every lead still at stage `new`.
pub async fn initial_draft_cycle(ctx: &EngineContext) -> TaskReport {
    let claimer = claimer_id("initial");
    let mut report = TaskReport::default();

    let leads = match ctx
        .store
        .claim_new_leads(&claimer, ctx.settings.claim_lease)
        .await
    {
        Ok(leads) => leads,
        Err(e) => {
            error!(error = %e, "Initial draft claim failed");
            report.failed += 1;
            return report;
        }
    };
    report.claimed = leads.len();

    for mut lead in leads {
        let draft = ctx.producer.outreach_draft(&lead, DraftKind::Initial).await;
        if !lead.put_draft(draft) {
            // Predicate excludes pending drafts; seeing one here means the
            // row changed under us. Leave it alone.
            release(ctx, &claimer, &lead).await;
            report.skipped += 1;
            continue;
        }
        persist_and_release(ctx, &claimer, &lead, &mut report).await;
    }

    if report.claimed > 0 {
        info!(?report, "Initial draft cycle completed");
    }
    report
}

/// Draft follow-ups for leads that went quiet after a send.
pub async fn followup_cycle(ctx: &EngineContext) -> TaskReport {
    let claimer = claimer_id("followup");
    let mut report = TaskReport::default();
    let now = Utc::now();

    let leads = match ctx
        .store
        .claim_followup_candidates(
            &claimer,
            ctx.settings.max_followups,
            ctx.settings.claim_lease,
        )
        .await
    {
        Ok(leads) => leads,
        Err(e) => {
            error!(error = %e, "Follow-up claim failed");
            report.failed += 1;
            return report;
        }
    };
    report.claimed = leads.len();

    for mut lead in leads {
        // The elapsed-time guard stays in-process; the claim predicate only
        // covers stage and budget.
        let delay = chrono::Duration::from_std(ctx.settings.followup_delay)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let quiet_long_enough = lead.last_email_sent.is_some_and(|sent| now - sent >= delay);
        if !quiet_long_enough {
            release(ctx, &claimer, &lead).await;
            report.skipped += 1;
            continue;
        }

        let draft = ctx
            .producer
            .outreach_draft(&lead, DraftKind::Followup)
            .await;
        if !lead.put_draft(draft) {
            release(ctx, &claimer, &lead).await;
            report.skipped += 1;
            continue;
        }
        persist_and_release(ctx, &claimer, &lead, &mut report).await;
    }

    if report.claimed > 0 {
        info!(?report, "Follow-up cycle completed");
    }
    report
}

/// Auto-send a nudge to leads that never answered our AI reply.
///
/// This is the one path that sends without the human gate: the human already
/// approved this conversation when they sent the reply that started the wait.
pub async fn post_reply_cycle(ctx: &EngineContext) -> TaskReport {
    let claimer = claimer_id("post-reply");
    let mut report = TaskReport::default();
    let now = Utc::now();

    let Some(mailer) = ctx.mailer.as_ref() else {
        return report;
    };

    let leads = match ctx
        .store
        .claim_awaiting_reply(&claimer, ctx.settings.claim_lease)
        .await
    {
        Ok(leads) => leads,
        Err(e) => {
            error!(error = %e, "Post-reply claim failed");
            report.failed += 1;
            return report;
        }
    };
    report.claimed = leads.len();

    for mut lead in leads {
        let wait = chrono::Duration::from_std(ctx.settings.post_reply_wait)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let waited_long_enough = lead.last_ai_reply_sent.is_some_and(|sent| now - sent >= wait);
        if !waited_long_enough {
            release(ctx, &claimer, &lead).await;
            report.skipped += 1;
            continue;
        }

        let draft = ctx
            .producer
            .outreach_draft(&lead, DraftKind::Followup)
            .await;

        if let Err(e) = mailer.send(&lead.email, draft.subject(), draft.body()).await {
            // State untouched; the next tick retries.
            warn!(lead = %lead.email, error = %e, "Post-reply nudge send failed");
            release(ctx, &claimer, &lead).await;
            report.failed += 1;
            continue;
        }

        lead.record_post_reply_followup(now);
        if let Err(e) = ctx
            .store
            .append_entry(lead.id, EntryKind::Followup, draft.subject(), draft.body())
            .await
        {
            warn!(lead = %lead.email, error = %e, "Failed to log post-reply nudge");
        }
        persist_and_release(ctx, &claimer, &lead, &mut report).await;
    }

    if report.claimed > 0 {
        info!(?report, "Post-reply cycle completed");
    }
    report
}
