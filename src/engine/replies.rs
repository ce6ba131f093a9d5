//! Reply ingestor — inbox poll, intent classification, reply draft.
//!
//! Each message commits individually and is marked seen only after its
//! effects are in the store. A crash between commit and mark means the next
//! poll reprocesses the message (at-least-once); a message for a lead under
//! a live foreign claim is left unseen and retried next poll.

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::context::EngineContext;
use crate::engine::tasks::TaskReport;
use crate::leads::model::{EntryKind, Intent};
use crate::mail::InboundEmail;

fn claimer_id() -> String {
    format!("replies-{}", Uuid::new_v4())
}

/// Poll the inbox once and process every unseen reply.
pub async fn poll_replies(ctx: &EngineContext) -> TaskReport {
    let mut report = TaskReport::default();

    let Some(inbox) = ctx.inbox.as_ref() else {
        return report;
    };

    let messages = match inbox.fetch_unseen().await {
        Ok(messages) => messages,
        Err(e) => {
            error!(error = %e, "Inbox fetch failed");
            report.failed += 1;
            return report;
        }
    };
    report.claimed = messages.len();

    for message in messages {
        match process_reply(ctx, &message).await {
            ReplyOutcome::Committed => {
                mark_seen(ctx, &message).await;
                report.advanced += 1;
            }
            ReplyOutcome::Discarded => {
                // Nothing to commit for this message; retrying it would
                // produce the same outcome forever.
                mark_seen(ctx, &message).await;
                report.skipped += 1;
            }
            ReplyOutcome::RetryLater => report.skipped += 1,
            ReplyOutcome::Failed => report.failed += 1,
        }
    }

    if report.claimed > 0 {
        info!(?report, "Reply poll completed");
    }
    report
}

enum ReplyOutcome {
    /// Effects committed; safe to mark seen.
    Committed,
    /// No lead state to change; mark seen and move on.
    Discarded,
    /// Lead busy under a foreign claim; leave unseen.
    RetryLater,
    /// Transient failure; leave unseen, next poll retries.
    Failed,
}

async fn process_reply(ctx: &EngineContext, message: &InboundEmail) -> ReplyOutcome {
    if message.body.trim().is_empty() {
        warn!(sender = %message.sender, "Ignoring reply with empty body");
        return ReplyOutcome::Discarded;
    }

    let claimer = claimer_id();
    let claimed = match ctx
        .store
        .claim_lead_by_email(&claimer, &message.sender, ctx.settings.claim_lease)
        .await
    {
        Ok(claimed) => claimed,
        Err(e) => {
            error!(sender = %message.sender, error = %e, "Reply claim failed");
            return ReplyOutcome::Failed;
        }
    };

    let Some(mut lead) = claimed else {
        // No lead, or a live foreign claim. Distinguish so strangers' mail
        // doesn't get re-polled forever.
        return match ctx.store.get_lead_by_email(&message.sender).await {
            Ok(Some(_)) => ReplyOutcome::RetryLater,
            Ok(None) => {
                warn!(sender = %message.sender, "No lead found for reply");
                ReplyOutcome::Discarded
            }
            Err(_) => ReplyOutcome::Failed,
        };
    };

    info!(lead = %lead.email, "Processing reply");

    if let Err(e) = ctx
        .store
        .append_entry(lead.id, EntryKind::Reply, &message.subject, &message.body)
        .await
    {
        error!(lead = %lead.email, error = %e, "Failed to log inbound reply");
        release(ctx, &claimer, lead.id, &lead.email).await;
        return ReplyOutcome::Failed;
    }

    let intent = ctx.classifier.classify(&message.body).await;
    lead.record_reply(intent, Utc::now());

    // Draft an AI reply for the human gate, unless the lead closed or a
    // draft is already pending.
    if intent != Intent::NotInterested && !lead.engagement.has_pending_draft() {
        let draft = ctx.producer.reply_draft(&lead, &message.body).await;
        lead.put_draft(draft);
    }

    let outcome = match ctx.store.update_lead(&lead).await {
        Ok(()) => ReplyOutcome::Committed,
        Err(e) => {
            error!(lead = %lead.email, error = %e, "Failed to persist reply effects");
            ReplyOutcome::Failed
        }
    };
    release(ctx, &claimer, lead.id, &lead.email).await;
    outcome
}

async fn release(ctx: &EngineContext, claimer: &str, id: Uuid, email: &str) {
    if let Err(e) = ctx.store.release_claim(id, claimer).await {
        warn!(lead = %email, error = %e, "Failed to release claim");
    }
}

async fn mark_seen(ctx: &EngineContext, message: &InboundEmail) {
    if let Some(inbox) = ctx.inbox.as_ref()
        && let Err(e) = inbox.mark_seen(&message.uid).await
    {
        // Worst case the message is reprocessed next poll; reply handling
        // is idempotent enough (a second log entry, same state).
        warn!(uid = %message.uid, error = %e, "Failed to mark message seen");
    }
}
