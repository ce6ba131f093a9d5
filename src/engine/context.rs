//! Engine wiring — shared context and task lifecycle.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::EngineSettings;
use crate::drafting::DraftProducer;
use crate::engine::ticker::spawn_recurring;
use crate::engine::{replies, tasks};
use crate::intent::IntentClassifier;
use crate::mail::{Inbox, Mailer};
use crate::store::LeadStore;

/// Everything the scheduler tasks and the human gate share.
///
/// `mailer` and `inbox` are optional: without outbound mail the gate and the
/// post-reply nudge are disabled, without an inbox the reply poll is.
pub struct EngineContext {
    pub store: Arc<dyn LeadStore>,
    pub producer: DraftProducer,
    pub classifier: IntentClassifier,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub inbox: Option<Arc<dyn Inbox>>,
    pub settings: EngineSettings,
}

/// The running engine: four recurring tasks over one shared context.
pub struct Engine {
    ctx: Arc<EngineContext>,
    handles: Vec<JoinHandle<()>>,
}

impl Engine {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            handles: Vec::new(),
        }
    }

    pub fn context(&self) -> Arc<EngineContext> {
        Arc::clone(&self.ctx)
    }

    /// Spawn the recurring tasks. Idempotent only in the sense that calling
    /// it twice would double the tasks; call once.
    pub fn start(&mut self) {
        let settings = self.ctx.settings.clone();

        let ctx = Arc::clone(&self.ctx);
        self.handles.push(spawn_recurring(
            "initial-drafts",
            settings.initial_draft_period,
            move || {
                let ctx = Arc::clone(&ctx);
                async move {
                    tasks::initial_draft_cycle(&ctx).await;
                }
            },
        ));

        let ctx = Arc::clone(&self.ctx);
        self.handles.push(spawn_recurring(
            "followup-drafts",
            settings.followup_period,
            move || {
                let ctx = Arc::clone(&ctx);
                async move {
                    tasks::followup_cycle(&ctx).await;
                }
            },
        ));

        if self.ctx.mailer.is_some() {
            let ctx = Arc::clone(&self.ctx);
            self.handles.push(spawn_recurring(
                "post-reply-nudges",
                settings.post_reply_period,
                move || {
                    let ctx = Arc::clone(&ctx);
                    async move {
                        tasks::post_reply_cycle(&ctx).await;
                    }
                },
            ));
        } else {
            info!("Outbound mail not configured, post-reply nudges disabled");
        }

        if self.ctx.inbox.is_some() {
            let ctx = Arc::clone(&self.ctx);
            self.handles.push(spawn_recurring(
                "reply-poll",
                settings.reply_poll_period,
                move || {
                    let ctx = Arc::clone(&ctx);
                    async move {
                        replies::poll_replies(&ctx).await;
                    }
                },
            ));
        } else {
            info!("Inbox not configured, reply polling disabled");
        }

        info!(tasks = self.handles.len(), "Engine started");
    }

    /// Abort all recurring tasks.
    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}
