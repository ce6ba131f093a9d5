//! Lead domain model — engagement state machine types and the conversation log.
//!
//! The engagement state is a single tagged union instead of the usual
//! status + draft_ready + awaiting_reply column trio, so contradictory
//! combinations (a ready draft with no draft fields, awaiting-reply on a
//! closed lead) cannot be constructed in memory. The store encodes and
//! decodes it; everything else works with `Engagement` directly.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle stage of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    New,
    EmailSent,
    FollowupSent,
    Qualified,
    Closed,
    FollowedUp,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::New => "new",
            Stage::EmailSent => "email_sent",
            Stage::FollowupSent => "followup_sent",
            Stage::Qualified => "qualified",
            Stage::Closed => "closed",
            Stage::FollowedUp => "followed_up",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Stage::New),
            "email_sent" => Some(Stage::EmailSent),
            "followup_sent" => Some(Stage::FollowupSent),
            "qualified" => Some(Stage::Qualified),
            "closed" => Some(Stage::Closed),
            "followed_up" => Some(Stage::FollowedUp),
            _ => None,
        }
    }
}

/// What kind of email a draft is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftKind {
    Initial,
    Followup,
    Reply,
}

impl DraftKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DraftKind::Initial => "initial",
            DraftKind::Followup => "followup",
            DraftKind::Reply => "reply",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(DraftKind::Initial),
            "followup" => Some(DraftKind::Followup),
            "reply" => Some(DraftKind::Reply),
            _ => None,
        }
    }
}

/// A generated, not-yet-sent subject/body pair.
///
/// Both fields are non-empty by construction; `new` trims and rejects blanks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    subject: String,
    body: String,
    kind: DraftKind,
}

impl Draft {
    pub fn new(subject: &str, body: &str, kind: DraftKind) -> Option<Self> {
        let subject = subject.trim();
        let body = body.trim();
        if subject.is_empty() || body.is_empty() {
            return None;
        }
        Some(Self {
            subject: subject.to_string(),
            body: body.to_string(),
            kind,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn kind(&self) -> DraftKind {
        self.kind
    }

    /// Replace subject/body (human edit). Blank fields keep the original.
    pub fn edited(&self, subject: Option<&str>, body: Option<&str>) -> Self {
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.subject);
        let body = body
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.body);
        Self {
            subject: subject.to_string(),
            body: body.to_string(),
            kind: self.kind,
        }
    }
}

/// Engagement state of a lead — the two conversation axes (lifecycle stage,
/// pending draft) folded into one union.
#[derive(Debug, Clone, PartialEq)]
pub enum Engagement {
    /// No pending draft, not waiting on our own reply.
    Idle(Stage),
    /// A draft is waiting for the human gate.
    DraftPending { stage: Stage, draft: Draft },
    /// Our AI reply went out; waiting on the lead. Stage is Qualified.
    AwaitingReply { since: DateTime<Utc> },
}

impl Engagement {
    pub fn stage(&self) -> Stage {
        match self {
            Engagement::Idle(stage) => *stage,
            Engagement::DraftPending { stage, .. } => *stage,
            Engagement::AwaitingReply { .. } => Stage::Qualified,
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        match self {
            Engagement::DraftPending { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn has_pending_draft(&self) -> bool {
        matches!(self, Engagement::DraftPending { .. })
    }

    pub fn awaiting_since(&self) -> Option<DateTime<Utc>> {
        match self {
            Engagement::AwaitingReply { since } => Some(*since),
            _ => None,
        }
    }
}

/// Classified purpose of an inbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Interested,
    Pricing,
    CallRequest,
    Question,
    NotInterested,
}

impl Intent {
    /// All labels, used by the classifier for longest-first matching.
    pub const ALL: [Intent; 5] = [
        Intent::Interested,
        Intent::Pricing,
        Intent::CallRequest,
        Intent::Question,
        Intent::NotInterested,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Intent::Interested => "Interested",
            Intent::Pricing => "Pricing",
            Intent::CallRequest => "Call Request",
            Intent::Question => "Question",
            Intent::NotInterested => "Not Interested",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Interested" => Some(Intent::Interested),
            "Pricing" => Some(Intent::Pricing),
            "Call Request" => Some(Intent::CallRequest),
            "Question" => Some(Intent::Question),
            "Not Interested" => Some(Intent::NotInterested),
            _ => None,
        }
    }

    /// Sentiment derived from intent.
    pub fn sentiment(self) -> Sentiment {
        match self {
            Intent::NotInterested => Sentiment::Negative,
            Intent::Interested | Intent::CallRequest => Sentiment::Positive,
            Intent::Pricing | Intent::Question => Sentiment::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

/// A prospective contact and the durable record of interaction with them.
#[derive(Debug, Clone)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    /// Natural key. Validated at ingestion, immutable thereafter.
    pub email: String,
    pub company: String,
    pub industry: String,
    pub pain_points: Option<String>,
    pub conversation_opener: Option<String>,
    pub negotiation_angle: Option<String>,
    pub engagement: Engagement,
    pub sent_by_human: bool,
    pub last_email_sent: Option<DateTime<Utc>>,
    pub last_ai_reply_sent: Option<DateTime<Utc>>,
    pub followup_count: u32,
    pub intent: Option<Intent>,
    pub sentiment: Option<Sentiment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Create a freshly ingested lead.
    pub fn new(name: &str, email: &str, company: &str, industry: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            company: company.to_string(),
            industry: industry.to_string(),
            pain_points: None,
            conversation_opener: None,
            negotiation_angle: None,
            engagement: Engagement::Idle(Stage::New),
            sent_by_human: false,
            last_email_sent: None,
            last_ai_reply_sent: None,
            followup_count: 0,
            intent: None,
            sentiment: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a draft. Refuses if one is already pending — a pending draft is
    /// never overwritten before the human gate consumes it.
    pub fn put_draft(&mut self, draft: Draft) -> bool {
        if self.engagement.has_pending_draft() {
            return false;
        }
        let stage = self.engagement.stage();
        self.engagement = Engagement::DraftPending { stage, draft };
        true
    }

    /// Drop the pending draft and return to the idle stage.
    pub fn clear_draft(&mut self) {
        if let Engagement::DraftPending { stage, .. } = &self.engagement {
            self.engagement = Engagement::Idle(*stage);
        }
    }

    /// Record an inbound reply: intent, sentiment, and the stage transition.
    /// Negative intent closes the lead (and drops any pending draft — a
    /// closed lead gets no further sends); anything else qualifies it, and a
    /// draft that was already pending rides along under the new stage.
    pub fn record_reply(&mut self, intent: Intent, now: DateTime<Utc>) {
        self.intent = Some(intent);
        self.sentiment = Some(intent.sentiment());
        self.last_email_sent = Some(now);
        if intent == Intent::NotInterested {
            self.engagement = Engagement::Idle(Stage::Closed);
        } else if let Engagement::DraftPending { draft, .. } = &self.engagement {
            self.engagement = Engagement::DraftPending {
                stage: Stage::Qualified,
                draft: draft.clone(),
            };
        } else {
            self.engagement = Engagement::Idle(Stage::Qualified);
        }
    }

    /// Record an approved send from the human gate. Transition depends on
    /// what kind of draft went out.
    pub fn record_sent(&mut self, kind: DraftKind, now: DateTime<Utc>) {
        self.sent_by_human = true;
        self.last_email_sent = Some(now);
        self.engagement = match kind {
            DraftKind::Initial => Engagement::Idle(Stage::EmailSent),
            DraftKind::Followup => {
                self.followup_count += 1;
                Engagement::Idle(Stage::FollowupSent)
            }
            DraftKind::Reply => {
                self.last_ai_reply_sent = Some(now);
                Engagement::AwaitingReply { since: now }
            }
        };
    }

    /// Record the auto-sent post-reply nudge.
    pub fn record_post_reply_followup(&mut self, now: DateTime<Utc>) {
        self.followup_count += 1;
        self.last_email_sent = Some(now);
        self.engagement = Engagement::Idle(Stage::FollowedUp);
    }
}

/// Direction/type of a conversation log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Initial,
    Followup,
    Reply,
    AiReply,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Initial => "initial",
            EntryKind::Followup => "followup",
            EntryKind::Reply => "reply",
            EntryKind::AiReply => "ai_reply",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(EntryKind::Initial),
            "followup" => Some(EntryKind::Followup),
            "reply" => Some(EntryKind::Reply),
            "ai_reply" => Some(EntryKind::AiReply),
            _ => None,
        }
    }

    pub fn from_draft(kind: DraftKind) -> Self {
        match kind {
            DraftKind::Initial => EntryKind::Initial,
            DraftKind::Followup => EntryKind::Followup,
            DraftKind::Reply => EntryKind::AiReply,
        }
    }
}

/// Append-only conversation log row. Never updated or deleted.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub kind: EntryKind,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_rejects_blank_fields() {
        assert!(Draft::new("", "body", DraftKind::Initial).is_none());
        assert!(Draft::new("subject", "  ", DraftKind::Initial).is_none());
        assert!(Draft::new(" s ", " b ", DraftKind::Initial).is_some());
    }

    #[test]
    fn draft_trims_on_construction() {
        let d = Draft::new("  Quick note  ", "\nHi there\n", DraftKind::Followup).unwrap();
        assert_eq!(d.subject(), "Quick note");
        assert_eq!(d.body(), "Hi there");
    }

    #[test]
    fn pending_draft_is_never_overwritten() {
        let mut lead = Lead::new("Ada", "ada@example.com", "Analytical", "Computing");
        let first = Draft::new("A", "one", DraftKind::Initial).unwrap();
        let second = Draft::new("B", "two", DraftKind::Initial).unwrap();
        assert!(lead.put_draft(first.clone()));
        assert!(!lead.put_draft(second));
        assert_eq!(lead.engagement.draft(), Some(&first));
    }

    #[test]
    fn stage_codec_round_trips() {
        for stage in [
            Stage::New,
            Stage::EmailSent,
            Stage::FollowupSent,
            Stage::Qualified,
            Stage::Closed,
            Stage::FollowedUp,
        ] {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(Stage::parse("bogus"), None);
    }

    #[test]
    fn intent_labels_round_trip() {
        for intent in Intent::ALL {
            assert_eq!(Intent::parse(intent.label()), Some(intent));
        }
    }

    #[test]
    fn negative_reply_closes_lead() {
        let mut lead = Lead::new("Ada", "ada@example.com", "Analytical", "Computing");
        lead.record_reply(Intent::NotInterested, Utc::now());
        assert_eq!(lead.engagement.stage(), Stage::Closed);
        assert_eq!(lead.sentiment, Some(Sentiment::Negative));
    }

    #[test]
    fn reply_send_enters_awaiting_reply() {
        let mut lead = Lead::new("Ada", "ada@example.com", "Analytical", "Computing");
        lead.record_reply(Intent::Pricing, Utc::now());
        let draft = Draft::new("Re: pricing", "Hi Ada", DraftKind::Reply).unwrap();
        assert!(lead.put_draft(draft));
        let now = Utc::now();
        lead.record_sent(DraftKind::Reply, now);
        assert_eq!(lead.engagement, Engagement::AwaitingReply { since: now });
        assert_eq!(lead.last_ai_reply_sent, Some(now));
        // Reply sends do not count against the follow-up budget.
        assert_eq!(lead.followup_count, 0);
    }

    #[test]
    fn followup_send_bumps_counter() {
        let mut lead = Lead::new("Ada", "ada@example.com", "Analytical", "Computing");
        lead.engagement = Engagement::Idle(Stage::EmailSent);
        let draft = Draft::new("Checking in", "Hi", DraftKind::Followup).unwrap();
        assert!(lead.put_draft(draft));
        lead.record_sent(DraftKind::Followup, Utc::now());
        assert_eq!(lead.engagement.stage(), Stage::FollowupSent);
        assert_eq!(lead.followup_count, 1);
    }
}
