//! libSQL backend — async `LeadStore` implementation.
//!
//! Supports local file and in-memory databases. Timestamps are stored as
//! RFC 3339 text; claims are single conditional UPDATEs so concurrent
//! claimers cannot intersect even over one shared connection.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::leads::model::{
    ConversationEntry, Draft, DraftKind, Engagement, EntryKind, Intent, Lead, Sentiment, Stage,
};
use crate::store::migrations;
use crate::store::traits::LeadStore;

/// libSQL lead store.
///
/// Holds a single connection reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlLeadStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlLeadStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Pool(format!("Failed to create database directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Lead store opened");

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Select all rows currently claimed by `claimer`.
    async fn leads_claimed_by(&self, claimer: &str) -> Result<Vec<Lead>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {LEAD_COLUMNS} FROM leads WHERE claimed_by = ?1 ORDER BY created_at ASC"
                ),
                params![claimer],
            )
            .await
            .map_err(|e| StoreError::Query(format!("leads_claimed_by: {e}")))?;

        let mut leads = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_lead(&row) {
                Ok(lead) => leads.push(lead),
                Err(e) => tracing::warn!("Skipping lead row: {e}"),
            }
        }
        Ok(leads)
    }

    /// Run a claim UPDATE and return the rows it stamped.
    async fn claim_where(
        &self,
        claimer: &str,
        lease: Duration,
        predicate: &str,
        extra: Vec<libsql::Value>,
    ) -> Result<Vec<Lead>, StoreError> {
        let now = Utc::now();
        let until = now + chrono::Duration::from_std(lease).unwrap_or(chrono::Duration::zero());

        let mut values: Vec<libsql::Value> = vec![
            libsql::Value::Text(claimer.to_string()),
            libsql::Value::Text(until.to_rfc3339()),
            libsql::Value::Text(now.to_rfc3339()),
        ];
        values.extend(extra);

        let sql = format!(
            "UPDATE leads SET claimed_by = ?1, claimed_until = ?2
             WHERE {predicate}
               AND (claimed_by IS NULL OR claimed_until IS NULL OR claimed_until <= ?3)"
        );

        let claimed = self
            .conn()
            .execute(&sql, values)
            .await
            .map_err(|e| StoreError::Query(format!("claim: {e}")))?;

        if claimed == 0 {
            return Ok(Vec::new());
        }
        self.leads_claimed_by(claimer).await
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

/// Convert `Option<String>` to a libsql Value.
fn opt_text(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

/// Column order for lead SELECTs. `row_to_lead` indexes into this.
const LEAD_COLUMNS: &str = "id, name, email, company, industry, pain_points, conversation_opener, \
     negotiation_angle, stage, draft_subject, draft_body, draft_kind, awaiting_since, \
     sent_by_human, last_email_sent, last_ai_reply_sent, followup_count, intent, sentiment, \
     created_at, updated_at";

/// Decode the engagement union from its stored columns.
///
/// Precedence: awaiting_since → AwaitingReply; draft columns → DraftPending;
/// otherwise Idle. Tolerates half-written legacy rows by that order.
fn decode_engagement(
    id: Uuid,
    stage_str: &str,
    draft_subject: Option<String>,
    draft_body: Option<String>,
    draft_kind: Option<String>,
    awaiting_since: Option<String>,
) -> Result<Engagement, StoreError> {
    let stage = Stage::parse(stage_str).ok_or_else(|| StoreError::InvalidState {
        id,
        reason: format!("unknown stage '{stage_str}'"),
    })?;

    if let Some(since) = awaiting_since {
        return Ok(Engagement::AwaitingReply {
            since: parse_datetime(&since),
        });
    }

    if let (Some(subject), Some(body), Some(kind_str)) = (draft_subject, draft_body, draft_kind) {
        let kind = DraftKind::parse(&kind_str).ok_or_else(|| StoreError::InvalidState {
            id,
            reason: format!("unknown draft kind '{kind_str}'"),
        })?;
        let draft = Draft::new(&subject, &body, kind).ok_or_else(|| StoreError::InvalidState {
            id,
            reason: "empty draft fields".to_string(),
        })?;
        return Ok(Engagement::DraftPending { stage, draft });
    }

    Ok(Engagement::Idle(stage))
}

/// Encode the engagement union into its stored columns:
/// (stage, draft_subject, draft_body, draft_kind, awaiting_since).
fn encode_engagement(
    engagement: &Engagement,
) -> (
    &'static str,
    libsql::Value,
    libsql::Value,
    libsql::Value,
    libsql::Value,
) {
    match engagement {
        Engagement::Idle(stage) => (
            stage.as_str(),
            libsql::Value::Null,
            libsql::Value::Null,
            libsql::Value::Null,
            libsql::Value::Null,
        ),
        Engagement::DraftPending { stage, draft } => (
            stage.as_str(),
            libsql::Value::Text(draft.subject().to_string()),
            libsql::Value::Text(draft.body().to_string()),
            libsql::Value::Text(draft.kind().as_str().to_string()),
            libsql::Value::Null,
        ),
        Engagement::AwaitingReply { since } => (
            Stage::Qualified.as_str(),
            libsql::Value::Null,
            libsql::Value::Null,
            libsql::Value::Null,
            libsql::Value::Text(since.to_rfc3339()),
        ),
    }
}

/// Map a libsql row (in LEAD_COLUMNS order) to a Lead.
fn row_to_lead(row: &libsql::Row) -> Result<Lead, StoreError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| StoreError::Query(format!("lead id column: {e}")))?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| StoreError::Query(format!("lead id '{id_str}': {e}")))?;

    let stage_str: String = row.get(8).unwrap_or_else(|_| "new".into());
    let draft_subject: Option<String> = row.get(9).ok();
    let draft_body: Option<String> = row.get(10).ok();
    let draft_kind: Option<String> = row.get(11).ok();
    let awaiting_since: Option<String> = row.get(12).ok();

    let engagement = decode_engagement(
        id,
        &stage_str,
        draft_subject,
        draft_body,
        draft_kind,
        awaiting_since,
    )?;

    let last_email_sent: Option<String> = row.get(14).ok();
    let last_ai_reply_sent: Option<String> = row.get(15).ok();
    let intent_str: Option<String> = row.get(17).ok();
    let sentiment_str: Option<String> = row.get(18).ok();
    let created_str: String = row.get(19).unwrap_or_default();
    let updated_str: String = row.get(20).unwrap_or_default();

    Ok(Lead {
        id,
        name: row.get(1).unwrap_or_default(),
        email: row
            .get(2)
            .map_err(|e| StoreError::Query(format!("lead email column: {e}")))?,
        company: row.get(3).unwrap_or_default(),
        industry: row.get(4).unwrap_or_default(),
        pain_points: row.get(5).ok(),
        conversation_opener: row.get(6).ok(),
        negotiation_angle: row.get(7).ok(),
        engagement,
        sent_by_human: row.get::<i64>(13).unwrap_or(0) != 0,
        last_email_sent: parse_optional_datetime(&last_email_sent),
        last_ai_reply_sent: parse_optional_datetime(&last_ai_reply_sent),
        followup_count: row.get::<i64>(16).unwrap_or(0).max(0) as u32,
        intent: intent_str.as_deref().and_then(Intent::parse),
        sentiment: sentiment_str.as_deref().and_then(Sentiment::parse),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

fn row_to_entry(row: &libsql::Row) -> Result<ConversationEntry, StoreError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| StoreError::Query(format!("entry id column: {e}")))?;
    let lead_id_str: String = row
        .get(1)
        .map_err(|e| StoreError::Query(format!("entry lead_id column: {e}")))?;
    let kind_str: String = row.get(2).unwrap_or_default();
    let created_str: String = row.get(5).unwrap_or_default();

    Ok(ConversationEntry {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        lead_id: Uuid::parse_str(&lead_id_str).unwrap_or_else(|_| Uuid::nil()),
        kind: EntryKind::parse(&kind_str).unwrap_or(EntryKind::Reply),
        subject: row.get(3).unwrap_or_default(),
        body: row.get(4).unwrap_or_default(),
        created_at: parse_datetime(&created_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl LeadStore for LibSqlLeadStore {
    async fn insert_lead(&self, lead: &Lead) -> Result<(), StoreError> {
        let (stage, draft_subject, draft_body, draft_kind, awaiting_since) =
            encode_engagement(&lead.engagement);

        let result = self
            .conn()
            .execute(
                "INSERT INTO leads (id, name, email, company, industry, pain_points,
                    conversation_opener, negotiation_angle, stage, draft_subject, draft_body,
                    draft_kind, awaiting_since, sent_by_human, last_email_sent,
                    last_ai_reply_sent, followup_count, intent, sentiment, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21)",
                params![
                    lead.id.to_string(),
                    lead.name.clone(),
                    lead.email.clone(),
                    lead.company.clone(),
                    lead.industry.clone(),
                    opt_text(lead.pain_points.clone()),
                    opt_text(lead.conversation_opener.clone()),
                    opt_text(lead.negotiation_angle.clone()),
                    stage,
                    draft_subject,
                    draft_body,
                    draft_kind,
                    awaiting_since,
                    lead.sent_by_human as i64,
                    opt_text(lead.last_email_sent.map(|t| t.to_rfc3339())),
                    opt_text(lead.last_ai_reply_sent.map(|t| t.to_rfc3339())),
                    lead.followup_count as i64,
                    opt_text(lead.intent.map(|i| i.label().to_string())),
                    opt_text(lead.sentiment.map(|s| s.as_str().to_string())),
                    lead.created_at.to_rfc3339(),
                    lead.updated_at.to_rfc3339(),
                ],
            )
            .await;

        match result {
            Ok(_) => {
                debug!(lead = %lead.email, "Lead inserted");
                Ok(())
            }
            Err(e) if e.to_string().contains("UNIQUE") => {
                Err(StoreError::Constraint(format!("duplicate email {}", lead.email)))
            }
            Err(e) => Err(StoreError::Query(format!("insert_lead: {e}"))),
        }
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get_lead: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_lead(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get_lead: {e}"))),
        }
    }

    async fn get_lead_by_email(&self, email: &str) -> Result<Option<Lead>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE email = ?1"),
                params![email],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get_lead_by_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_lead(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get_lead_by_email: {e}"))),
        }
    }

    async fn list_leads(&self) -> Result<Vec<Lead>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at ASC"),
                (),
            )
            .await
            .map_err(|e| StoreError::Query(format!("list_leads: {e}")))?;

        let mut leads = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_lead(&row) {
                Ok(lead) => leads.push(lead),
                Err(e) => tracing::warn!("Skipping lead row: {e}"),
            }
        }
        Ok(leads)
    }

    async fn update_lead(&self, lead: &Lead) -> Result<(), StoreError> {
        let (stage, draft_subject, draft_body, draft_kind, awaiting_since) =
            encode_engagement(&lead.engagement);
        let now = Utc::now().to_rfc3339();

        // Email is the natural key and immutable — deliberately not updated.
        let changed = self
            .conn()
            .execute(
                "UPDATE leads SET name = ?1, company = ?2, industry = ?3, pain_points = ?4,
                    conversation_opener = ?5, negotiation_angle = ?6, stage = ?7,
                    draft_subject = ?8, draft_body = ?9, draft_kind = ?10, awaiting_since = ?11,
                    sent_by_human = ?12, last_email_sent = ?13, last_ai_reply_sent = ?14,
                    followup_count = ?15, intent = ?16, sentiment = ?17, updated_at = ?18
                 WHERE id = ?19",
                params![
                    lead.name.clone(),
                    lead.company.clone(),
                    lead.industry.clone(),
                    opt_text(lead.pain_points.clone()),
                    opt_text(lead.conversation_opener.clone()),
                    opt_text(lead.negotiation_angle.clone()),
                    stage,
                    draft_subject,
                    draft_body,
                    draft_kind,
                    awaiting_since,
                    lead.sent_by_human as i64,
                    opt_text(lead.last_email_sent.map(|t| t.to_rfc3339())),
                    opt_text(lead.last_ai_reply_sent.map(|t| t.to_rfc3339())),
                    lead.followup_count as i64,
                    opt_text(lead.intent.map(|i| i.label().to_string())),
                    opt_text(lead.sentiment.map(|s| s.as_str().to_string())),
                    now,
                    lead.id.to_string(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("update_lead: {e}")))?;

        if changed == 0 {
            return Err(StoreError::NotFound(lead.id.to_string()));
        }
        Ok(())
    }

    // ── Claims ──────────────────────────────────────────────────────

    async fn claim_new_leads(
        &self,
        claimer: &str,
        lease: Duration,
    ) -> Result<Vec<Lead>, StoreError> {
        self.claim_where(
            claimer,
            lease,
            "stage = 'new' AND draft_subject IS NULL AND awaiting_since IS NULL",
            Vec::new(),
        )
        .await
    }

    async fn claim_followup_candidates(
        &self,
        claimer: &str,
        max_followups: u32,
        lease: Duration,
    ) -> Result<Vec<Lead>, StoreError> {
        self.claim_where(
            claimer,
            lease,
            "stage IN ('email_sent', 'followup_sent') AND last_email_sent IS NOT NULL
               AND followup_count < ?4 AND draft_subject IS NULL AND awaiting_since IS NULL",
            vec![libsql::Value::Integer(max_followups as i64)],
        )
        .await
    }

    async fn claim_awaiting_reply(
        &self,
        claimer: &str,
        lease: Duration,
    ) -> Result<Vec<Lead>, StoreError> {
        self.claim_where(
            claimer,
            lease,
            "awaiting_since IS NOT NULL AND last_ai_reply_sent IS NOT NULL
               AND stage = 'qualified'",
            Vec::new(),
        )
        .await
    }

    async fn claim_lead_by_email(
        &self,
        claimer: &str,
        email: &str,
        lease: Duration,
    ) -> Result<Option<Lead>, StoreError> {
        let leads = self
            .claim_where(
                claimer,
                lease,
                "email = ?4",
                vec![libsql::Value::Text(email.to_string())],
            )
            .await?;
        Ok(leads.into_iter().next())
    }

    async fn claim_lead_by_id(
        &self,
        claimer: &str,
        id: Uuid,
        lease: Duration,
    ) -> Result<Option<Lead>, StoreError> {
        let leads = self
            .claim_where(
                claimer,
                lease,
                "id = ?4",
                vec![libsql::Value::Text(id.to_string())],
            )
            .await?;
        Ok(leads.into_iter().next())
    }

    async fn release_claim(&self, id: Uuid, claimer: &str) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE leads SET claimed_by = NULL, claimed_until = NULL
                 WHERE id = ?1 AND claimed_by = ?2",
                params![id.to_string(), claimer],
            )
            .await
            .map_err(|e| StoreError::Query(format!("release_claim: {e}")))?;
        Ok(())
    }

    // ── Conversation log ────────────────────────────────────────────

    async fn append_entry(
        &self,
        lead_id: Uuid,
        kind: EntryKind,
        subject: &str,
        body: &str,
    ) -> Result<ConversationEntry, StoreError> {
        let entry = ConversationEntry {
            id: Uuid::new_v4(),
            lead_id,
            kind,
            subject: subject.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };

        self.conn()
            .execute(
                "INSERT INTO conversation_log (id, lead_id, kind, subject, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.id.to_string(),
                    entry.lead_id.to_string(),
                    entry.kind.as_str(),
                    entry.subject.clone(),
                    entry.body.clone(),
                    entry.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("append_entry: {e}")))?;

        debug!(lead_id = %lead_id, kind = kind.as_str(), "Conversation entry appended");
        Ok(entry)
    }

    async fn list_entries(&self, lead_id: Uuid) -> Result<Vec<ConversationEntry>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, lead_id, kind, subject, body, created_at FROM conversation_log
                 WHERE lead_id = ?1 ORDER BY created_at ASC",
                params![lead_id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("list_entries: {e}")))?;

        let mut entries = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_entry(&row) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping log row: {e}"),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_secs(120);

    async fn store() -> LibSqlLeadStore {
        LibSqlLeadStore::new_memory().await.unwrap()
    }

    fn lead(email: &str) -> Lead {
        Lead::new("Test", email, "TestCo", "Testing")
    }

    #[tokio::test]
    async fn local_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outreach.db");
        {
            let store = LibSqlLeadStore::new_local(&path).await.unwrap();
            store.insert_lead(&lead("persist@example.com")).await.unwrap();
        }
        let store = LibSqlLeadStore::new_local(&path).await.unwrap();
        let fetched = store
            .get_lead_by_email("persist@example.com")
            .await
            .unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let store = store().await;
        let mut l = lead("a@example.com");
        l.pain_points = Some("A, B".into());
        store.insert_lead(&l).await.unwrap();

        let fetched = store.get_lead(l.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "a@example.com");
        assert_eq!(fetched.pain_points.as_deref(), Some("A, B"));
        assert_eq!(fetched.engagement, Engagement::Idle(Stage::New));

        let by_email = store.get_lead_by_email("a@example.com").await.unwrap();
        assert_eq!(by_email.unwrap().id, l.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_constraint_violation() {
        let store = store().await;
        store.insert_lead(&lead("dup@example.com")).await.unwrap();
        let err = store.insert_lead(&lead("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn engagement_states_round_trip() {
        let store = store().await;

        let mut pending = lead("pending@example.com");
        let draft = Draft::new("Subject", "Body", DraftKind::Initial).unwrap();
        assert!(pending.put_draft(draft.clone()));
        store.insert_lead(&pending).await.unwrap();
        let fetched = store.get_lead(pending.id).await.unwrap().unwrap();
        assert_eq!(fetched.engagement.draft(), Some(&draft));
        assert_eq!(fetched.engagement.stage(), Stage::New);

        let mut awaiting = lead("awaiting@example.com");
        let since = Utc::now();
        awaiting.engagement = Engagement::AwaitingReply { since };
        awaiting.last_ai_reply_sent = Some(since);
        store.insert_lead(&awaiting).await.unwrap();
        let fetched = store.get_lead(awaiting.id).await.unwrap().unwrap();
        assert_eq!(fetched.engagement.stage(), Stage::Qualified);
        assert!(fetched.engagement.awaiting_since().is_some());
    }

    #[tokio::test]
    async fn concurrent_claimers_never_intersect() {
        let store = store().await;
        for i in 0..3 {
            store
                .insert_lead(&lead(&format!("lead{i}@example.com")))
                .await
                .unwrap();
        }

        let first = store.claim_new_leads("claimer-a", LEASE).await.unwrap();
        let second = store.claim_new_leads("claimer-b", LEASE).await.unwrap();

        assert_eq!(first.len(), 3);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn expired_lease_is_reclaimable() {
        let store = store().await;
        store.insert_lead(&lead("x@example.com")).await.unwrap();

        let first = store
            .claim_new_leads("claimer-a", Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = store.claim_new_leads("claimer-b", LEASE).await.unwrap();
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn release_makes_lead_claimable_again() {
        let store = store().await;
        let l = lead("y@example.com");
        store.insert_lead(&l).await.unwrap();

        let claimed = store.claim_new_leads("claimer-a", LEASE).await.unwrap();
        assert_eq!(claimed.len(), 1);
        store.release_claim(l.id, "claimer-a").await.unwrap();

        let reclaimed = store.claim_new_leads("claimer-b", LEASE).await.unwrap();
        assert_eq!(reclaimed.len(), 1);
    }

    #[tokio::test]
    async fn followup_budget_excludes_exhausted_leads() {
        let store = store().await;

        let mut eligible = lead("eligible@example.com");
        eligible.engagement = Engagement::Idle(Stage::EmailSent);
        eligible.last_email_sent = Some(Utc::now());
        eligible.followup_count = 2;
        store.insert_lead(&eligible).await.unwrap();

        let mut exhausted = lead("exhausted@example.com");
        exhausted.engagement = Engagement::Idle(Stage::FollowupSent);
        exhausted.last_email_sent = Some(Utc::now());
        exhausted.followup_count = 3;
        store.insert_lead(&exhausted).await.unwrap();

        let claimed = store
            .claim_followup_candidates("claimer", 3, LEASE)
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].email, "eligible@example.com");
    }

    #[tokio::test]
    async fn pending_draft_excluded_from_followup_claim() {
        let store = store().await;

        let mut l = lead("drafted@example.com");
        l.engagement = Engagement::Idle(Stage::EmailSent);
        l.last_email_sent = Some(Utc::now());
        l.put_draft(Draft::new("S", "B", DraftKind::Followup).unwrap());
        store.insert_lead(&l).await.unwrap();

        let claimed = store
            .claim_followup_candidates("claimer", 3, LEASE)
            .await
            .unwrap();
        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn claim_by_email_respects_foreign_claims() {
        let store = store().await;
        let l = lead("z@example.com");
        store.insert_lead(&l).await.unwrap();

        let first = store
            .claim_lead_by_email("claimer-a", "z@example.com", LEASE)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .claim_lead_by_email("claimer-b", "z@example.com", LEASE)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn conversation_log_is_append_only_timeline() {
        let store = store().await;
        let l = lead("log@example.com");
        store.insert_lead(&l).await.unwrap();

        store
            .append_entry(l.id, EntryKind::Initial, "Hello", "First email")
            .await
            .unwrap();
        store
            .append_entry(l.id, EntryKind::Reply, "Re: Hello", "A reply")
            .await
            .unwrap();

        let entries = store.list_entries(l.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, EntryKind::Initial);
        assert_eq!(entries[1].kind, EntryKind::Reply);
    }

    #[tokio::test]
    async fn update_persists_state_transition() {
        let store = store().await;
        let mut l = lead("t@example.com");
        store.insert_lead(&l).await.unwrap();

        l.put_draft(Draft::new("Quick note", "Hi", DraftKind::Initial).unwrap());
        store.update_lead(&l).await.unwrap();

        let fetched = store.get_lead(l.id).await.unwrap().unwrap();
        assert!(fetched.engagement.has_pending_draft());

        let mut fetched = fetched;
        fetched.record_sent(DraftKind::Initial, Utc::now());
        store.update_lead(&fetched).await.unwrap();

        let again = store.get_lead(l.id).await.unwrap().unwrap();
        assert_eq!(again.engagement, Engagement::Idle(Stage::EmailSent));
        assert!(again.sent_by_human);
    }
}
