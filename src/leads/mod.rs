//! Lead domain — state machine model and ingestion feed.

pub mod ingest;
pub mod model;

pub use ingest::{IngestReport, LeadFeed, LeadRecord, ingest_feed, ingest_file};
pub use model::{
    ConversationEntry, Draft, DraftKind, Engagement, EntryKind, Intent, Lead, Sentiment, Stage,
};
