//! The engagement engine — scheduler tasks, reply ingestion, human gate.

pub mod context;
pub mod gate;
pub mod replies;
pub mod tasks;
pub mod ticker;

pub use context::{Engine, EngineContext};
pub use tasks::TaskReport;
pub use ticker::spawn_recurring;
