//! Persistence — `LeadStore` trait, libSQL backend, and migrations.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlLeadStore;
pub use migrations::run_migrations;
pub use traits::LeadStore;
