//! Draft generation — prompts and the never-failing producer.

pub mod producer;
pub mod prompts;

pub use producer::{DraftProducer, parse_subject_body};
pub use prompts::Persona;
