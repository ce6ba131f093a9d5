//! Draft producer — lead + mode in, subject/body draft out.
//!
//! The surface never fails: any generation problem (HTTP error, timeout,
//! missing markers, empty fields) collapses to a fixed mode-specific
//! fallback, so a flaky or unreachable model never stalls the pipeline.

use std::sync::Arc;

use tracing::warn;

use crate::drafting::prompts::{
    self, FOLLOWUP_TEMPERATURE, INITIAL_TEMPERATURE, Persona, REPLY_TEMPERATURE,
};
use crate::leads::model::{Draft, DraftKind, Lead};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Extract the subject/body pair from generated text.
///
/// Marker detection is ASCII case-insensitive. Subject is the text between
/// `SUBJECT:` and the first following `BODY:`; body is everything after that
/// `BODY:`. Both are trimmed and must be non-empty.
pub fn parse_subject_body(content: &str) -> Option<(String, String)> {
    let subject_at = find_marker(content, "SUBJECT:", 0)?;
    let subject_start = subject_at + "SUBJECT:".len();
    let body_at = find_marker(content, "BODY:", subject_start)?;
    let body_start = body_at + "BODY:".len();

    let subject = content[subject_start..body_at].trim();
    let body = content[body_start..].trim();
    if subject.is_empty() || body.is_empty() {
        return None;
    }
    Some((subject.to_string(), body.to_string()))
}

/// ASCII case-insensitive substring search starting at `from`.
///
/// The marker is pure ASCII, so a byte-level match can only start on a UTF-8
/// character boundary.
fn find_marker(haystack: &str, marker: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let m = marker.as_bytes();
    if from + m.len() > h.len() {
        return None;
    }
    (from..=h.len() - m.len()).find(|&i| h[i..i + m.len()].eq_ignore_ascii_case(m))
}

/// Produces drafts by invoking the LLM provider, with fixed fallbacks.
pub struct DraftProducer {
    llm: Arc<dyn LlmProvider>,
    persona: Persona,
}

impl DraftProducer {
    pub fn new(llm: Arc<dyn LlmProvider>, persona: Persona) -> Self {
        Self { llm, persona }
    }

    /// Draft a cold outreach email. `kind` must be `Initial` or `Followup`;
    /// the prompt is shared, only the temperature differs.
    pub async fn outreach_draft(&self, lead: &Lead, kind: DraftKind) -> Draft {
        let temperature = match kind {
            DraftKind::Followup => FOLLOWUP_TEMPERATURE,
            _ => INITIAL_TEMPERATURE,
        };
        let prompt = prompts::outreach_prompt(&self.persona, lead);
        self.generate(lead, kind, prompt, temperature).await
    }

    /// Draft a reply to an inbound email.
    pub async fn reply_draft(&self, lead: &Lead, reply_text: &str) -> Draft {
        let prompt = prompts::reply_prompt(&self.persona, lead, reply_text);
        self.generate(lead, DraftKind::Reply, prompt, REPLY_TEMPERATURE)
            .await
    }

    async fn generate(&self, lead: &Lead, kind: DraftKind, prompt: String, temperature: f32) -> Draft {
        let request = CompletionRequest::new(
            vec![
                ChatMessage::system(prompts::SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
            temperature,
        );

        let draft = match self.llm.complete(request).await {
            Ok(content) => parse_subject_body(&content)
                .and_then(|(subject, body)| Draft::new(&subject, &body, kind)),
            Err(e) => {
                warn!(lead = %lead.email, kind = kind.as_str(), error = %e, "Draft generation failed");
                None
            }
        };

        match draft {
            Some(draft) => draft,
            None => self.fallback(lead, kind),
        }
    }

    fn fallback(&self, lead: &Lead, kind: DraftKind) -> Draft {
        warn!(lead = %lead.email, kind = kind.as_str(), "Using fallback draft copy");
        let (subject, lede) = match kind {
            DraftKind::Reply => (
                "Re: Thanks for your note",
                "Thanks for getting back. I appreciate you sharing your thoughts.",
            ),
            _ => (
                "Quick note",
                "Just wanted to briefly follow up and see if this is relevant at all.",
            ),
        };
        let body = format!("Hi {},\n\n{lede}\n\n{}", lead.name, self.persona.signoff());
        match Draft::new(subject, &body, kind) {
            Some(draft) => draft,
            // Subject and lede are non-empty literals.
            None => unreachable!("fallback draft fields are non-empty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    struct FixedLlm(Result<&'static str, ()>);

    #[async_trait::async_trait]
    impl LlmProvider for FixedLlm {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            self.0
                .map(String::from)
                .map_err(|_| LlmError::RequestFailed("down".into()))
        }
    }

    fn producer(output: Result<&'static str, ()>) -> DraftProducer {
        DraftProducer::new(
            Arc::new(FixedLlm(output)),
            Persona::new("Acme Digital", "Acme builds things."),
        )
    }

    fn lead() -> Lead {
        Lead::new("Ada", "ada@example.com", "Analytical Engines", "Computing")
    }

    #[test]
    fn parses_well_formed_output() {
        let (subject, body) =
            parse_subject_body("SUBJECT:\nAbout your roadmap\n\nBODY:\nHi Ada,\nShort note.").unwrap();
        assert_eq!(subject, "About your roadmap");
        assert_eq!(body, "Hi Ada,\nShort note.");
    }

    #[test]
    fn markers_are_case_insensitive() {
        let (subject, body) = parse_subject_body("subject: Hello\nbody: World").unwrap();
        assert_eq!(subject, "Hello");
        assert_eq!(body, "World");
    }

    #[test]
    fn rejects_missing_or_empty_sections() {
        assert!(parse_subject_body("no markers here").is_none());
        assert!(parse_subject_body("SUBJECT: only a subject").is_none());
        assert!(parse_subject_body("BODY: only a body").is_none());
        assert!(parse_subject_body("SUBJECT:\nBODY: text").is_none());
        assert!(parse_subject_body("SUBJECT: text\nBODY:\n   ").is_none());
    }

    #[test]
    fn body_marker_must_follow_subject_marker() {
        // A BODY: before SUBJECT: is not the section delimiter.
        let (subject, body) = parse_subject_body("BODY: x\nSUBJECT: s\nBODY: real body").unwrap();
        assert_eq!(subject, "s");
        assert_eq!(body, "real body");
    }

    #[tokio::test]
    async fn well_formed_completion_becomes_draft() {
        let p = producer(Ok("SUBJECT:\nRoadmap question\nBODY:\nHi Ada,\n\nBest regards,\nAcme Digital"));
        let draft = p.outreach_draft(&lead(), DraftKind::Initial).await;
        assert_eq!(draft.subject(), "Roadmap question");
        assert_eq!(draft.kind(), DraftKind::Initial);
    }

    #[tokio::test]
    async fn provider_failure_yields_outreach_fallback() {
        let p = producer(Err(()));
        let draft = p.outreach_draft(&lead(), DraftKind::Followup).await;
        assert_eq!(draft.subject(), "Quick note");
        assert!(draft.body().starts_with("Hi Ada,"));
        assert!(draft.body().ends_with("Best regards,\nAcme Digital"));
        assert_eq!(draft.kind(), DraftKind::Followup);
    }

    #[tokio::test]
    async fn malformed_completion_yields_reply_fallback() {
        let p = producer(Ok("I cannot produce that format."));
        let draft = p.reply_draft(&lead(), "What does it cost?").await;
        assert_eq!(draft.subject(), "Re: Thanks for your note");
        assert_eq!(draft.kind(), DraftKind::Reply);
    }
}
