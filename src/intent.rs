//! Reply intent classification.
//!
//! Five-label closed taxonomy, classified by the LLM at temperature 0 and
//! matched against the model text by substring. The classifier never fails:
//! empty input, transport errors, and unrecognized output all collapse to
//! the safe default `Question`.

use std::sync::Arc;

use tracing::warn;

use crate::leads::model::Intent;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

const SYSTEM_PROMPT: &str = "You classify email intent.";
const CLASSIFY_TEMPERATURE: f32 = 0.0;

/// Classifies inbound reply text into an `Intent`.
pub struct IntentClassifier {
    llm: Arc<dyn LlmProvider>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Classify a reply. Blank input short-circuits to `Question` without a
    /// network call.
    pub async fn classify(&self, text: &str) -> Intent {
        if text.trim().is_empty() {
            return Intent::Question;
        }

        let prompt = format!(
            r#"You are an email intent classifier.

Allowed labels (return EXACTLY one):
- Interested
- Pricing
- Call Request
- Question
- Not Interested

Reply text:
{text}

Return only the label."#
        );

        let request = CompletionRequest::new(
            vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
            CLASSIFY_TEMPERATURE,
        );

        match self.llm.complete(request).await {
            Ok(content) => match_label(&content),
            Err(e) => {
                warn!(error = %e, "Intent classification failed, defaulting to Question");
                Intent::Question
            }
        }
    }
}

/// Map model output to a label by substring match.
///
/// "not interested" is checked first, because "interested" is a substring of
/// it. Remaining labels match longest-first for the same reason.
fn match_label(content: &str) -> Intent {
    let content = content.trim().to_lowercase();

    if content.contains("not interested") {
        return Intent::NotInterested;
    }

    let mut labels: Vec<Intent> = Intent::ALL.to_vec();
    labels.sort_by_key(|i| std::cmp::Reverse(i.label().len()));
    for intent in labels {
        if content.contains(&intent.label().to_lowercase()) {
            return intent;
        }
    }

    warn!(output = %content, "Unknown intent output, defaulting to Question");
    Intent::Question
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

    fn classifier(output: Result<&'static str, ()>) -> IntentClassifier {
        IntentClassifier::new(Arc::new(FixedLlm(output)))
    }

    #[test]
    fn not_interested_beats_interested_substring() {
        assert_eq!(match_label("Not Interested"), Intent::NotInterested);
        assert_eq!(
            match_label("The sender is clearly not interested."),
            Intent::NotInterested
        );
    }

    #[test]
    fn plain_labels_match_case_insensitively() {
        assert_eq!(match_label("INTERESTED"), Intent::Interested);
        assert_eq!(match_label("pricing"), Intent::Pricing);
        assert_eq!(match_label("Call Request"), Intent::CallRequest);
        assert_eq!(match_label("  Question  "), Intent::Question);
    }

    #[test]
    fn chatty_output_still_matches() {
        assert_eq!(
            match_label("The label is: Call Request."),
            Intent::CallRequest
        );
    }

    #[test]
    fn unknown_output_defaults_to_question() {
        assert_eq!(match_label("no idea"), Intent::Question);
    }

    #[tokio::test]
    async fn blank_reply_is_question_without_a_call() {
        // The provider would fail if invoked.
        let c = classifier(Err(()));
        assert_eq!(c.classify("   ").await, Intent::Question);
    }

    #[tokio::test]
    async fn provider_failure_defaults_to_question() {
        let c = classifier(Err(()));
        assert_eq!(c.classify("What's the pricing?").await, Intent::Question);
    }

    #[tokio::test]
    async fn classifies_via_provider() {
        let c = classifier(Ok("Pricing"));
        assert_eq!(c.classify("How much does it cost?").await, Intent::Pricing);
    }
}
