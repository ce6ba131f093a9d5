//! Prompt construction for outreach and reply drafts.
//!
//! The prompts are deterministic: persona + fixed house-style rules + the
//! lead's profile fields, with a strict `SUBJECT:`/`BODY:` output contract
//! the producer parses against.

use crate::leads::model::Lead;

/// System message for every generation call.
pub const SYSTEM_PROMPT: &str = "You generate structured emails.";

pub const INITIAL_TEMPERATURE: f32 = 0.35;
pub const FOLLOWUP_TEMPERATURE: f32 = 0.3;
pub const REPLY_TEMPERATURE: f32 = 0.2;

/// Sender identity woven into every prompt and sign-off.
#[derive(Debug, Clone)]
pub struct Persona {
    /// Company name used in the sign-off.
    pub company: String,
    /// Internal positioning blurb the model may draw on but never quote.
    pub blurb: String,
}

impl Persona {
    pub fn new(company: impl Into<String>, blurb: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            blurb: blurb.into(),
        }
    }

    /// The exact sign-off every email must end with.
    pub fn signoff(&self) -> String {
        format!("Best regards,\n{}", self.company)
    }
}

/// Cold-outreach prompt, shared by initial and follow-up drafts.
pub fn outreach_prompt(persona: &Persona, lead: &Lead) -> String {
    format!(
        r#"You are a senior B2B outreach copywriter writing on behalf of {company}.

GOAL:
Write a calm, thoughtful cold email (60-80 words) as a 1-to-1 relevance check, not a pitch.

TONE:
- Professional, human, grounded
- Neutral and non-salesy
- No hype, no marketing language

ABOUT {company} (INTERNAL CONTEXT, DO NOT QUOTE):
{blurb}

TENSION RULES:
- Imply ONLY ONE situational tension
- Derive it ONLY from the internal context below
- Never assume it applies to the recipient
- Frame it as something teams in similar environments often think about
- If context is weak or empty, use a neutral, widely applicable tension
- Mention the tension subtly in ONE short sentence

COMPANY CONTEXT USAGE RULE:
- Use company context only to sound credible and relevant
- NEVER list services or technologies
- NEVER position {company} as a vendor or provider
- At most one subtle capability may be implied, only if it naturally aligns with the lead's industry
- It is acceptable to not reference the company's work at all

FORMAT (STRICT):
Return output in EXACTLY this format:

SUBJECT:
<3-5 word curiosity-driven subject reflecting the tension>

BODY:
<email body>

STRUCTURE RULES:
- Include a brief neutral greeting (e.g. "Hi <Name>," or "Hope you're having a good week at <Company>.")
- Greeting does NOT count as the opening line
- Opening line: max 1 sentence, observational, neutral
- Short paragraphs (1-2 lines)
- Short, clear sentences

STYLE CONSTRAINTS:
- 60-80 words total
- No flattery, metrics, bold claims, service lists
- Do NOT use these words: pain, problem, challenge, issue, struggle, need, solution

CTA:
- Optional, max 1 sentence
- Low-pressure (e.g. "If you're open, we could schedule a quick 10-minute chat.")

NAMING & SIGNATURE:
- Mention {company} at most once
- End exactly with:

{signoff}

Lead:
Name: {name}
Company: {lead_company}
Industry: {industry}

Internal context (do not quote, may be empty):
{pain_points}

Additional internal guidance (DO NOT QUOTE OR PARAPHRASE DIRECTLY):
- Conversation opener (tone reference only):
{opener}

- Negotiation angle (strategic framing only):
{angle}

IMPORTANT:
Never reuse or closely paraphrase the conversation opener text.
Use it only to understand the lead's role, context, and sensitivity."#,
        company = persona.company,
        blurb = persona.blurb,
        signoff = persona.signoff(),
        name = lead.name,
        lead_company = lead.company,
        industry = lead.industry,
        pain_points = lead.pain_points.as_deref().unwrap_or(""),
        opener = lead.conversation_opener.as_deref().unwrap_or(""),
        angle = lead.negotiation_angle.as_deref().unwrap_or(""),
    )
}

/// Prompt for replying to an inbound email.
pub fn reply_prompt(persona: &Persona, lead: &Lead, reply_text: &str) -> String {
    format!(
        r#"You are replying to an inbound email.

STRICT OUTPUT CONTRACT:
Return ONLY in this format:

SUBJECT:
<subject>

BODY:
<body>

Rules:
- Under 90 words
- Respect intent
- No selling
- Start with: Hi {name},
- End exactly with:

{signoff}

Lead:
Name: {name}
Company: {company}

Reply:
"""
{reply_text}
""""#,
        name = lead.name,
        company = lead.company,
        signoff = persona.signoff(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead() -> Lead {
        let mut l = Lead::new("Ada", "ada@example.com", "Analytical Engines", "Computing");
        l.pain_points = Some("slow builds".into());
        l
    }

    #[test]
    fn outreach_prompt_embeds_lead_and_persona() {
        let persona = Persona::new("Acme Digital", "Acme builds things.");
        let prompt = outreach_prompt(&persona, &lead());
        assert!(prompt.contains("Analytical Engines"));
        assert!(prompt.contains("slow builds"));
        assert!(prompt.contains("Best regards,\nAcme Digital"));
        assert!(prompt.contains("SUBJECT:"));
        assert!(prompt.contains("BODY:"));
    }

    #[test]
    fn reply_prompt_quotes_the_reply() {
        let persona = Persona::new("Acme Digital", "Acme builds things.");
        let prompt = reply_prompt(&persona, &lead(), "What does this cost?");
        assert!(prompt.contains("What does this cost?"));
        assert!(prompt.contains("Hi Ada,"));
    }
}
