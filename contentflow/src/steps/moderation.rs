//! Moderation step and verdict parsing.

use super::{Step, StepOutput};
use crate::capabilities::{TextGenerator, TextRequest};
use crate::state::{ModerationResult, PipelineState};
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::info;

const SYSTEM_PROMPT: &str =
    "You are a content moderator ensuring brand consistency, factual accuracy, and compliance.";
const DEFAULT_GUIDELINES: &str = "Professional, friendly, value-focused.";

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*_]*STATUS[*_]*:[\s*_]*(APPROVED|REJECTED)(?:_|\b)").expect("valid regex")
});

static SECTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?ims)^[\s*_]*REASON[*_]*:[\s*_]*(.*?)[\s*_]*",
        r"(?:^[\s*_]*SUGGESTIONS[*_]*:[\s*_]*(.*?)[\s*_]*)?\z",
    ))
    .expect("valid regex")
});

/// Parses a moderator reply of the form
///
/// ```text
/// STATUS: APPROVED or REJECTED
/// REASON: ...
/// SUGGESTIONS: ...
/// ```
///
/// Labels and values may carry markdown emphasis (`**STATUS:** APPROVED`).
/// A reply with no recognisable `STATUS:` line is treated as rejected.
/// When no `REASON:` section is present the whole reply becomes the reason.
#[must_use]
pub fn parse_verdict(reply: &str) -> ModerationResult {
    let approved = STATUS_RE
        .captures(reply)
        .and_then(|c| c.get(1))
        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("APPROVED"));

    let (reason, suggestions) = match SECTIONS_RE.captures(reply) {
        Some(caps) => (
            caps.get(1).map_or("", |m| m.as_str()).to_string(),
            caps.get(2).map_or("", |m| m.as_str()).to_string(),
        ),
        None => (reply.trim().to_string(), String::new()),
    };

    let suggestions = if approved {
        String::new()
    } else if suggestions.is_empty() {
        reason.clone()
    } else {
        suggestions
    };

    ModerationResult {
        approved,
        reason,
        suggestions,
    }
}

/// Reviews the copy and writes `moderation_result` and `approved`.
pub struct ModerationStep {
    text: Arc<dyn TextGenerator>,
}

impl ModerationStep {
    /// Creates the step over a text generator.
    pub fn new(text: Arc<dyn TextGenerator>) -> Self {
        Self { text }
    }
}

impl fmt::Debug for ModerationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModerationStep").finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for ModerationStep {
    fn name(&self) -> &str {
        "moderation"
    }

    async fn execute(&self, mut state: PipelineState) -> StepOutput {
        let Some(content) = state.content.as_ref() else {
            return StepOutput::fail(state, "Moderation error: no content");
        };

        let guidelines = state
            .business_context
            .brand_guidelines
            .as_deref()
            .filter(|g| !g.is_empty())
            .unwrap_or(DEFAULT_GUIDELINES);

        let request = TextRequest::new(
            SYSTEM_PROMPT,
            format!(
                "Review this social media content:\n\n\
                 Content: {}\n\nBrand Guidelines: {guidelines}\n\n\
                 Check for:\n\
                 1. Brand consistency (tone, style, messaging)\n\
                 2. Factual accuracy\n\
                 3. Stop words or inappropriate content\n\
                 4. Platform guidelines compliance\n\
                 5. Overall quality\n\n\
                 Respond in this format:\n\
                 STATUS: APPROVED or REJECTED\n\
                 REASON: [detailed explanation]\n\
                 SUGGESTIONS: [if rejected, provide improvement suggestions]",
                content.text
            ),
        );

        match self.text.generate(&request).await {
            Ok(reply) => {
                let verdict = parse_verdict(&reply);
                info!(approved = verdict.approved, "Moderation verdict");
                state.approved = verdict.approved;
                state.moderation_result = Some(verdict);
                StepOutput::proceed(state)
            }
            Err(e) => StepOutput::fail(state, format!("Moderation error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::MockTextGenerator;
    use crate::state::{BusinessContext, Content, Platform};
    use pretty_assertions::assert_eq;

    fn written() -> PipelineState {
        let mut state = PipelineState::new(
            BusinessContext::new("Acme", "Retail").with_brand_guidelines("No slang"),
        );
        state.content = Some(Content {
            text: "Big savings, fam!".to_string(),
            variations: Vec::new(),
            platform: Platform::Telegram,
            theme: "general".to_string(),
        });
        state
    }

    #[test]
    fn test_parse_approved() {
        let verdict = parse_verdict("STATUS: APPROVED\nREASON: On brand and accurate.");
        assert_eq!(
            verdict,
            ModerationResult {
                approved: true,
                reason: "On brand and accurate.".to_string(),
                suggestions: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_rejected_with_suggestions() {
        let verdict = parse_verdict(
            "STATUS: REJECTED\nREASON: Uses slang.\nSUGGESTIONS: Replace 'fam' with 'friends'.",
        );
        assert!(!verdict.approved);
        assert_eq!(verdict.reason, "Uses slang.");
        assert_eq!(verdict.suggestions, "Replace 'fam' with 'friends'.");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert!(parse_verdict("status: approved").approved);
    }

    #[test]
    fn test_parse_bold_label() {
        let verdict = parse_verdict("**STATUS:** APPROVED\n**REASON:** Fine.");
        assert!(verdict.approved);
        assert_eq!(verdict.reason, "Fine.");
    }

    #[test]
    fn test_parse_bold_value() {
        assert!(parse_verdict("STATUS: **APPROVED**\nREASON: Fine.").approved);
        assert!(parse_verdict("__STATUS__: _APPROVED_").approved);
    }

    #[test]
    fn test_parse_bold_rejection_keeps_sections() {
        let verdict = parse_verdict(
            "**STATUS:** **REJECTED**\n**REASON:** Too pushy.\n**SUGGESTIONS:** Soften the call to action.",
        );
        assert!(!verdict.approved);
        assert_eq!(verdict.reason, "Too pushy.");
        assert_eq!(verdict.suggestions, "Soften the call to action.");
    }

    #[test]
    fn test_parse_mentions_are_not_a_status() {
        let verdict = parse_verdict("This would be APPROVED if it had no slang.");
        assert!(!verdict.approved);
        assert_eq!(verdict.reason, "This would be APPROVED if it had no slang.");
        assert_eq!(verdict.suggestions, verdict.reason);
    }

    #[tokio::test]
    async fn test_rejection_sets_state() {
        let mut text = MockTextGenerator::new();
        text.expect_generate()
            .withf(|req| req.user.contains("Brand Guidelines: No slang") && req.user.contains("fam!"))
            .returning(|_| Ok("STATUS: REJECTED\nREASON: Slang.\nSUGGESTIONS: Drop 'fam'.".to_string()));

        let output = ModerationStep::new(Arc::new(text)).execute(written()).await;
        assert!(output.is_success());
        assert!(!output.state.approved);
        assert_eq!(output.state.moderation_result.unwrap().suggestions, "Drop 'fam'.");
    }

    #[tokio::test]
    async fn test_approval_sets_state() {
        let mut text = MockTextGenerator::new();
        text.expect_generate()
            .returning(|_| Ok("STATUS: APPROVED\nREASON: Fine.".to_string()));

        let output = ModerationStep::new(Arc::new(text)).execute(written()).await;
        assert!(output.state.approved);
    }

    #[tokio::test]
    async fn test_missing_content_fails() {
        let mut text = MockTextGenerator::new();
        text.expect_generate().never();

        let state = PipelineState::new(BusinessContext::new("Acme", "Retail"));
        let output = ModerationStep::new(Arc::new(text)).execute(state).await;
        assert!(!output.is_success());
        assert!(!output.state.approved);
    }
}
