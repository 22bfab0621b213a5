//! Schema-Driven Generation
//!
//! Builds the backend prompt from an insight and conversation context,
//! requests structured output against the selected schema, and walks the
//! degradation cascade when the backend cannot comply: structured JSON,
//! then free text wrapped in a fallback shape, then a fully synthetic
//! payload. Whatever happens, the returned result carries a well-formed,
//! non-empty payload.

use crate::backend::{BackendError, GenerationRequest, GenerativeBackend};
use crate::credentials::CredentialPool;
use crate::fallback;
use crate::insight::Insight;
use crate::retry::call_with_retry;
use crate::schema::{StructuredPayload, quiz_evaluation_schema, tutoring_turn_schema};
use tracing::{error, warn};

const TUTORING_SYSTEM_TEMPLATE: &str = include_str!("../prompts/tutoring_system.md");
const QUIZ_SYSTEM_TEMPLATE: &str = include_str!("../prompts/quiz_system.md");

/// Words-to-tokens multiplier used whenever the backend does not report
/// usage metadata. A rough deterministic proxy, not a tokenizer.
const TOKENS_PER_WORD: u32 = 3;

/// Outcome of one generation: the payload is always present and always
/// schema-shaped, even when `success` is false.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub success: bool,
    pub data: StructuredPayload,
    pub tokens_used: u32,
    pub error: Option<String>,
}

/// Estimates a token count from whitespace-separated word count.
pub fn estimate_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32 * TOKENS_PER_WORD
}

fn build_system_prompt(insight: &Insight, context: &str, is_quiz_reply: bool) -> String {
    let template = if is_quiz_reply {
        QUIZ_SYSTEM_TEMPLATE
    } else {
        TUTORING_SYSTEM_TEMPLATE
    };
    template
        .replace("{subject_area}", &insight.subject_area.to_string())
        .replace("{question_type}", &insight.question_type.to_string())
        .replace("{difficulty_level}", &insight.difficulty_level.to_string())
        .replace("{confidence_level}", &insight.confidence_level)
        .replace("{context}", context)
}

fn structured_prompt(system_prompt: &str, message: &str) -> String {
    format!(
        "{system_prompt}\n\nStudent Message: {message}\n\n\
         IMPORTANT: Provide a complete JSON response following the schema.\n\
         The 'response_text' field must contain a full conversational response that naturally incorporates:\n\
         - A clear explanation of the topic\n\
         - Engaging examples or analogies\n\
         - A follow-up question to check understanding\n\
         - Encouraging tone throughout\n\n\
         Make it sound like a knowledgeable, friendly tutor having a natural conversation."
    )
}

fn freeform_prompt(system_prompt: &str, message: &str) -> String {
    format!(
        "{system_prompt}\n\nStudent Message: {message}\n\n\
         Please provide a comprehensive response about this topic. \
         Be engaging, clear, and educational."
    )
}

/// Generates a structured response for one message.
///
/// Tiers, in order: structured output validated against the selected
/// schema; a parsed payload with a blank conversational field repaired in
/// place from the fallback synthesizer (reported token usage retained);
/// a free-text retry wrapped in a fallback-shaped payload; and finally a
/// fully synthetic payload with `success = false`.
pub async fn generate(
    backend: &dyn GenerativeBackend,
    pool: &mut CredentialPool,
    model: &str,
    max_attempts: u32,
    message: &str,
    context: &str,
    insight: &Insight,
    is_quiz_reply: bool,
) -> GenerationResult {
    let system_prompt = build_system_prompt(insight, context, is_quiz_reply);
    let schema = if is_quiz_reply {
        quiz_evaluation_schema()
    } else {
        tutoring_turn_schema()
    };

    let structured_request = GenerationRequest {
        model: model.to_string(),
        prompt: structured_prompt(&system_prompt, message),
        response_schema: Some(schema),
    };

    let structured_failure: BackendError = match call_with_retry(pool, max_attempts, |credential| {
        let request = structured_request.clone();
        async move { backend.generate(&credential, &request).await }
    })
    .await
    {
        Ok(response) => match StructuredPayload::parse(&response.text, is_quiz_reply) {
            Ok(payload) => {
                let tokens_used = response
                    .total_tokens
                    .unwrap_or_else(|| estimate_tokens(message));
                let data = if payload.has_blank_response_text() {
                    warn!("structured payload arrived with blank response_text, repairing locally");
                    fallback::synthesize(message, insight, is_quiz_reply)
                } else {
                    payload
                };
                return GenerationResult {
                    success: true,
                    data,
                    tokens_used,
                    error: None,
                };
            }
            Err(parse_err) => {
                warn!(error = %parse_err, "structured payload failed validation, degrading to free text");
                BackendError::InvalidResponse(parse_err.to_string())
            }
        },
        Err(err) => {
            warn!(error = %err, "structured generation failed, degrading to free text");
            err
        }
    };

    let freeform_request = GenerationRequest {
        model: model.to_string(),
        prompt: freeform_prompt(&system_prompt, message),
        response_schema: None,
    };

    match call_with_retry(pool, max_attempts, |credential| {
        let request = freeform_request.clone();
        async move { backend.generate(&credential, &request).await }
    })
    .await
    {
        Ok(response) => {
            let tokens_used = response
                .total_tokens
                .unwrap_or_else(|| estimate_tokens(message));
            let data = fallback::synthesize(message, insight, is_quiz_reply);
            // An empty free-text reply must not defeat the non-empty
            // response invariant.
            let data = if response.text.trim().is_empty() {
                data
            } else {
                data.with_response_text(response.text)
            };
            GenerationResult {
                success: true,
                data,
                tokens_used,
                error: None,
            }
        }
        Err(freeform_err) => {
            error!(
                structured = %structured_failure,
                freeform = %freeform_err,
                "all generation attempts failed, using synthetic fallback"
            );
            let data = fallback::synthesize(message, insight, is_quiz_reply);
            let tokens_used = estimate_tokens(data.response_text());
            GenerationResult {
                success: false,
                data,
                tokens_used,
                error: Some(format!(
                    "structured attempt: {structured_failure}; free-text attempt: {freeform_err}"
                )),
            }
        }
    }
}
