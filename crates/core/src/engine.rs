//! Response Assembly
//!
//! The top-level entry point for one tutoring turn: classify the message,
//! decide whether it answers a quiz, drive the schema-driven generator,
//! summarize the conversation context for the next turn, optionally render
//! speech, and package the externally-visible [`ResponseRecord`]. One
//! [`StudyBuddy`] instance owns the credential pool cursor for its whole
//! lifetime; processing is strictly one message at a time through
//! `&mut self`.

use crate::audio::{AudioArtifact, SpeechRenderer};
use crate::backend::GenerativeBackend;
use crate::config::{Config, ConfigError};
use crate::credentials::CredentialPool;
use crate::generator;
use crate::insight::{self, Insight};
use crate::schema::StructuredPayload;
use chrono::Local;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

const DEFAULT_VOICE: &str = "Kore";

/// Phrases that mark a message as answering a previously posed quiz.
const QUIZ_INDICATORS: &[&str] = &[
    "q1:",
    "q2:",
    "q3:",
    "question 1",
    "question 2",
    "question 3",
    "answer:",
    "my answer",
    "i think",
    "the answer is",
    "format:",
    "quiz",
    "test",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Audio,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::Text => write!(f, "text"),
            MessageType::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for MessageType {
    type Err = std::convert::Infallible;

    /// Anything that is not explicitly audio is treated as a text turn.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("audio") {
            Ok(MessageType::Audio)
        } else {
            Ok(MessageType::Text)
        }
    }
}

/// Per-turn options; only audio turns consult them.
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    pub voice: Option<String>,
    pub file_name: Option<String>,
}

/// One user turn to process.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    pub context: String,
    pub message_type: MessageType,
    pub options: TurnOptions,
}

/// The assembled result of one turn. Serialized field names and presence
/// rules are a stable contract for downstream parsers.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub message_type: MessageType,
    pub response_text: String,
    pub updated_context: String,
    pub text_tokens: u32,
    pub total_tokens: u32,
    pub processing_time_ms: f64,
    pub timestamp: String,
    pub learning_insights: Insight,
    pub structured_data: StructuredPayload,
    pub generation_success: bool,
    pub model_used: String,
    #[serde(flatten)]
    pub audio: Option<AudioArtifact>,
}

/// The adaptive tutoring orchestrator.
pub struct StudyBuddy {
    backend: Arc<dyn GenerativeBackend>,
    pool: CredentialPool,
    text_model: String,
    tts_model: String,
    max_attempts: u32,
    renderer: SpeechRenderer,
}

impl StudyBuddy {
    pub fn new(config: &Config, backend: Arc<dyn GenerativeBackend>) -> Result<Self, ConfigError> {
        let pool = CredentialPool::new(config.credentials.clone())?;
        info!(credentials = pool.len(), model = %config.text_model, "orchestrator ready");
        Ok(Self {
            backend,
            pool,
            text_model: config.text_model.clone(),
            tts_model: config.tts_model.clone(),
            max_attempts: config.max_attempts,
            renderer: SpeechRenderer::new(config.uploads_dir.clone()),
        })
    }

    /// Processes one message start to finish and returns the assembled
    /// record. Never fails at the record level: generation degrades to
    /// fallback payloads and audio degrades to a placeholder artifact.
    pub async fn process(&mut self, request: TurnRequest) -> ResponseRecord {
        let start = Instant::now();

        let insight = insight::extract(&request.message, &request.context);
        let is_quiz_reply = detect_quiz_reply(&request.message);
        info!(
            subject = %insight.subject_area,
            question_type = %insight.question_type,
            is_quiz_reply,
            "processing message"
        );

        let generation = generator::generate(
            self.backend.as_ref(),
            &mut self.pool,
            &self.text_model,
            self.max_attempts,
            &request.message,
            &request.context,
            &insight,
            is_quiz_reply,
        )
        .await;

        let response_text = generation.data.response_text().to_string();
        let updated_context = build_updated_context(&generation.data, &insight);

        let audio = match request.message_type {
            MessageType::Audio => {
                let voice = request
                    .options
                    .voice
                    .clone()
                    .unwrap_or_else(|| DEFAULT_VOICE.to_string());
                let file_name = request
                    .options
                    .file_name
                    .clone()
                    .unwrap_or_else(|| format!("audio_{}", Local::now().timestamp()));
                Some(self.renderer.render(&response_text, &voice, &file_name))
            }
            MessageType::Text => None,
        };

        let text_tokens = generation.tokens_used;
        let audio_tokens = audio.as_ref().map(|a| a.audio_tokens).unwrap_or(0);
        let model_used = match request.message_type {
            MessageType::Audio => self.tts_model.clone(),
            MessageType::Text => self.text_model.clone(),
        };

        ResponseRecord {
            message_type: request.message_type,
            response_text,
            updated_context,
            text_tokens,
            total_tokens: text_tokens + audio_tokens,
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            learning_insights: insight,
            structured_data: generation.data,
            generation_success: generation.success,
            model_used,
            audio,
        }
    }
}

/// Whether the message reads as an answer to a previously posed quiz.
pub fn detect_quiz_reply(message: &str) -> bool {
    let lowered = message.to_lowercase();
    QUIZ_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
}

/// Summarizes the turn into the context string carried into the next one.
fn build_updated_context(payload: &StructuredPayload, insight: &Insight) -> String {
    match payload {
        StructuredPayload::Quiz(eval) => format!(
            "Quiz completed - Performance: {}, Next: {}",
            eval.quiz_evaluation.performance_level, eval.next_action.recommended_action
        ),
        StructuredPayload::Tutoring(turn) => {
            let concepts = &turn.phase_2_teaching.key_concepts;
            let concept_list = if concepts.is_empty() {
                "general topic".to_string()
            } else {
                concepts
                    .iter()
                    .take(3)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!(
                "Discussed: {} | Mastery: {} | Subject: {}",
                concept_list, turn.phase_4_next_steps.mastery_level, insight.subject_area
            )
        }
    }
}
