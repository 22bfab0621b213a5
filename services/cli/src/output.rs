//! Line-Oriented Output Contract
//!
//! Renders a [`ResponseRecord`] as the `key: value` lines downstream
//! integrations parse. Key names, ordering, and the audio- vs text-turn
//! tails must not change without coordinating with those consumers.

use studybuddy_core::engine::{MessageType, ResponseRecord};

/// Formats the record as the stable line protocol.
pub fn format_record(record: &ResponseRecord) -> String {
    let mut lines = vec![
        format!("message_type: {}", record.message_type),
        format!("response_text: {}", record.response_text),
        format!("updated_context: {}", record.updated_context),
        format!("total_tokens: {}", record.total_tokens),
        format!("processing_time_ms: {:.2}", record.processing_time_ms),
        format!("timestamp: {}", record.timestamp),
        format!("generation_success: {}", record.generation_success),
        format!("mastery_level: {}", record.structured_data.mastery_label()),
        format!(
            "follow_up_question: {}",
            record.structured_data.follow_up_question()
        ),
        format!("has_follow_up: {}", record.structured_data.has_follow_up()),
    ];

    match (&record.message_type, &record.audio) {
        (MessageType::Audio, Some(audio)) => {
            lines.push(format!("audio_file: {}", audio.audio_file));
            lines.push(format!("audio_tokens: {}", audio.audio_tokens));
            lines.push(format!("text_tokens: {}", record.text_tokens));
            lines.push(format!("voice_used: {}", audio.voice_used));
            lines.push(format!("duration_seconds: {}", audio.duration_seconds));
        }
        _ => {
            lines.push(format!("model_used: {}", record.model_used));
            // For text-only turns the text tokens are the total.
            lines.push(format!("text_tokens: {}", record.total_tokens));
        }
    }

    lines.join("\n")
}

pub fn print_record(record: &ResponseRecord) {
    println!("{}", format_record(record));
}

#[cfg(test)]
mod tests {
    use super::*;
    use studybuddy_core::audio::AudioArtifact;
    use studybuddy_core::engine::MessageType;
    use studybuddy_core::{fallback, insight};

    fn sample_record(
        message_type: MessageType,
        audio: Option<AudioArtifact>,
    ) -> ResponseRecord {
        let message = "Explain photosynthesis";
        let learning_insights = insight::extract(message, "");
        // Single-line text keeps the line-indexed assertions below honest.
        let structured_data = fallback::synthesize(message, &learning_insights, false)
            .with_response_text("Photosynthesis turns light into food.".to_string());
        ResponseRecord {
            message_type,
            response_text: structured_data.response_text().to_string(),
            updated_context: "Discussed: plants | Mastery: progressing | Subject: science"
                .to_string(),
            text_tokens: 120,
            total_tokens: 120 + audio.as_ref().map(|a| a.audio_tokens).unwrap_or(0),
            processing_time_ms: 12.3456,
            timestamp: "2025-01-15 10:30:00".to_string(),
            learning_insights,
            structured_data,
            generation_success: true,
            model_used: "gemini-2.0-flash-exp".to_string(),
            audio,
        }
    }

    #[test]
    fn text_turns_end_with_model_and_total_as_text_tokens() {
        let output = format_record(&sample_record(MessageType::Text, None));
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "message_type: text");
        assert_eq!(lines[3], "total_tokens: 120");
        assert_eq!(lines[4], "processing_time_ms: 12.35");
        assert_eq!(lines[7], "mastery_level: progressing");
        assert_eq!(lines[9], "has_follow_up: true");
        assert_eq!(lines[10], "model_used: gemini-2.0-flash-exp");
        assert_eq!(lines[11], "text_tokens: 120");
        assert!(!output.contains("audio_file:"));
    }

    #[test]
    fn audio_turns_carry_the_artifact_tail() {
        let artifact = AudioArtifact {
            audio_file: "uploads/answer.wav".to_string(),
            voice_used: "Kore".to_string(),
            audio_tokens: 30,
            duration_seconds: 3,
        };
        let output = format_record(&sample_record(MessageType::Audio, Some(artifact)));
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "message_type: audio");
        assert_eq!(lines[3], "total_tokens: 150");
        assert_eq!(lines[10], "audio_file: uploads/answer.wav");
        assert_eq!(lines[11], "audio_tokens: 30");
        assert_eq!(lines[12], "text_tokens: 120");
        assert_eq!(lines[13], "voice_used: Kore");
        assert_eq!(lines[14], "duration_seconds: 3");
        assert!(!output.contains("model_used:"));
    }

    #[test]
    fn key_order_is_stable() {
        let output = format_record(&sample_record(MessageType::Text, None));
        let keys: Vec<&str> = output
            .lines()
            .map(|line| line.split(':').next().unwrap())
            .collect();
        assert_eq!(
            keys,
            vec![
                "message_type",
                "response_text",
                "updated_context",
                "total_tokens",
                "processing_time_ms",
                "timestamp",
                "generation_success",
                "mastery_level",
                "follow_up_question",
                "has_follow_up",
                "model_used",
                "text_tokens",
            ]
        );
    }
}
