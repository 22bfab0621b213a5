//! Fallback Synthesis
//!
//! The orchestrator's correctness backstop: a deterministic, network-free
//! producer of schema-shaped payloads whose `response_text` is never
//! empty. Every other component may fail; this one must not. The answer
//! content lives in `prompts/` as static templates so it can be extended
//! without touching orchestrator control flow.

use crate::insight::Insight;
use crate::schema::{
    ActionRequired, AdaptiveResponse, ConceptComplexity, InteractiveElements, MasteryLevel,
    NextAction, NextDifficulty, PerformanceLevel, Phase1Analysis, Phase2Teaching, Phase3Assessment,
    Phase4NextSteps, QuizAssessment, QuizEvaluation, RecommendedAction, StructuredPayload,
    StudentLevel, TeachingMethod, TutoringTurn,
};

const QUIZ_TEMPLATE: &str = include_str!("../prompts/fallback_quiz.md");
const GENERIC_TEMPLATE: &str = include_str!("../prompts/fallback_generic.md");
const PHOTOSYNTHESIS_ANSWER: &str = include_str!("../prompts/fallback_photosynthesis.md");

/// How much of the message is quoted back as the topic snippet.
const TOPIC_SNIPPET_CHARS: usize = 50;

/// Builds a replacement payload for a turn the backend could not serve.
pub fn synthesize(message: &str, insight: &Insight, is_quiz_reply: bool) -> StructuredPayload {
    if is_quiz_reply {
        quiz_payload(insight)
    } else {
        tutoring_payload(message, insight)
    }
}

fn quiz_payload(insight: &Insight) -> StructuredPayload {
    let subject = insight.subject_area.to_string();
    let response_text = QUIZ_TEMPLATE.trim_end().replace("{subject}", &subject);

    StructuredPayload::Quiz(Box::new(QuizEvaluation {
        quiz_evaluation: QuizAssessment {
            overall_score: 75.0,
            performance_level: PerformanceLevel::Good,
            strengths_identified: None,
            areas_for_improvement: None,
            detailed_feedback: "You're making good progress! Let's review the key concepts together."
                .to_string(),
        },
        adaptive_response: AdaptiveResponse {
            next_difficulty_level: NextDifficulty::Same,
            reinforcement_needed: true,
            topics_to_review: None,
            ready_for_advancement: false,
        },
        response_text,
        next_action: NextAction {
            recommended_action: RecommendedAction::ReviewBasics,
            follow_up_question: "Which question gave you the most trouble?".to_string(),
            new_quiz_available: Some(false),
        },
    }))
}

fn tutoring_payload(message: &str, insight: &Insight) -> StructuredPayload {
    let subject = insight.subject_area.to_string();
    let topic_snippet: String = message
        .chars()
        .take(TOPIC_SNIPPET_CHARS)
        .collect::<String>()
        .to_lowercase();

    // The one pre-written answer: a canned explainer, not a knowledge engine.
    let response_text = if topic_snippet.contains("photosynthesis") {
        PHOTOSYNTHESIS_ANSWER.trim_end().to_string()
    } else {
        GENERIC_TEMPLATE
            .trim_end()
            .replace("{topic}", &topic_snippet)
            .replace("{subject}", &subject)
    };

    StructuredPayload::Tutoring(Box::new(TutoringTurn {
        phase_1_analysis: Phase1Analysis {
            student_level_detected: StudentLevel::Intermediate,
            learning_style_identified: None,
            concept_complexity: ConceptComplexity::Moderate,
            prior_knowledge_assessment: None,
        },
        phase_2_teaching: Phase2Teaching {
            main_explanation: format!(
                "This is a fascinating {subject} topic that I'm excited to help you understand!"
            ),
            teaching_method_used: TeachingMethod::StepByStep,
            key_concepts: vec![
                topic_snippet.clone(),
                format!("{subject} fundamentals"),
                "practical applications".to_string(),
            ],
            examples_provided: None,
        },
        phase_3_assessment: Phase3Assessment {
            check_understanding_question: "Does this explanation make sense so far?".to_string(),
            quiz_available: true,
            quiz_questions: Some(Vec::new()),
        },
        phase_4_next_steps: Phase4NextSteps {
            mastery_level: MasteryLevel::Progressing,
            suggested_next_topics: None,
            study_recommendations: None,
            follow_up_question: format!(
                "What specific aspect of {topic_snippet} would you like to explore next?"
            ),
            encouragement_message: "You're asking great questions! Keep that curiosity going!"
                .to_string(),
        },
        response_text,
        interactive_elements: InteractiveElements {
            has_follow_up: true,
            action_required: ActionRequired::AnswerQuestion,
            engagement_level: None,
        },
    }))
}
