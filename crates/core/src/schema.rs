//! Structured Payload Model
//!
//! The two response shapes the orchestrator negotiates with the backend:
//! a four-phase tutoring turn and a quiz evaluation. Closed-set fields are
//! Rust enums, schema-optional fields are `Option`s, and a parsed payload
//! is rejected (and repaired upstream) rather than permissively defaulted.
//! The JSON schema descriptors sent alongside structured requests live
//! here too, declared literally because they carry enum and range
//! constraints the type definitions alone cannot express.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

// --- Closed vocabularies shared with the backend schema ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptComplexity {
    Basic,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachingMethod {
    StepByStep,
    Analogy,
    ExampleBased,
    Visual,
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizQuestionKind {
    MultipleChoice,
    ShortAnswer,
    TrueFalse,
    Calculation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizDifficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    NeedsReview,
    Progressing,
    Mastered,
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MasteryLevel::NeedsReview => "needs_review",
            MasteryLevel::Progressing => "progressing",
            MasteryLevel::Mastered => "mastered",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequired {
    AnswerQuestion,
    TakeQuiz,
    ExploreTopic,
    PracticeMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    NeedsImprovement,
    RequiresReview,
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PerformanceLevel::Excellent => "excellent",
            PerformanceLevel::Good => "good",
            PerformanceLevel::NeedsImprovement => "needs_improvement",
            PerformanceLevel::RequiresReview => "requires_review",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextDifficulty {
    Easier,
    Same,
    Harder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    ContinueTopic,
    ReviewBasics,
    AdvanceTopic,
    TryDifferentApproach,
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecommendedAction::ContinueTopic => "continue_topic",
            RecommendedAction::ReviewBasics => "review_basics",
            RecommendedAction::AdvanceTopic => "advance_topic",
            RecommendedAction::TryDifferentApproach => "try_different_approach",
        };
        write!(f, "{label}")
    }
}

// --- Tutoring turn ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase1Analysis {
    pub student_level_detected: StudentLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_style_identified: Option<LearningStyle>,
    pub concept_complexity: ConceptComplexity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_knowledge_assessment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase2Teaching {
    pub main_explanation: String,
    pub teaching_method_used: TeachingMethod,
    pub key_concepts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples_provided: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuizQuestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<QuizDifficulty>,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase3Assessment {
    pub check_understanding_question: String,
    pub quiz_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_questions: Option<Vec<QuizQuestion>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase4NextSteps {
    pub mastery_level: MasteryLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_next_topics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_recommendations: Option<Vec<String>>,
    pub follow_up_question: String,
    pub encouragement_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveElements {
    pub has_follow_up: bool,
    pub action_required: ActionRequired,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_level: Option<EngagementLevel>,
}

/// A complete four-phase tutoring response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutoringTurn {
    pub phase_1_analysis: Phase1Analysis,
    pub phase_2_teaching: Phase2Teaching,
    pub phase_3_assessment: Phase3Assessment,
    pub phase_4_next_steps: Phase4NextSteps,
    pub response_text: String,
    pub interactive_elements: InteractiveElements,
}

// --- Quiz evaluation ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAssessment {
    pub overall_score: f64,
    pub performance_level: PerformanceLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strengths_identified: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub areas_for_improvement: Option<Vec<String>>,
    pub detailed_feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveResponse {
    pub next_difficulty_level: NextDifficulty,
    pub reinforcement_needed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics_to_review: Option<Vec<String>>,
    pub ready_for_advancement: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextAction {
    pub recommended_action: RecommendedAction,
    pub follow_up_question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_quiz_available: Option<bool>,
}

/// Adaptive feedback on a student's quiz answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizEvaluation {
    pub quiz_evaluation: QuizAssessment,
    pub adaptive_response: AdaptiveResponse,
    pub response_text: String,
    pub next_action: NextAction,
}

// --- The tagged union ---

/// Either response shape; serializes transparently as the inner payload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StructuredPayload {
    Tutoring(Box<TutoringTurn>),
    Quiz(Box<QuizEvaluation>),
}

impl StructuredPayload {
    /// Parses backend JSON text against the shape selected for this turn.
    pub fn parse(text: &str, is_quiz_reply: bool) -> Result<Self, serde_json::Error> {
        if is_quiz_reply {
            serde_json::from_str::<QuizEvaluation>(text).map(|p| Self::Quiz(Box::new(p)))
        } else {
            serde_json::from_str::<TutoringTurn>(text).map(|p| Self::Tutoring(Box::new(p)))
        }
    }

    pub fn response_text(&self) -> &str {
        match self {
            StructuredPayload::Tutoring(turn) => &turn.response_text,
            StructuredPayload::Quiz(eval) => &eval.response_text,
        }
    }

    /// True when the conversational field would read as empty to a user.
    pub fn has_blank_response_text(&self) -> bool {
        self.response_text().trim().is_empty()
    }

    /// Replaces the conversational field, keeping the rest of the shape.
    pub fn with_response_text(mut self, text: String) -> Self {
        match &mut self {
            StructuredPayload::Tutoring(turn) => turn.response_text = text,
            StructuredPayload::Quiz(eval) => eval.response_text = text,
        }
        self
    }

    /// Mastery label for the output contract; quiz turns carry no mastery
    /// phase and report `progressing`.
    pub fn mastery_label(&self) -> String {
        match self {
            StructuredPayload::Tutoring(turn) => turn.phase_4_next_steps.mastery_level.to_string(),
            StructuredPayload::Quiz(_) => MasteryLevel::Progressing.to_string(),
        }
    }

    pub fn follow_up_question(&self) -> &str {
        match self {
            StructuredPayload::Tutoring(turn) => &turn.phase_4_next_steps.follow_up_question,
            StructuredPayload::Quiz(eval) => &eval.next_action.follow_up_question,
        }
    }

    /// Quiz payloads carry no interactive-elements block and default to
    /// offering a follow-up.
    pub fn has_follow_up(&self) -> bool {
        match self {
            StructuredPayload::Tutoring(turn) => turn.interactive_elements.has_follow_up,
            StructuredPayload::Quiz(_) => true,
        }
    }
}

// --- Schema descriptors sent to the backend ---

/// The structured-output schema for a tutoring turn.
pub fn tutoring_turn_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "phase_1_analysis": {
                "type": "object",
                "properties": {
                    "student_level_detected": {"type": "string", "enum": ["beginner", "intermediate", "advanced"]},
                    "learning_style_identified": {"type": "string", "enum": ["visual", "auditory", "kinesthetic", "reading"]},
                    "concept_complexity": {"type": "string", "enum": ["basic", "moderate", "complex"]},
                    "prior_knowledge_assessment": {"type": "string"}
                },
                "required": ["student_level_detected", "concept_complexity"]
            },
            "phase_2_teaching": {
                "type": "object",
                "properties": {
                    "main_explanation": {"type": "string"},
                    "teaching_method_used": {"type": "string", "enum": ["step_by_step", "analogy", "example_based", "visual", "interactive"]},
                    "key_concepts": {"type": "array", "items": {"type": "string"}},
                    "examples_provided": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["main_explanation", "teaching_method_used", "key_concepts"]
            },
            "phase_3_assessment": {
                "type": "object",
                "properties": {
                    "check_understanding_question": {"type": "string"},
                    "quiz_available": {"type": "boolean"},
                    "quiz_questions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "question": {"type": "string"},
                                "type": {"type": "string", "enum": ["multiple_choice", "short_answer", "true_false", "calculation"]},
                                "difficulty": {"type": "string", "enum": ["easy", "medium", "hard"]},
                                "correct_answer": {"type": "string"},
                                "explanation": {"type": "string"}
                            },
                            "required": ["question", "type", "correct_answer"]
                        }
                    }
                },
                "required": ["check_understanding_question", "quiz_available"]
            },
            "phase_4_next_steps": {
                "type": "object",
                "properties": {
                    "mastery_level": {"type": "string", "enum": ["needs_review", "progressing", "mastered"]},
                    "suggested_next_topics": {"type": "array", "items": {"type": "string"}},
                    "study_recommendations": {"type": "array", "items": {"type": "string"}},
                    "follow_up_question": {"type": "string"},
                    "encouragement_message": {"type": "string"}
                },
                "required": ["mastery_level", "follow_up_question", "encouragement_message"]
            },
            "response_text": {
                "type": "string",
                "description": "The complete conversational response that combines all phases into natural text"
            },
            "interactive_elements": {
                "type": "object",
                "properties": {
                    "has_follow_up": {"type": "boolean"},
                    "action_required": {"type": "string", "enum": ["answer_question", "take_quiz", "explore_topic", "practice_more"]},
                    "engagement_level": {"type": "string", "enum": ["low", "medium", "high"]}
                },
                "required": ["has_follow_up", "action_required"]
            }
        },
        "required": ["phase_1_analysis", "phase_2_teaching", "phase_3_assessment", "phase_4_next_steps", "response_text", "interactive_elements"]
    })
}

/// The structured-output schema for a quiz evaluation.
pub fn quiz_evaluation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "quiz_evaluation": {
                "type": "object",
                "properties": {
                    "overall_score": {"type": "number", "minimum": 0, "maximum": 100},
                    "performance_level": {"type": "string", "enum": ["excellent", "good", "needs_improvement", "requires_review"]},
                    "strengths_identified": {"type": "array", "items": {"type": "string"}},
                    "areas_for_improvement": {"type": "array", "items": {"type": "string"}},
                    "detailed_feedback": {"type": "string"}
                },
                "required": ["overall_score", "performance_level", "detailed_feedback"]
            },
            "adaptive_response": {
                "type": "object",
                "properties": {
                    "next_difficulty_level": {"type": "string", "enum": ["easier", "same", "harder"]},
                    "reinforcement_needed": {"type": "boolean"},
                    "topics_to_review": {"type": "array", "items": {"type": "string"}},
                    "ready_for_advancement": {"type": "boolean"}
                },
                "required": ["next_difficulty_level", "reinforcement_needed", "ready_for_advancement"]
            },
            "response_text": {
                "type": "string",
                "description": "Complete conversational response with feedback and next steps"
            },
            "next_action": {
                "type": "object",
                "properties": {
                    "recommended_action": {"type": "string", "enum": ["continue_topic", "review_basics", "advance_topic", "try_different_approach"]},
                    "follow_up_question": {"type": "string"},
                    "new_quiz_available": {"type": "boolean"}
                },
                "required": ["recommended_action", "follow_up_question"]
            }
        },
        "required": ["quiz_evaluation", "adaptive_response", "response_text", "next_action"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_tutoring_json() -> String {
        json!({
            "phase_1_analysis": {
                "student_level_detected": "intermediate",
                "concept_complexity": "moderate"
            },
            "phase_2_teaching": {
                "main_explanation": "Plants convert light into sugar.",
                "teaching_method_used": "analogy",
                "key_concepts": ["chlorophyll", "glucose", "sunlight"]
            },
            "phase_3_assessment": {
                "check_understanding_question": "What gas do plants release?",
                "quiz_available": true
            },
            "phase_4_next_steps": {
                "mastery_level": "progressing",
                "follow_up_question": "Want to look at the light reactions?",
                "encouragement_message": "Nice question!"
            },
            "response_text": "Photosynthesis turns light into food.",
            "interactive_elements": {
                "has_follow_up": true,
                "action_required": "answer_question"
            }
        })
        .to_string()
    }

    fn sample_quiz_json() -> String {
        json!({
            "quiz_evaluation": {
                "overall_score": 90,
                "performance_level": "excellent",
                "detailed_feedback": "Two of three correct."
            },
            "adaptive_response": {
                "next_difficulty_level": "harder",
                "reinforcement_needed": false,
                "ready_for_advancement": true
            },
            "response_text": "Great work on the quiz!",
            "next_action": {
                "recommended_action": "advance_topic",
                "follow_up_question": "Ready for the next challenge?"
            }
        })
        .to_string()
    }

    #[test]
    fn tutoring_payload_parses_with_optional_fields_absent() {
        let payload = StructuredPayload::parse(&sample_tutoring_json(), false).unwrap();
        assert_eq!(payload.response_text(), "Photosynthesis turns light into food.");
        assert_eq!(payload.mastery_label(), "progressing");
        assert!(payload.has_follow_up());
        match payload {
            StructuredPayload::Tutoring(turn) => {
                assert_eq!(turn.phase_2_teaching.teaching_method_used, TeachingMethod::Analogy);
                assert!(turn.phase_1_analysis.learning_style_identified.is_none());
            }
            StructuredPayload::Quiz(_) => panic!("expected a tutoring payload"),
        }
    }

    #[test]
    fn quiz_payload_parses_and_reports_defaults() {
        let payload = StructuredPayload::parse(&sample_quiz_json(), true).unwrap();
        assert_eq!(payload.mastery_label(), "progressing");
        assert_eq!(payload.follow_up_question(), "Ready for the next challenge?");
        assert!(payload.has_follow_up());
    }

    #[test]
    fn missing_required_section_is_rejected() {
        let mut value: Value = serde_json::from_str(&sample_tutoring_json()).unwrap();
        value.as_object_mut().unwrap().remove("phase_4_next_steps");
        assert!(StructuredPayload::parse(&value.to_string(), false).is_err());
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let mut value: Value = serde_json::from_str(&sample_tutoring_json()).unwrap();
        value["phase_2_teaching"]["teaching_method_used"] = json!("interpretive_dance");
        assert!(StructuredPayload::parse(&value.to_string(), false).is_err());
    }

    #[test]
    fn selected_shape_is_enforced() {
        // A tutoring body does not satisfy the quiz shape.
        assert!(StructuredPayload::parse(&sample_tutoring_json(), true).is_err());
    }

    #[test]
    fn blank_response_text_is_detected() {
        let mut value: Value = serde_json::from_str(&sample_tutoring_json()).unwrap();
        value["response_text"] = json!("   ");
        let payload = StructuredPayload::parse(&value.to_string(), false).unwrap();
        assert!(payload.has_blank_response_text());
    }

    #[test]
    fn with_response_text_replaces_only_the_conversational_field() {
        let payload = StructuredPayload::parse(&sample_tutoring_json(), false).unwrap();
        let replaced = payload.with_response_text("New text.".to_string());
        assert_eq!(replaced.response_text(), "New text.");
        assert_eq!(replaced.mastery_label(), "progressing");
    }

    #[test]
    fn payload_serializes_untagged() {
        let payload = StructuredPayload::parse(&sample_quiz_json(), true).unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("quiz_evaluation").is_some());
        assert!(value.get("Quiz").is_none());
    }

    #[test]
    fn schema_descriptors_declare_the_conversational_field_required() {
        for schema in [tutoring_turn_schema(), quiz_evaluation_schema()] {
            let required: Vec<&str> = schema["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap())
                .collect();
            assert!(required.contains(&"response_text"));
        }
    }
}
