//! Message Classification
//!
//! A deterministic, network-free classifier that maps one user message to
//! the lightweight [`Insight`] record used to tailor prompt construction.
//! Matching is case-insensitive substring search against fixed keyword
//! tables; the tables are configuration data, not logic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phrases that mark a question as analytical (and therefore harder).
const ANALYTICAL_INDICATORS: &[&str] = &["explain", "how", "why", "what if", "compare", "analyze"];

/// Phrases that mark a question as a request for a definition.
const DEFINITIONAL_INDICATORS: &[&str] = &["definition", "what is", "meaning"];

/// Subject keyword table. Declaration order is the tie-break: the first
/// category with a matching keyword wins.
const SUBJECT_KEYWORDS: &[(SubjectArea, &[&str])] = &[
    (
        SubjectArea::Math,
        &[
            "equation",
            "solve",
            "calculate",
            "formula",
            "graph",
            "algebra",
            "geometry",
            "calculus",
            "trigonometry",
        ],
    ),
    (
        SubjectArea::Science,
        &[
            "experiment",
            "hypothesis",
            "molecule",
            "cell",
            "reaction",
            "physics",
            "chemistry",
            "biology",
            "atom",
            "energy",
            "photosynthesis",
        ],
    ),
    (
        SubjectArea::History,
        &[
            "war",
            "revolution",
            "empire",
            "ancient",
            "timeline",
            "civilization",
            "century",
            "historical",
        ],
    ),
    (
        SubjectArea::Literature,
        &[
            "poem",
            "novel",
            "author",
            "character",
            "theme",
            "analysis",
            "story",
            "narrative",
        ],
    ),
    (
        SubjectArea::Language,
        &[
            "grammar",
            "vocabulary",
            "sentence",
            "verb",
            "noun",
            "adjective",
            "syntax",
        ],
    ),
    (
        SubjectArea::ComputerScience,
        &[
            "programming",
            "algorithm",
            "code",
            "function",
            "variable",
            "loop",
            "data structure",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectArea {
    Math,
    Science,
    History,
    Literature,
    Language,
    ComputerScience,
    General,
}

impl fmt::Display for SubjectArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubjectArea::Math => "math",
            SubjectArea::Science => "science",
            SubjectArea::History => "history",
            SubjectArea::Literature => "literature",
            SubjectArea::Language => "language",
            SubjectArea::ComputerScience => "computer_science",
            SubjectArea::General => "general",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Analytical,
    Definitional,
    Conceptual,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuestionType::Analytical => "analytical",
            QuestionType::Definitional => "definitional",
            QuestionType::Conceptual => "conceptual",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DifficultyLevel::Low => "low",
            DifficultyLevel::Medium => "medium",
            DifficultyLevel::High => "high",
        };
        write!(f, "{label}")
    }
}

/// The classification of a single user message.
///
/// Produced fresh per message and never persisted by the orchestrator;
/// it only steers prompt construction and fallback content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub subject_area: SubjectArea,
    pub question_type: QuestionType,
    pub difficulty_level: DifficultyLevel,
    pub learning_style: String,
    pub confidence_level: String,
    pub needs_reinforcement: Vec<String>,
}

/// Classifies a user message into an [`Insight`].
///
/// The conversation context is part of the contract but does not currently
/// influence classification.
pub fn extract(message: &str, _context: &str) -> Insight {
    let lowered = message.to_lowercase();

    let (question_type, difficulty_level) = if ANALYTICAL_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
    {
        (QuestionType::Analytical, DifficultyLevel::High)
    } else if DEFINITIONAL_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
    {
        (QuestionType::Definitional, DifficultyLevel::Low)
    } else {
        (QuestionType::Conceptual, DifficultyLevel::Medium)
    };

    let subject_area = SUBJECT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(subject, _)| *subject)
        .unwrap_or(SubjectArea::General);

    Insight {
        subject_area,
        question_type,
        difficulty_level,
        learning_style: "mixed".to_string(),
        confidence_level: "moderate".to_string(),
        needs_reinforcement: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytical_science_question() {
        let insight = extract("Explain how photosynthesis works", "");
        assert_eq!(insight.question_type, QuestionType::Analytical);
        assert_eq!(insight.difficulty_level, DifficultyLevel::High);
        assert_eq!(insight.subject_area, SubjectArea::Science);
    }

    #[test]
    fn definitional_language_question() {
        // "noun" lands in the language table before any later category.
        let insight = extract("What is a noun?", "");
        assert_eq!(insight.question_type, QuestionType::Definitional);
        assert_eq!(insight.difficulty_level, DifficultyLevel::Low);
        assert_eq!(insight.subject_area, SubjectArea::Language);
    }

    #[test]
    fn conceptual_fallback_for_plain_statements() {
        let insight = extract("gravity pulls things down", "");
        assert_eq!(insight.question_type, QuestionType::Conceptual);
        assert_eq!(insight.difficulty_level, DifficultyLevel::Medium);
        assert_eq!(insight.subject_area, SubjectArea::General);
    }

    #[test]
    fn analytical_indicators_win_over_definitional() {
        // "explain" appears before "what is" is even considered.
        let insight = extract("Explain what is meant by momentum", "");
        assert_eq!(insight.question_type, QuestionType::Analytical);
    }

    #[test]
    fn earlier_declared_subject_wins_ties() {
        // "calculate" (math) and "energy" (science) both match; math is
        // declared first.
        let insight = extract("calculate the energy of the ball", "");
        assert_eq!(insight.subject_area, SubjectArea::Math);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let insight = extract("EXPLAIN PHYSICS", "");
        assert_eq!(insight.question_type, QuestionType::Analytical);
        assert_eq!(insight.subject_area, SubjectArea::Science);
    }

    #[test]
    fn empty_message_yields_the_defaults() {
        let insight = extract("", "");
        assert_eq!(insight.subject_area, SubjectArea::General);
        assert_eq!(insight.question_type, QuestionType::Conceptual);
        assert_eq!(insight.difficulty_level, DifficultyLevel::Medium);
        assert_eq!(insight.learning_style, "mixed");
        assert_eq!(insight.confidence_level, "moderate");
        assert!(insight.needs_reinforcement.is_empty());
    }

    #[test]
    fn insight_serializes_with_snake_case_fields() {
        let insight = extract("Explain how algebra works", "");
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["subject_area"], "math");
        assert_eq!(json["question_type"], "analytical");
        assert_eq!(json["difficulty_level"], "high");
    }
}
