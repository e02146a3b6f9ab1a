use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(Error::UnknownDifficulty(s.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-reported confidence, recorded alongside a review rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl FromStr for Confidence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            _ => Err(Error::UnknownConfidence(s.to_string())),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Completion percent as last persisted; see `progress::subject_progress`.
    pub progress: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub id: String,
    pub subject_id: String,
    pub name: String,
    pub sort_order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctIndex")]
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: String,
}

/// Generated study material attached to a topic. Opaque to the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Vec<QuizQuestion>>,
}

impl TopicContent {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.quiz.is_none()
    }

    /// Quiz questions, empty when the topic has no quiz.
    pub fn questions(&self) -> &[QuizQuestion] {
        self.quiz.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topic {
    pub id: String,
    pub unit_id: String,
    pub name: String,
    pub is_completed: bool,
    pub difficulty: Difficulty,
    pub confidence: Option<Confidence>,
    pub review_count: u32,
    /// Display copy only. Recompute from `difficulty` via
    /// `scheduler::required_reviews` whenever it matters.
    pub required_reviews: u32,
    pub next_review: Option<DateTime<Utc>>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub revision_interval_days: Option<f64>,
    pub sort_order: u32,
    pub notes: String,
    pub content: TopicContent,
}

impl Topic {
    /// A freshly added syllabus entry: unscheduled, never reviewed.
    pub fn new(unit_id: &str, name: &str, difficulty: Difficulty) -> Topic {
        Topic {
            id: uuid::Uuid::new_v4().to_string(),
            unit_id: unit_id.to_string(),
            name: name.to_string(),
            is_completed: false,
            difficulty,
            confidence: None,
            review_count: 0,
            required_reviews: crate::scheduler::required_reviews(difficulty),
            next_review: None,
            last_reviewed: None,
            revision_interval_days: None,
            sort_order: 0,
            notes: String::new(),
            content: TopicContent::default(),
        }
    }
}
