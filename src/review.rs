use chrono::{DateTime, TimeZone, Utc};

use crate::scheduler::{self, ReviewOutcome};
use crate::store::Library;
use crate::topic::{Confidence, Difficulty, QuizQuestion, Topic};

pub struct ReviewItem {
    pub topic_id: String,
    pub title: String,
    pub notes_display: String,
    pub progress_display: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SubjectSummary {
    pub id: String,
    pub name: String,
    pub color: String,
    pub total: usize,
    pub due: usize,
    pub upcoming: usize,
    pub mastered: usize,
}

/// Badge shown next to a topic in the review list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewStatus {
    pub text: String,
    pub urgent: bool,
    pub overdue: bool,
}

/// Counters for one sitting of reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSession {
    pub reviewed: u32,
    pub mastered: u32,
}

impl ReviewSession {
    /// Starts a session; `mastered` is the number of topics already mastered.
    pub fn new(mastered: u32) -> ReviewSession {
        ReviewSession {
            reviewed: 0,
            mastered,
        }
    }

    pub fn record(&mut self, outcome: &ReviewOutcome) {
        self.reviewed += 1;
        if outcome.newly_mastered {
            self.mastered += 1;
        }
    }
}

/// Result of answering a topic's quiz before rating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
}

impl QuizScore {
    pub fn verdict(&self) -> &'static str {
        if self.correct >= self.total {
            "Perfect!"
        } else if self.correct * 2 >= self.total {
            "Good job!"
        } else {
            "Keep practicing!"
        }
    }
}

/// Scores `answers` against the quiz. A missing answer counts as wrong.
pub fn score_quiz(quiz: &[QuizQuestion], answers: &[Option<usize>]) -> QuizScore {
    let correct = quiz
        .iter()
        .enumerate()
        .filter(|(i, q)| answers.get(*i).copied().flatten() == Some(q.correct_index))
        .count();
    QuizScore {
        correct,
        total: quiz.len(),
    }
}

/// Applies one finished review to `topic` and returns what was written.
pub fn record_review(
    topic: &mut Topic,
    difficulty: Difficulty,
    confidence: Option<Confidence>,
    now: DateTime<Utc>,
) -> ReviewOutcome {
    let outcome = scheduler::apply_review_outcome(topic, difficulty, confidence, now);
    topic.difficulty = outcome.difficulty;
    topic.confidence = outcome.confidence;
    topic.last_reviewed = Some(outcome.last_reviewed);
    topic.next_review = Some(outcome.next_review);
    topic.review_count = outcome.review_count;
    topic.required_reviews = outcome.required_reviews;
    outcome
}

/// Day-level status relative to the caller's local calendar. Anything less
/// than a full day away but not today reads as one day remaining.
pub fn review_status<Tz: TimeZone>(
    next_review: Option<DateTime<Utc>>,
    now: &DateTime<Tz>,
) -> ReviewStatus {
    let Some(next) = next_review else {
        return ReviewStatus {
            text: "Ready now".to_string(),
            urgent: true,
            overdue: false,
        };
    };

    let today = now.date_naive();
    let next_day = next.with_timezone(&now.timezone()).date_naive();
    let now_utc = now.with_timezone(&Utc);

    if next <= now_utc || next_day == today {
        return ReviewStatus {
            text: "Due today".to_string(),
            urgent: true,
            overdue: next_day < today,
        };
    }

    let days = (next - now_utc).num_days().max(1);
    let text = if days == 1 {
        "1 day remaining".to_string()
    } else {
        format!("{days} days remaining")
    };
    ReviewStatus {
        text,
        urgent: false,
        overdue: false,
    }
}

pub fn render_notes(topic: &Topic) -> String {
    let mut out = String::new();
    if let Some(summary) = &topic.content.summary {
        out.push_str(summary.trim());
    }
    if !topic.notes.trim().is_empty() {
        if !out.is_empty() {
            out.push_str("\n---\n");
        }
        out.push_str(topic.notes.trim());
    }
    if out.is_empty() {
        out.push_str("(no notes yet)");
    }
    out
}

pub fn render_progress(topic: &Topic) -> String {
    format!(
        "{}/{} reviews, {}",
        topic.review_count,
        scheduler::required_reviews(topic.difficulty),
        topic.difficulty
    )
}

pub fn build_review_items(library: &Library, topics: &[&Topic]) -> Vec<ReviewItem> {
    topics
        .iter()
        .map(|topic| {
            let unit = library.unit(&topic.unit_id);
            let subject = library.subject_of_topic(topic);
            let mut crumbs: Vec<&str> = Vec::new();
            if let Some(s) = subject {
                crumbs.push(&s.name);
            }
            if let Some(u) = unit {
                crumbs.push(&u.name);
            }
            crumbs.push(&topic.name);
            ReviewItem {
                topic_id: topic.id.clone(),
                title: crumbs.join(" > "),
                notes_display: render_notes(topic),
                progress_display: render_progress(topic),
            }
        })
        .collect()
}

/// Per-subject counts using the review-list notion of due (no look-ahead).
/// Only completed topics are bucketed; `total` counts every topic.
pub fn subject_summaries(library: &Library, now: DateTime<Utc>) -> Vec<SubjectSummary> {
    library
        .subjects
        .iter()
        .map(|subject| {
            let topics = library.topics_of_subject(&subject.id);
            let buckets = scheduler::classify(
                topics.iter().copied().filter(|t| t.is_completed),
                now,
            );
            SubjectSummary {
                id: subject.id.clone(),
                name: subject.name.clone(),
                color: subject.color.clone(),
                total: topics.len(),
                due: buckets.due.len(),
                upcoming: buckets.upcoming.len(),
                mastered: buckets.mastered.len(),
            }
        })
        .collect()
}

pub fn mastered_count(topics: &[Topic]) -> usize {
    topics
        .iter()
        .filter(|t| scheduler::is_mastered(t.review_count, t.difficulty))
        .count()
}
