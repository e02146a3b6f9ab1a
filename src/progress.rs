//! Dashboard and parent dashboard statistics.
//!
//! Activity is inferred from `last_reviewed`, so a topic only contributes to
//! the day it was last touched.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::scheduler;
use crate::store::Library;
use crate::topic::{Confidence, Topic};

/// Longest streak the dashboard looks back for.
const STREAK_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DayActivity {
    pub date: NaiveDate,
    /// Short weekday name, e.g. "Mon".
    pub label: String,
    pub completed: usize,
    pub reviews: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ConfidenceDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct WeeklySummary {
    pub completed_this_week: usize,
    pub reviews_this_week: usize,
    pub overall_progress: u32,
    pub study_streak: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub total_subjects: usize,
    pub total_topics: usize,
    pub completed_topics: usize,
    pub overall_progress: u32,
    pub due_today: usize,
    pub urgent: usize,
    pub mastered: usize,
}

/// Rounded completion percent; 0 when there is nothing to complete.
pub fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

pub fn overall_progress(topics: &[Topic]) -> u32 {
    percent(topics.iter().filter(|t| t.is_completed).count(), topics.len())
}

pub fn subject_progress(library: &Library, subject_id: &str) -> u32 {
    let topics = library.topics_of_subject(subject_id);
    percent(topics.iter().filter(|t| t.is_completed).count(), topics.len())
}

/// Recomputes and stores the cached `progress` of every subject.
pub fn refresh_subject_progress(library: &mut Library) {
    let updates: Vec<(String, u32)> = library
        .subjects
        .iter()
        .map(|s| (s.id.clone(), subject_progress(library, &s.id)))
        .collect();
    for (id, progress) in updates {
        if let Some(subject) = library.subjects.iter_mut().find(|s| s.id == id) {
            subject.progress = progress;
        }
    }
}

fn local_day<Tz: TimeZone>(t: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    t.with_timezone(tz).date_naive()
}

/// Completed topics and reviews per day for the seven days ending today.
pub fn weekly_activity<Tz: TimeZone>(topics: &[Topic], now: &DateTime<Tz>) -> Vec<DayActivity> {
    let tz = now.timezone();
    let today = now.date_naive();
    (0..7)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let touched: Vec<&Topic> = topics
                .iter()
                .filter(|t| t.last_reviewed.is_some_and(|r| local_day(r, &tz) == date))
                .collect();
            DayActivity {
                date,
                label: date.weekday().to_string(),
                completed: touched.iter().filter(|t| t.is_completed).count(),
                reviews: touched.iter().filter(|t| t.review_count > 0).count(),
            }
        })
        .collect()
}

/// Consecutive active days counting back from today. A quiet today does not
/// break a streak that ran through yesterday.
pub fn study_streak<Tz: TimeZone>(topics: &[Topic], now: &DateTime<Tz>) -> u32 {
    let tz = now.timezone();
    let active: std::collections::HashSet<NaiveDate> = topics
        .iter()
        .filter_map(|t| t.last_reviewed)
        .map(|r| local_day(r, &tz))
        .collect();
    let today = now.date_naive();

    let mut streak = 0;
    for back in 0..STREAK_WINDOW_DAYS {
        if active.contains(&(today - Duration::days(back))) {
            streak += 1;
        } else if back > 0 {
            break;
        }
    }
    streak
}

pub fn weekly_summary<Tz: TimeZone>(topics: &[Topic], now: &DateTime<Tz>) -> WeeklySummary {
    let week_ago = now.with_timezone(&Utc) - Duration::days(7);
    let recent: Vec<&Topic> = topics
        .iter()
        .filter(|t| t.last_reviewed.is_some_and(|r| r >= week_ago))
        .collect();
    WeeklySummary {
        completed_this_week: recent.iter().filter(|t| t.is_completed).count(),
        reviews_this_week: recent.iter().filter(|t| t.review_count > 0).count(),
        overall_progress: overall_progress(topics),
        study_streak: study_streak(topics, now),
    }
}

pub fn confidence_distribution(topics: &[Topic]) -> ConfidenceDistribution {
    let mut dist = ConfidenceDistribution::default();
    for topic in topics {
        match topic.confidence {
            Some(Confidence::Low) => dist.low += 1,
            Some(Confidence::Medium) => dist.medium += 1,
            Some(Confidence::High) => dist.high += 1,
            None => {}
        }
    }
    dist
}

pub fn encouragement(overall_progress: u32) -> &'static str {
    match overall_progress {
        75.. => "Excellent progress this week!",
        50..=74 => "Good progress! Keep it up!",
        25..=49 => "Making steady progress",
        _ => "Just getting started!",
    }
}

pub fn dashboard_summary<Tz: TimeZone>(library: &Library, now: &DateTime<Tz>) -> DashboardSummary {
    let topics = &library.topics;
    DashboardSummary {
        total_subjects: library.subjects.len(),
        total_topics: topics.len(),
        completed_topics: topics.iter().filter(|t| t.is_completed).count(),
        overall_progress: overall_progress(topics),
        due_today: scheduler::count_due_today(library.completed_topics(), now),
        urgent: scheduler::count_urgent(library.completed_topics(), now.with_timezone(&Utc)),
        mastered: topics
            .iter()
            .filter(|t| t.is_completed && scheduler::is_mastered(t.review_count, t.difficulty))
            .count(),
    }
}
