// Fixed-table spaced repetition: each difficulty tier has a required review
// count and a growing interval sequence. Every function takes `now` from the
// caller and never reads the clock itself.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::topic::{Confidence, Difficulty, Topic};

/// Window in which a not-yet-due topic is already surfaced by `is_due`.
const DUE_LOOKAHEAD_HOURS: i64 = 1;

/// How far past `next_review` a topic must be to count as urgent.
const URGENT_AFTER_DAYS: i64 = 1;

// Caps absurd custom intervals at a century.
const MAX_INTERVAL_DAYS: f64 = 36_500.0;

const EASY_INTERVALS: [f64; 7] = [1.0, 3.0, 7.0, 14.0, 30.0, 60.0, 120.0];
const MEDIUM_INTERVALS: [f64; 7] = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0];
const HARD_INTERVALS: [f64; 7] = [0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0];

pub fn required_reviews(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 2,
        Difficulty::Medium => 3,
        Difficulty::Hard => 4,
    }
}

/// Interval sequence in days; index 0 is the gap after the first review.
pub fn next_review_interval(difficulty: Difficulty) -> &'static [f64] {
    match difficulty {
        Difficulty::Easy => &EASY_INTERVALS,
        Difficulty::Medium => &MEDIUM_INTERVALS,
        Difficulty::Hard => &HARD_INTERVALS,
    }
}

fn effective_custom_interval(custom_interval_days: Option<f64>) -> Option<f64> {
    custom_interval_days.filter(|d| d.is_finite() && *d > 0.0)
}

fn interval_duration(days: f64) -> Duration {
    let days = days.min(MAX_INTERVAL_DAYS);
    if days < 1.0 {
        // Sub-day slots are counted in hours rather than whole days.
        let seconds = (days * 24.0 * 3600.0).round() as i64;
        Duration::seconds(seconds.max(1))
    } else {
        Duration::days(days.trunc() as i64)
    }
}

/// When a topic that has been reviewed `review_count` times should next come up.
///
/// A positive `custom_interval_days` only applies to the very first
/// scheduling (`review_count == 0`). Past the end of the table the last,
/// longest interval is reused.
pub fn calculate_next_review(
    review_count: u32,
    difficulty: Difficulty,
    custom_interval_days: Option<f64>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if review_count == 0
        && let Some(custom) = effective_custom_interval(custom_interval_days)
    {
        return now + interval_duration(custom);
    }

    let intervals = next_review_interval(difficulty);
    let index = (review_count as usize).min(intervals.len() - 1);
    now + interval_duration(intervals[index])
}

/// Per-topic due check with a one hour look-ahead. Unscheduled topics are due.
pub fn is_due(next_review: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match next_review {
        None => true,
        Some(next) => next <= now + Duration::hours(DUE_LOOKAHEAD_HOURS),
    }
}

pub fn is_mastered(review_count: u32, difficulty: Difficulty) -> bool {
    review_count >= required_reviews(difficulty)
}

fn start_of_tomorrow<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tomorrow = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX);
    let midnight = tomorrow.and_time(NaiveTime::MIN);
    let tz = now.timezone();
    // Midnight can fall in a DST gap; the first valid instant after it is used.
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

/// Topics due by the end of the caller's local day, overdue ones included.
pub fn count_due_today<'a, Tz: TimeZone>(
    topics: impl IntoIterator<Item = &'a Topic>,
    now: &DateTime<Tz>,
) -> usize {
    let tomorrow = start_of_tomorrow(now);
    topics
        .into_iter()
        .filter(|t| match t.next_review {
            None => true,
            Some(next) => next < tomorrow,
        })
        .count()
}

pub fn is_urgent(next_review: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match next_review {
        None => false,
        Some(next) => next + Duration::days(URGENT_AFTER_DAYS) < now,
    }
}

/// Topics more than a full day past their scheduled review.
pub fn count_urgent<'a>(topics: impl IntoIterator<Item = &'a Topic>, now: DateTime<Utc>) -> usize {
    topics
        .into_iter()
        .filter(|t| is_urgent(t.next_review, now))
        .count()
}

#[derive(Debug, Default)]
pub struct ReviewBuckets<'a> {
    pub due: Vec<&'a Topic>,
    /// Sorted soonest first.
    pub upcoming: Vec<&'a Topic>,
    /// Overlaps `due` and `upcoming`; mastery does not stop reviews.
    pub mastered: Vec<&'a Topic>,
}

/// Partition for the review list. Unlike `is_due` there is no look-ahead:
/// a topic is due only once `next_review` is at or before `now`.
pub fn classify<'a>(
    topics: impl IntoIterator<Item = &'a Topic>,
    now: DateTime<Utc>,
) -> ReviewBuckets<'a> {
    let mut buckets = ReviewBuckets::default();
    for topic in topics {
        match topic.next_review {
            Some(next) if next > now => buckets.upcoming.push(topic),
            _ => buckets.due.push(topic),
        }
        if is_mastered(topic.review_count, topic.difficulty) {
            buckets.mastered.push(topic);
        }
    }
    buckets.upcoming.sort_by_key(|t| t.next_review);
    buckets
}

/// Fields to persist after a finished review, plus the derived mastery flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub difficulty: Difficulty,
    pub confidence: Option<Confidence>,
    pub last_reviewed: DateTime<Utc>,
    pub next_review: DateTime<Utc>,
    pub review_count: u32,
    pub required_reviews: u32,
    pub mastered: bool,
    /// Mastered now but not before this review.
    pub newly_mastered: bool,
}

/// Computes the state transition for one completed review of `topic`.
///
/// The interval is picked with the count of reviews completed before this
/// one, so the first review of a topic uses the first slot of the table (or
/// the topic's custom interval). A medium topic is therefore due one day
/// after its first review and four days after its third; indexing with the
/// incremented count would skip the first slot and give two and eight.
/// A `None` confidence keeps the stored one.
pub fn apply_review_outcome(
    topic: &Topic,
    new_difficulty: Difficulty,
    confidence: Option<Confidence>,
    now: DateTime<Utc>,
) -> ReviewOutcome {
    let review_count = topic.review_count.saturating_add(1);
    let next_review = calculate_next_review(
        topic.review_count,
        new_difficulty,
        topic.revision_interval_days,
        now,
    );
    let mastered = is_mastered(review_count, new_difficulty);
    let was_mastered = is_mastered(topic.review_count, topic.difficulty);

    tracing::debug!(
        topic = %topic.id,
        difficulty = %new_difficulty,
        review_count,
        next_review = %next_review,
        mastered,
        "scheduled next review"
    );

    ReviewOutcome {
        difficulty: new_difficulty,
        confidence: confidence.or(topic.confidence),
        last_reviewed: now,
        next_review,
        review_count,
        required_reviews: required_reviews(new_difficulty),
        mastered,
        newly_mastered: mastered && !was_mastered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn topic(difficulty: Difficulty, review_count: u32, next: Option<DateTime<Utc>>) -> Topic {
        let mut t = Topic::new("unit", "topic", difficulty);
        t.review_count = review_count;
        t.next_review = next;
        t
    }

    #[test]
    fn required_reviews_table() {
        assert_eq!(required_reviews(Difficulty::Easy), 2);
        assert_eq!(required_reviews(Difficulty::Medium), 3);
        assert_eq!(required_reviews(Difficulty::Hard), 4);
    }

    #[test]
    fn interval_tables_increase() {
        for d in Difficulty::ALL {
            let seq = next_review_interval(d);
            assert_eq!(seq.len(), 7);
            assert!(seq.windows(2).all(|w| w[0] < w[1]));
            assert!(seq.iter().all(|&v| v > 0.0));
        }
    }

    #[test]
    fn next_review_always_in_future() {
        for d in Difficulty::ALL {
            for r in 0..12 {
                assert!(calculate_next_review(r, d, None, now()) > now());
            }
        }
    }

    #[test]
    fn custom_interval_on_first_scheduling() {
        for d in Difficulty::ALL {
            let next = calculate_next_review(0, d, Some(5.0), now());
            assert_eq!(next, now() + Duration::days(5));
        }
    }

    #[test]
    fn custom_interval_ignored_after_first_review() {
        let next = calculate_next_review(1, Difficulty::Easy, Some(5.0), now());
        assert_eq!(next, now() + Duration::days(3));
    }

    #[test]
    fn non_positive_custom_interval_falls_back_to_table() {
        let table = calculate_next_review(0, Difficulty::Medium, None, now());
        assert_eq!(calculate_next_review(0, Difficulty::Medium, Some(0.0), now()), table);
        assert_eq!(calculate_next_review(0, Difficulty::Medium, Some(-2.0), now()), table);
        assert_eq!(
            calculate_next_review(0, Difficulty::Medium, Some(f64::NAN), now()),
            table
        );
    }

    #[test]
    fn hard_first_slot_is_twelve_hours() {
        let next = calculate_next_review(0, Difficulty::Hard, None, now());
        assert_eq!(next, now() + Duration::hours(12));
    }

    #[test]
    fn interval_saturates_at_last_entry() {
        let at_six = calculate_next_review(6, Difficulty::Easy, None, now());
        let at_ten = calculate_next_review(10, Difficulty::Easy, None, now());
        assert_eq!(at_six, at_ten);
        assert_eq!(at_ten, now() + Duration::days(120));
    }

    #[test]
    fn is_due_lookahead_window() {
        assert!(is_due(None, now()));
        assert!(is_due(Some(now() - Duration::seconds(1)), now()));
        assert!(is_due(Some(now() + Duration::minutes(30)), now()));
        assert!(is_due(Some(now() + Duration::hours(1)), now()));
        assert!(!is_due(Some(now() + Duration::hours(2)), now()));
    }

    #[test]
    fn mastery_threshold() {
        assert!(is_mastered(2, Difficulty::Easy));
        assert!(!is_mastered(1, Difficulty::Easy));
        assert!(!is_mastered(2, Difficulty::Hard));
        assert!(is_mastered(4, Difficulty::Hard));
    }

    #[test]
    fn due_today_uses_day_boundary() {
        let tomorrow_start = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 1).unwrap();
        let today_end = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap();
        assert_eq!(
            count_due_today(&[topic(Difficulty::Easy, 1, Some(tomorrow_start))], &now()),
            0
        );
        assert_eq!(
            count_due_today(&[topic(Difficulty::Easy, 1, Some(today_end))], &now()),
            1
        );
    }

    #[test]
    fn due_today_counts_unscheduled_and_overdue() {
        let topics = vec![
            topic(Difficulty::Easy, 0, None),
            topic(Difficulty::Easy, 1, Some(now() - Duration::days(3))),
            topic(Difficulty::Easy, 1, Some(now() + Duration::days(3))),
        ];
        assert_eq!(count_due_today(&topics, &now()), 2);
    }

    #[test]
    fn due_today_respects_caller_timezone() {
        let tz = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        // 23:30 local on June 1st is 21:30 UTC.
        let local_now = tz.with_ymd_and_hms(2025, 6, 1, 23, 30, 0).unwrap();
        // 22:30 UTC is already June 2nd locally.
        let next = Utc.with_ymd_and_hms(2025, 6, 1, 22, 30, 0).unwrap();
        assert_eq!(
            count_due_today(&[topic(Difficulty::Easy, 1, Some(next))], &local_now),
            0
        );
    }

    #[test]
    fn urgent_after_a_full_day() {
        let overdue_25h = topic(Difficulty::Medium, 1, Some(now() - Duration::hours(25)));
        let overdue_23h = topic(Difficulty::Medium, 1, Some(now() - Duration::hours(23)));
        let unscheduled = topic(Difficulty::Medium, 0, None);
        assert_eq!(count_urgent(&[overdue_25h], now()), 1);
        assert_eq!(count_urgent(&[overdue_23h], now()), 0);
        assert_eq!(count_urgent(&[unscheduled], now()), 0);
    }

    #[test]
    fn classify_partitions_without_lookahead() {
        let topics = vec![
            topic(Difficulty::Easy, 0, None),
            topic(Difficulty::Easy, 2, Some(now())),
            topic(Difficulty::Medium, 1, Some(now() + Duration::minutes(30))),
            topic(Difficulty::Medium, 1, Some(now() + Duration::minutes(10))),
        ];
        let buckets = classify(&topics, now());
        assert_eq!(buckets.due.len(), 2);
        assert_eq!(buckets.upcoming.len(), 2);
        assert_eq!(
            buckets.upcoming[0].next_review,
            Some(now() + Duration::minutes(10))
        );
        // Mastered easy topic is also due again.
        assert_eq!(buckets.mastered.len(), 1);
        assert!(std::ptr::eq(buckets.mastered[0], buckets.due[1]));
    }

    #[test]
    fn outcome_increments_by_exactly_one() {
        for from in Difficulty::ALL {
            for to in Difficulty::ALL {
                let t = topic(from, 5, None);
                let outcome = apply_review_outcome(&t, to, None, now());
                assert_eq!(outcome.review_count, 6);
                assert_eq!(outcome.required_reviews, required_reviews(to));
            }
        }
    }

    #[test]
    fn outcome_uses_custom_interval_for_first_review() {
        let mut t = topic(Difficulty::Medium, 0, None);
        t.revision_interval_days = Some(5.0);
        let first = apply_review_outcome(&t, Difficulty::Medium, None, now());
        assert_eq!(first.next_review, now() + Duration::days(5));

        t.review_count = 1;
        let second = apply_review_outcome(&t, Difficulty::Medium, None, now());
        assert_eq!(second.next_review, now() + Duration::days(2));
    }

    #[test]
    fn mastery_lost_when_difficulty_raised() {
        let t = topic(Difficulty::Easy, 2, Some(now()));
        assert!(is_mastered(t.review_count, t.difficulty));
        let outcome = apply_review_outcome(&t, Difficulty::Hard, None, now());
        assert_eq!(outcome.review_count, 3);
        assert!(!outcome.mastered);
        assert!(!outcome.newly_mastered);
    }

    #[test]
    fn newly_mastered_only_on_crossing() {
        let t = topic(Difficulty::Easy, 1, None);
        let outcome = apply_review_outcome(&t, Difficulty::Easy, None, now());
        assert!(outcome.mastered && outcome.newly_mastered);

        let t = topic(Difficulty::Easy, 2, None);
        let outcome = apply_review_outcome(&t, Difficulty::Easy, None, now());
        assert!(outcome.mastered && !outcome.newly_mastered);
    }

    #[test]
    fn confidence_kept_when_not_given() {
        let mut t = topic(Difficulty::Easy, 0, None);
        t.confidence = Some(Confidence::Low);
        let kept = apply_review_outcome(&t, Difficulty::Easy, None, now());
        assert_eq!(kept.confidence, Some(Confidence::Low));
        let set = apply_review_outcome(&t, Difficulty::Easy, Some(Confidence::High), now());
        assert_eq!(set.confidence, Some(Confidence::High));
    }
}
