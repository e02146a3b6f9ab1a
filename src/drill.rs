use std::io::{BufRead, Write};

use chrono::{DateTime, Local, Utc};

use crate::error::Result;
use crate::progress;
use crate::review::{self, ReviewSession};
use crate::scheduler;
use crate::store::Library;
use crate::topic::{Confidence, Difficulty, QuizQuestion};

/// Reads one trimmed line; `None` once input is exhausted.
fn read_answer<R: BufRead>(input: &mut R, buf: &mut String) -> Result<Option<String>> {
    buf.clear();
    if input.read_line(buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(buf.trim().to_string()))
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    buf: &mut String,
    text: &str,
) -> Result<Option<String>> {
    write!(out, "{text}")?;
    out.flush()?;
    read_answer(input, buf)
}

fn parse_difficulty(answer: &str) -> Option<Difficulty> {
    match answer {
        "1" => Some(Difficulty::Easy),
        "2" => Some(Difficulty::Medium),
        "3" => Some(Difficulty::Hard),
        other => other.parse().ok(),
    }
}

/// Asks every question; `None` if input ran out part way.
fn ask_quiz<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    buf: &mut String,
    quiz: &[QuizQuestion],
) -> Result<Option<Vec<Option<usize>>>> {
    let mut answers = Vec::with_capacity(quiz.len());
    for (i, q) in quiz.iter().enumerate() {
        writeln!(out, "Q{}. {}", i + 1, q.question)?;
        for (j, option) in q.options.iter().enumerate() {
            writeln!(out, "  {}) {option}", j + 1)?;
        }
        let Some(answer) = prompt(input, out, buf, "Answer: ")? else {
            return Ok(None);
        };
        let picked = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|n| *n < q.options.len());
        if picked == Some(q.correct_index) {
            writeln!(out, "Correct.")?;
        } else if let Some(right) = q.options.get(q.correct_index) {
            writeln!(out, "The answer was: {right}")?;
        }
        if !q.explanation.is_empty() {
            writeln!(out, "{}", q.explanation)?;
        }
        answers.push(picked);
    }
    Ok(Some(answers))
}

/// Runs a terminal review of every completed topic that is due. Each review
/// is written to disk as soon as it is rated; running out of input ends the
/// session early with everything rated so far kept.
pub fn run<R, W, C>(library: &mut Library, mut input: R, mut out: W, mut clock: C) -> Result<ReviewSession>
where
    R: BufRead,
    W: Write,
    C: FnMut() -> DateTime<Utc>,
{
    let due_ids: Vec<String> = scheduler::classify(library.completed_topics(), clock())
        .due
        .iter()
        .map(|t| t.id.clone())
        .collect();

    let mut session = ReviewSession::new(review::mastered_count(&library.topics) as u32);
    if due_ids.is_empty() {
        writeln!(out, "No topics due for review.")?;
        return Ok(session);
    }
    writeln!(out, "{} topics due for review.\n", due_ids.len())?;

    let mut buf = String::new();
    for (i, id) in due_ids.iter().enumerate() {
        let Some(topic) = library.topic(id) else {
            continue;
        };
        let item = review::build_review_items(library, &[topic]).remove(0);
        let quiz = topic.content.questions().to_vec();

        writeln!(out, "[{}/{}] {}", i + 1, due_ids.len(), item.title)?;
        writeln!(out, "{}\n", item.progress_display)?;

        if prompt(&mut input, &mut out, &mut buf, "Press Enter to show notes...")?.is_none() {
            break;
        }
        writeln!(out, "{}\n", item.notes_display)?;

        if !quiz.is_empty() {
            let Some(answers) = ask_quiz(&mut input, &mut out, &mut buf, &quiz)? else {
                break;
            };
            let score = review::score_quiz(&quiz, &answers);
            writeln!(out, "Score: {}/{} {}\n", score.correct, score.total, score.verdict())?;
        }

        let difficulty = loop {
            let Some(answer) = prompt(
                &mut input,
                &mut out,
                &mut buf,
                "How difficult was it? (1=easy, 2=medium, 3=hard): ",
            )?
            else {
                break None;
            };
            match parse_difficulty(&answer) {
                Some(d) => break Some(d),
                None => writeln!(out, "Please enter 1, 2, or 3.")?,
            }
        };
        let Some(difficulty) = difficulty else {
            break;
        };

        let confidence = prompt(
            &mut input,
            &mut out,
            &mut buf,
            "Confidence? (low/medium/high, Enter to skip): ",
        )?
        .and_then(|answer| answer.parse::<Confidence>().ok());

        let mut updated = topic.clone();
        let outcome = review::record_review(&mut updated, difficulty, confidence, clock());
        library.commit_topic(updated)?;
        session.record(&outcome);
        tracing::info!(
            topic = %id,
            review_count = outcome.review_count,
            mastered = outcome.mastered,
            "review recorded"
        );

        if outcome.newly_mastered {
            writeln!(
                out,
                "Topic mastered! ({}/{} reviews)",
                outcome.review_count, outcome.required_reviews
            )?;
        } else {
            writeln!(
                out,
                "Next review: {} ({}/{})",
                outcome.next_review.with_timezone(&Local).format("%b %d, %Y %H:%M"),
                outcome.review_count,
                outcome.required_reviews
            )?;
        }
        writeln!(out)?;
    }

    progress::refresh_subject_progress(library);
    library.save()?;

    writeln!(out, "Session complete!")?;
    writeln!(
        out,
        "  Reviewed: {}, Mastered: {}",
        session.reviewed, session.mastered
    )?;
    Ok(session)
}
