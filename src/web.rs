use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Local, Utc};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::progress;
use crate::review::{self, QuizScore, ReviewSession};
use crate::scheduler;
use crate::store::Library;
use crate::topic::{Confidence, Difficulty, Topic};

// -- App state --

struct ServerState {
    library: Library,
    session: ReviewSession,
}

type SharedState = Arc<Mutex<ServerState>>;

type PageError = (StatusCode, Html<String>);

// -- HTML helpers --

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - studytrack</title>
<script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-[#1e1e1e] text-[#d4d4d4] font-sans antialiased min-h-screen">
<nav class="flex gap-4 px-6 py-3 border-b border-[#333] bg-[#232323] text-sm">
<a href="/" class="text-[#6ba3d6]">Dashboard</a>
<a href="/review" class="text-[#6ba3d6]">Review</a>
<a href="/parent" class="text-[#6ba3d6]">Parent view</a>
</nav>
<main class="p-6 max-w-5xl">{body}</main>
</body>
</html>"#,
        title = html_escape(title),
        body = body,
    )
}

fn error_page(status: StatusCode, message: &str) -> PageError {
    (
        status,
        Html(page(
            "Error",
            &format!(
                r#"<p class="text-[#e06c6c]">{}</p><p class="mt-4"><a href="/review" class="text-[#6ba3d6]">Back to reviews</a></p>"#,
                html_escape(message)
            ),
        )),
    )
}

fn stat_card(label: &str, value: &str) -> String {
    format!(
        r#"<div class="bg-[#2d2d2d] border border-[#3a3a3a] rounded-lg p-4"><p class="text-xs text-[#888] uppercase tracking-wider">{label}</p><p class="text-2xl font-bold text-[#e0e0e0]">{value}</p></div>"#,
        label = html_escape(label),
        value = html_escape(value),
    )
}

fn section(title: &str, count: usize, rows: &str, empty: &str) -> String {
    let inner = if rows.is_empty() {
        format!(r#"<p class="text-[#666] py-4">{}</p>"#, html_escape(empty))
    } else {
        format!(r#"<div class="flex flex-col gap-1">{rows}</div>"#)
    };
    format!(
        r#"<h2 class="text-lg font-semibold text-[#e0e0e0] mt-8 mb-3">{title} ({count})</h2>{inner}"#,
        title = html_escape(title),
    )
}

fn topic_row(library: &Library, topic: &Topic, now: &DateTime<Local>, action: bool) -> String {
    let status = review::review_status(topic.next_review, now);
    let badge_color = if status.overdue {
        "#e06c6c"
    } else if status.urgent {
        "#6ba3d6"
    } else {
        "#888"
    };
    let subject = library
        .subject_of_topic(topic)
        .map_or(String::new(), |s| s.name.clone());
    let button = if action {
        format!(
            r#"<a href="/topic/{id}/review" class="px-3 py-1 rounded-md text-sm bg-[#4a90d9] !text-white no-underline">Review</a>"#,
            id = html_escape(&topic.id),
        )
    } else {
        String::new()
    };
    format!(
        r#"<div class="flex justify-between items-center py-2.5 px-3 bg-[#2a2a2a] rounded-md text-[0.9rem]"><span>{name} <span class="text-xs text-[#888]">{subject}</span></span><span class="flex items-center gap-3 text-sm"><span style="color:{badge_color}">{status}</span><span class="text-[#888]">{progress}</span>{button}</span></div>"#,
        name = html_escape(&topic.name),
        subject = html_escape(&subject),
        status = html_escape(&status.text),
        progress = html_escape(&review::render_progress(topic)),
    )
}

// -- Page bodies --

fn dashboard_body(library: &Library, now: &DateTime<Local>) -> String {
    let summary = progress::dashboard_summary(library, now);

    let reminder = if summary.due_today > 0 {
        let urgent = if summary.urgent > 0 {
            format!(", {} overdue by more than a day", summary.urgent)
        } else {
            String::new()
        };
        format!(
            r#"<div class="bg-[#2a3340] border border-[#6ba3d6] rounded-lg p-4 mb-6 flex justify-between items-center"><span>{} topics due for revision today{}</span><a href="/review" class="px-3 py-1 rounded-md text-sm bg-[#4a90d9] !text-white no-underline">Start reviewing</a></div>"#,
            summary.due_today, urgent
        )
    } else {
        String::new()
    };

    let cards = [
        stat_card("Subjects", &summary.total_subjects.to_string()),
        stat_card("Progress", &format!("{}%", summary.overall_progress)),
        stat_card("Due today", &summary.due_today.to_string()),
        stat_card("Mastered", &summary.mastered.to_string()),
    ]
    .concat();

    let mut subject_rows = String::new();
    for s in &library.subjects {
        let pct = progress::subject_progress(library, &s.id);
        subject_rows.push_str(&format!(
            r#"<div class="py-2"><div class="flex justify-between text-sm"><span>{name}</span><span class="text-[#888]">{pct}% complete</span></div><div class="h-2 bg-[#333] rounded"><div class="h-2 rounded" style="width:{pct}%;background:{color}"></div></div></div>"#,
            name = html_escape(&s.name),
            color = html_escape(&s.color),
        ));
    }

    format!(
        r#"{reminder}<div class="grid grid-cols-4 gap-4">{cards}</div>{subjects}"#,
        subjects = section(
            "Subjects",
            library.subjects.len(),
            &subject_rows,
            "Add subjects to see progress"
        ),
    )
}

fn review_list_body(library: &Library, session: &ReviewSession, now: &DateTime<Local>) -> String {
    let buckets = scheduler::classify(library.completed_topics(), now.with_timezone(&Utc));

    let rows = |topics: &[&Topic], action: bool| -> String {
        topics
            .iter()
            .map(|t| topic_row(library, t, now, action))
            .collect()
    };

    let cards = [
        stat_card("Due", &buckets.due.len().to_string()),
        stat_card("Reviewed this session", &session.reviewed.to_string()),
        stat_card("Mastered", &session.mastered.to_string()),
    ]
    .concat();

    format!(
        r#"<h1 class="text-2xl font-bold text-[#e0e0e0] mb-4">Review Center</h1><div class="grid grid-cols-3 gap-4">{cards}</div>{due}{upcoming}{mastered}"#,
        due = section(
            "Due for review",
            buckets.due.len(),
            &rows(buckets.due.as_slice(), true),
            "No topics due for review right now."
        ),
        upcoming = section(
            "Upcoming",
            buckets.upcoming.len(),
            &rows(buckets.upcoming.as_slice(), false),
            "Complete more topics to schedule reviews."
        ),
        mastered = section(
            "Mastered",
            buckets.mastered.len(),
            &rows(buckets.mastered.as_slice(), true),
            "Complete all required reviews to master topics."
        ),
    )
}

fn rating_form(topic: &Topic) -> String {
    let buttons: String = Difficulty::ALL
        .iter()
        .map(|d| {
            format!(
                r#"<button type="submit" name="difficulty" value="{d}" class="px-4 py-2 rounded-md bg-[#383838] border border-[#444] capitalize">{d}<span class="block text-xs text-[#888]">{n} reviews</span></button>"#,
                n = scheduler::required_reviews(*d),
            )
        })
        .collect();

    format!(
        r#"<form method="post" action="/topic/{id}/review">
<label class="block text-xs text-[#888] mb-1" for="confidence">Confidence</label>
<select id="confidence" name="confidence" class="mb-4 bg-[#383838] border border-[#444] rounded-md px-2 py-1">
<option value="">(unchanged)</option><option value="low">Low</option><option value="medium">Medium</option><option value="high">High</option>
</select>
<p class="text-sm mb-2">How difficult was this topic?</p>
<div class="flex gap-3">{buttons}</div>
</form>"#,
        id = html_escape(&topic.id),
    )
}

fn quiz_form(topic: &Topic) -> String {
    let questions: String = topic
        .content
        .questions()
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let options: String = q
                .options
                .iter()
                .enumerate()
                .map(|(j, option)| {
                    format!(
                        r#"<label class="block py-1"><input type="radio" name="q{i}" value="{j}" required> {}</label>"#,
                        html_escape(option)
                    )
                })
                .collect();
            format!(
                r#"<fieldset class="bg-[#2d2d2d] border border-[#3a3a3a] rounded-lg p-4 mb-3"><legend class="text-sm">Q{n}. {question}</legend>{options}</fieldset>"#,
                n = i + 1,
                question = html_escape(&q.question),
            )
        })
        .collect();

    format!(
        r#"<form method="post" action="/topic/{id}/quiz">{questions}<button type="submit" class="px-4 py-2 rounded-md bg-[#4a90d9] text-white">Submit quiz</button></form>"#,
        id = html_escape(&topic.id),
    )
}

fn topic_header(library: &Library, topic: &Topic) -> String {
    let item = review::build_review_items(library, &[topic]).remove(0);
    format!(
        r#"<h1 class="text-xl font-semibold text-[#e0e0e0]">{title}</h1>
<p class="text-sm text-[#888] mb-4">{progress}</p>"#,
        title = html_escape(&item.title),
        progress = html_escape(&item.progress_display),
    )
}

/// Notes first, then the quiz when the topic has one, else the rating form.
fn review_form_body(library: &Library, topic: &Topic) -> String {
    let notes = review::render_notes(topic);
    let next = if topic.content.questions().is_empty() {
        rating_form(topic)
    } else {
        quiz_form(topic)
    };
    format!(
        r#"{header}<pre class="whitespace-pre-wrap bg-[#2d2d2d] border border-[#3a3a3a] rounded-lg p-5 mb-6">{notes}</pre>{next}"#,
        header = topic_header(library, topic),
        notes = html_escape(&notes),
    )
}

fn quiz_result_body(library: &Library, topic: &Topic, score: QuizScore) -> String {
    format!(
        r#"{header}<div class="text-center mb-6"><p class="text-5xl font-bold text-[#6ba3d6]">{correct}/{total}</p><p class="text-lg">{verdict}</p></div>{rating}"#,
        header = topic_header(library, topic),
        correct = score.correct,
        total = score.total,
        verdict = score.verdict(),
        rating = rating_form(topic),
    )
}

fn parent_body(library: &Library, now: &DateTime<Local>) -> String {
    let weekly = progress::weekly_summary(&library.topics, now);
    let confidence = progress::confidence_distribution(&library.topics);
    let activity = progress::weekly_activity(&library.topics, now);
    let completed = library.topics.iter().filter(|t| t.is_completed).count();

    let cards = [
        stat_card("Completed this week", &weekly.completed_this_week.to_string()),
        stat_card("Reviews this week", &weekly.reviews_this_week.to_string()),
        stat_card("Overall progress", &format!("{}%", weekly.overall_progress)),
        stat_card("Study streak", &format!("{} days", weekly.study_streak)),
    ]
    .concat();

    let days: String = activity
        .iter()
        .map(|d| {
            format!(
                r#"<li class="flex justify-between py-1 border-b border-[#333]"><span>{}</span><span class="text-[#888]">{} completed, {} reviews</span></li>"#,
                d.label, d.completed, d.reviews
            )
        })
        .collect();

    let streak = if weekly.study_streak > 0 {
        format!("{} day study streak!", weekly.study_streak)
    } else {
        "Start studying to build a streak!".to_string()
    };

    format!(
        r#"<h1 class="text-2xl font-bold text-[#e0e0e0] mb-1">Progress report</h1>
<p class="text-sm text-[#888] mb-4">{completed} of {total} topics completed</p>
<div class="grid grid-cols-4 gap-4">{cards}</div>
<h2 class="text-lg font-semibold text-[#e0e0e0] mt-8 mb-3">This week</h2><ul>{days}</ul>
<h2 class="text-lg font-semibold text-[#e0e0e0] mt-8 mb-3">Confidence</h2>
<p>Low: {low} &middot; Medium: {medium} &middot; High: {high}</p>
<div class="mt-8 text-center"><p class="text-lg">{message}</p><p class="text-sm text-[#888]">{streak}</p></div>"#,
        total = library.topics.len(),
        low = confidence.low,
        medium = confidence.medium,
        high = confidence.high,
        message = progress::encouragement(weekly.overall_progress),
    )
}

// -- Route handlers --

async fn dashboard(State(state): State<SharedState>) -> Html<String> {
    let st = state.lock().await;
    let now = Local::now();
    Html(page("Dashboard", &dashboard_body(&st.library, &now)))
}

async fn review_list(State(state): State<SharedState>) -> Html<String> {
    let st = state.lock().await;
    let now = Local::now();
    Html(page("Review", &review_list_body(&st.library, &st.session, &now)))
}

async fn review_form(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> std::result::Result<Html<String>, PageError> {
    let st = state.lock().await;
    let topic = st
        .library
        .topic(&id)
        .ok_or_else(|| error_page(StatusCode::NOT_FOUND, "Topic not found."))?;
    Ok(Html(page(&topic.name, &review_form_body(&st.library, topic))))
}

/// Answers arrive as `q0`, `q1`, ... holding the chosen option index.
fn quiz_answers(form: &HashMap<String, String>, questions: usize) -> Vec<Option<usize>> {
    (0..questions)
        .map(|i| form.get(&format!("q{i}")).and_then(|v| v.trim().parse().ok()))
        .collect()
}

async fn quiz_submit(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> std::result::Result<Html<String>, PageError> {
    let st = state.lock().await;
    let topic = st
        .library
        .topic(&id)
        .ok_or_else(|| error_page(StatusCode::NOT_FOUND, "Topic not found."))?;
    let quiz = topic.content.questions();
    let score = review::score_quiz(quiz, &quiz_answers(&form, quiz.len()));
    tracing::debug!(topic = %id, correct = score.correct, total = score.total, "quiz scored");
    Ok(Html(page(
        &topic.name,
        &quiz_result_body(&st.library, topic, score),
    )))
}

#[derive(serde::Deserialize)]
struct ReviewForm {
    difficulty: String,
    #[serde(default)]
    confidence: String,
}

fn parse_review_form(form: &ReviewForm) -> Result<(Difficulty, Option<Confidence>)> {
    let difficulty = form.difficulty.parse::<Difficulty>()?;
    let confidence = if form.confidence.trim().is_empty() {
        None
    } else {
        Some(form.confidence.parse::<Confidence>()?)
    };
    Ok((difficulty, confidence))
}

async fn review_submit(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> std::result::Result<Redirect, PageError> {
    let (difficulty, confidence) = parse_review_form(&form)
        .map_err(|e| error_page(StatusCode::BAD_REQUEST, &e.to_string()))?;

    let mut st = state.lock().await;
    let now = Utc::now();

    let mut updated = st
        .library
        .topic(&id)
        .cloned()
        .ok_or_else(|| error_page(StatusCode::NOT_FOUND, "Topic not found."))?;
    let outcome = review::record_review(&mut updated, difficulty, confidence, now);

    match st.library.commit_topic(updated) {
        Ok(()) => {}
        Err(e @ Error::NotFound { .. }) => {
            return Err(error_page(StatusCode::NOT_FOUND, &e.to_string()));
        }
        Err(e) => {
            tracing::error!("failed to save review for {id}: {e}");
            return Err(error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save review.",
            ));
        }
    }

    st.session.record(&outcome);
    tracing::info!(
        topic = %id,
        review_count = outcome.review_count,
        mastered = outcome.mastered,
        "review recorded"
    );
    Ok(Redirect::to("/review"))
}

async fn parent_dashboard(State(state): State<SharedState>) -> Html<String> {
    let st = state.lock().await;
    let now = Local::now();
    Html(page("Progress report", &parent_body(&st.library, &now)))
}

async fn api_summary(State(state): State<SharedState>) -> Json<progress::DashboardSummary> {
    let st = state.lock().await;
    Json(progress::dashboard_summary(&st.library, &Local::now()))
}

// -- Public entry point --

fn shared_state(library: Library) -> SharedState {
    let mastered = review::mastered_count(&library.topics) as u32;
    Arc::new(Mutex::new(ServerState {
        library,
        session: ReviewSession::new(mastered),
    }))
}

pub fn router(library: Library) -> Router {
    let state = shared_state(library);

    Router::new()
        .route("/", get(dashboard))
        .route("/review", get(review_list))
        .route("/topic/{id}/review", get(review_form).post(review_submit))
        .route("/topic/{id}/quiz", post(quiz_submit))
        .route("/parent", get(parent_dashboard))
        .route("/api/summary", get(api_summary))
        .with_state(state)
}

pub async fn serve(library: Library, addr: &str) -> Result<()> {
    let app = router(library);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("serving at http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::topic::QuizQuestion;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap()
    }

    fn library() -> (tempfile::TempDir, Library) {
        let dir = tempfile::tempdir().unwrap();
        let mut lib = Library::open(dir.path()).unwrap();
        let subject = lib.insert_subject("History", "#d4a05a").id.clone();
        let unit = lib.insert_unit(&subject, "Rome").unwrap().id.clone();
        let mut republic = Topic::new(&unit, "Republic <early>", Difficulty::Medium);
        republic.is_completed = true;
        lib.insert_topic(republic).unwrap();
        let mut later = Topic::new(&unit, "Empire", Difficulty::Easy);
        later.is_completed = true;
        later.next_review = Some(now().with_timezone(&Utc) + Duration::days(4));
        lib.insert_topic(later).unwrap();
        // Not studied yet: no next_review, but not due either.
        lib.insert_topic(Topic::new(&unit, "Augustus", Difficulty::Hard))
            .unwrap();
        lib.save().unwrap();
        (dir, lib)
    }

    fn with_quiz(lib: &mut Library) -> String {
        let id = lib.topics[0].id.clone();
        lib.update_topic(&id, |t| {
            t.content.quiz = Some(vec![
                QuizQuestion {
                    question: "First consuls?".into(),
                    options: vec!["Brutus & Collatinus".into(), "Caesar".into()],
                    correct_index: 0,
                    explanation: String::new(),
                },
                QuizQuestion {
                    question: "Founded in?".into(),
                    options: vec!["753 BC".into(), "509 BC".into()],
                    correct_index: 1,
                    explanation: String::new(),
                },
            ]);
        })
        .unwrap();
        id
    }

    fn form(difficulty: &str) -> Form<ReviewForm> {
        Form(ReviewForm {
            difficulty: difficulty.into(),
            confidence: String::new(),
        })
    }

    #[test]
    fn escape_html() {
        assert_eq!(html_escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn dashboard_shows_reminder_when_due() {
        let (_dir, lib) = library();
        let body = dashboard_body(&lib, &now());
        assert!(body.contains("1 topics due for revision today"));
        assert!(body.contains("History"));
    }

    #[test]
    fn review_list_escapes_and_buckets() {
        let (_dir, lib) = library();
        let body = review_list_body(&lib, &ReviewSession::default(), &now());
        assert!(body.contains("Due for review (1)"));
        assert!(body.contains("Upcoming (1)"));
        assert!(body.contains("Republic &lt;early&gt;"));
        assert!(body.contains("Ready now"));
        assert!(body.contains("4 days remaining"));
    }

    #[test]
    fn review_list_leaves_out_unfinished_topics() {
        let (_dir, lib) = library();
        let body = review_list_body(&lib, &ReviewSession::default(), &now());
        assert!(!body.contains("Augustus"));
    }

    #[test]
    fn review_form_offers_each_difficulty() {
        let (_dir, lib) = library();
        let body = review_form_body(&lib, &lib.topics[0]);
        for d in Difficulty::ALL {
            assert!(body.contains(&format!("value=\"{d}\"")));
        }
        assert!(body.contains("History &gt; Rome"));
        assert!(!body.contains("/quiz"));
    }

    #[test]
    fn review_form_asks_quiz_before_rating() {
        let (_dir, mut lib) = library();
        with_quiz(&mut lib);
        let body = review_form_body(&lib, &lib.topics[0]);
        assert!(body.contains("action=\"/topic/"));
        assert!(body.contains("/quiz\""));
        assert!(body.contains("Brutus &amp; Collatinus"));
        assert!(body.contains("name=\"q1\" value=\"1\""));
        assert!(!body.contains("name=\"difficulty\""));
    }

    #[test]
    fn quiz_answers_from_form_fields() {
        let mut fields = HashMap::new();
        fields.insert("q0".to_string(), "1".to_string());
        fields.insert("q2".to_string(), "x".to_string());
        assert_eq!(quiz_answers(&fields, 3), vec![Some(1), None, None]);
    }

    #[tokio::test]
    async fn quiz_submit_shows_score_and_rating() {
        let (_dir, mut lib) = library();
        let id = with_quiz(&mut lib);
        let state = shared_state(lib);
        let mut fields = HashMap::new();
        fields.insert("q0".to_string(), "0".to_string());
        fields.insert("q1".to_string(), "1".to_string());

        let Html(body) = quiz_submit(State(state), Path(id), Form(fields))
            .await
            .unwrap();
        assert!(body.contains("2/2"));
        assert!(body.contains("Perfect!"));
        assert!(body.contains("name=\"difficulty\""));
    }

    #[test]
    fn review_form_parsing() {
        let ok = ReviewForm {
            difficulty: "hard".into(),
            confidence: String::new(),
        };
        assert_eq!(parse_review_form(&ok).unwrap(), (Difficulty::Hard, None));
        let bad = ReviewForm {
            difficulty: "impossible".into(),
            confidence: String::new(),
        };
        assert!(matches!(
            parse_review_form(&bad),
            Err(Error::UnknownDifficulty(_))
        ));
    }

    #[tokio::test]
    async fn review_submit_records_and_saves() {
        let (dir, lib) = library();
        let id = lib.topics[0].id.clone();
        let state = shared_state(lib);

        let result = review_submit(State(state.clone()), Path(id.clone()), form("medium")).await;
        assert!(result.is_ok());

        let st = state.lock().await;
        assert_eq!(st.library.topic(&id).unwrap().review_count, 1);
        assert_eq!(st.session.reviewed, 1);
        assert_eq!(st.session.mastered, 0);
        let reloaded = Library::open(dir.path()).unwrap();
        assert_eq!(reloaded.topic(&id).unwrap().review_count, 1);
    }

    #[tokio::test]
    async fn review_submit_counts_new_mastery() {
        let (_dir, mut lib) = library();
        let id = lib.topics[1].id.clone();
        lib.update_topic(&id, |t| t.review_count = 1).unwrap();
        let state = shared_state(lib);

        assert!(
            review_submit(State(state.clone()), Path(id), form("easy"))
                .await
                .is_ok()
        );
        let st = state.lock().await;
        assert_eq!(st.session.mastered, 1);
    }

    #[tokio::test]
    async fn review_submit_unknown_topic_is_404() {
        let (_dir, lib) = library();
        let state = shared_state(lib);
        let Err((status, _)) =
            review_submit(State(state.clone()), Path("missing".into()), form("easy")).await
        else {
            panic!("expected an error page");
        };
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(state.lock().await.session.reviewed, 0);
    }

    #[tokio::test]
    async fn review_submit_rejects_unknown_difficulty() {
        let (_dir, lib) = library();
        let id = lib.topics[0].id.clone();
        let state = shared_state(lib);
        let Err((status, _)) = review_submit(State(state), Path(id), form("brutal")).await else {
            panic!("expected an error page");
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failed_save_leaves_topic_unchanged() {
        let (dir, lib) = library();
        let id = lib.topics[0].id.clone();
        let state = shared_state(lib);
        std::fs::remove_file(dir.path().join("topics.csv")).unwrap();
        std::fs::create_dir(dir.path().join("topics.csv")).unwrap();

        for _ in 0..2 {
            let Err((status, _)) =
                review_submit(State(state.clone()), Path(id.clone()), form("medium")).await
            else {
                panic!("expected an error page");
            };
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        }

        let st = state.lock().await;
        let topic = st.library.topic(&id).unwrap();
        assert_eq!(topic.review_count, 0);
        assert!(topic.next_review.is_none());
        assert_eq!(st.session.reviewed, 0);
    }

    #[test]
    fn parent_view_reports_progress() {
        let (_dir, lib) = library();
        let body = parent_body(&lib, &now());
        assert!(body.contains("2 of 3 topics completed"));
        assert!(body.contains("Good progress! Keep it up!"));
        assert!(body.contains("Start studying to build a streak!"));
    }
}
