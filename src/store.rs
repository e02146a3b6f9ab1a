use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};
use crate::topic::{Subject, Topic, TopicContent, Unit};

const SUBJECTS_FILE: &str = "subjects.csv";
const UNITS_FILE: &str = "units.csv";
const TOPICS_FILE: &str = "topics.csv";

const SUBJECT_HEADER: [&str; 4] = ["id", "name", "color", "progress"];
const UNIT_HEADER: [&str; 4] = ["id", "subject_id", "name", "sort_order"];
const TOPIC_HEADER: [&str; 14] = [
    "id",
    "unit_id",
    "name",
    "is_completed",
    "difficulty",
    "confidence",
    "review_count",
    "required_reviews",
    "next_review",
    "last_reviewed",
    "revision_interval_days",
    "sort_order",
    "notes",
    "content",
];

const DEFAULT_COLOR: &str = "#4a90d9";

/// Subjects, units and topics of one learner, backed by three CSV files in a
/// data directory.
#[derive(Debug, Clone)]
pub struct Library {
    dir: PathBuf,
    pub subjects: Vec<Subject>,
    pub units: Vec<Unit>,
    pub topics: Vec<Topic>,
}

fn get_field(record: &csv::StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").to_string()
}

fn id_or_new(raw: String) -> String {
    if raw.trim().is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        raw
    }
}

fn parse_u32(s: &str) -> u32 {
    s.trim().parse().unwrap_or(0)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_optional_f64(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() { None } else { s.parse().ok() }
}

fn parse_optional_timestamp(s: &str, file: &Path) -> Result<Option<DateTime<Utc>>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|_| Error::InvalidTimestamp {
            file: file.display().to_string(),
            value: s.to_string(),
        })
}

fn format_timestamp(t: Option<DateTime<Utc>>) -> String {
    t.map_or(String::new(), |t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn open_reader(path: &Path) -> Result<Option<csv::Reader<std::fs::File>>> {
    if !path.exists() {
        return Ok(None);
    }
    let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    Ok(Some(reader))
}

fn load_subjects(path: &Path) -> Result<Vec<Subject>> {
    let Some(mut reader) = open_reader(path)? else {
        return Ok(Vec::new());
    };
    let mut subjects = Vec::new();
    for result in reader.records() {
        let record = result?;
        let color = get_field(&record, 2);
        subjects.push(Subject {
            id: id_or_new(get_field(&record, 0)),
            name: get_field(&record, 1),
            color: if color.trim().is_empty() {
                DEFAULT_COLOR.to_string()
            } else {
                color
            },
            progress: parse_u32(&get_field(&record, 3)).min(100),
        });
    }
    Ok(subjects)
}

fn load_units(path: &Path) -> Result<Vec<Unit>> {
    let Some(mut reader) = open_reader(path)? else {
        return Ok(Vec::new());
    };
    let mut units = Vec::new();
    for result in reader.records() {
        let record = result?;
        units.push(Unit {
            id: id_or_new(get_field(&record, 0)),
            subject_id: get_field(&record, 1),
            name: get_field(&record, 2),
            sort_order: parse_u32(&get_field(&record, 3)),
        });
    }
    Ok(units)
}

fn load_topics(path: &Path) -> Result<Vec<Topic>> {
    let Some(mut reader) = open_reader(path)? else {
        return Ok(Vec::new());
    };
    let mut topics = Vec::new();
    for result in reader.records() {
        let record = result?;

        let difficulty_raw = get_field(&record, 4);
        let difficulty = if difficulty_raw.trim().is_empty() {
            crate::topic::Difficulty::Medium
        } else {
            difficulty_raw.parse::<crate::topic::Difficulty>()?
        };

        let confidence_raw = get_field(&record, 5);
        let confidence = if confidence_raw.trim().is_empty() {
            None
        } else {
            Some(confidence_raw.parse::<crate::topic::Confidence>()?)
        };

        let content_raw = get_field(&record, 13);
        let content: TopicContent = if content_raw.trim().is_empty() {
            TopicContent::default()
        } else {
            serde_json::from_str(&content_raw)?
        };

        let required_raw = get_field(&record, 7);
        let required_reviews = if required_raw.trim().is_empty() {
            crate::scheduler::required_reviews(difficulty)
        } else {
            parse_u32(&required_raw)
        };

        topics.push(Topic {
            id: id_or_new(get_field(&record, 0)),
            unit_id: get_field(&record, 1),
            name: get_field(&record, 2),
            is_completed: parse_bool(&get_field(&record, 3)),
            difficulty,
            confidence,
            review_count: parse_u32(&get_field(&record, 6)),
            required_reviews,
            next_review: parse_optional_timestamp(&get_field(&record, 8), path)?,
            last_reviewed: parse_optional_timestamp(&get_field(&record, 9), path)?,
            revision_interval_days: parse_optional_f64(&get_field(&record, 10)),
            sort_order: parse_u32(&get_field(&record, 11)),
            notes: get_field(&record, 12),
            content,
        });
    }
    Ok(topics)
}

fn save_subjects(path: &Path, subjects: &[Subject]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(SUBJECT_HEADER)?;
    for s in subjects {
        writer.write_record([&s.id, &s.name, &s.color, &s.progress.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn save_units(path: &Path, units: &[Unit]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(UNIT_HEADER)?;
    for u in units {
        writer.write_record([&u.id, &u.subject_id, &u.name, &u.sort_order.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn save_topics(path: &Path, topics: &[Topic]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(TOPIC_HEADER)?;
    for t in topics {
        let content = if t.content.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&t.content)?
        };
        writer.write_record([
            t.id.clone(),
            t.unit_id.clone(),
            t.name.clone(),
            t.is_completed.to_string(),
            t.difficulty.to_string(),
            t.confidence.map_or(String::new(), |c| c.to_string()),
            t.review_count.to_string(),
            t.required_reviews.to_string(),
            format_timestamp(t.next_review),
            format_timestamp(t.last_reviewed),
            t.revision_interval_days
                .map_or(String::new(), |d| d.to_string()),
            t.sort_order.to_string(),
            t.notes.clone(),
            content,
        ])?;
    }
    writer.flush()?;
    Ok(())
}

impl Library {
    /// Loads a data directory. Missing files are read as empty tables.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Library> {
        let dir = dir.into();
        let library = Library {
            subjects: load_subjects(&dir.join(SUBJECTS_FILE))?,
            units: load_units(&dir.join(UNITS_FILE))?,
            topics: load_topics(&dir.join(TOPICS_FILE))?,
            dir,
        };
        tracing::info!(
            dir = %library.dir.display(),
            subjects = library.subjects.len(),
            units = library.units.len(),
            topics = library.topics.len(),
            "loaded library"
        );
        Ok(library)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        save_subjects(&self.dir.join(SUBJECTS_FILE), &self.subjects)?;
        save_units(&self.dir.join(UNITS_FILE), &self.units)?;
        self.save_topics()
    }

    /// Writes only `topics.csv`, which is all a review touches.
    pub fn save_topics(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        save_topics(&self.dir.join(TOPICS_FILE), &self.topics)?;
        tracing::debug!(dir = %self.dir.display(), topics = self.topics.len(), "saved topics");
        Ok(())
    }

    pub fn subject(&self, id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn topic(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// Units of a subject, in `sort_order`.
    pub fn units_of(&self, subject_id: &str) -> Vec<&Unit> {
        let mut units: Vec<&Unit> = self
            .units
            .iter()
            .filter(|u| u.subject_id == subject_id)
            .collect();
        units.sort_by_key(|u| u.sort_order);
        units
    }

    /// Topics of a unit, in `sort_order`.
    pub fn topics_of(&self, unit_id: &str) -> Vec<&Topic> {
        let mut topics: Vec<&Topic> = self.topics.iter().filter(|t| t.unit_id == unit_id).collect();
        topics.sort_by_key(|t| t.sort_order);
        topics
    }

    pub fn topics_of_subject(&self, subject_id: &str) -> Vec<&Topic> {
        self.units_of(subject_id)
            .into_iter()
            .flat_map(|u| self.topics_of(&u.id))
            .collect()
    }

    /// Subject that owns a topic, through its unit.
    pub fn subject_of_topic(&self, topic: &Topic) -> Option<&Subject> {
        self.unit(&topic.unit_id)
            .and_then(|u| self.subject(&u.subject_id))
    }

    /// Topics the learner has finished studying; only these enter review.
    pub fn completed_topics(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter().filter(|t| t.is_completed)
    }

    /// Replaces the stored topic with the same id and writes `topics.csv`.
    /// If the write fails the previous topic is put back, so memory never
    /// holds a change that did not reach disk.
    pub fn commit_topic(&mut self, topic: Topic) -> Result<()> {
        let pos = self
            .topics
            .iter()
            .position(|t| t.id == topic.id)
            .ok_or_else(|| Error::NotFound {
                kind: "topic",
                id: topic.id.clone(),
            })?;
        let previous = std::mem::replace(&mut self.topics[pos], topic);
        if let Err(e) = self.save_topics() {
            self.topics[pos] = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Runs `update` on the topic with `id` and returns its result.
    pub fn update_topic<F, R>(&mut self, id: &str, update: F) -> Result<R>
    where
        F: FnOnce(&mut Topic) -> R,
    {
        let topic = self
            .topics
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound {
                kind: "topic",
                id: id.to_string(),
            })?;
        Ok(update(topic))
    }

    pub fn insert_subject(&mut self, name: &str, color: &str) -> &Subject {
        self.subjects.push(Subject {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            color: color.to_string(),
            progress: 0,
        });
        &self.subjects[self.subjects.len() - 1]
    }

    pub fn insert_unit(&mut self, subject_id: &str, name: &str) -> Result<&Unit> {
        if self.subject(subject_id).is_none() {
            return Err(Error::NotFound {
                kind: "subject",
                id: subject_id.to_string(),
            });
        }
        let sort_order = self.units_of(subject_id).len() as u32;
        self.units.push(Unit {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            name: name.to_string(),
            sort_order,
        });
        Ok(&self.units[self.units.len() - 1])
    }

    pub fn insert_topic(&mut self, mut topic: Topic) -> Result<&Topic> {
        if self.unit(&topic.unit_id).is_none() {
            return Err(Error::NotFound {
                kind: "unit",
                id: topic.unit_id.clone(),
            });
        }
        topic.sort_order = self.topics_of(&topic.unit_id).len() as u32;
        self.topics.push(topic);
        Ok(&self.topics[self.topics.len() - 1])
    }

    pub fn delete_topic(&mut self, id: &str) -> Result<Topic> {
        let pos = self
            .topics
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::NotFound {
                kind: "topic",
                id: id.to_string(),
            })?;
        Ok(self.topics.remove(pos))
    }

    /// Removes a unit and its topics.
    pub fn delete_unit(&mut self, id: &str) -> Result<Unit> {
        let pos = self
            .units
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| Error::NotFound {
                kind: "unit",
                id: id.to_string(),
            })?;
        self.topics.retain(|t| t.unit_id != id);
        Ok(self.units.remove(pos))
    }

    /// Removes a subject with all of its units and topics.
    pub fn delete_subject(&mut self, id: &str) -> Result<Subject> {
        let pos = self
            .subjects
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::NotFound {
                kind: "subject",
                id: id.to_string(),
            })?;
        let unit_ids: Vec<String> = self
            .units
            .iter()
            .filter(|u| u.subject_id == id)
            .map(|u| u.id.clone())
            .collect();
        self.topics.retain(|t| !unit_ids.contains(&t.unit_id));
        self.units.retain(|u| u.subject_id != id);
        Ok(self.subjects.remove(pos))
    }
}
