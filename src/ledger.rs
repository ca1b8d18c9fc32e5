//! Weekly chore catalog and the append-only ledger of submissions.
//!
//! The catalog (`tareas_semaneros`) defines the chores; the ledger
//! (`registro_tareas`) collects one row per submission and is never edited.
//! A submission records who worked on which chore, how far they got and any
//! notes. Status is derived from the percent at submission time.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{self, NormalizedRow, EVENT_SCHEMA, TASK_SCHEMA};
use crate::search::Searchable;
use crate::storage::TableStore;

/// Timestamp format used in the persisted ledger
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Percent that marks a chore as done
pub const DONE_PERCENT: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TaskDefinition {
    pub topic: String,
    pub zone: String,
    pub description: String,
}

impl TaskDefinition {
    pub fn new(
        topic: impl Into<String>,
        zone: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            zone: zone.into(),
            description: description.into(),
        }
    }

    pub fn key(&self) -> TaskKey {
        TaskKey::new(&self.topic, &self.zone, &self.description)
    }

    fn from_normalized(row: &NormalizedRow) -> Self {
        Self::new(row.get("topic"), row.get("zone"), row.get("description"))
    }
}

impl Searchable for TaskDefinition {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.topic.as_str()),
            Cow::Borrowed(self.zone.as_str()),
            Cow::Borrowed(self.description.as_str()),
        ]
    }
}

/// Identity of a chore, compared without regard to case or surrounding spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    topic: String,
    zone: String,
    description: String,
}

impl TaskKey {
    pub fn new(topic: &str, zone: &str, description: &str) -> Self {
        Self {
            topic: fold_text(topic),
            zone: fold_text(zone),
            description: fold_text(description),
        }
    }
}

/// Case-insensitive, trimmed form used for identity comparisons.
pub fn fold_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Whether two identity fields (person, topic, ...) refer to the same thing.
pub fn same_text(left: &str, right: &str) -> bool {
    fold_text(left) == fold_text(right)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Sí")]
    Done,
    #[serde(rename = "En proceso")]
    InProgress,
}

impl TaskStatus {
    pub fn from_percent(percent: u8) -> Self {
        if percent >= DONE_PERCENT {
            TaskStatus::Done
        } else {
            TaskStatus::InProgress
        }
    }

    /// Status cell as stored in the sheet.
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Done => "Sí",
            TaskStatus::InProgress => "En proceso",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match schema::fold(raw).as_str() {
            "" => None,
            "si" | "done" | "hecha" | "hecho" | "true" => Some(TaskStatus::Done),
            _ => Some(TaskStatus::InProgress),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskEvent {
    /// Absent when the sheet cell could not be read; such events are left out
    /// of every week or window view.
    pub timestamp: Option<NaiveDateTime>,
    pub person: String,
    pub topic: String,
    pub zone: String,
    pub description: String,
    pub status: TaskStatus,
    pub percent: u8,
    pub notes: String,
}

impl TaskEvent {
    pub fn key(&self) -> TaskKey {
        TaskKey::new(&self.topic, &self.zone, &self.description)
    }

    pub fn is_done(&self) -> bool {
        self.percent >= DONE_PERCENT
    }

    pub fn is_in_progress(&self) -> bool {
        self.percent > 0 && self.percent < DONE_PERCENT
    }

    /// Cells in ledger column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            self.person.clone(),
            self.topic.clone(),
            self.zone.clone(),
            self.description.clone(),
            self.status.label().to_string(),
            self.percent.to_string(),
            self.notes.clone(),
        ]
    }

    fn from_normalized(table: &str, row_number: usize, row: &NormalizedRow) -> Self {
        let timestamp = schema::parse_timestamp(row.get("timestamp"));
        if timestamp.is_none() {
            let err = Error::MalformedRow {
                table: table.to_string(),
                row: row_number,
                reason: format!("unreadable timestamp '{}'", row.get("timestamp")),
            };
            tracing::warn!(error = %err, "event left out of week views");
        }

        let percent = match schema::parse_percent(row.get("percent")) {
            Some(percent) => percent,
            None => {
                if !row.get("percent").is_empty() {
                    let err = Error::MalformedRow {
                        table: table.to_string(),
                        row: row_number,
                        reason: format!("non-numeric percent '{}'", row.get("percent")),
                    };
                    tracing::warn!(error = %err, "percent treated as 0");
                }
                0
            }
        };

        let status = TaskStatus::parse(row.get("status"))
            .unwrap_or_else(|| TaskStatus::from_percent(percent));

        Self {
            timestamp,
            person: row.get("person").to_string(),
            topic: row.get("topic").to_string(),
            zone: row.get("zone").to_string(),
            description: row.get("description").to_string(),
            status,
            percent,
            notes: row.get("notes").to_string(),
        }
    }
}

/// A chore update about to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct Submission {
    person: String,
    task: TaskDefinition,
    percent: u8,
    notes: String,
}

impl Submission {
    /// Percent is clamped to 0..=100.
    pub fn new(
        person: &str,
        task: TaskDefinition,
        percent: i64,
        notes: impl Into<String>,
    ) -> Result<Self> {
        let person = person.trim();
        if person.is_empty() {
            return Err(Error::InvalidArgument(
                "person cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            person: person.to_string(),
            task,
            percent: percent.clamp(0, i64::from(DONE_PERCENT)) as u8,
            notes: notes.into().trim().to_string(),
        })
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn into_event(self, now: NaiveDateTime) -> TaskEvent {
        TaskEvent {
            timestamp: Some(now),
            person: self.person,
            topic: self.task.topic,
            zone: self.task.zone,
            description: self.task.description,
            status: TaskStatus::from_percent(self.percent),
            percent: self.percent,
            notes: self.notes,
        }
    }
}

/// Look up a catalog chore by its identity fields.
pub fn find_task<'a>(
    catalog: &'a [TaskDefinition],
    topic: &str,
    zone: &str,
    description: &str,
) -> Result<&'a TaskDefinition> {
    let key = TaskKey::new(topic, zone, description);
    catalog
        .iter()
        .find(|task| task.key() == key)
        .ok_or_else(|| Error::UnknownTask {
            topic: topic.trim().to_string(),
            zone: zone.trim().to_string(),
            description: description.trim().to_string(),
        })
}

/// Load the chore catalog, in sheet order.
pub fn load_catalog(store: &dyn TableStore, table: &str) -> Result<Vec<TaskDefinition>> {
    let rows = store.fetch_rows(table)?;
    Ok(TASK_SCHEMA
        .normalize_rows(table, &rows)
        .iter()
        .map(TaskDefinition::from_normalized)
        .collect())
}

/// Load the ledger. Bad cells are coerced, never fatal.
pub fn load_ledger(store: &dyn TableStore, table: &str) -> Result<Vec<TaskEvent>> {
    let rows = store.fetch_rows(table)?;
    Ok(EVENT_SCHEMA
        .normalize_rows(table, &rows)
        .iter()
        .enumerate()
        .map(|(idx, row)| TaskEvent::from_normalized(table, idx + 2, row))
        .collect())
}

/// Append a submission to the ledger and return the stored event.
pub fn submit(
    store: &dyn TableStore,
    table: &str,
    submission: Submission,
    now: NaiveDateTime,
) -> Result<TaskEvent> {
    let event = submission.into_event(now);
    store.append_row(table, &event.to_row())?;
    tracing::debug!(
        table,
        person = %event.person,
        topic = %event.topic,
        percent = event.percent,
        "submission appended"
    );
    Ok(event)
}
