//! Community agreements: internal house rules by topic, and external
//! communication agreements by kind.

use std::borrow::Cow;

use serde::Serialize;

use crate::error::Result;
use crate::ledger::same_text;
use crate::schema::{self, NormalizedRow, AGREEMENT_SCHEMA, EXTERNAL_AGREEMENT_SCHEMA};
use crate::search::Searchable;
use crate::storage::TableStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agreement {
    pub topic: String,
    /// Position within the topic; `None` when the sheet cell is not a number.
    pub order: Option<u32>,
    pub text: String,
}

impl Agreement {
    fn from_normalized(row: &NormalizedRow) -> Self {
        Self {
            topic: row.get("topic").to_string(),
            order: schema::parse_whole(row.get("order")).and_then(|value| u32::try_from(value).ok()),
            text: row.get("text").to_string(),
        }
    }
}

impl Searchable for Agreement {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.topic.as_str()), Cow::Borrowed(self.text.as_str())]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalAgreement {
    pub kind: String,
    pub aspect: String,
    pub detail: String,
}

impl ExternalAgreement {
    fn from_normalized(row: &NormalizedRow) -> Self {
        Self {
            kind: row.get("kind").to_string(),
            aspect: row.get("aspect").to_string(),
            detail: row.get("detail").to_string(),
        }
    }
}

impl Searchable for ExternalAgreement {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.kind.as_str()),
            Cow::Borrowed(self.aspect.as_str()),
            Cow::Borrowed(self.detail.as_str()),
        ]
    }
}

/// Agreements of one topic, ordered.
#[derive(Debug, Clone, Serialize)]
pub struct TopicAgreements<'a> {
    pub topic: &'a str,
    pub agreements: Vec<&'a Agreement>,
}

pub fn load_internal(store: &dyn TableStore, table: &str) -> Result<Vec<Agreement>> {
    let rows = store.fetch_rows(table)?;
    Ok(AGREEMENT_SCHEMA
        .normalize_rows(table, &rows)
        .iter()
        .map(Agreement::from_normalized)
        .collect())
}

pub fn load_external(store: &dyn TableStore, table: &str) -> Result<Vec<ExternalAgreement>> {
    let rows = store.fetch_rows(table)?;
    Ok(EXTERNAL_AGREEMENT_SCHEMA
        .normalize_rows(table, &rows)
        .iter()
        .map(ExternalAgreement::from_normalized)
        .collect())
}

fn first_appearance<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen: Vec<&'a str> = Vec::new();
    for value in values {
        if !value.is_empty() && !seen.iter().any(|known| same_text(known, value)) {
            seen.push(value);
        }
    }
    seen
}

/// Topics in first-appearance order.
pub fn topics(agreements: &[Agreement]) -> Vec<&str> {
    first_appearance(agreements.iter().map(|agreement| agreement.topic.as_str()))
}

/// Agreements of `topic` by order; unnumbered ones go last in sheet order.
pub fn for_topic<'a>(agreements: &'a [Agreement], topic: &str) -> Vec<&'a Agreement> {
    let mut selected: Vec<&Agreement> = agreements
        .iter()
        .filter(|agreement| same_text(&agreement.topic, topic))
        .collect();
    selected.sort_by_key(|agreement| (agreement.order.is_none(), agreement.order));
    selected
}

/// Every topic with its ordered agreements.
pub fn grouped(agreements: &[Agreement]) -> Vec<TopicAgreements<'_>> {
    topics(agreements)
        .into_iter()
        .map(|topic| TopicAgreements {
            topic,
            agreements: for_topic(agreements, topic),
        })
        .collect()
}

/// External agreement kinds in first-appearance order.
pub fn kinds(agreements: &[ExternalAgreement]) -> Vec<&str> {
    first_appearance(agreements.iter().map(|agreement| agreement.kind.as_str()))
}

/// Entries of one kind, in sheet order.
pub fn for_kind<'a>(agreements: &'a [ExternalAgreement], kind: &str) -> Vec<&'a ExternalAgreement> {
    agreements
        .iter()
        .filter(|agreement| same_text(&agreement.kind, kind))
        .collect()
}
