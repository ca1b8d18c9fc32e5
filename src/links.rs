//! Link records: resources grouped by petal and topic.

use std::borrow::Cow;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::schema::{self, NormalizedRow, LINK_SCHEMA};
use crate::search::Searchable;
use crate::storage::TableStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub petal: String,
    pub topic: String,
    pub detail: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub name: String,
    pub description: String,
    pub url: String,
}

impl LinkRecord {
    pub fn from_normalized(row: &NormalizedRow) -> Self {
        let year = schema::parse_whole(row.get("year")).and_then(|value| i32::try_from(value).ok());
        Self {
            petal: row.get("petal").to_string(),
            topic: row.get("topic").to_string(),
            detail: row.get("detail").to_string(),
            kind: row.get("kind").to_string(),
            created_date: schema::parse_spanish_date(row.get("created"), year),
            year,
            name: row.get("name").to_string(),
            description: row.get("description").to_string(),
            url: row.get("url").to_string(),
        }
    }
}

impl Searchable for LinkRecord {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![
            Cow::Borrowed(self.petal.as_str()),
            Cow::Borrowed(self.topic.as_str()),
            Cow::Borrowed(self.detail.as_str()),
            Cow::Borrowed(self.kind.as_str()),
        ];
        if let Some(date) = self.created_date {
            fields.push(Cow::Owned(date.format("%Y-%m-%d").to_string()));
        }
        if let Some(year) = self.year {
            fields.push(Cow::Owned(year.to_string()));
        }
        fields.extend([
            Cow::Borrowed(self.name.as_str()),
            Cow::Borrowed(self.description.as_str()),
            Cow::Borrowed(self.url.as_str()),
        ]);
        fields
    }
}

/// Load every link, in sheet order.
pub fn load_links(store: &dyn TableStore, table: &str) -> Result<Vec<LinkRecord>> {
    let rows = store.fetch_rows(table)?;
    Ok(LINK_SCHEMA
        .normalize_rows(table, &rows)
        .iter()
        .map(LinkRecord::from_normalized)
        .collect())
}

/// Petals in first-appearance order.
pub fn petals(links: &[LinkRecord]) -> Vec<&str> {
    let mut seen = Vec::new();
    for link in links {
        let petal = link.petal.as_str();
        if !petal.is_empty() && !seen.contains(&petal) {
            seen.push(petal);
        }
    }
    seen
}

/// Links sorted newest first; undated links go last, keeping sheet order.
pub fn newest_first(links: &mut [LinkRecord]) {
    links.sort_by(|left, right| right.created_date.cmp(&left.created_date));
}
