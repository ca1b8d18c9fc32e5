//! acuerdos links commands

use serde::Serialize;

use crate::cli::Context;
use crate::error::{Error, Result};
use crate::ledger::same_text;
use crate::links::{self, LinkRecord};
use crate::output::Report;
use crate::search::{normalize_query, search_records};

pub struct SearchOptions {
    pub query: Option<String>,
    pub threshold: Option<f64>,
    pub petal: Option<String>,
    pub newest: bool,
}

#[derive(Serialize)]
struct SearchResult<'a> {
    query: String,
    threshold: f64,
    total: usize,
    petals: Vec<&'a str>,
    links: Vec<&'a LinkRecord>,
}

pub fn run_search(ctx: &Context, options: SearchOptions) -> Result<()> {
    let threshold = options.threshold.unwrap_or(ctx.config.search.threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::InvalidArgument(format!(
            "threshold must be between 0 and 1, got {threshold}"
        )));
    }

    let mut warnings = Vec::new();
    let mut records =
        ctx.load_or_empty(&ctx.config.tables.links, links::load_links, &mut warnings)?;
    if options.newest {
        links::newest_first(&mut records);
    }

    let query = normalize_query(options.query.as_deref().unwrap_or_default());
    let matched: Vec<&LinkRecord> = search_records(&records, &query, threshold)
        .into_iter()
        .filter(|link| {
            options
                .petal
                .as_deref()
                .map_or(true, |petal| same_text(&link.petal, petal))
        })
        .collect();

    let found = SearchResult {
        query: query.clone(),
        threshold,
        total: records.len(),
        petals: links::petals(&records),
        links: matched,
    };

    let mut report = Report::new(if query.is_empty() {
        "acuerdos links search".to_string()
    } else {
        format!("acuerdos links search: \"{query}\"")
    });
    report.fact("matched", format!("{} of {}", found.links.len(), found.total));
    if !found.petals.is_empty() {
        report.fact("petals", found.petals.join(", "));
    }
    for link in &found.links {
        report.line(describe_link(link));
    }
    report.warn_all(warnings);
    if found.links.is_empty() && !query.is_empty() {
        report.next_step("try a shorter query or a lower --threshold");
    }

    ctx.emit(&found, report)
}

fn describe_link(link: &LinkRecord) -> String {
    let mut line = if link.name.is_empty() {
        link.url.clone()
    } else {
        format!("{} <{}>", link.name, link.url)
    };
    let scope: Vec<&str> = [link.petal.as_str(), link.topic.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    if !scope.is_empty() {
        line.push_str(&format!(" [{}]", scope.join(" / ")));
    }
    if let Some(date) = link.created_date {
        line.push_str(&format!(" {}", date.format("%Y-%m-%d")));
    }
    if !link.description.is_empty() {
        line.push_str(&format!(": {}", link.description));
    }
    line
}
