//! acuerdos agreements commands

use serde::Serialize;

use crate::agreements::{self, Agreement, ExternalAgreement, TopicAgreements};
use crate::cli::Context;
use crate::error::Result;
use crate::output::Report;
use crate::search::search_records;

pub struct InternalOptions {
    pub topic: Option<String>,
    pub all: bool,
    pub search: Option<String>,
}

pub struct ExternalOptions {
    pub kind: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize)]
struct InternalAgreements<'a> {
    topics: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    groups: Vec<TopicAgreements<'a>>,
}

fn describe_agreement(agreement: &Agreement) -> String {
    match agreement.order {
        Some(order) => format!("{order}. {}", agreement.text),
        None => agreement.text.clone(),
    }
}

pub fn run_internal(ctx: &Context, options: InternalOptions) -> Result<()> {
    let mut warnings = Vec::new();
    let loaded = ctx.load_or_empty(
        &ctx.config.tables.internal_agreements,
        agreements::load_internal,
        &mut warnings,
    )?;
    let query = options.search.unwrap_or_default();
    let records: Vec<Agreement> = search_records(&loaded, &query, ctx.config.search.threshold)
        .into_iter()
        .cloned()
        .collect();

    let groups = if options.all {
        agreements::grouped(&records)
    } else if let Some(topic) = options.topic.as_deref() {
        vec![TopicAgreements {
            topic,
            agreements: agreements::for_topic(&records, topic),
        }]
    } else {
        Vec::new()
    };

    let listing = InternalAgreements {
        topics: agreements::topics(&records),
        groups,
    };

    let mut report = Report::new("acuerdos agreements internal");
    report.fact("topics", listing.topics.len());
    if listing.groups.is_empty() {
        for topic in &listing.topics {
            report.line(*topic);
        }
        report.next_step("acuerdos agreements internal --topic <topic>");
    }
    for group in &listing.groups {
        report.line(format!("{} ({})", group.topic, group.agreements.len()));
        for agreement in &group.agreements {
            report.line(format!("  {}", describe_agreement(agreement)));
        }
    }
    report.warn_all(warnings);

    ctx.emit(&listing, report)
}

#[derive(Serialize)]
struct ExternalAgreements<'a> {
    kinds: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    entries: Vec<&'a ExternalAgreement>,
}

pub fn run_external(ctx: &Context, options: ExternalOptions) -> Result<()> {
    let mut warnings = Vec::new();
    let loaded = ctx.load_or_empty(
        &ctx.config.tables.external_agreements,
        agreements::load_external,
        &mut warnings,
    )?;
    let query = options.search.unwrap_or_default();
    let records: Vec<ExternalAgreement> =
        search_records(&loaded, &query, ctx.config.search.threshold)
            .into_iter()
            .cloned()
            .collect();

    let entries = match options.kind.as_deref() {
        Some(kind) => agreements::for_kind(&records, kind),
        None => Vec::new(),
    };
    let listing = ExternalAgreements {
        kinds: agreements::kinds(&records),
        kind: options.kind.as_deref(),
        entries,
    };

    let mut report = Report::new(match listing.kind {
        Some(kind) => format!("acuerdos agreements external: {kind}"),
        None => "acuerdos agreements external".to_string(),
    });
    report.fact("kinds", listing.kinds.join(", "));
    for entry in &listing.entries {
        report.line(format!("{}: {}", entry.aspect, entry.detail));
    }
    if listing.kind.is_none() {
        report.next_step("acuerdos agreements external --kind <kind>");
    }
    report.warn_all(warnings);

    ctx.emit(&listing, report)
}
