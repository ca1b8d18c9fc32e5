//! acuerdos tasks commands
//!
//! Views over the chore catalog and the submission ledger. Read views degrade
//! to empty data when a sheet is unavailable; `submit` does not.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::{
    DateWindow, LedgerAggregator, PendingTasks, PersonContribution, TopicBreakdown, TopicCompletion,
};
use crate::cli::Context;
use crate::error::Result;
use crate::ledger::{self, Submission, TaskDefinition, TaskEvent};
use crate::output::Report;
use crate::search::search_records;

pub struct ListOptions {
    pub topic: Option<String>,
    pub search: Option<String>,
}

pub struct SubmitOptions {
    pub topic: String,
    pub zone: String,
    pub description: String,
    pub percent: i64,
    pub notes: String,
}

pub struct BreakdownOptions {
    pub topic: String,
    pub window: DateWindow,
    pub history: bool,
}

fn load_catalog(ctx: &Context, warnings: &mut Vec<String>) -> Result<Vec<TaskDefinition>> {
    ctx.load_or_empty(&ctx.config.tables.tasks, ledger::load_catalog, warnings)
}

fn load_ledger(ctx: &Context, warnings: &mut Vec<String>) -> Result<Vec<TaskEvent>> {
    ctx.load_or_empty(&ctx.config.tables.ledger, ledger::load_ledger, warnings)
}

fn describe_task(task: &TaskDefinition) -> String {
    format!("{} / {}: {}", task.topic, task.zone, task.description)
}

fn describe_event(event: &TaskEvent) -> String {
    let when = event
        .timestamp
        .map(|ts| ts.format(ledger::TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "?".to_string());
    let mut line = format!(
        "{when} {} {}% {} / {}",
        event.person, event.percent, event.zone, event.description
    );
    if !event.notes.is_empty() {
        line.push_str(&format!(" ({})", event.notes));
    }
    line
}

#[derive(Serialize)]
struct TopicSummary<'a> {
    topic: &'a str,
    tasks: usize,
}

pub fn run_topics(ctx: &Context) -> Result<()> {
    let mut warnings = Vec::new();
    let catalog = load_catalog(ctx, &mut warnings)?;
    let aggregator = LedgerAggregator::new(&catalog, &[]);

    let topics: Vec<TopicSummary> = aggregator
        .topics()
        .into_iter()
        .map(|topic| TopicSummary {
            topic,
            tasks: aggregator.tasks_for_topic(topic).len(),
        })
        .collect();

    let mut report = Report::new("acuerdos tasks topics");
    report.fact("topics", topics.len());
    for summary in &topics {
        report.line(format!("{} ({} chores)", summary.topic, summary.tasks));
    }
    report.warn_all(warnings);

    ctx.emit(&topics, report)
}

pub fn run_list(ctx: &Context, options: ListOptions) -> Result<()> {
    let mut warnings = Vec::new();
    let catalog = load_catalog(ctx, &mut warnings)?;

    let in_topic: Vec<TaskDefinition> = match options.topic.as_deref() {
        Some(topic) => LedgerAggregator::new(&catalog, &[])
            .tasks_for_topic(topic)
            .into_iter()
            .cloned()
            .collect(),
        None => catalog.clone(),
    };
    let query = options.search.unwrap_or_default();
    let tasks = search_records(&in_topic, &query, ctx.config.search.threshold);

    let mut report = Report::new(match options.topic.as_deref() {
        Some(topic) => format!("acuerdos tasks list: {topic}"),
        None => "acuerdos tasks list".to_string(),
    });
    report.fact("chores", tasks.len());
    for task in &tasks {
        report.line(describe_task(task));
    }
    report.warn_all(warnings);

    ctx.emit(&tasks, report)
}

#[derive(Serialize)]
struct PendingView<'a> {
    person: &'a str,
    week: DateWindow,
    pending: &'a PendingTasks,
}

pub fn run_pending(ctx: &Context) -> Result<()> {
    let person = ctx.person()?;
    let mut warnings = Vec::new();
    let catalog = load_catalog(ctx, &mut warnings)?;
    let events = load_ledger(ctx, &mut warnings)?;

    let week = DateWindow::iso_week_of(ctx.now);
    let pending = LedgerAggregator::new(&catalog, &events).pending_tasks_for(&person, ctx.now);

    let mut report = Report::new(format!("acuerdos tasks pending: {person}")).over(week);
    report.fact("pending", pending.task_count());
    for topic in &pending.topics {
        for task in &topic.tasks {
            let mut line = describe_task(&task.definition);
            if task.prior_percent > 0 {
                line.push_str(&format!(" (in progress: {}%)", task.prior_percent));
            }
            report.line(line);
        }
    }
    if pending.is_empty() {
        report.line("all chores done this week");
    }
    report.warn_all(warnings);

    let view = PendingView {
        person: &person,
        week,
        pending: &pending,
    };
    ctx.emit(&view, report)
}

#[derive(Serialize)]
struct Submitted<'a> {
    event: &'a TaskEvent,
    remaining: usize,
}

pub fn run_submit(ctx: &Context, options: SubmitOptions) -> Result<()> {
    let person = ctx.person()?;
    let tables = &ctx.config.tables;

    let catalog = ledger::load_catalog(ctx.store(), &tables.tasks)?;
    let task = ledger::find_task(&catalog, &options.topic, &options.zone, &options.description)?;
    let submission = Submission::new(&person, task.clone(), options.percent, options.notes)?;
    let event = ledger::submit(ctx.store(), &tables.ledger, submission, ctx.now)?;

    // The append invalidated the cached ledger, so this read sees the new row.
    let mut warnings = Vec::new();
    let events = load_ledger(ctx, &mut warnings)?;
    let remaining = LedgerAggregator::new(&catalog, &events)
        .pending_tasks_for(&person, ctx.now)
        .task_count();

    let mut report = Report::new("acuerdos tasks submit: recorded");
    report
        .fact("chore", describe_task(task))
        .fact("status", event.status.label())
        .fact("percent", format!("{}%", event.percent))
        .fact("pending this week", remaining)
        .warn_all(warnings);

    ctx.emit(
        &Submitted {
            event: &event,
            remaining,
        },
        report,
    )
}

#[derive(Serialize)]
struct Ratios {
    window: DateWindow,
    topics: BTreeMap<String, TopicCompletion>,
}

pub fn run_ratios(ctx: &Context, window: DateWindow) -> Result<()> {
    let mut warnings = Vec::new();
    let catalog = load_catalog(ctx, &mut warnings)?;
    let events = load_ledger(ctx, &mut warnings)?;

    let ratios = Ratios {
        window,
        topics: LedgerAggregator::new(&catalog, &events).topic_completion_ratios(&window),
    };

    let mut report = Report::new("acuerdos tasks ratios").over(window);
    report.fact("topics", ratios.topics.len());
    for (topic, completion) in &ratios.topics {
        report.line(format!(
            "{topic}: {:.1}% ({} done / {} chores)",
            completion.ratio_percent, completion.completed, completion.total
        ));
    }
    report.warn_all(warnings);

    ctx.emit(&ratios, report)
}

#[derive(Serialize)]
struct Breakdown {
    window: DateWindow,
    #[serde(flatten)]
    breakdown: TopicBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<Vec<TaskEvent>>,
}

pub fn run_breakdown(ctx: &Context, options: BreakdownOptions) -> Result<()> {
    let mut warnings = Vec::new();
    let catalog = load_catalog(ctx, &mut warnings)?;
    let events = load_ledger(ctx, &mut warnings)?;

    let aggregator = LedgerAggregator::new(&catalog, &events);
    let breakdown = aggregator.topic_breakdown(&options.topic, &options.window);
    let history = options
        .history
        .then(|| aggregator.topic_history(&options.topic, &options.window));

    let mut report = Report::new(format!("acuerdos tasks breakdown: {}", breakdown.topic))
        .over(options.window);
    report
        .fact("done", breakdown.done.len())
        .fact("in progress", breakdown.in_progress.len())
        .fact("pending", breakdown.pending.len());
    for event in &breakdown.done {
        report.line(format!("done: {}", describe_event(event)));
    }
    for event in &breakdown.in_progress {
        report.line(format!("in progress: {}", describe_event(event)));
    }
    for task in &breakdown.pending {
        report.line(format!("pending: {} / {}", task.zone, task.description));
    }
    for event in history.iter().flatten() {
        report.line(format!("history: {}", describe_event(event)));
    }
    report.warn_all(warnings);

    ctx.emit(
        &Breakdown {
            window: options.window,
            breakdown,
            history,
        },
        report,
    )
}

#[derive(Serialize)]
struct Contribution {
    window: DateWindow,
    #[serde(flatten)]
    contribution: PersonContribution,
}

pub fn run_contribution(ctx: &Context, window: DateWindow) -> Result<()> {
    let person = ctx.person()?;
    let mut warnings = Vec::new();
    let catalog = load_catalog(ctx, &mut warnings)?;
    let events = load_ledger(ctx, &mut warnings)?;

    let contribution = LedgerAggregator::new(&catalog, &events).person_contribution(&person, &window);

    let mut report = Report::new(format!("acuerdos tasks contribution: {}", contribution.person))
        .over(window);
    report
        .fact("submissions", contribution.events)
        .fact("catalog chores", contribution.catalog_size)
        .fact("ratio", format!("{:.1}%", contribution.total_ratio_percent));
    for (topic, count) in &contribution.by_topic {
        report.line(format!("{topic}: {count}"));
    }
    report.warn_all(warnings);

    ctx.emit(
        &Contribution {
            window,
            contribution,
        },
        report,
    )
}
