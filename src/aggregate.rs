//! Views derived from the chore catalog and the submission ledger.
//!
//! Every view is recomputed from a full snapshot; nothing here is cached or
//! mutated. Events without a readable timestamp fall outside every window.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::ledger::{fold_text, same_text, TaskDefinition, TaskEvent, TaskKey};

/// Inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidArgument(format!(
                "window start {start} is after its end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Whole days, from the start of `start` to the end of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        Self::new(start.and_time(NaiveTime::MIN), end_of_day(end))
    }

    /// Monday 00:00 through Sunday 23:59:59.999999999 of the ISO week containing `now`.
    pub fn iso_week_of(now: NaiveDateTime) -> Self {
        let date = now.date();
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        Self {
            start: monday.and_time(NaiveTime::MIN),
            end: end_of_day(monday + Duration::days(6)),
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }

    fn contains_event(&self, event: &TaskEvent) -> bool {
        event.timestamp.is_some_and(|ts| self.contains(ts))
    }
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    (date + Duration::days(1)).and_time(NaiveTime::MIN) - Duration::nanoseconds(1)
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingTask {
    #[serde(flatten)]
    pub definition: TaskDefinition,
    /// Best percent the asking person submitted this week.
    pub prior_percent: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingTopic {
    pub topic: String,
    pub tasks: Vec<PendingTask>,
}

/// Pending chores grouped by topic, both in catalog order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PendingTasks {
    pub topics: Vec<PendingTopic>,
}

impl PendingTasks {
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.topics.iter().map(|topic| topic.tasks.len()).sum()
    }

    pub fn topic(&self, name: &str) -> Option<&PendingTopic> {
        self.topics.iter().find(|topic| same_text(&topic.topic, name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TopicCompletion {
    pub completed: usize,
    pub total: usize,
    pub ratio_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicBreakdown {
    pub topic: String,
    pub done: Vec<TaskEvent>,
    pub in_progress: Vec<TaskEvent>,
    pub pending: Vec<TaskDefinition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonContribution {
    pub person: String,
    pub events: usize,
    pub catalog_size: usize,
    /// Submissions in the window over catalog size, not a per-task completion rate.
    pub total_ratio_percent: f64,
    pub by_topic: BTreeMap<String, usize>,
}

pub struct LedgerAggregator<'a> {
    catalog: &'a [TaskDefinition],
    events: &'a [TaskEvent],
}

impl<'a> LedgerAggregator<'a> {
    pub fn new(catalog: &'a [TaskDefinition], events: &'a [TaskEvent]) -> Self {
        Self { catalog, events }
    }

    /// Catalog topics in first-appearance order.
    pub fn topics(&self) -> Vec<&'a str> {
        let mut seen: Vec<&'a str> = Vec::new();
        for task in self.catalog {
            if !seen.iter().any(|topic| same_text(topic, &task.topic)) {
                seen.push(task.topic.as_str());
            }
        }
        seen
    }

    pub fn tasks_for_topic(&self, topic: &str) -> Vec<&'a TaskDefinition> {
        self.catalog
            .iter()
            .filter(|task| same_text(&task.topic, topic))
            .collect()
    }

    fn events_in<'w>(&self, window: &'w DateWindow) -> impl Iterator<Item = &'a TaskEvent> + 'w
    where
        'a: 'w,
    {
        self.events
            .iter()
            .filter(move |event| window.contains_event(event))
    }

    /// Chores nobody finished during the ISO week of `now`.
    ///
    /// A 100% submission from anyone closes the chore for everyone, and a later
    /// lower submission in the same week does not reopen it.
    pub fn pending_tasks_for(&self, person: &str, now: NaiveDateTime) -> PendingTasks {
        let week = DateWindow::iso_week_of(now);

        let mut done: HashSet<TaskKey> = HashSet::new();
        let mut prior: HashMap<TaskKey, u8> = HashMap::new();
        for event in self.events_in(&week) {
            let key = event.key();
            if event.is_done() {
                done.insert(key.clone());
            }
            if same_text(&event.person, person) {
                let best = prior.entry(key).or_insert(0);
                *best = (*best).max(event.percent);
            }
        }

        let mut pending = PendingTasks::default();
        for task in self.catalog {
            let key = task.key();
            if done.contains(&key) {
                continue;
            }
            let entry = PendingTask {
                definition: task.clone(),
                prior_percent: prior.get(&key).copied().unwrap_or(0),
            };
            match pending
                .topics
                .iter_mut()
                .find(|group| same_text(&group.topic, &task.topic))
            {
                Some(group) => group.tasks.push(entry),
                None => pending.topics.push(PendingTopic {
                    topic: task.topic.clone(),
                    tasks: vec![entry],
                }),
            }
        }
        pending
    }

    /// Done submissions per catalog topic within `window`.
    ///
    /// Every 100% submission counts, so a ratio can exceed 100. Topics without
    /// catalog chores are left out, as are submissions for unknown topics.
    pub fn topic_completion_ratios(&self, window: &DateWindow) -> BTreeMap<String, TopicCompletion> {
        let mut completed: HashMap<String, usize> = HashMap::new();
        for event in self.events_in(window).filter(|event| event.is_done()) {
            *completed.entry(fold_text(&event.topic)).or_insert(0) += 1;
        }

        self.topics()
            .into_iter()
            .filter_map(|topic| {
                let total = self.tasks_for_topic(topic).len();
                if total == 0 {
                    return None;
                }
                let done = completed.get(&fold_text(topic)).copied().unwrap_or(0);
                Some((
                    topic.to_string(),
                    TopicCompletion {
                        completed: done,
                        total,
                        ratio_percent: percent_of(done, total),
                    },
                ))
            })
            .collect()
    }

    /// Submissions for `topic` in the window, newest first.
    pub fn topic_history(&self, topic: &str, window: &DateWindow) -> Vec<TaskEvent> {
        let mut events: Vec<TaskEvent> = self
            .events_in(window)
            .filter(|event| same_text(&event.topic, topic))
            .cloned()
            .collect();
        newest_first(&mut events);
        events
    }

    /// Done and in-progress submissions for one topic, plus the catalog
    /// chores whose description has no done submission in the window.
    pub fn topic_breakdown(&self, topic: &str, window: &DateWindow) -> TopicBreakdown {
        let history = self.topic_history(topic, window);

        let done_descriptions: HashSet<String> = history
            .iter()
            .filter(|event| event.is_done())
            .map(|event| fold_text(&event.description))
            .collect();

        let pending = self
            .tasks_for_topic(topic)
            .into_iter()
            .filter(|task| !done_descriptions.contains(&fold_text(&task.description)))
            .cloned()
            .collect();

        let (done, rest): (Vec<TaskEvent>, Vec<TaskEvent>) =
            history.into_iter().partition(TaskEvent::is_done);
        let in_progress = rest.into_iter().filter(TaskEvent::is_in_progress).collect();

        let display = self
            .topics()
            .into_iter()
            .find(|known| same_text(known, topic))
            .unwrap_or(topic.trim())
            .to_string();

        TopicBreakdown {
            topic: display,
            done,
            in_progress,
            pending,
        }
    }

    /// How many submissions `person` made in the window, against catalog size.
    pub fn person_contribution(&self, person: &str, window: &DateWindow) -> PersonContribution {
        let mut by_topic: BTreeMap<String, usize> = BTreeMap::new();
        let mut labels: HashMap<String, String> = HashMap::new();
        let mut events = 0;

        for event in self
            .events_in(window)
            .filter(|event| same_text(&event.person, person))
        {
            events += 1;
            let label = labels
                .entry(fold_text(&event.topic))
                .or_insert_with(|| event.topic.trim().to_string())
                .clone();
            *by_topic.entry(label).or_insert(0) += 1;
        }

        let catalog_size = self.catalog.len();
        PersonContribution {
            person: person.trim().to_string(),
            events,
            catalog_size,
            total_ratio_percent: if catalog_size == 0 {
                0.0
            } else {
                percent_of(events, catalog_size)
            },
            by_topic,
        }
    }
}

fn newest_first(events: &mut [TaskEvent]) {
    events.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
}

/// `part / whole * 100`, rounded to one decimal.
fn percent_of(part: usize, whole: usize) -> f64 {
    let ratio = part as f64 / whole as f64 * 100.0;
    (ratio * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Submission, TaskStatus};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .expect("valid timestamp")
    }

    fn task(topic: &str, zone: &str, description: &str) -> TaskDefinition {
        TaskDefinition::new(topic, zone, description)
    }

    fn event(ts: NaiveDateTime, person: &str, task: &TaskDefinition, percent: i64) -> TaskEvent {
        Submission::new(person, task.clone(), percent, "")
            .expect("submission")
            .into_event(ts)
    }

    fn catalog() -> Vec<TaskDefinition> {
        vec![
            task("Cocina", "Mesones", "Limpiar"),
            task("Cocina", "Piso", "Trapear"),
            task("Baño", "Ducha", "Fregar"),
            task("Cocina", "Refrigerador", "Ordenar"),
        ]
    }

    // 2024-05-06 is a Monday; 2024-05-12 the Sunday of the same ISO week.
    fn this_week() -> DateWindow {
        DateWindow::iso_week_of(at(8, 12))
    }

    #[test]
    fn iso_week_spans_monday_to_sunday() {
        let week = DateWindow::iso_week_of(at(12, 23));
        assert_eq!(week.start(), at(6, 0));
        assert!(week.contains(at(12, 23)));
        assert!(week.contains(
            NaiveDate::from_ymd_opt(2024, 5, 12)
                .and_then(|date| date.and_hms_opt(23, 59, 59))
                .expect("valid")
        ));
        assert!(!week.contains(at(13, 0)));
        assert!(!week.contains(at(5, 23)));
    }

    #[test]
    fn iso_week_crosses_year_boundary() {
        let newyear = NaiveDate::from_ymd_opt(2025, 1, 1)
            .and_then(|date| date.and_hms_opt(8, 0, 0))
            .expect("valid");
        let week = DateWindow::iso_week_of(newyear);
        assert_eq!(
            week.start().date(),
            NaiveDate::from_ymd_opt(2024, 12, 30).expect("valid")
        );
    }

    #[test]
    fn window_rejects_reversed_bounds() {
        let (early, late) = (
            NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid"),
            NaiveDate::from_ymd_opt(2024, 5, 2).expect("valid"),
        );
        assert!(matches!(
            DateWindow::from_dates(late, early),
            Err(Error::InvalidArgument(_))
        ));
        let same_day = DateWindow::from_dates(early, early).expect("window");
        assert!(same_day.contains(
            early.and_hms_opt(23, 59, 0).expect("valid")
        ));
    }

    #[test]
    fn everything_pending_with_empty_ledger() {
        let catalog = vec![task("Cocina", "Mesones", "Limpiar")];
        let pending = LedgerAggregator::new(&catalog, &[]).pending_tasks_for("Ana", at(8, 12));

        assert_eq!(pending.topics.len(), 1);
        assert_eq!(pending.topics[0].topic, "Cocina");
        assert_eq!(pending.topics[0].tasks.len(), 1);
        assert_eq!(pending.topics[0].tasks[0].definition, catalog[0]);
        assert_eq!(pending.topics[0].tasks[0].prior_percent, 0);
    }

    #[test]
    fn done_event_clears_pending_for_everyone() {
        let catalog = vec![task("Cocina", "Mesones", "Limpiar")];
        let events = vec![event(at(7, 9), "Ana", &catalog[0], 100)];
        let aggregator = LedgerAggregator::new(&catalog, &events);

        assert!(aggregator.pending_tasks_for("Ana", at(8, 12)).is_empty());
        assert!(aggregator.pending_tasks_for("Luis", at(8, 12)).is_empty());
    }

    #[test]
    fn done_event_from_last_week_does_not_count() {
        let catalog = vec![task("Cocina", "Mesones", "Limpiar")];
        let events = vec![event(at(3, 9), "Ana", &catalog[0], 100)];
        let pending = LedgerAggregator::new(&catalog, &events).pending_tasks_for("Ana", at(8, 12));

        assert_eq!(pending.task_count(), 1);
        assert_eq!(pending.topics[0].tasks[0].prior_percent, 0);
    }

    #[test]
    fn regression_does_not_reopen_a_done_task() {
        let catalog = vec![task("Cocina", "Mesones", "Limpiar")];
        let events = vec![
            event(at(6, 9), "Ana", &catalog[0], 100),
            event(at(7, 9), "Luis", &catalog[0], 40),
        ];
        let aggregator = LedgerAggregator::new(&catalog, &events);

        assert!(aggregator.pending_tasks_for("Luis", at(8, 12)).is_empty());
    }

    #[test]
    fn pending_groups_by_topic_in_catalog_order_with_prior_percent() {
        let catalog = catalog();
        let events = vec![
            event(at(6, 9), "Ana", &catalog[1], 30),
            event(at(7, 9), "ana ", &catalog[1], 60),
            event(at(7, 10), "Luis", &catalog[0], 90),
            event(at(7, 11), "Luis", &catalog[2], 100),
        ];
        let pending = LedgerAggregator::new(&catalog, &events).pending_tasks_for("Ana", at(8, 12));

        assert_eq!(pending.topics.len(), 1);
        let cocina = pending.topic("cocina").expect("cocina group");
        let zones: Vec<&str> = cocina
            .tasks
            .iter()
            .map(|task| task.definition.zone.as_str())
            .collect();
        assert_eq!(zones, vec!["Mesones", "Piso", "Refrigerador"]);
        // Luis's 90% is not Ana's progress
        assert_eq!(cocina.tasks[0].prior_percent, 0);
        assert_eq!(cocina.tasks[1].prior_percent, 60);
        assert!(pending.topic("Baño").is_none());
    }

    #[test]
    fn matching_ignores_case_and_spacing() {
        let catalog = vec![task("Cocina", "Mesones", "Limpiar")];
        let events = vec![event(
            at(7, 9),
            "Ana",
            &task(" cocina", "MESONES", "limpiar "),
            100,
        )];
        assert!(LedgerAggregator::new(&catalog, &events)
            .pending_tasks_for("Ana", at(8, 12))
            .is_empty());
    }

    #[test]
    fn untimed_events_never_close_a_task() {
        let catalog = vec![task("Cocina", "Mesones", "Limpiar")];
        let mut untimed = event(at(7, 9), "Ana", &catalog[0], 100);
        untimed.timestamp = None;
        let events = vec![untimed];
        let aggregator = LedgerAggregator::new(&catalog, &events);

        assert_eq!(aggregator.pending_tasks_for("Ana", at(8, 12)).task_count(), 1);
        assert_eq!(aggregator.topic_completion_ratios(&this_week())["Cocina"].completed, 0);
    }

    #[test]
    fn ratios_count_done_events_per_topic() {
        let catalog = catalog();
        let events = vec![
            event(at(6, 9), "Ana", &catalog[0], 100),
            event(at(7, 9), "Luis", &catalog[0], 100),
            event(at(7, 10), "Luis", &catalog[1], 50),
            event(at(1, 10), "Luis", &catalog[3], 100),
            event(at(7, 11), "Luis", &task("Patio", "Pasto", "Cortar"), 100),
        ];
        let ratios = LedgerAggregator::new(&catalog, &events).topic_completion_ratios(&this_week());

        assert_eq!(
            ratios.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["Baño", "Cocina"]
        );
        assert_eq!(
            ratios["Cocina"],
            TopicCompletion {
                completed: 2,
                total: 3,
                ratio_percent: 66.7
            }
        );
        assert_eq!(ratios["Baño"].completed, 0);
        assert_eq!(ratios["Baño"].ratio_percent, 0.0);
        assert!(!ratios.contains_key("Patio"));
    }

    #[test]
    fn ratios_never_decrease_as_done_events_are_added() {
        let catalog = catalog();
        let mut events = Vec::new();
        let mut last = 0.0;
        for day in 6..=12 {
            events.push(event(at(day, 9), "Ana", &catalog[2], 100));
            let ratio = LedgerAggregator::new(&catalog, &events).topic_completion_ratios(&this_week())
                ["Baño"]
                .ratio_percent;
            assert!(ratio >= last);
            last = ratio;
        }
        assert_eq!(last, 700.0);
    }

    #[test]
    fn ratios_are_empty_without_catalog() {
        let events = vec![event(at(7, 9), "Ana", &task("Cocina", "Mesones", "Limpiar"), 100)];
        assert!(LedgerAggregator::new(&[], &events)
            .topic_completion_ratios(&this_week())
            .is_empty());
    }

    #[test]
    fn breakdown_never_lists_a_task_as_done_and_pending() {
        let catalog = catalog();
        let events = vec![
            event(at(6, 9), "Ana", &catalog[0], 50),
            event(at(7, 9), "Ana", &catalog[0], 100),
            event(at(7, 10), "Luis", &catalog[1], 20),
            event(at(7, 11), "Luis", &catalog[3], 0),
        ];
        let aggregator = LedgerAggregator::new(&catalog, &events);
        let breakdown = aggregator.topic_breakdown("cocina", &this_week());

        assert_eq!(breakdown.topic, "Cocina");
        assert_eq!(breakdown.done.len(), 1);
        assert_eq!(breakdown.done[0].status, TaskStatus::Done);
        let in_progress: Vec<(&str, u8)> = breakdown
            .in_progress
            .iter()
            .map(|event| (event.description.as_str(), event.percent))
            .collect();
        assert_eq!(in_progress, vec![("Trapear", 20), ("Limpiar", 50)]);
        let pending: Vec<&str> = breakdown
            .pending
            .iter()
            .map(|task| task.description.as_str())
            .collect();
        assert_eq!(pending, vec!["Trapear", "Ordenar"]);

        // The full history keeps every submission, newest first.
        let history = aggregator.topic_history("Cocina", &this_week());
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].percent, 0);
        assert_eq!(history[3].percent, 50);
    }

    #[test]
    fn breakdown_of_unknown_topic_is_empty() {
        let catalog = catalog();
        let breakdown = LedgerAggregator::new(&catalog, &[]).topic_breakdown(" Patio ", &this_week());
        assert_eq!(breakdown.topic, "Patio");
        assert!(breakdown.done.is_empty());
        assert!(breakdown.pending.is_empty());
    }

    #[test]
    fn contribution_counts_events_against_catalog_size() {
        let catalog = catalog();
        let events = vec![
            event(at(6, 9), "Ana", &catalog[0], 50),
            event(at(7, 9), "Ana", &catalog[0], 100),
            event(at(7, 10), "ANA", &catalog[2], 30),
            event(at(7, 11), "Luis", &catalog[1], 100),
            event(at(1, 11), "Ana", &catalog[1], 100),
        ];
        let contribution =
            LedgerAggregator::new(&catalog, &events).person_contribution("Ana", &this_week());

        assert_eq!(contribution.events, 3);
        assert_eq!(contribution.catalog_size, 4);
        assert_eq!(contribution.total_ratio_percent, 75.0);
        assert_eq!(contribution.by_topic["Cocina"], 2);
        assert_eq!(contribution.by_topic["Baño"], 1);
    }

    #[test]
    fn contribution_with_empty_catalog_is_zero() {
        let events = vec![event(at(7, 9), "Ana", &task("Cocina", "Mesones", "Limpiar"), 100)];
        let contribution = LedgerAggregator::new(&[], &events).person_contribution("Ana", &this_week());
        assert_eq!(contribution.events, 1);
        assert_eq!(contribution.total_ratio_percent, 0.0);
    }

    #[test]
    fn topics_keep_first_appearance_order() {
        let catalog = catalog();
        let aggregator = LedgerAggregator::new(&catalog, &[]);
        assert_eq!(aggregator.topics(), vec!["Cocina", "Baño"]);
        assert_eq!(aggregator.tasks_for_topic("COCINA").len(), 3);
    }
}
