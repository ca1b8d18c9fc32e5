//! Command-line interface for acuerdos
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is defined in its own submodule.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::aggregate::DateWindow;
use crate::cache::CachedStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{self, OutputOptions, Report};
use crate::schema;
use crate::storage::{JsonlTableStore, TableStore};

mod agreements;
mod init;
mod links;
mod tasks;

/// acuerdos - community agreements and weekly chores
///
/// Browse links and agreements, check off weekly chores and see how each
/// topic is doing, all from a directory of tabular sheets.
#[derive(Parser, Debug)]
#[command(name = "acuerdos")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data root holding .acuerdos.toml (defaults to current directory)
    #[arg(long, global = true, env = "ACUERDOS_ROOT")]
    pub root: Option<PathBuf>,

    /// Person submitting chores or asking for their view
    #[arg(long, global = true, env = "ACUERDOS_PERSON")]
    pub person: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Override the current time ("YYYY-MM-DD HH:MM")
    #[arg(long, global = true, env = "ACUERDOS_NOW", hide = true)]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the config file and empty sheets
    Init,

    /// Resource links
    #[command(subcommand)]
    Links(LinksCommands),

    /// Weekly chores and their ledger
    #[command(subcommand)]
    Tasks(TasksCommands),

    /// Community agreements
    #[command(subcommand)]
    Agreements(AgreementsCommands),
}

impl Commands {
    /// Name reported in the JSON envelope, e.g. `tasks pending`.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Init => "init",
            Commands::Links(LinksCommands::Search { .. }) => "links search",
            Commands::Tasks(cmd) => match cmd {
                TasksCommands::Topics => "tasks topics",
                TasksCommands::List { .. } => "tasks list",
                TasksCommands::Pending => "tasks pending",
                TasksCommands::Submit { .. } => "tasks submit",
                TasksCommands::Ratios { .. } => "tasks ratios",
                TasksCommands::Breakdown { .. } => "tasks breakdown",
                TasksCommands::Contribution { .. } => "tasks contribution",
            },
            Commands::Agreements(cmd) => match cmd {
                AgreementsCommands::Internal { .. } => "agreements internal",
                AgreementsCommands::External { .. } => "agreements external",
            },
        }
    }
}

/// Link subcommands
#[derive(Subcommand, Debug)]
pub enum LinksCommands {
    /// Search links, tolerating typos (no query lists every link)
    Search {
        /// Free-text query
        query: Option<String>,

        /// Similarity needed for a fuzzy match, between 0 and 1
        #[arg(long)]
        threshold: Option<f64>,

        /// Only links of this petal
        #[arg(long)]
        petal: Option<String>,

        /// Sort newest first instead of sheet order
        #[arg(long)]
        newest: bool,
    },
}

/// Chore subcommands
#[derive(Subcommand, Debug)]
pub enum TasksCommands {
    /// List chore topics
    Topics,

    /// List catalog chores
    List {
        /// Only chores of this topic
        #[arg(long)]
        topic: Option<String>,

        /// Free-text filter over topic, zone and description
        #[arg(long)]
        search: Option<String>,
    },

    /// Chores still open this week
    Pending,

    /// Record progress on a chore
    Submit {
        #[arg(long)]
        topic: String,

        #[arg(long)]
        zone: String,

        #[arg(long)]
        description: String,

        /// Progress from 0 to 100; 100 marks the chore done
        #[arg(long, allow_negative_numbers = true)]
        percent: i64,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Completion ratio per topic
    Ratios {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Done, in-progress and pending chores of one topic
    Breakdown {
        topic: String,

        #[command(flatten)]
        window: WindowArgs,

        /// Also list every submission in the window
        #[arg(long)]
        history: bool,
    },

    /// Submissions by one person against the catalog
    Contribution {
        #[command(flatten)]
        window: WindowArgs,
    },
}

/// Agreement subcommands
#[derive(Subcommand, Debug)]
pub enum AgreementsCommands {
    /// House agreements by topic
    Internal {
        /// Show the agreements of this topic
        #[arg(long, conflicts_with = "all")]
        topic: Option<String>,

        /// Show every topic with its agreements
        #[arg(long)]
        all: bool,

        /// Free-text filter over topic and agreement text
        #[arg(long)]
        search: Option<String>,
    },

    /// External communication agreements by kind
    External {
        /// Show the entries of this kind
        #[arg(long)]
        kind: Option<String>,

        /// Free-text filter over kind, aspect and detail
        #[arg(long)]
        search: Option<String>,
    },
}

/// Inclusive date range; defaults to the current ISO week.
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct WindowArgs {
    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl WindowArgs {
    fn resolve(self, now: NaiveDateTime) -> Result<DateWindow> {
        let week = DateWindow::iso_week_of(now);
        let from = self.from.unwrap_or_else(|| week.start().date());
        let to = self.to.unwrap_or_else(|| week.end().date());
        DateWindow::from_dates(from, to)
    }
}

/// Config, cached store and clock shared by the commands of one invocation.
pub(crate) struct Context {
    command: &'static str,
    config: Config,
    config_warning: Option<String>,
    store: CachedStore<JsonlTableStore>,
    output: OutputOptions,
    person: Option<String>,
    now: NaiveDateTime,
}

impl Context {
    fn open(cli: &Cli) -> Result<Self> {
        let root = match &cli.root {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };
        let (config, config_warning) = Config::load_from_root(&root);
        let store = CachedStore::new(
            JsonlTableStore::new(config.data_dir(&root)),
            config.cache_ttl()?,
        );
        let now = match cli.now.as_deref() {
            Some(raw) => schema::parse_timestamp(raw).ok_or_else(|| {
                Error::InvalidArgument(format!("invalid --now '{raw}', expected YYYY-MM-DD HH:MM"))
            })?,
            None => chrono::Local::now().naive_local(),
        };

        tracing::debug!(root = %root.display(), %now, "opened data root");
        Ok(Self {
            command: cli.command.name(),
            config,
            config_warning,
            store,
            output: OutputOptions {
                json: cli.json,
                quiet: cli.quiet,
            },
            person: cli.person.clone(),
            now,
        })
    }

    fn store(&self) -> &dyn TableStore {
        &self.store
    }

    fn person(&self) -> Result<String> {
        crate::person::require_person(self.person.as_deref(), &self.config)
    }

    /// Print the command result, adding the config warning if the
    /// config file was ignored.
    fn emit<T: Serialize>(&self, data: &T, mut report: Report) -> Result<()> {
        if let Some(warning) = &self.config_warning {
            report.warn(warning.clone());
        }
        output::print_success(self.output, self.command, data, &report)
    }

    /// Load a table, degrading to an empty dataset when it is unavailable.
    fn load_or_empty<T>(
        &self,
        table: &str,
        load: impl FnOnce(&dyn TableStore, &str) -> Result<Vec<T>>,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<T>> {
        match load(self.store(), table) {
            Ok(records) => Ok(records),
            Err(err) if err.is_degradable() => {
                tracing::warn!(table, error = %err, "showing empty dataset");
                warnings.push(format!("{table} unavailable ({err}); showing no rows"));
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        if let Commands::Init = self.command {
            return init::run(init::InitOptions {
                root: self.root,
                json: self.json,
                quiet: self.quiet,
            });
        }

        let ctx = Context::open(&self)?;
        let result = match self.command {
            Commands::Init => Ok(()),
            Commands::Links(cmd) => match cmd {
                LinksCommands::Search {
                    query,
                    threshold,
                    petal,
                    newest,
                } => links::run_search(
                    &ctx,
                    links::SearchOptions {
                        query,
                        threshold,
                        petal,
                        newest,
                    },
                ),
            },
            Commands::Tasks(cmd) => match cmd {
                TasksCommands::Topics => tasks::run_topics(&ctx),
                TasksCommands::List { topic, search } => {
                    tasks::run_list(&ctx, tasks::ListOptions { topic, search })
                }
                TasksCommands::Pending => tasks::run_pending(&ctx),
                TasksCommands::Submit {
                    topic,
                    zone,
                    description,
                    percent,
                    notes,
                } => tasks::run_submit(
                    &ctx,
                    tasks::SubmitOptions {
                        topic,
                        zone,
                        description,
                        percent,
                        notes,
                    },
                ),
                TasksCommands::Ratios { window } => {
                    tasks::run_ratios(&ctx, window.resolve(ctx.now)?)
                }
                TasksCommands::Breakdown {
                    topic,
                    window,
                    history,
                } => tasks::run_breakdown(
                    &ctx,
                    tasks::BreakdownOptions {
                        topic,
                        window: window.resolve(ctx.now)?,
                        history,
                    },
                ),
                TasksCommands::Contribution { window } => {
                    tasks::run_contribution(&ctx, window.resolve(ctx.now)?)
                }
            },
            Commands::Agreements(cmd) => match cmd {
                AgreementsCommands::Internal { topic, all, search } => agreements::run_internal(
                    &ctx,
                    agreements::InternalOptions { topic, all, search },
                ),
                AgreementsCommands::External { kind, search } => agreements::run_external(
                    &ctx,
                    agreements::ExternalOptions { kind, search },
                ),
            },
        };

        tracing::debug!(
            hits = ctx.store.hits(),
            misses = ctx.store.misses(),
            "table cache"
        );
        result
    }
}
