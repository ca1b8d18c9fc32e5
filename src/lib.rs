//! acuerdos - community agreements and weekly chores
//!
//! This library provides the core functionality for the acuerdos CLI:
//! browsing links and agreements kept in tabular sheets, and tracking weekly
//! chores through an append-only ledger of submissions.
//!
//! # Core Concepts
//!
//! - **Sheets**: tables with a header row, read as column-to-text mappings
//! - **Fuzzy search**: typo-tolerant matching over every field of a record
//! - **Ledger**: append-only chore submissions with a percent and notes
//! - **Views**: pending chores per person, completion ratios per topic,
//!   topic breakdowns and per-person contributions over a date window
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.acuerdos.toml`
//! - `error`: Error types and result aliases
//! - `storage`: Sheet store trait and the JSONL directory backend
//! - `cache`: TTL cache in front of a sheet store
//! - `lock`: File locking and atomic writes for appends
//! - `schema`: Header renames, default-fill and tolerant cell parsing
//! - `search`: Ratcliff/Obershelp fuzzy matching
//! - `links`, `agreements`: browsable record kinds
//! - `ledger`: chore catalog, submissions and their rows
//! - `aggregate`: date windows and the ledger views
//! - `person`: submitter identity resolution
//! - `output`: human and JSON output envelopes

pub mod aggregate;
pub mod agreements;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod links;
pub mod lock;
pub mod output;
pub mod person;
pub mod schema;
pub mod search;
pub mod storage;

pub use aggregate::{DateWindow, LedgerAggregator};
pub use error::{Error, Result};
pub use search::{matches, search_records, DEFAULT_THRESHOLD};
