//! Rendering of command results.
//!
//! Every command produces serializable data plus a [`Report`], the text a
//! person reads. With `--json` the data goes out inside a versioned envelope
//! instead; the report's warnings and next steps travel in both forms, so a
//! sheet that degraded to "no rows" is never silent.
//!
//! ```text
//! acuerdos tasks ratios (2024-05-06 to 2024-05-12)
//! topics: 2
//!
//!   Baño: 0.0% (0 done / 1 chores)
//!   Cocina: 50.0% (1 done / 2 chores)
//!
//! warning: registro_tareas unavailable (...); showing no rows
//! next: acuerdos init
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::aggregate::DateWindow;
use crate::error::{Error, JsonError, Result};

pub const SCHEMA_VERSION: &str = "acuerdos.v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Human-readable side of a command result.
#[derive(Debug, Clone, Default)]
pub struct Report {
    title: String,
    window: Option<DateWindow>,
    facts: Vec<(String, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Date range the report covers, shown next to the title.
    pub fn over(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// A `key: value` line under the title.
    pub fn fact(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.facts.push((key.to_string(), value.to_string()));
        self
    }

    /// One entry of the listing.
    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    pub fn warn(&mut self, warning: impl Into<String>) -> &mut Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn warn_all(&mut self, warnings: impl IntoIterator<Item = String>) -> &mut Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn next_step(&mut self, step: impl Into<String>) -> &mut Self {
        self.next_steps.push(step.into());
        self
    }

    pub fn render(&self) -> String {
        let mut out = self.title.clone();
        if let Some(window) = &self.window {
            out.push_str(&format!(
                " ({} to {})",
                window.start().format("%Y-%m-%d"),
                window.end().format("%Y-%m-%d")
            ));
        }
        for (key, value) in &self.facts {
            out.push('\n');
            out.push_str(key);
            if !value.is_empty() {
                out.push_str(": ");
                out.push_str(value);
            }
        }
        if !self.lines.is_empty() {
            out.push('\n');
            for line in &self.lines {
                out.push_str("\n  ");
                out.push_str(line);
            }
        }
        if !self.warnings.is_empty() || !self.next_steps.is_empty() {
            out.push('\n');
        }
        for warning in &self.warnings {
            out.push_str("\nwarning: ");
            out.push_str(warning);
        }
        for step in &self.next_steps {
            out.push_str("\nnext: ");
            out.push_str(step);
        }
        out
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome {
    Success { data: Value },
    Error { error: JsonError },
}

/// Print a successful result: the envelope with `--json`, else the report
/// unless `--quiet`.
pub fn print_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    report: &Report,
) -> Result<()> {
    if options.json {
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Success {
                data: serde_json::to_value(data)?,
            },
            warnings: report.warnings.clone(),
            next_steps: report.next_steps.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else if !options.quiet {
        println!("{}", report.render());
    }
    Ok(())
}

/// Print a failed command. JSON goes to stdout like any envelope; text goes
/// to stderr.
pub fn print_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = recovery_steps(err);
    if json {
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Error {
                error: JsonError::from(err),
            },
            warnings: Vec::new(),
            next_steps,
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    eprintln!("acuerdos: {err}");
    for step in next_steps {
        eprintln!("next: {step}");
    }
    Ok(())
}

fn recovery_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::DataUnavailable(_) => "acuerdos init".to_string(),
        Error::UnknownTask { topic, .. } => format!("acuerdos tasks list --topic \"{topic}\""),
        Error::InvalidConfig(_) => "fix .acuerdos.toml then retry".to_string(),
        Error::WriteFailed { .. } | Error::LockFailed(_) => "retry the submission".to_string(),
        _ => return Vec::new(),
    };
    vec![step]
}
