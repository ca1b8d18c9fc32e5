//! Submitter identity.
//!
//! Person resolution order:
//! 1) CLI --person (explicit)
//! 2) ACUERDOS_PERSON environment variable
//! 3) Config default (person.default)

use crate::config::Config;
use crate::error::{Error, Result};

/// Environment variable naming the person running the command
pub const PERSON_ENV: &str = "ACUERDOS_PERSON";

/// Resolve the current person, if any source names one.
pub fn resolve_person(cli_person: Option<&str>, config: &Config) -> Option<String> {
    if let Some(person) = non_empty(cli_person) {
        return Some(person.to_string());
    }

    if let Ok(env_person) = std::env::var(PERSON_ENV) {
        if let Some(person) = non_empty(Some(env_person.as_str())) {
            return Some(person.to_string());
        }
    }

    non_empty(Some(config.person.default.as_str())).map(str::to_string)
}

/// Resolve the current person for commands that cannot run without one.
pub fn require_person(cli_person: Option<&str>, config: &Config) -> Result<String> {
    resolve_person(cli_person, config).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "no person given; pass --person, set {PERSON_ENV}, or set person.default in the config"
        ))
    })
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
