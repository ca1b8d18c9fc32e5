//! acuerdos init command implementation
//!
//! Creates the config file, the data directory and every sheet with its header.

use std::path::{Path, PathBuf};

use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::output::{print_success, OutputOptions, Report};
use crate::schema::{
    RecordSchema, AGREEMENT_SCHEMA, EVENT_SCHEMA, EXTERNAL_AGREEMENT_SCHEMA, LINK_SCHEMA,
    TASK_SCHEMA,
};
use crate::storage::{JsonlTableStore, Row};

pub struct InitOptions {
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct InitSummary {
    root: PathBuf,
    data_dir: PathBuf,
    created: Created,
}

#[derive(serde::Serialize)]
struct Created {
    config: bool,
    data_dir: bool,
    tables: Vec<String>,
}

pub fn run(options: InitOptions) -> Result<()> {
    let root = match options.root {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&root)?;

    let created_config = ensure_config(&root)?;
    let config = Config::load(&root.join(CONFIG_FILE))?;

    let data_dir = config.data_dir(&root);
    let created_data_dir = ensure_dir(&data_dir)?;

    let store = JsonlTableStore::new(&data_dir);
    let mut created_tables = Vec::new();
    let mut warnings = Vec::new();
    for (table, schema) in table_schemas(&config) {
        if store.create_table(table, &schema.sheet_header())? {
            created_tables.push(table.to_string());
            continue;
        }
        match store.header(table) {
            Ok(header) => {
                let columns: Row = header.into_iter().map(|column| (column, String::new())).collect();
                let missing = schema.missing_fields(&columns);
                if !missing.is_empty() {
                    warnings.push(format!(
                        "{table} has no column for: {}; those fields read as blank",
                        missing.join(", ")
                    ));
                }
            }
            Err(err) => warnings.push(format!("{table} exists but is unreadable ({err})")),
        }
    }

    let summary = InitSummary {
        root: root.clone(),
        data_dir: data_dir.clone(),
        created: Created {
            config: created_config,
            data_dir: created_data_dir,
            tables: created_tables.clone(),
        },
    };

    let title = if !created_config && !created_data_dir && created_tables.is_empty() {
        "acuerdos init: nothing to do"
    } else {
        "acuerdos init: initialized data root"
    };

    let mut report = Report::new(title);
    report
        .fact("root", root.display())
        .fact("data", data_dir.display())
        .fact("created", if created_config { CONFIG_FILE } else { "none" })
        .fact(
            "tables",
            if created_tables.is_empty() {
                "none".to_string()
            } else {
                created_tables.join(", ")
            },
        )
        .warn_all(warnings)
        .next_step("fill the catalog sheet with chores")
        .next_step("acuerdos --person <name> tasks pending");

    print_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "init",
        &summary,
        &report,
    )
}

fn table_schemas(config: &Config) -> [(&str, RecordSchema); 5] {
    let tables = &config.tables;
    [
        (tables.links.as_str(), LINK_SCHEMA),
        (tables.tasks.as_str(), TASK_SCHEMA),
        (tables.ledger.as_str(), EVENT_SCHEMA),
        (tables.internal_agreements.as_str(), AGREEMENT_SCHEMA),
        (tables.external_agreements.as_str(), EXTERNAL_AGREEMENT_SCHEMA),
    ]
}

fn ensure_dir(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    std::fs::create_dir_all(path)?;
    Ok(true)
}

fn ensure_config(root: &Path) -> Result<bool> {
    let path = root.join(CONFIG_FILE);
    if path.exists() {
        return Ok(false);
    }
    Config::default().save(&path)?;
    Ok(true)
}
