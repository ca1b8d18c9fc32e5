use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Fixed clock for CLI tests: Wednesday 2024-05-08, ISO week 19 (May 6 to May 12).
pub const NOW: &str = "2024-05-08 12:00";

pub const CATALOG_HEADER: &[&str] = &["Tema", "Zona", "Tarea"];

pub const LEDGER_HEADER: &[&str] = &[
    "Fecha",
    "Semanerx",
    "Tema",
    "Zona",
    "Tarea",
    "Realizada",
    "Porcentaje",
    "Observaciones",
];

pub struct TestRoot {
    dir: TempDir,
}

impl TestRoot {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("data"))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(".acuerdos.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Write a sheet: `header` first, then one JSON array per row.
    pub fn write_table(&self, table: &str, header: &[&str], rows: &[&[&str]]) -> std::io::Result<PathBuf> {
        let mut contents = serde_json::to_string(header)?;
        contents.push('\n');
        for row in rows {
            contents.push_str(&serde_json::to_string(row)?);
            contents.push('\n');
        }
        let path = self.data_dir().join(format!("{table}.jsonl"));
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Every line of a sheet, header included.
    pub fn read_table(&self, table: &str) -> Result<Vec<Vec<String>>, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(self.data_dir().join(format!("{table}.jsonl")))?;
        let mut rows = Vec::new();
        for line in contents.lines().filter(|line| !line.trim().is_empty()) {
            rows.push(serde_json::from_str(line)?);
        }
        Ok(rows)
    }

    pub fn write_catalog(&self) -> std::io::Result<PathBuf> {
        self.write_table(
            "tareas_semaneros",
            CATALOG_HEADER,
            &[
                &["Cocina", "Mesones", "Limpiar"],
                &["Cocina", "Piso", "Trapear"],
                &["Baño", "Ducha", "Fregar"],
            ],
        )
    }

    pub fn write_ledger(&self, rows: &[&[&str]]) -> std::io::Result<PathBuf> {
        self.write_table("registro_tareas", LEDGER_HEADER, rows)
    }
}

pub fn acuerdos_cmd() -> Command {
    let mut cmd = Command::cargo_bin("acuerdos").expect("binary");
    cmd.env_remove("ACUERDOS_ROOT")
        .env_remove("ACUERDOS_PERSON")
        .env_remove("ACUERDOS_NOW")
        .env_remove("RUST_LOG");
    cmd
}

/// Command rooted at `root` with the fixed clock.
pub fn root_cmd(root: &TestRoot) -> Command {
    let mut cmd = acuerdos_cmd();
    cmd.arg("--root").arg(root.path()).args(["--now", NOW]);
    cmd
}

pub fn json_output(cmd: &mut Command) -> Result<Value, Box<dyn std::error::Error>> {
    let output = cmd.arg("--json").output()?;
    Ok(serde_json::from_slice(&output.stdout)?)
}
