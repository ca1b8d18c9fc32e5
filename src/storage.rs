//! Tabular store for acuerdos
//!
//! Every dataset is a sheet: a header row naming the columns followed by
//! append-only value rows. On disk a sheet is one JSONL file per table:
//!
//! ```text
//! data/
//!   tareas_semaneros.jsonl     # ["Tema","Zona","Tarea"] then one array per row
//!   registro_tareas.jsonl      # chore submissions, appended by `tasks submit`
//!   registro_tareas.lock       # append lock
//! ```
//!
//! Readers see each row as a mapping of column name to cell text.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::lock::{FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Extension used for table files
pub const TABLE_EXTENSION: &str = "jsonl";

/// One sheet row: column name to cell text.
pub type Row = BTreeMap<String, String>;

/// Read/append access to named tables.
pub trait TableStore {
    /// Fetch every row of a table, in sheet order.
    ///
    /// Fails with `DataUnavailable` when the store cannot be reached or the
    /// table does not exist.
    fn fetch_rows(&self, table: &str) -> Result<Vec<Row>>;

    /// Append one row, values in column order. Fails with `WriteFailed`.
    fn append_row(&self, table: &str, values: &[String]) -> Result<()>;

    /// Drop any cached state so the next fetch reads the store again.
    fn invalidate(&self);
}

/// Directory of JSONL sheets
#[derive(Debug, Clone)]
pub struct JsonlTableStore {
    dir: PathBuf,
    lock_timeout_ms: u64,
}

impl JsonlTableStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.{TABLE_EXTENSION}"))
    }

    fn lock_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.lock"))
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.table_path(table).is_file()
    }

    /// Create a table with the given header. Returns false if it already existed.
    pub fn create_table(&self, table: &str, header: &[&str]) -> Result<bool> {
        fs::create_dir_all(&self.dir)?;
        let path = self.table_path(table);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        let mut line = serde_json::to_vec(header)?;
        line.push(b'\n');
        file.write_all(&line)?;
        file.sync_all()?;
        tracing::debug!(table, path = %path.display(), "created table");
        Ok(true)
    }

    /// Read the header row of a table
    pub fn header(&self, table: &str) -> Result<Vec<String>> {
        let path = self.table_path(table);
        let file = File::open(&path).map_err(|_| Error::DataUnavailable(table.to_string()))?;
        let mut reader = BufReader::new(file);
        let mut first = String::new();
        reader.read_line(&mut first)?;
        parse_header(table, &first)
    }

    fn read_table(&self, table: &str) -> Result<Vec<Row>> {
        let path = self.table_path(table);
        if !path.is_file() {
            return Err(Error::DataUnavailable(table.to_string()));
        }

        let file = File::open(&path).map_err(|err| {
            tracing::warn!(table, error = %err, "table unreadable");
            Error::DataUnavailable(table.to_string())
        })?;
        let mut lines = BufReader::new(file).lines();

        let header = match lines.next() {
            Some(line) => parse_header(table, &line?)?,
            None => return Err(Error::DataUnavailable(table.to_string())),
        };

        let mut rows = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // Row numbers are 1-based and count the header, like the sheet UI.
            let row_number = idx + 2;
            match parse_cells(&line) {
                Some(cells) => rows.push(zip_row(&header, cells)),
                None => {
                    let err = Error::MalformedRow {
                        table: table.to_string(),
                        row: row_number,
                        reason: "not a JSON array".to_string(),
                    };
                    tracing::warn!(error = %err, "skipping row");
                }
            }
        }

        tracing::debug!(table, rows = rows.len(), "fetched table");
        Ok(rows)
    }

    fn write_row(&self, table: &str, values: &[String]) -> Result<()> {
        if !self.table_exists(table) {
            return Err(Error::DataUnavailable(table.to_string()));
        }

        let _guard = FileLock::acquire(self.lock_path(table), self.lock_timeout_ms)?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(self.table_path(table))?;
        let mut line = Vec::new();
        // A hand-edited sheet may lack the final newline.
        if !ends_with_newline(&mut file)? {
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, values)?;
        line.push(b'\n');
        file.write_all(&line)?;
        file.sync_all()?;
        Ok(())
    }
}

fn ends_with_newline(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

impl TableStore for JsonlTableStore {
    fn fetch_rows(&self, table: &str) -> Result<Vec<Row>> {
        self.read_table(table)
    }

    fn append_row(&self, table: &str, values: &[String]) -> Result<()> {
        self.write_row(table, values).map_err(|err| match err {
            Error::WriteFailed { .. } => err,
            other => Error::WriteFailed {
                table: table.to_string(),
                reason: other.to_string(),
            },
        })
    }

    fn invalidate(&self) {}
}

fn parse_header(table: &str, line: &str) -> Result<Vec<String>> {
    let cells = parse_cells(line).ok_or_else(|| Error::DataUnavailable(table.to_string()))?;
    if cells.iter().all(|cell| cell.trim().is_empty()) {
        return Err(Error::DataUnavailable(table.to_string()));
    }
    Ok(cells.into_iter().map(|cell| cell.trim().to_string()).collect())
}

fn parse_cells(line: &str) -> Option<Vec<String>> {
    let value: Value = serde_json::from_str(line).ok()?;
    let cells = value.as_array()?;
    Some(cells.iter().map(cell_text).collect())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn zip_row(header: &[String], cells: Vec<String>) -> Row {
    let mut cells = cells.into_iter();
    header
        .iter()
        .map(|column| (column, cells.next().unwrap_or_default()))
        .filter(|(column, _)| !column.is_empty())
        .map(|(column, cell)| (column.clone(), cell))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_table(dir: &Path, table: &str, contents: &str) {
        fs::write(dir.join(format!("{table}.jsonl")), contents).expect("write table");
    }

    #[test]
    fn fetch_rows_zips_header_and_pads_short_rows() {
        let dir = tempdir().expect("tempdir");
        write_table(
            dir.path(),
            "tareas",
            "[\"Tema\",\"Zona\",\"Tarea\"]\n[\"Cocina\",\"Mesones\",\"Limpiar\"]\n\n[\"Baño\"]\n[\"Patio\",\"Pasto\",\"Cortar\",\"extra\"]\n",
        );
        let store = JsonlTableStore::new(dir.path());

        let rows = store.fetch_rows("tareas").expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Tarea"], "Limpiar");
        assert_eq!(rows[1]["Tema"], "Baño");
        assert_eq!(rows[1]["Zona"], "");
        assert_eq!(rows[2].len(), 3);
    }

    #[test]
    fn numeric_cells_are_rendered_as_text() {
        let dir = tempdir().expect("tempdir");
        write_table(dir.path(), "registro", "[\"Porcentaje\",\"Nota\"]\n[75,null]\n");
        let store = JsonlTableStore::new(dir.path());

        let rows = store.fetch_rows("registro").expect("rows");
        assert_eq!(rows[0]["Porcentaje"], "75");
        assert_eq!(rows[0]["Nota"], "");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempdir().expect("tempdir");
        write_table(dir.path(), "t", "[\"A\"]\n{not json\n[\"ok\"]\n");
        let store = JsonlTableStore::new(dir.path());

        let rows = store.fetch_rows("t").expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["A"], "ok");
    }

    #[test]
    fn missing_table_is_unavailable() {
        let dir = tempdir().expect("tempdir");
        let store = JsonlTableStore::new(dir.path());

        match store.fetch_rows("nada") {
            Err(Error::DataUnavailable(table)) => assert_eq!(table, "nada"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_unavailable() {
        let dir = tempdir().expect("tempdir");
        write_table(dir.path(), "vacia", "");
        let store = JsonlTableStore::new(dir.path());

        assert!(matches!(
            store.fetch_rows("vacia"),
            Err(Error::DataUnavailable(_))
        ));
    }

    #[test]
    fn append_row_requires_existing_table() {
        let dir = tempdir().expect("tempdir");
        let store = JsonlTableStore::new(dir.path());

        let err = store
            .append_row("registro", &["x".to_string()])
            .expect_err("missing table");
        assert!(matches!(err, Error::WriteFailed { .. }));
    }

    #[test]
    fn create_then_append_round_trips() {
        let dir = tempdir().expect("tempdir");
        let store = JsonlTableStore::new(dir.path().join("data"));

        assert!(store.create_table("registro", &["Fecha", "Semanerx"]).expect("create"));
        assert!(!store.create_table("registro", &["Otro"]).expect("exists"));
        assert_eq!(store.header("registro").expect("header"), vec!["Fecha", "Semanerx"]);

        store
            .append_row("registro", &["2024-05-06 10:00".to_string(), "Ana".to_string()])
            .expect("append");

        let rows = store.fetch_rows("registro").expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Semanerx"], "Ana");
    }

    #[test]
    fn append_after_unterminated_last_row_keeps_both_rows() {
        let dir = tempdir().expect("tempdir");
        write_table(dir.path(), "registro", "[\"A\"]\n[\"first\"]");
        let store = JsonlTableStore::new(dir.path());

        store
            .append_row("registro", &["second".to_string()])
            .expect("append");

        let rows = store.fetch_rows("registro").expect("rows");
        let cells: Vec<&str> = rows.iter().map(|row| row["A"].as_str()).collect();
        assert_eq!(cells, vec!["first", "second"]);
        assert_eq!(
            fs::read_to_string(store.table_path("registro")).expect("read"),
            "[\"A\"]\n[\"first\"]\n[\"second\"]\n"
        );
    }

    #[test]
    fn create_table_keeps_an_existing_sheet() {
        let dir = tempdir().expect("tempdir");
        write_table(dir.path(), "registro", "[\"Fecha\"]\n[\"ayer\"]\n");
        let store = JsonlTableStore::new(dir.path());

        assert!(!store.create_table("registro", &["Otro"]).expect("exists"));
        assert_eq!(store.fetch_rows("registro").expect("rows").len(), 1);
    }

    #[test]
    fn append_times_out_when_lock_is_held() {
        let dir = tempdir().expect("tempdir");
        let store = JsonlTableStore::new(dir.path()).with_lock_timeout(50);
        store.create_table("registro", &["A"]).expect("create");

        let _held = FileLock::acquire(dir.path().join("registro.lock"), 1000).expect("lock");
        let err = store
            .append_row("registro", &["x".to_string()])
            .expect_err("locked");
        match err {
            Error::WriteFailed { table, .. } => assert_eq!(table, "registro"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
