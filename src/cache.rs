//! Read-through cache in front of a [`TableStore`].
//!
//! Fetched tables stay fresh for a configured TTL. `invalidate()` drops every
//! entry, and a successful append drops the entry for that table, so a view
//! rendered right after a submission always sees it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::storage::{Row, TableStore};

struct CachedTable {
    rows: Vec<Row>,
    fetched_at: Instant,
}

pub struct CachedStore<S: TableStore> {
    inner: S,
    ttl: Duration,
    tables: RefCell<HashMap<String, CachedTable>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<S: TableStore> CachedStore<S> {
    pub fn new(inner: S, ttl: chrono::Duration) -> Self {
        Self {
            inner,
            // Negative TTLs behave like zero: never fresh.
            ttl: ttl.to_std().unwrap_or(Duration::ZERO),
            tables: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    fn fresh_rows(&self, table: &str) -> Option<Vec<Row>> {
        let tables = self.tables.borrow();
        let cached = tables.get(table)?;
        if cached.fetched_at.elapsed() < self.ttl {
            Some(cached.rows.clone())
        } else {
            None
        }
    }

    fn invalidate_table(&self, table: &str) {
        self.tables.borrow_mut().remove(table);
    }
}

impl<S: TableStore> TableStore for CachedStore<S> {
    fn fetch_rows(&self, table: &str) -> Result<Vec<Row>> {
        if let Some(rows) = self.fresh_rows(table) {
            self.hits.set(self.hits.get() + 1);
            tracing::debug!(table, "cache hit");
            return Ok(rows);
        }

        self.misses.set(self.misses.get() + 1);
        tracing::debug!(table, "cache miss");
        let rows = self.inner.fetch_rows(table)?;
        self.tables.borrow_mut().insert(
            table.to_string(),
            CachedTable {
                rows: rows.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(rows)
    }

    fn append_row(&self, table: &str, values: &[String]) -> Result<()> {
        self.inner.append_row(table, values)?;
        self.invalidate_table(table);
        Ok(())
    }

    fn invalidate(&self) {
        self.tables.borrow_mut().clear();
        self.inner.invalidate();
    }
}
