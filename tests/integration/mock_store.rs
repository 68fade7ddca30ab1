//! In-memory `TableStore` for integration testing.
//!
//! Holds worksheets as plain row vectors, fully inspectable from test
//! code. Clones share state, so tests can keep a handle after the
//! orchestrator takes ownership of its copy.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sweep::sheets::{TableRef, TableStore};

#[derive(Debug, Default)]
struct Tab {
    sheet_id: i64,
    rows: Vec<Vec<String>>,
    frozen_rows: u32,
}

#[derive(Debug, Default)]
struct Inner {
    tabs: Mutex<HashMap<String, Tab>>,
    append_calls: Mutex<usize>,
    /// If set, all operations will return this error.
    force_error: Mutex<Option<String>>,
}

/// A deterministic in-memory worksheet store.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
    anchored: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            anchored: true,
        }
    }

    /// A store whose `append_rows` doesn't honour anchoring, to exercise
    /// the logger's row-count fallback path.
    pub fn without_anchored_append() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            anchored: false,
        }
    }

    /// Seed a worksheet with rows.
    pub fn seed_tab(&self, tab: &str, rows: &[&[&str]]) {
        let mut tabs = self.inner.tabs.lock().unwrap();
        let sheet_id = tabs.len() as i64;
        tabs.insert(
            tab.to_string(),
            Tab {
                sheet_id,
                rows: rows
                    .iter()
                    .map(|r| r.iter().map(|s| s.to_string()).collect())
                    .collect(),
                frozen_rows: 0,
            },
        );
    }

    /// Current rows of a worksheet (empty if it doesn't exist).
    pub fn rows(&self, tab: &str) -> Vec<Vec<String>> {
        self.inner
            .tabs
            .lock()
            .unwrap()
            .get(tab)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn has_tab(&self, tab: &str) -> bool {
        self.inner.tabs.lock().unwrap().contains_key(tab)
    }

    pub fn frozen_rows(&self, tab: &str) -> u32 {
        self.inner
            .tabs
            .lock()
            .unwrap()
            .get(tab)
            .map(|t| t.frozen_rows)
            .unwrap_or(0)
    }

    /// Number of `append_rows` calls seen so far.
    pub fn append_calls(&self) -> usize {
        *self.inner.append_calls.lock().unwrap()
    }

    /// Force all subsequent operations to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.inner.force_error.lock().unwrap() = Some(msg.to_string());
    }

    fn check_error(&self) -> Result<()> {
        if let Some(msg) = self.inner.force_error.lock().unwrap().as_ref() {
            anyhow::bail!("{msg}");
        }
        Ok(())
    }

    /// Row numbers (1-based, inclusive) of an A1 range like `A5:H6`.
    fn range_rows(range: &str) -> (usize, usize) {
        let parse = |part: &str| -> usize {
            part.trim_start_matches(|c: char| c.is_ascii_alphabetic())
                .parse()
                .unwrap_or(1)
        };
        match range.split_once(':') {
            Some((start, end)) => (parse(start), parse(end)),
            None => (parse(range), parse(range)),
        }
    }
}

#[async_trait]
impl TableStore for InMemoryStore {
    async fn open_or_create(&self, tab: &str) -> Result<TableRef> {
        self.check_error()?;
        let mut tabs = self.inner.tabs.lock().unwrap();
        let next_id = tabs.len() as i64;
        let entry = tabs.entry(tab.to_string()).or_insert_with(|| Tab {
            sheet_id: next_id,
            ..Tab::default()
        });
        Ok(TableRef {
            tab: tab.to_string(),
            sheet_id: entry.sheet_id,
        })
    }

    async fn read_all(&self, table: &TableRef) -> Result<Vec<Vec<String>>> {
        self.check_error()?;
        Ok(self.rows(&table.tab))
    }

    async fn read_range(&self, table: &TableRef, range: &str) -> Result<Vec<Vec<String>>> {
        self.check_error()?;
        let (start, end) = Self::range_rows(range);
        let rows = self.rows(&table.tab);
        Ok(rows
            .into_iter()
            .skip(start - 1)
            .take(end - start + 1)
            .collect())
    }

    async fn update_range(
        &self,
        table: &TableRef,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<()> {
        self.check_error()?;
        let (start, _) = Self::range_rows(range);
        let mut tabs = self.inner.tabs.lock().unwrap();
        let tab = tabs
            .get_mut(&table.tab)
            .ok_or_else(|| anyhow::anyhow!("no such tab: {}", table.tab))?;
        for (i, row) in rows.iter().enumerate() {
            let idx = start - 1 + i;
            if tab.rows.len() <= idx {
                tab.rows.resize(idx + 1, Vec::new());
            }
            tab.rows[idx] = row.clone();
        }
        Ok(())
    }

    async fn append_rows(
        &self,
        table: &TableRef,
        _table_range: &str,
        rows: &[Vec<String>],
    ) -> Result<()> {
        self.check_error()?;
        *self.inner.append_calls.lock().unwrap() += 1;
        let mut tabs = self.inner.tabs.lock().unwrap();
        let tab = tabs
            .get_mut(&table.tab)
            .ok_or_else(|| anyhow::anyhow!("no such tab: {}", table.tab))?;
        tab.rows.extend(rows.iter().cloned());
        Ok(())
    }

    async fn freeze_rows(&self, table: &TableRef, row_count: u32) -> Result<()> {
        self.check_error()?;
        let mut tabs = self.inner.tabs.lock().unwrap();
        let tab = tabs
            .get_mut(&table.tab)
            .ok_or_else(|| anyhow::anyhow!("no such tab: {}", table.tab))?;
        tab.frozen_rows = row_count;
        Ok(())
    }

    fn supports_anchored_append(&self) -> bool {
        self.anchored
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
