//! Event capture for the linked-views core.
//!
//! A `tracing` subscriber that files every event under its target
//! (`selection`, `render`, `ignored_selection`, ...) as a row in a
//! column-oriented table. Columns appear as fields are first seen.
//!
//! # Usage
//!
//! ```ignore
//! let (_, journal) = instrument::capture(|| {
//!     coordinator.select_bucket("Perfect").unwrap();
//! });
//! assert_eq!(journal.count("selection"), 1);
//! let frames = journal.to_dataframes();
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Level, Metadata, Subscriber};

/// A column of typed values. Rows that lack the field hold the type's default.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::U64(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::F64(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fill_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        match self {
            Column::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            Column::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            Column::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            Column::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            Column::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }
}

/// Rows recorded under one target.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    pub columns: BTreeMap<String, Column>,
    pub rows: usize,
}

impl EventTable {
    fn align(&mut self) {
        for column in self.columns.values_mut() {
            column.fill_to(self.rows);
        }
    }

    pub fn u64s(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            Column::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn strs(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            Column::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// Everything captured on this thread, keyed by target.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    pub tables: BTreeMap<String, EventTable>,
}

impl Journal {
    pub fn table(&self, target: &str) -> Option<&EventTable> {
        self.tables.get(target)
    }

    /// Number of events recorded under `target` (0 if none).
    pub fn count(&self, target: &str) -> usize {
        self.tables.get(target).map_or(0, |t| t.rows)
    }
}

thread_local! {
    static JOURNAL: RefCell<Journal> = RefCell::default();
}

/// Visitor writing one event's fields into the current row.
struct RowWriter<'a> {
    table: &'a mut EventTable,
}

impl RowWriter<'_> {
    fn column(&mut self, name: &str, empty: impl FnOnce(usize) -> Column) -> &mut Column {
        let rows = self.table.rows;
        self.table
            .columns
            .entry(name.to_string())
            .or_insert_with(|| empty(rows))
    }

    fn push_str(&mut self, name: &str, value: &str) {
        if let Column::Str(v) = self.column(name, |n| Column::Str(vec![String::new(); n])) {
            v.push(value.to_string());
        }
    }
}

impl Visit for RowWriter<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let Column::U64(v) = self.column(field.name(), |n| Column::U64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let Column::I64(v) = self.column(field.name(), |n| Column::I64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Column::F64(v) = self.column(field.name(), |n| Column::F64(vec![0.0; n])) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let Column::Bool(v) = self.column(field.name(), |n| Column::Bool(vec![false; n])) {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push_str(field.name(), value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Records info, warn and error events. Spans are ignored.
pub struct JournalSubscriber;

impl Subscriber for JournalSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();
        let level = event.metadata().level().as_str();
        JOURNAL.with(|j| {
            let mut journal = j.borrow_mut();
            let table = journal.tables.entry(target).or_default();
            table.align();
            {
                let mut writer = RowWriter { table: &mut *table };
                writer.push_str("level", level);
                event.record(&mut writer);
            }
            table.rows += 1;
            table.align();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Drain everything recorded on this thread.
pub fn drain() -> Journal {
    JOURNAL.with(|j| std::mem::take(&mut *j.borrow_mut()))
}

pub fn clear() {
    JOURNAL.with(|j| *j.borrow_mut() = Journal::default());
}

/// Run `f` with a thread-scoped `JournalSubscriber` and return what it logged.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Journal) {
    clear();
    let result = tracing::subscriber::with_default(JournalSubscriber, f);
    (result, drain())
}

// === Polars Integration ===

use polars::prelude::{DataFrame, NamedFrom, PolarsResult};

impl EventTable {
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| match col {
                Column::U64(v) => polars::prelude::Column::new(name.into(), v),
                Column::I64(v) => polars::prelude::Column::new(name.into(), v),
                Column::F64(v) => polars::prelude::Column::new(name.into(), v),
                Column::Bool(v) => polars::prelude::Column::new(name.into(), v),
                Column::Str(v) => polars::prelude::Column::new(name.into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

impl Journal {
    /// One DataFrame per target. Tables that fail to convert are skipped.
    pub fn to_dataframes(&self) -> BTreeMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}
