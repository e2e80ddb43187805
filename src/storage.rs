//! File-backed storage of loaded matches.
//!
//! The database file is attached under the dataset name, so every table is
//! addressed as `<dataset>.<table>` (e.g. `fbref.match_stats`).  Scalar match
//! fields live in [`MATCH_STATS_TABLE`]; each statistics category gets a
//! child table `match_stats__<category>` whose rows point back to their
//! match through `_parent_id`.  Columns are created on first sight, so later
//! records may widen the schema.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use fbref_scraping_utils::regex;
use itertools::Itertools;
use log::{debug, info};
use rusqlite::{params, params_from_iter, types::Value, Connection, Transaction};

use crate::schema::{CellValue, MatchRecord, MatchUrl, StatRow, TableCategory};

pub const MATCH_STATS_TABLE: &str = "match_stats";
pub const LOADS_TABLE: &str = "_loads";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database file {0:?} was not found.")]
    NotFound(PathBuf),
    #[error("Invalid dataset name {0:?}: only ASCII letters, digits and underscores are allowed.")]
    InvalidDataset(String),
    #[error("A database error occurred: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Identifies one pipeline run in the `_loads` table and on every row it wrote.
#[derive(Clone, PartialEq, Eq, Debug, From, Display)]
pub struct LoadId(String);
impl LoadId {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self(format!(
            "{}.{:09}",
            started_at.timestamp(),
            started_at.timestamp_subsec_nanos()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn attach(path: &Path, dataset: &str) -> Result<Connection, StorageError> {
    if !regex!(r"^[A-Za-z_][A-Za-z0-9_]*$").is_match(dataset) {
        return Err(StorageError::InvalidDataset(dataset.to_owned()));
    }
    let conn = Connection::open_in_memory()?;
    conn.execute(
        &format!("ATTACH DATABASE ?1 AS {dataset}"),
        [path.to_string_lossy().as_ref()],
    )?;
    Ok(conn)
}

/// Distinct URLs of every match loaded so far.
///
/// A missing database file is reported as [`StorageError::NotFound`] rather
/// than created.
pub fn load_prior_urls(path: &Path, dataset: &str) -> Result<HashSet<MatchUrl>, StorageError> {
    if !path.exists() {
        return Err(StorageError::NotFound(path.to_owned()));
    }
    let conn = attach(path, dataset)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT url FROM {dataset}.{MATCH_STATS_TABLE}"
    ))?;
    let urls = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .map_ok(MatchUrl::from)
        .collect::<Result<HashSet<_>, _>>()?;
    debug!("{} match urls already loaded in {path:?}", urls.len());
    Ok(urls)
}

/// Append-only writer for match records.
pub struct MatchStatsStore {
    conn: Connection,
    dataset: String,
    path: PathBuf,
}

impl MatchStatsStore {
    pub fn open(path: impl Into<PathBuf>, dataset: &str) -> Result<Self, StorageError> {
        let path = path.into();
        let conn = attach(&path, dataset)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {dataset}.{MATCH_STATS_TABLE} (
                _id INTEGER PRIMARY KEY,
                _load_id TEXT NOT NULL,
                url TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {dataset}.{LOADS_TABLE} (
                load_id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                finished_at TEXT,
                records INTEGER NOT NULL DEFAULT 0
            );"
        ))?;
        info!("Opened dataset {dataset:?} in {path:?}.");
        Ok(Self {
            conn,
            dataset: dataset.to_owned(),
            path,
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start_load(&mut self, started_at: DateTime<Utc>) -> Result<LoadId, StorageError> {
        let load_id = LoadId::new(started_at);
        self.conn.execute(
            &format!(
                "INSERT INTO {}.{LOADS_TABLE} (load_id, started_at) VALUES (?1, ?2)",
                self.dataset
            ),
            params![load_id.as_str(), started_at.to_rfc3339()],
        )?;
        Ok(load_id)
    }

    pub fn finish_load(
        &mut self,
        load_id: &LoadId,
        finished_at: DateTime<Utc>,
        records: usize,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            &format!(
                "UPDATE {}.{LOADS_TABLE} SET finished_at = ?1, records = ?2 WHERE load_id = ?3",
                self.dataset
            ),
            params![finished_at.to_rfc3339(), records as i64, load_id.as_str()],
        )?;
        Ok(())
    }

    /// Writes one match and its statistics rows in a single transaction.
    pub fn append(&mut self, load_id: &LoadId, record: &MatchRecord) -> Result<(), StorageError> {
        let dataset = self.dataset.as_str();
        let tx = self.conn.transaction()?;

        let mut columns = vec![
            ("_load_id".to_owned(), Value::Text(load_id.as_str().to_owned())),
            ("url".to_owned(), Value::Text(record.url.as_str().to_owned())),
        ];
        columns.extend(record.info.scalar_fields().into_iter().map(|(key, value)| {
            (
                key.to_owned(),
                value.map_or(Value::Null, |value| Value::Text(value.to_owned())),
            )
        }));
        let parent_id = insert_row(&tx, dataset, MATCH_STATS_TABLE, &columns)?;

        for (category, rows) in record.tables.iter() {
            let table = child_table_name(category);
            tx.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {dataset}.{table} (
                    _parent_id INTEGER NOT NULL,
                    _list_idx INTEGER NOT NULL
                );"
            ))?;
            for (list_idx, row) in rows.iter().enumerate() {
                let mut columns = vec![
                    ("_parent_id".to_owned(), Value::Integer(parent_id)),
                    ("_list_idx".to_owned(), Value::Integer(list_idx as i64)),
                ];
                columns.extend(stat_row_columns(row));
                insert_row(&tx, dataset, &table, &columns)?;
            }
        }

        tx.commit()?;
        debug!("Appended {} to {dataset}.{MATCH_STATS_TABLE}", record.url);
        Ok(())
    }
}

pub fn child_table_name(category: TableCategory) -> String {
    format!("{MATCH_STATS_TABLE}__{category}")
}

/// Column names of a stat row.  Labels that normalize to a name already taken
/// get the first free `_2`, `_3`, ... suffix.
fn stat_row_columns(row: &StatRow) -> Vec<(String, Value)> {
    let mut emitted = HashSet::new();
    row.iter()
        .map(|(name, value)| {
            let base = normalize_identifier(name);
            let mut name = base.clone();
            let mut suffix = 1;
            while emitted.contains(&name) {
                suffix += 1;
                name = format!("{base}_{suffix}");
            }
            emitted.insert(name.clone());
            (name, sql_value(value))
        })
        .collect()
}

fn sql_value(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Integer(x) => Value::Integer(*x),
        CellValue::Float(x) => Value::Real(*x),
        CellValue::Text(x) => Value::Text(x.clone()),
    }
}

/// Turns a column label into a snake_case SQL identifier,
/// e.g. `"Performance Gls"` into `performance_gls` and `"Cmp%"` into `cmp_pct`.
pub fn normalize_identifier(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' => normalized.push_str("_pct_"),
            '#' => normalized.push_str("_num_"),
            c if c.is_ascii_alphanumeric() => normalized.push(c.to_ascii_lowercase()),
            _ => normalized.push('_'),
        }
    }
    let normalized = normalized
        .split('_')
        .filter(|part| !part.is_empty())
        .join("_");
    if normalized.is_empty() {
        "_".to_owned()
    } else if normalized.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{normalized}")
    } else {
        normalized
    }
}

fn declared_type(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => " INTEGER",
        Value::Real(_) => " REAL",
        Value::Text(_) => " TEXT",
        Value::Blob(_) => " BLOB",
        Value::Null => "",
    }
}

fn existing_columns(
    tx: &Transaction,
    dataset: &str,
    table: &str,
) -> Result<HashSet<String>, StorageError> {
    let mut stmt = tx.prepare(&format!("PRAGMA {dataset}.table_info(\"{table}\")"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<_, _>>()?;
    Ok(columns)
}

/// Inserts a row, first adding any column the table does not have yet.
fn insert_row(
    tx: &Transaction,
    dataset: &str,
    table: &str,
    columns: &[(String, Value)],
) -> Result<i64, StorageError> {
    let existing = existing_columns(tx, dataset, table)?;
    // A column is created once it has a non-null value, typed after that value.
    let columns = columns
        .iter()
        .filter(|(name, value)| existing.contains(name) || !matches!(value, Value::Null))
        .collect_vec();
    for (name, value) in columns.iter().filter(|(name, _)| !existing.contains(name)) {
        debug!("Adding column {name:?} to {dataset}.{table}");
        tx.execute_batch(&format!(
            "ALTER TABLE {dataset}.{table} ADD COLUMN \"{name}\"{}",
            declared_type(value)
        ))?;
    }
    let sql = format!(
        "INSERT INTO {dataset}.{table} ({}) VALUES ({})",
        columns.iter().map(|(name, _)| format!("\"{name}\"")).join(", "),
        (1..=columns.len()).map(|i| format!("?{i}")).join(", "),
    );
    tx.execute(&sql, params_from_iter(columns.iter().map(|(_, value)| value)))?;
    Ok(tx.last_insert_rowid())
}
