//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for ministries,
//!   memberships and the ministry closure table.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories refuse connections whose schema is not fully migrated.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod hierarchy_repo;
pub mod member_repo;
pub mod ministry_repo;

/// Connection/schema readiness failures shared by all repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for SchemaError {}

/// Outcome of a readiness check: SQL failure or schema mismatch.
pub(crate) enum ReadinessError {
    Sqlite(rusqlite::Error),
    Schema(SchemaError),
}

impl From<rusqlite::Error> for ReadinessError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Verifies migration version plus the presence of `table` and `columns`.
pub(crate) fn ensure_table_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> Result<(), ReadinessError> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(ReadinessError::Schema(SchemaError::UninitializedConnection {
            expected_version,
            actual_version,
        }));
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(ReadinessError::Schema(SchemaError::MissingRequiredTable(table)));
    }

    let mut present = Vec::new();
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        present.push(row.get::<_, String>(1)?);
    }
    for column in columns {
        if !present.iter().any(|name| name == column) {
            return Err(ReadinessError::Schema(SchemaError::MissingRequiredColumn {
                table,
                column,
            }));
        }
    }
    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value).map_err(|_| format!("invalid uuid `{value}` in {column}"))
}

pub(crate) fn parse_date(value: &str, column: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date `{value}` in {column}"))
}

pub(crate) fn parse_flag(value: i64, column: &str) -> Result<bool, String> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(format!("invalid flag value `{other}` in {column}")),
    }
}

pub(crate) fn format_date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// `?1, ?2, ... ?count` for dynamic `IN (...)` lists.
pub(crate) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::{parse_date, parse_flag, placeholders};

    #[test]
    fn placeholders_are_numbered() {
        assert_eq!(placeholders(3), "?1, ?2, ?3");
        assert_eq!(placeholders(0), "");
    }

    #[test]
    fn parse_helpers_reject_garbage() {
        assert!(parse_date("2024-13-01", "t.c").is_err());
        assert!(parse_date("2024-02-29", "t.c").is_ok());
        assert!(parse_flag(2, "t.c").is_err());
    }
}
