//! Ministry repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `ministries` storage.
//! - Keep SQL details inside core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Ministry::validate()` before SQL mutations.
//! - Name uniqueness is enforced by the `ministries.name` unique index.
//! - Closure rows are not touched here; see `hierarchy_repo`.

use crate::db::DbError;
use crate::model::ministry::{
    Criteria, Ministry, MinistryId, MinistryType, MinistryValidationError,
};
use crate::repo::{
    ensure_table_ready, format_date, parse_date, parse_flag, parse_uuid, ReadinessError,
    SchemaError,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MINISTRY_SELECT_SQL: &str = "SELECT
    id,
    name,
    type,
    established_date,
    parent_id,
    term_start,
    term_end,
    criteria_gender,
    criteria_age_group,
    criteria_marital_status,
    active
FROM ministries";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for ministry and membership record operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(MinistryValidationError),
    Db(DbError),
    NotFound(Uuid),
    Schema(SchemaError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<MinistryValidationError> for RepoError {
    fn from(value: MinistryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ReadinessError> for RepoError {
    fn from(value: ReadinessError) -> Self {
        match value {
            ReadinessError::Sqlite(err) => err.into(),
            ReadinessError::Schema(err) => Self::Schema(err),
        }
    }
}

/// Repository interface for ministry records.
pub trait MinistryRepository {
    fn create_ministry(&self, ministry: &Ministry) -> RepoResult<MinistryId>;
    fn update_ministry(&self, ministry: &Ministry) -> RepoResult<()>;
    fn get_ministry(&self, id: MinistryId) -> RepoResult<Option<Ministry>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Ministry>>;
    /// All ministries ordered by name.
    fn list_ministries(&self) -> RepoResult<Vec<Ministry>>;
    fn ministry_name(&self, id: MinistryId) -> RepoResult<Option<String>>;
}

/// SQLite-backed ministry repository.
pub struct SqliteMinistryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMinistryRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(
            conn,
            "ministries",
            &["id", "name", "type", "parent_id", "active"],
        )?;
        Ok(Self { conn })
    }
}

impl MinistryRepository for SqliteMinistryRepository<'_> {
    fn create_ministry(&self, ministry: &Ministry) -> RepoResult<MinistryId> {
        ministry.validate()?;

        self.conn.execute(
            "INSERT INTO ministries (
                id,
                name,
                type,
                established_date,
                parent_id,
                term_start,
                term_end,
                criteria_gender,
                criteria_age_group,
                criteria_marital_status,
                active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                ministry.id.to_string(),
                ministry.name.trim(),
                ministry.kind.map(MinistryType::as_str),
                ministry.established_date.map(format_date),
                ministry.parent_id.map(|value| value.to_string()),
                ministry.term_start.map(format_date),
                ministry.term_end.map(format_date),
                ministry.criteria.gender,
                ministry.criteria.age_group,
                ministry.criteria.marital_status,
                ministry.active as i64,
            ],
        )?;

        Ok(ministry.id)
    }

    fn update_ministry(&self, ministry: &Ministry) -> RepoResult<()> {
        ministry.validate()?;

        let changed = self.conn.execute(
            "UPDATE ministries
             SET name = ?2,
                 type = ?3,
                 established_date = ?4,
                 parent_id = ?5,
                 term_start = ?6,
                 term_end = ?7,
                 criteria_gender = ?8,
                 criteria_age_group = ?9,
                 criteria_marital_status = ?10,
                 active = ?11,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                ministry.id.to_string(),
                ministry.name.trim(),
                ministry.kind.map(MinistryType::as_str),
                ministry.established_date.map(format_date),
                ministry.parent_id.map(|value| value.to_string()),
                ministry.term_start.map(format_date),
                ministry.term_end.map(format_date),
                ministry.criteria.gender,
                ministry.criteria.age_group,
                ministry.criteria.marital_status,
                ministry.active as i64,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(ministry.id));
        }
        Ok(())
    }

    fn get_ministry(&self, id: MinistryId) -> RepoResult<Option<Ministry>> {
        let sql = format!("{MINISTRY_SELECT_SQL} WHERE id = ?1;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_ministry_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Ministry>> {
        let sql = format!("{MINISTRY_SELECT_SQL} WHERE name = ?1;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([name.trim()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_ministry_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_ministries(&self) -> RepoResult<Vec<Ministry>> {
        let sql = format!("{MINISTRY_SELECT_SQL} ORDER BY name ASC, id ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut ministries = Vec::new();
        while let Some(row) = rows.next()? {
            ministries.push(parse_ministry_row(row)?);
        }
        Ok(ministries)
    }

    fn ministry_name(&self, id: MinistryId) -> RepoResult<Option<String>> {
        let name = self
            .conn
            .query_row(
                "SELECT name FROM ministries WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }
}

fn parse_ministry_row(row: &Row<'_>) -> RepoResult<Ministry> {
    let id_text: String = row.get("id")?;
    let kind = match row.get::<_, Option<String>>("type")? {
        None => None,
        Some(value) => Some(MinistryType::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid ministry type `{value}` in ministries.type"))
        })?),
    };

    Ok(Ministry {
        id: parse_uuid(&id_text, "ministries.id").map_err(RepoError::InvalidData)?,
        name: row.get("name")?,
        kind,
        established_date: optional_date(row, "established_date")?,
        parent_id: row
            .get::<_, Option<String>>("parent_id")?
            .map(|value| parse_uuid(&value, "ministries.parent_id"))
            .transpose()
            .map_err(RepoError::InvalidData)?,
        term_start: optional_date(row, "term_start")?,
        term_end: optional_date(row, "term_end")?,
        criteria: Criteria {
            gender: row.get("criteria_gender")?,
            age_group: row.get("criteria_age_group")?,
            marital_status: row.get("criteria_marital_status")?,
        },
        active: parse_flag(row.get("active")?, "ministries.active")
            .map_err(RepoError::InvalidData)?,
    })
}

fn optional_date(row: &Row<'_>, column: &'static str) -> RepoResult<Option<chrono::NaiveDate>> {
    row.get::<_, Option<String>>(column)?
        .map(|value| parse_date(&value, column))
        .transpose()
        .map_err(RepoError::InvalidData)
}

#[cfg(test)]
mod tests {
    use super::{MinistryRepository, RepoError, SqliteMinistryRepository};
    use crate::db::open_db_in_memory;
    use crate::model::ministry::{Ministry, MinistryType};
    use chrono::NaiveDate;

    #[test]
    fn create_then_get_preserves_fields() {
        let conn = open_db_in_memory().expect("db should open");
        let repo = SqliteMinistryRepository::try_new(&conn).expect("repo should build");

        let mut ministry = Ministry::new("  Choir  ");
        ministry.kind = Some(MinistryType::Choir);
        ministry.term_start = NaiveDate::from_ymd_opt(2024, 1, 1);
        ministry.term_end = NaiveDate::from_ymd_opt(2025, 12, 31);
        ministry.criteria.gender = Some("FEMALE".to_string());
        repo.create_ministry(&ministry).expect("create should succeed");

        let loaded = repo
            .get_ministry(ministry.id)
            .expect("get should succeed")
            .expect("row should exist");
        assert_eq!(loaded.name, "Choir");
        assert_eq!(loaded.kind, Some(MinistryType::Choir));
        assert_eq!(loaded.term_end, ministry.term_end);
        assert_eq!(loaded.criteria.gender.as_deref(), Some("FEMALE"));
        assert!(loaded.active);

        let by_name = repo.find_by_name("Choir").expect("lookup should succeed");
        assert_eq!(by_name.map(|value| value.id), Some(ministry.id));
    }

    #[test]
    fn update_missing_ministry_is_not_found() {
        let conn = open_db_in_memory().expect("db should open");
        let repo = SqliteMinistryRepository::try_new(&conn).expect("repo should build");
        let ghost = Ministry::new("Ghost");
        let err = repo.update_ministry(&ghost).expect_err("update must fail");
        assert!(matches!(err, RepoError::NotFound(id) if id == ghost.id));
    }

    #[test]
    fn blank_name_never_reaches_storage() {
        let conn = open_db_in_memory().expect("db should open");
        let repo = SqliteMinistryRepository::try_new(&conn).expect("repo should build");
        let err = repo
            .create_ministry(&Ministry::new(" "))
            .expect_err("blank name must fail");
        assert!(matches!(err, RepoError::Validation(_)));
        assert!(repo.list_ministries().expect("list").is_empty());
    }
}
