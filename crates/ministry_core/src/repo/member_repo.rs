//! Ministry membership repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist `(ministry, member, role, committee)` assignments.
//! - Serve the read paths used by membership resolution and ministry details.
//!
//! # Invariants
//! - One row per `(ministry_id, member_id)` (unique index).
//! - Listing order is deterministic: `assigned_date ASC`, then insertion order.

use crate::model::member::{MemberId, MinistryMember};
use crate::model::ministry::MinistryId;
use crate::model::role::RoleName;
use crate::repo::ministry_repo::{RepoError, RepoResult};
use crate::repo::{
    ensure_table_ready, format_date, parse_date, parse_flag, parse_uuid, placeholders,
};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeSet;

const MEMBER_SELECT_SQL: &str = "SELECT
    id,
    ministry_id,
    member_id,
    role,
    committee,
    assigned_date,
    active
FROM ministry_members";

const MEMBER_ORDER_SQL: &str = "ORDER BY assigned_date ASC, rowid ASC";

/// Repository interface for membership records.
pub trait MemberRepository {
    fn insert_member(&self, member: &MinistryMember) -> RepoResult<()>;
    /// Updates role, committee flag and active flag of an existing row.
    fn update_member(&self, member: &MinistryMember) -> RepoResult<()>;
    fn find_by_ministry(&self, ministry_id: MinistryId) -> RepoResult<Vec<MinistryMember>>;
    fn find_by_ministries(
        &self,
        ministry_ids: &BTreeSet<MinistryId>,
    ) -> RepoResult<Vec<MinistryMember>>;
    /// Active memberships of one member; `committee_only` narrows to committee seats.
    fn find_active_by_member(
        &self,
        member_id: &str,
        committee_only: bool,
    ) -> RepoResult<Vec<MinistryMember>>;
}

/// SQLite-backed membership repository.
pub struct SqliteMemberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(
            conn,
            "ministry_members",
            &["id", "ministry_id", "member_id", "role", "committee", "active"],
        )?;
        Ok(Self { conn })
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn insert_member(&self, member: &MinistryMember) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO ministry_members (
                id,
                ministry_id,
                member_id,
                role,
                committee,
                assigned_date,
                active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                member.id.to_string(),
                member.ministry_id.to_string(),
                member.member_id,
                member.role.as_str(),
                member.committee as i64,
                format_date(member.assigned_date),
                member.active as i64,
            ],
        )?;
        Ok(())
    }

    fn update_member(&self, member: &MinistryMember) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE ministry_members
             SET role = ?2,
                 committee = ?3,
                 active = ?4
             WHERE id = ?1;",
            params![
                member.id.to_string(),
                member.role.as_str(),
                member.committee as i64,
                member.active as i64,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(member.id));
        }
        Ok(())
    }

    fn find_by_ministry(&self, ministry_id: MinistryId) -> RepoResult<Vec<MinistryMember>> {
        let sql = format!("{MEMBER_SELECT_SQL} WHERE ministry_id = ?1 {MEMBER_ORDER_SQL};");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query([ministry_id.to_string()])?;
        collect_members(rows)
    }

    fn find_by_ministries(
        &self,
        ministry_ids: &BTreeSet<MinistryId>,
    ) -> RepoResult<Vec<MinistryMember>> {
        if ministry_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "{MEMBER_SELECT_SQL} WHERE ministry_id IN ({}) {MEMBER_ORDER_SQL};",
            placeholders(ministry_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query(params_from_iter(ministry_ids.iter().map(|id| id.to_string())))?;
        collect_members(rows)
    }

    fn find_active_by_member(
        &self,
        member_id: &str,
        committee_only: bool,
    ) -> RepoResult<Vec<MinistryMember>> {
        let sql = if committee_only {
            format!(
                "{MEMBER_SELECT_SQL} WHERE member_id = ?1 AND active = 1 AND committee = 1 {MEMBER_ORDER_SQL};"
            )
        } else {
            format!("{MEMBER_SELECT_SQL} WHERE member_id = ?1 AND active = 1 {MEMBER_ORDER_SQL};")
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query([member_id])?;
        collect_members(rows)
    }
}

fn collect_members(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<MinistryMember>> {
    let mut members = Vec::new();
    while let Some(row) = rows.next()? {
        members.push(parse_member_row(row)?);
    }
    Ok(members)
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<MinistryMember> {
    let id_text: String = row.get("id")?;
    let ministry_text: String = row.get("ministry_id")?;
    let role_text: String = row.get("role")?;
    let date_text: String = row.get("assigned_date")?;
    let member_id: MemberId = row.get("member_id")?;

    let role = role_text.parse::<RoleName>().map_err(|err| {
        RepoError::InvalidData(format!("{err} in ministry_members.role"))
    })?;

    Ok(MinistryMember {
        id: parse_uuid(&id_text, "ministry_members.id").map_err(RepoError::InvalidData)?,
        ministry_id: parse_uuid(&ministry_text, "ministry_members.ministry_id")
            .map_err(RepoError::InvalidData)?,
        member_id,
        role,
        committee: parse_flag(row.get("committee")?, "ministry_members.committee")
            .map_err(RepoError::InvalidData)?,
        assigned_date: parse_date(&date_text, "ministry_members.assigned_date")
            .map_err(RepoError::InvalidData)?,
        active: parse_flag(row.get("active")?, "ministry_members.active")
            .map_err(RepoError::InvalidData)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{MemberRepository, SqliteMemberRepository};
    use crate::db::open_db_in_memory;
    use crate::model::member::MinistryMember;
    use crate::model::ministry::Ministry;
    use crate::model::role::RoleName;
    use crate::repo::ministry_repo::{MinistryRepository, SqliteMinistryRepository};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).expect("valid test date")
    }

    #[test]
    fn active_lookup_filters_inactive_and_committee() {
        let conn = open_db_in_memory().expect("db should open");
        let ministries = SqliteMinistryRepository::try_new(&conn).expect("ministry repo");
        let members = SqliteMemberRepository::try_new(&conn).expect("member repo");

        let choir = Ministry::new("Choir");
        let ushers = Ministry::new("Ushers");
        let media = Ministry::new("Media");
        for ministry in [&choir, &ushers, &media] {
            ministries.create_ministry(ministry).expect("create ministry");
        }

        let committee_seat =
            MinistryMember::new(choir.id, "m-1", RoleName::President, true, day(2));
        let unit_seat = MinistryMember::new(ushers.id, "m-1", RoleName::Usher, false, day(1));
        let mut retired = MinistryMember::new(media.id, "m-1", RoleName::MediaDirector, true, day(3));
        retired.active = false;
        for member in [&committee_seat, &unit_seat, &retired] {
            members.insert_member(member).expect("insert member");
        }

        let active = members.find_active_by_member("m-1", false).expect("active lookup");
        assert_eq!(
            active.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![unit_seat.id, committee_seat.id]
        );
        let committee = members.find_active_by_member("m-1", true).expect("committee lookup");
        assert_eq!(committee, vec![committee_seat]);
        assert!(members
            .find_active_by_member("nobody", false)
            .expect("empty lookup")
            .is_empty());
    }

    #[test]
    fn duplicate_member_in_same_ministry_is_rejected() {
        let conn = open_db_in_memory().expect("db should open");
        let ministries = SqliteMinistryRepository::try_new(&conn).expect("ministry repo");
        let members = SqliteMemberRepository::try_new(&conn).expect("member repo");
        let choir = Ministry::new("Choir");
        ministries.create_ministry(&choir).expect("create ministry");

        members
            .insert_member(&MinistryMember::new(choir.id, "m-1", RoleName::Member, false, day(1)))
            .expect("first insert");
        assert!(members
            .insert_member(&MinistryMember::new(choir.id, "m-1", RoleName::Dancer, false, day(2)))
            .is_err());
    }
}
