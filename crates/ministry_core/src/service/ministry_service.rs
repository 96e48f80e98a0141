//! Ministry lifecycle use-case service.
//!
//! # Responsibility
//! - Create/update ministries and their member assignments.
//! - Drive the hierarchy engine on structural changes, inside the same
//!   transaction as the ministry row.
//! - Assemble ministry rosters enriched with member-directory profiles.
//!
//! # Invariants
//! - Name conflicts and missing references are detected before any mutation.
//! - A create/update commits the row, its closure edges and its assignments
//!   together or not at all.
//! - Criteria are fixed at creation time.
//! - Directory failures surface as missing profiles, never as errors.

use crate::db::{run_in_transaction, DbError};
use crate::directory::{FallbackDirectory, MemberDirectory, MemberProfile, MemberSearchFilters};
use crate::model::member::{MemberAssignment, MemberId, MinistryMember};
use crate::model::ministry::{
    Criteria, Ministry, MinistryId, MinistryType, MinistryValidationError,
};
use crate::model::role::{RoleName, RoleRanking};
use crate::repo::hierarchy_repo::SqliteHierarchyRepository;
use crate::repo::member_repo::{MemberRepository, SqliteMemberRepository};
use crate::repo::ministry_repo::{MinistryRepository, RepoError, SqliteMinistryRepository};
use crate::service::hierarchy_service::{HierarchyService, HierarchyServiceError};
use crate::service::membership_resolver::{HighestRole, MembershipResolver, ResolverError};
use chrono::{Local, NaiveDate};
use log::{info, warn};
use rusqlite::{Connection, ErrorCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Create/update payload for one ministry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMinistryRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<MinistryType>,
    pub established_date: Option<NaiveDate>,
    /// Parent ministry; `None` makes the ministry a root.
    #[serde(rename = "direction")]
    pub parent_id: Option<MinistryId>,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
    #[serde(default)]
    pub criteria: Criteria,
    #[serde(default)]
    pub members: Vec<MemberAssignment>,
}

/// One member seat in a ministry roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub profile: MemberProfile,
    pub role: RoleName,
    pub committee: bool,
}

/// Members of one ministry split by seat kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MinistryRoster {
    pub unit: Vec<RosterEntry>,
    pub committee: Vec<RosterEntry>,
    /// Committee member with the most senior role.
    pub leader: Option<RosterEntry>,
}

/// Ministry with roster and direct sub-units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinistryDetails {
    pub ministry: Ministry,
    pub sub_units: Vec<String>,
    pub members: MinistryRoster,
}

/// Errors from ministry lifecycle operations.
#[derive(Debug)]
pub enum MinistryServiceError {
    /// Name is blank after trim.
    InvalidName,
    /// Term ends before it starts.
    InvalidTerm { start: NaiveDate, end: NaiveDate },
    /// Another ministry already uses this name.
    NameConflict(String),
    /// Target ministry does not exist.
    NotFound(MinistryId),
    /// Requested parent does not exist.
    ParentNotFound(MinistryId),
    /// Re-parent would place a ministry under itself or a descendant.
    CycleDetected {
        ministry_id: MinistryId,
        parent_id: MinistryId,
    },
    /// Ministry/membership storage failure.
    Records(RepoError),
    /// Closure maintenance failure.
    Hierarchy(HierarchyServiceError),
    /// Membership resolution failure.
    Resolver(ResolverError),
}

impl MinistryServiceError {
    /// Whether the caller sent an invalid request (as opposed to a server fault).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidName
                | Self::InvalidTerm { .. }
                | Self::NameConflict(_)
                | Self::NotFound(_)
                | Self::ParentNotFound(_)
                | Self::CycleDetected { .. }
        )
    }
}

impl Display for MinistryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "ministry name must not be blank"),
            Self::InvalidTerm { start, end } => {
                write!(f, "term end {end} is before term start {start}")
            }
            Self::NameConflict(name) => write!(f, "ministry name exists: {name}"),
            Self::NotFound(id) => write!(f, "ministry not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent ministry not found: {id}"),
            Self::CycleDetected {
                ministry_id,
                parent_id,
            } => write!(
                f,
                "move would create cycle: ministry {ministry_id} under parent {parent_id}"
            ),
            Self::Records(err) => write!(f, "{err}"),
            Self::Hierarchy(err) => write!(f, "{err}"),
            Self::Resolver(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MinistryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Records(err) => Some(err),
            Self::Hierarchy(err) => Some(err),
            Self::Resolver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MinistryValidationError> for MinistryServiceError {
    fn from(value: MinistryValidationError) -> Self {
        match value {
            MinistryValidationError::BlankName => Self::InvalidName,
            MinistryValidationError::TermEndsBeforeStart { start, end } => {
                Self::InvalidTerm { start, end }
            }
            MinistryValidationError::SelfParent(id) => Self::CycleDetected {
                ministry_id: id,
                parent_id: id,
            },
        }
    }
}

impl From<RepoError> for MinistryServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => err.into(),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Records(other),
        }
    }
}

impl From<HierarchyServiceError> for MinistryServiceError {
    fn from(value: HierarchyServiceError) -> Self {
        match value {
            HierarchyServiceError::MinistryNotFound(id) => Self::NotFound(id),
            HierarchyServiceError::ParentNotFound(id) => Self::ParentNotFound(id),
            HierarchyServiceError::CycleDetected {
                ministry_id,
                parent_id,
            } => Self::CycleDetected {
                ministry_id,
                parent_id,
            },
            other => Self::Hierarchy(other),
        }
    }
}

impl From<ResolverError> for MinistryServiceError {
    fn from(value: ResolverError) -> Self {
        Self::Resolver(value)
    }
}

impl From<rusqlite::Error> for MinistryServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Records(RepoError::Db(DbError::Sqlite(value)))
    }
}

type SqliteResolver<'conn> = MembershipResolver<
    SqliteMemberRepository<'conn>,
    SqliteHierarchyRepository<'conn>,
    SqliteMinistryRepository<'conn>,
>;

/// Ministry lifecycle facade over one SQLite connection.
pub struct MinistryService<'conn, D: MemberDirectory> {
    conn: &'conn Connection,
    ministries: SqliteMinistryRepository<'conn>,
    members: SqliteMemberRepository<'conn>,
    hierarchy: HierarchyService<SqliteHierarchyRepository<'conn>>,
    resolver: SqliteResolver<'conn>,
    directory: FallbackDirectory<D>,
}

impl<'conn, D: MemberDirectory> MinistryService<'conn, D> {
    /// Wires repositories over a migrated connection.
    pub fn try_new(
        conn: &'conn Connection,
        directory: FallbackDirectory<D>,
        ranking: RoleRanking,
    ) -> Result<Self, MinistryServiceError> {
        let resolver = MembershipResolver::new(
            SqliteMemberRepository::try_new(conn)?,
            SqliteHierarchyRepository::try_new(conn).map_err(HierarchyServiceError::Repo)?,
            SqliteMinistryRepository::try_new(conn)?,
            ranking,
        );
        Ok(Self {
            conn,
            ministries: SqliteMinistryRepository::try_new(conn)?,
            members: SqliteMemberRepository::try_new(conn)?,
            hierarchy: HierarchyService::new(
                SqliteHierarchyRepository::try_new(conn).map_err(HierarchyServiceError::Repo)?,
            ),
            resolver,
            directory,
        })
    }

    /// Creates one ministry, its closure edges and its assignments.
    pub fn create_ministry(
        &self,
        request: CreateMinistryRequest,
    ) -> Result<Ministry, MinistryServiceError> {
        let name = normalize_name(&request.name)?;
        let mut ministry = Ministry::new(name);
        ministry.kind = request.kind;
        ministry.established_date = request.established_date;
        ministry.parent_id = request.parent_id;
        ministry.term_start = request.term_start;
        ministry.term_end = request.term_end;
        ministry.criteria = request.criteria;
        ministry.validate()?;

        run_in_transaction(self.conn, |_| -> Result<(), MinistryServiceError> {
            self.ensure_name_free(&ministry.name, None)?;
            if let Some(parent_id) = ministry.parent_id {
                self.ensure_exists(parent_id, MinistryServiceError::ParentNotFound)?;
            }
            self.ministries
                .create_ministry(&ministry)
                .map_err(|err| name_collision(err, &ministry.name))?;
            self.hierarchy.on_created(ministry.id, ministry.parent_id)?;
            self.persist_assignments(ministry.id, &request.members)?;
            Ok(())
        })?;

        info!(
            "event=ministry_create module=ministry status=ok has_parent={} assignments={}",
            ministry.parent_id.is_some(),
            request.members.len()
        );
        Ok(ministry)
    }

    /// Updates one ministry; re-links its subtree when the parent changed.
    pub fn update_ministry(
        &self,
        id: MinistryId,
        request: CreateMinistryRequest,
    ) -> Result<Ministry, MinistryServiceError> {
        let name = normalize_name(&request.name)?;

        let (updated, moved) =
            run_in_transaction(self.conn, |_| -> Result<(Ministry, bool), MinistryServiceError> {
                let existing = self.get_ministry(id)?;
                self.ensure_name_free(&name, Some(id))?;
                if let Some(parent_id) = request.parent_id {
                    self.ensure_exists(parent_id, MinistryServiceError::ParentNotFound)?;
                }

                let mut updated = existing.clone();
                updated.name = name.clone();
                updated.kind = request.kind;
                updated.established_date = request.established_date;
                updated.parent_id = request.parent_id;
                updated.term_start = request.term_start;
                updated.term_end = request.term_end;
                updated.validate()?;

                self.ministries
                    .update_ministry(&updated)
                    .map_err(|err| name_collision(err, &updated.name))?;
                let moved =
                    self.hierarchy
                        .on_reparented(id, existing.parent_id, updated.parent_id)?;
                self.persist_assignments(id, &request.members)?;
                Ok((updated, moved))
            })?;

        info!(
            "event=ministry_update module=ministry status=ok moved={} assignments={}",
            moved,
            request.members.len()
        );
        Ok(updated)
    }

    pub fn get_ministry(&self, id: MinistryId) -> Result<Ministry, MinistryServiceError> {
        self.ministries
            .get_ministry(id)?
            .ok_or(MinistryServiceError::NotFound(id))
    }

    pub fn list_ministries(&self) -> Result<Vec<Ministry>, MinistryServiceError> {
        Ok(self.ministries.list_ministries()?)
    }

    /// Lists every ministry with roster, leader and direct sub-units.
    ///
    /// Profiles are fetched from the directory in one batch; members whose
    /// profile is unavailable are left out of the roster.
    pub fn ministry_details(&self) -> Result<Vec<MinistryDetails>, MinistryServiceError> {
        let ministries = self.ministries.list_ministries()?;
        if ministries.is_empty() {
            return Ok(Vec::new());
        }

        let ids: BTreeSet<MinistryId> = ministries.iter().map(|ministry| ministry.id).collect();
        let seats = self.members.find_by_ministries(&ids)?;
        let member_ids: BTreeSet<MemberId> =
            seats.iter().map(|seat| seat.member_id.clone()).collect();
        let profiles: HashMap<MemberId, MemberProfile> = self
            .directory
            .members_by_ids(&member_ids)
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();

        let mut seats_by_ministry: HashMap<MinistryId, Vec<&MinistryMember>> = HashMap::new();
        for seat in &seats {
            seats_by_ministry.entry(seat.ministry_id).or_default().push(seat);
        }
        let mut children: HashMap<MinistryId, Vec<String>> = HashMap::new();
        for ministry in &ministries {
            if let Some(parent_id) = ministry.parent_id {
                children.entry(parent_id).or_default().push(ministry.name.clone());
            }
        }

        let ranking = self.resolver.ranking();
        let details = ministries
            .into_iter()
            .map(|ministry| {
                let seats = seats_by_ministry.remove(&ministry.id).unwrap_or_default();
                MinistryDetails {
                    sub_units: children.remove(&ministry.id).unwrap_or_default(),
                    members: build_roster(&seats, &profiles, ranking),
                    ministry,
                }
            })
            .collect();
        Ok(details)
    }

    /// Directory members matching the ministry's criteria.
    pub fn potential_members(
        &self,
        ministry_id: MinistryId,
    ) -> Result<Vec<MemberProfile>, MinistryServiceError> {
        let ministry = self.get_ministry(ministry_id)?;
        let filters = MemberSearchFilters::from_criteria(&ministry.criteria);
        Ok(self.directory.search_members(&filters))
    }

    /// Directory members matching explicit demographic filters.
    pub fn potential_members_by_filters(
        &self,
        age: &str,
        gender: &str,
        marital_status: &str,
    ) -> Vec<MemberProfile> {
        let filters = MemberSearchFilters::demographic(age, gender, marital_status);
        self.directory.search_members(&filters)
    }

    /// Most senior active membership of `member_id`, if any.
    pub fn highest_role_for_member(
        &self,
        member_id: &str,
    ) -> Result<Option<HighestRole>, MinistryServiceError> {
        Ok(self.resolver.highest_role_for_member(member_id)?)
    }

    /// Administrative full closure rebuild. Returns the number of edges written.
    pub fn rebuild_full_hierarchy(&self) -> Result<usize, MinistryServiceError> {
        Ok(self.hierarchy.rebuild_all()?)
    }

    /// Name lookup runs inside the write transaction, so it serializes with
    /// other writers.
    fn ensure_name_free(
        &self,
        name: &str,
        owner: Option<MinistryId>,
    ) -> Result<(), MinistryServiceError> {
        match self.ministries.find_by_name(name)? {
            Some(other) if Some(other.id) != owner => {
                Err(MinistryServiceError::NameConflict(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn ensure_exists(
        &self,
        id: MinistryId,
        missing: fn(MinistryId) -> MinistryServiceError,
    ) -> Result<(), MinistryServiceError> {
        match self.ministries.get_ministry(id)? {
            Some(_) => Ok(()),
            None => Err(missing(id)),
        }
    }

    /// Merges assignments: existing seats get role/committee updated, new
    /// seats default to `MEMBER`.
    fn persist_assignments(
        &self,
        ministry_id: MinistryId,
        assignments: &[MemberAssignment],
    ) -> Result<(), MinistryServiceError> {
        if assignments.is_empty() {
            return Ok(());
        }

        let mut existing: HashMap<MemberId, MinistryMember> = self
            .members
            .find_by_ministry(ministry_id)?
            .into_iter()
            .map(|seat| (seat.member_id.clone(), seat))
            .collect();
        let today = Local::now().date_naive();

        for assignment in assignments {
            let member_id = assignment.member_id.trim();
            if member_id.is_empty() {
                continue;
            }
            match existing.get_mut(member_id) {
                Some(seat) => {
                    if let Some(role) = assignment.role {
                        seat.role = role;
                    }
                    seat.committee = assignment.committee;
                    self.members.update_member(seat)?;
                }
                None => {
                    let seat = MinistryMember::new(
                        ministry_id,
                        member_id,
                        assignment.role.unwrap_or(RoleName::Member),
                        assignment.committee,
                        today,
                    );
                    self.members.insert_member(&seat)?;
                    existing.insert(seat.member_id.clone(), seat);
                }
            }
        }
        Ok(())
    }
}

/// Maps a unique-index hit on `ministries.name` to `NameConflict`.
fn name_collision(err: RepoError, name: &str) -> MinistryServiceError {
    if let RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(code, Some(message)))) =
        &err
    {
        if code.code == ErrorCode::ConstraintViolation && message.contains("ministries.name") {
            warn!("event=ministry_write module=ministry status=rejected reason=name_conflict");
            return MinistryServiceError::NameConflict(name.to_string());
        }
    }
    err.into()
}

fn normalize_name(value: &str) -> Result<String, MinistryServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MinistryServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}

/// Splits seats into unit/committee and elects the committee leader.
fn build_roster(
    seats: &[&MinistryMember],
    profiles: &HashMap<MemberId, MemberProfile>,
    ranking: &RoleRanking,
) -> MinistryRoster {
    let mut roster = MinistryRoster::default();
    let mut leader_rank = None;

    for seat in seats {
        let Some(profile) = profiles.get(&seat.member_id) else {
            continue;
        };
        let entry = RosterEntry {
            profile: profile.clone(),
            role: seat.role,
            committee: seat.committee,
        };
        if seat.committee {
            let rank = ranking.rank(seat.role);
            if leader_rank.map_or(true, |best| rank < best) {
                leader_rank = Some(rank);
                roster.leader = Some(entry.clone());
            }
            roster.committee.push(entry);
        } else {
            roster.unit.push(entry);
        }
    }
    roster
}
