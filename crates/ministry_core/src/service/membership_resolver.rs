//! Membership resolver: one canonical (most senior) membership per member.
//!
//! # Responsibility
//! - Pick the candidate memberships (committee seats first, else all active).
//! - Rank candidates by closure-table standing, then by role seniority.
//!
//! # Invariants
//! - No active membership means "none found", not an error.
//! - Ties on both keys resolve to the first candidate in repository order.
//! - One `RoleRanking` is used for the whole resolution call.

use crate::model::member::{MemberId, MinistryMember};
use crate::model::ministry::MinistryId;
use crate::model::role::{RoleName, RoleRanking};
use crate::repo::hierarchy_repo::{HierarchyRepoError, HierarchyRepository};
use crate::repo::member_repo::MemberRepository;
use crate::repo::ministry_repo::{MinistryRepository, RepoError};
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Primary key for candidates outside the min-of-max-depth set.
const OUTSIDE_TOP_SET: u32 = u32::MAX;

/// Resolved most-senior membership for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighestRole {
    pub member_id: MemberId,
    pub role: RoleName,
    pub ministry_id: MinistryId,
    /// `None` only when the ministry row vanished concurrently.
    pub ministry_name: Option<String>,
}

/// Errors from membership resolution.
#[derive(Debug)]
pub enum ResolverError {
    Records(RepoError),
    Hierarchy(HierarchyRepoError),
}

impl Display for ResolverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Records(err) => write!(f, "{err}"),
            Self::Hierarchy(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResolverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Records(err) => Some(err),
            Self::Hierarchy(err) => Some(err),
        }
    }
}

impl From<RepoError> for ResolverError {
    fn from(value: RepoError) -> Self {
        Self::Records(value)
    }
}

impl From<HierarchyRepoError> for ResolverError {
    fn from(value: HierarchyRepoError) -> Self {
        Self::Hierarchy(value)
    }
}

/// Resolver over membership, closure and ministry stores.
pub struct MembershipResolver<M, H, N>
where
    M: MemberRepository,
    H: HierarchyRepository,
    N: MinistryRepository,
{
    members: M,
    hierarchy: H,
    ministries: N,
    ranking: RoleRanking,
}

impl<M, H, N> MembershipResolver<M, H, N>
where
    M: MemberRepository,
    H: HierarchyRepository,
    N: MinistryRepository,
{
    pub fn new(members: M, hierarchy: H, ministries: N, ranking: RoleRanking) -> Self {
        Self {
            members,
            hierarchy,
            ministries,
            ranking,
        }
    }

    pub fn ranking(&self) -> &RoleRanking {
        &self.ranking
    }

    /// Resolves the most senior active membership of `member_id`.
    pub fn highest_role_for_member(
        &self,
        member_id: &str,
    ) -> Result<Option<HighestRole>, ResolverError> {
        let mut candidates = self.members.find_active_by_member(member_id, true)?;
        if candidates.is_empty() {
            candidates = self.members.find_active_by_member(member_id, false)?;
        }
        if candidates.is_empty() {
            info!("event=resolve_role module=resolver status=ok outcome=none_found");
            return Ok(None);
        }

        let ministry_ids: BTreeSet<MinistryId> =
            candidates.iter().map(|member| member.ministry_id).collect();
        let top_set: HashMap<MinistryId, String> = self
            .hierarchy
            .min_of_max_depth_among(&ministry_ids)?
            .into_iter()
            .map(|descent| (descent.ministry_id, descent.name))
            .collect();

        let Some(best) = select_best(&candidates, &top_set, &self.ranking) else {
            return Ok(None);
        };

        let ministry_name = match top_set.get(&best.ministry_id) {
            Some(name) => Some(name.clone()),
            None => self.ministries.ministry_name(best.ministry_id)?,
        };

        debug!(
            "event=resolve_role module=resolver status=ok candidates={} top_set={} rank={}",
            candidates.len(),
            top_set.len(),
            self.ranking.rank(best.role)
        );

        Ok(Some(HighestRole {
            member_id: best.member_id.clone(),
            role: best.role,
            ministry_id: best.ministry_id,
            ministry_name,
        }))
    }
}

/// Smallest `(standing, rank)` candidate; first one wins exact ties.
fn select_best<'a, V>(
    candidates: &'a [MinistryMember],
    top_set: &HashMap<MinistryId, V>,
    ranking: &RoleRanking,
) -> Option<&'a MinistryMember> {
    candidates.iter().min_by_key(|member| {
        let standing = if top_set.contains_key(&member.ministry_id) {
            0
        } else {
            OUTSIDE_TOP_SET
        };
        (standing, ranking.rank(member.role))
    })
}

#[cfg(test)]
mod tests {
    use super::select_best;
    use crate::model::member::MinistryMember;
    use crate::model::role::{RoleName, RoleRanking};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn seat(ministry_id: Uuid, role: RoleName) -> MinistryMember {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid test date");
        MinistryMember::new(ministry_id, "m-1", role, true, date)
    }

    #[test]
    fn top_set_standing_beats_role_rank() {
        let shallow = Uuid::new_v4();
        let deep = Uuid::new_v4();
        let candidates = vec![
            seat(deep, RoleName::SeniorPastor),
            seat(shallow, RoleName::Member),
        ];
        let top_set = HashMap::from([(shallow, ())]);
        let best = select_best(&candidates, &top_set, RoleRanking::standard())
            .expect("candidate should be chosen");
        assert_eq!(best.ministry_id, shallow);
    }

    #[test]
    fn role_rank_breaks_standing_ties() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let candidates = vec![seat(a, RoleName::Secretary), seat(b, RoleName::Chairman)];
        let top_set = HashMap::from([(a, ()), (b, ())]);
        let best = select_best(&candidates, &top_set, RoleRanking::standard())
            .expect("candidate should be chosen");
        assert_eq!(best.role, RoleName::Chairman);
    }

    #[test]
    fn exact_tie_keeps_first_candidate() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let candidates = vec![seat(a, RoleName::Usher), seat(b, RoleName::Usher)];
        let top_set = HashMap::from([(a, ()), (b, ())]);
        let best = select_best(&candidates, &top_set, RoleRanking::standard())
            .expect("candidate should be chosen");
        assert_eq!(best.ministry_id, a);
    }

    #[test]
    fn unranked_roles_lose_to_ranked_ones() {
        let a = Uuid::new_v4();
        let ranking = RoleRanking::from_entries([(RoleName::Greeter, 7)]);
        let candidates = vec![seat(a, RoleName::SeniorPastor), seat(a, RoleName::Greeter)];
        let top_set: HashMap<Uuid, ()> = HashMap::new();
        let best = select_best(&candidates, &top_set, &ranking).expect("candidate should be chosen");
        assert_eq!(best.role, RoleName::Greeter);
    }
}
