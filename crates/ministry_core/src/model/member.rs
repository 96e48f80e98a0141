//! Ministry membership domain model.
//!
//! # Invariants
//! - One membership per `(ministry_id, member_id)` pair.
//! - Inactive memberships are kept for history but never resolved.

use crate::model::ministry::MinistryId;
use crate::model::role::RoleName;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Member identifier issued by the external member directory.
pub type MemberId = String;

/// Stable membership row identifier.
pub type MembershipId = Uuid;

/// One member's assignment to one ministry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinistryMember {
    pub id: MembershipId,
    pub ministry_id: MinistryId,
    pub member_id: MemberId,
    pub role: RoleName,
    /// Committee (leadership) seat rather than a plain unit seat.
    pub committee: bool,
    pub assigned_date: NaiveDate,
    pub active: bool,
}

impl MinistryMember {
    /// Creates an active membership assigned on `assigned_date`.
    pub fn new(
        ministry_id: MinistryId,
        member_id: impl Into<MemberId>,
        role: RoleName,
        committee: bool,
        assigned_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ministry_id,
            member_id: member_id.into(),
            role,
            committee,
            assigned_date,
            active: true,
        }
    }
}

/// Requested assignment of one member to a ministry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAssignment {
    #[serde(rename = "id")]
    pub member_id: MemberId,
    /// Defaults to `MEMBER` for new rows when absent.
    pub role: Option<RoleName>,
    #[serde(default)]
    pub committee: bool,
}
