//! Role identifiers and the role seniority table.
//!
//! # Responsibility
//! - Enumerate every role a member can hold inside a ministry.
//! - Map roles to seniority ranks (lower rank = more senior).
//!
//! # Invariants
//! - The standard table is built once per process and never mutated.
//! - Roles absent from a table rank at `UNRANKED`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Rank assigned to roles missing from a ranking table.
pub const UNRANKED: u32 = u32::MAX;

macro_rules! role_names {
    ($($variant:ident => $text:literal,)+) => {
        /// Role held by a member inside one ministry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum RoleName {
            $($variant,)+
        }

        impl RoleName {
            /// Every role in declaration order.
            pub const ALL: &'static [RoleName] = &[$(RoleName::$variant,)+];

            /// Stable storage/wire name, e.g. `SENIOR_PASTOR`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl FromStr for RoleName {
            type Err = UnknownRole;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownRole(other.to_string())),
                }
            }
        }
    };
}

role_names! {
    SeniorPastor => "SENIOR_PASTOR",
    LeadPastor => "LEAD_PASTOR",
    AssociatePastor => "ASSOCIATE_PASTOR",
    Chairman => "CHAIRMAN",
    ViceChairman => "VICE_CHAIRMAN",
    Deacon => "DEACON",
    Deaconess => "DEACONESS",
    President => "PRESIDENT",
    VicePresident => "VICE_PRESIDENT",
    Superintendent => "SUPERINTENDENT",
    Coordinator => "COORDINATOR",
    AssistantCoordinator => "ASSISTANT_COORDINATOR",
    Secretary => "SECRETARY",
    AssistantSecretary => "ASSISTANT_SECRETARY",
    Treasurer => "TREASURER",
    AssistantTreasurer => "ASSISTANT_TREASURER",
    FinanceOfficer => "FINANCE_OFFICER",
    Advisor => "ADVISOR",
    Representative => "REPRESENTATIVE",
    ItAdministrator => "IT_ADMINISTRATOR",
    MediaDirector => "MEDIA_DIRECTOR",
    ProgramDirector => "PROGRAM_DIRECTOR",
    PublicRelationsOfficer => "PUBLIC_RELATIONS_OFFICER",
    Teacher => "TEACHER",
    Usher => "USHER",
    Greeter => "GREETER",
    MaintenanceWorker => "MAINTENANCE_WORKER",
    Custodian => "CUSTODIAN",
    Groundskeeper => "GROUNDSKEEPER",
    BusDriver => "BUS_DRIVER",
    Mechanic => "MECHANIC",
    SoftwareDeveloper => "SOFTWARE_DEVELOPER",
    ElectricalTechnician => "ELECTRICAL_TECHNICIAN",
    Dancer => "DANCER",
    Projectionist => "PROJECTIONIST",
    AudioEngineer => "AUDIO_ENGINEER",
    VideoOperator => "VIDEO_OPERATOR",
    LightingTechnician => "LIGHTING_TECHNICIAN",
    MediaContentCreator => "MEDIA_CONTENT_CREATOR",
    TechnicalSupport => "TECHNICAL_SUPPORT",
    EventPlanner => "EVENT_PLANNER",
    SecurityOfficer => "SECURITY_OFFICER",
    Volunteer => "VOLUNTEER",
    Intern => "INTERN",
    Trainee => "TRAINEE",
    Member => "MEMBER",
}

impl Display for RoleName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse failure for role names outside `RoleName::ALL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl Display for UnknownRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown role `{}`", self.0)
    }
}

impl Error for UnknownRole {}

const STANDARD_RANKS: &[(RoleName, u32)] = &[
    // Pastoral leadership
    (RoleName::SeniorPastor, 0),
    (RoleName::LeadPastor, 1),
    (RoleName::AssociatePastor, 2),
    // Executive and governing
    (RoleName::Chairman, 10),
    (RoleName::ViceChairman, 11),
    (RoleName::Deacon, 12),
    (RoleName::Deaconess, 13),
    // Departmental heads
    (RoleName::President, 20),
    (RoleName::VicePresident, 21),
    (RoleName::Superintendent, 22),
    (RoleName::Coordinator, 23),
    (RoleName::AssistantCoordinator, 24),
    // Administrative and financial
    (RoleName::Secretary, 30),
    (RoleName::AssistantSecretary, 31),
    (RoleName::Treasurer, 32),
    (RoleName::AssistantTreasurer, 33),
    (RoleName::FinanceOfficer, 34),
    (RoleName::Advisor, 35),
    (RoleName::Representative, 36),
    // Technical and operational directors
    (RoleName::ItAdministrator, 40),
    (RoleName::MediaDirector, 41),
    (RoleName::ProgramDirector, 42),
    (RoleName::PublicRelationsOfficer, 43),
    // Educational and service
    (RoleName::Teacher, 50),
    (RoleName::Usher, 51),
    (RoleName::Greeter, 52),
    // Facilities
    (RoleName::MaintenanceWorker, 60),
    (RoleName::Custodian, 61),
    (RoleName::Groundskeeper, 62),
    (RoleName::BusDriver, 63),
    (RoleName::Mechanic, 64),
    // Creative, arts and tech
    (RoleName::SoftwareDeveloper, 70),
    (RoleName::ElectricalTechnician, 71),
    (RoleName::Dancer, 72),
    (RoleName::Projectionist, 73),
    (RoleName::AudioEngineer, 74),
    (RoleName::VideoOperator, 75),
    (RoleName::LightingTechnician, 76),
    (RoleName::MediaContentCreator, 77),
    (RoleName::TechnicalSupport, 78),
    // Event and general
    (RoleName::EventPlanner, 90),
    (RoleName::SecurityOfficer, 91),
    (RoleName::Volunteer, 92),
    (RoleName::Intern, 93),
    (RoleName::Trainee, 94),
    (RoleName::Member, 95),
];

static STANDARD_RANKING: Lazy<RoleRanking> =
    Lazy::new(|| RoleRanking::from_entries(STANDARD_RANKS.iter().copied()));

/// Immutable role -> seniority rank table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleRanking {
    ranks: HashMap<RoleName, u32>,
}

impl RoleRanking {
    /// Returns the process-wide standard table.
    pub fn standard() -> &'static RoleRanking {
        &STANDARD_RANKING
    }

    /// Builds a deployment-specific table. Later entries win on duplicates.
    pub fn from_entries(entries: impl IntoIterator<Item = (RoleName, u32)>) -> Self {
        Self {
            ranks: entries.into_iter().collect(),
        }
    }

    /// Returns a copy of `self` with `overrides` applied on top.
    pub fn with_overrides(&self, overrides: impl IntoIterator<Item = (RoleName, u32)>) -> Self {
        let mut ranks = self.ranks.clone();
        ranks.extend(overrides);
        Self { ranks }
    }

    /// Seniority rank for `role`; `UNRANKED` when the table has no entry.
    pub fn rank(&self, role: RoleName) -> u32 {
        self.ranks.get(&role).copied().unwrap_or(UNRANKED)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{RoleName, RoleRanking, UNRANKED};

    #[test]
    fn standard_table_ranks_every_role() {
        let ranking = RoleRanking::standard();
        assert_eq!(ranking.len(), RoleName::ALL.len());
        assert_eq!(ranking.rank(RoleName::SeniorPastor), 0);
        assert_eq!(ranking.rank(RoleName::Deacon), 12);
        assert_eq!(ranking.rank(RoleName::Member), 95);
    }

    #[test]
    fn missing_role_is_unranked() {
        let ranking = RoleRanking::from_entries([(RoleName::Usher, 3)]);
        assert_eq!(ranking.rank(RoleName::Usher), 3);
        assert_eq!(ranking.rank(RoleName::SeniorPastor), UNRANKED);
    }

    #[test]
    fn overrides_leave_standard_table_untouched() {
        let custom = RoleRanking::standard().with_overrides([(RoleName::Member, 1)]);
        assert_eq!(custom.rank(RoleName::Member), 1);
        assert_eq!(RoleRanking::standard().rank(RoleName::Member), 95);
    }

    #[test]
    fn role_names_parse_from_storage_text() {
        for role in RoleName::ALL {
            assert_eq!(role.as_str().parse::<RoleName>(), Ok(*role));
        }
        assert!("POPE".parse::<RoleName>().is_err());
    }

    #[test]
    fn serde_name_matches_storage_text() {
        let json = serde_json::to_string(&RoleName::PublicRelationsOfficer)
            .expect("role should serialize");
        assert_eq!(json, "\"PUBLIC_RELATIONS_OFFICER\"");
    }
}
