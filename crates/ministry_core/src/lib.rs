//! Core domain logic for ministry management.
//! Owns the ministry closure table, memberships and role resolution.

pub mod config;
pub mod db;
pub mod directory;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DirectoryConfig};
pub use db::{open_db, open_db_in_memory, run_in_transaction, DbError};
pub use directory::{
    DirectoryError, FallbackDirectory, HttpMemberDirectory, MemberDirectory, MemberProfile,
    MemberSearchFilters,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::member::{MemberAssignment, MemberId, MinistryMember};
pub use model::ministry::{Criteria, Ministry, MinistryId, MinistryType};
pub use model::role::{RoleName, RoleRanking, UNRANKED};
pub use repo::hierarchy_repo::{HierarchyRepository, SqliteHierarchyRepository};
pub use repo::ministry_repo::{RepoError, RepoResult};
pub use service::hierarchy_service::{HierarchyService, HierarchyServiceError};
pub use service::membership_resolver::{HighestRole, MembershipResolver, ResolverError};
pub use service::ministry_service::{
    CreateMinistryRequest, MinistryDetails, MinistryRoster, MinistryService,
    MinistryServiceError, RosterEntry,
};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
