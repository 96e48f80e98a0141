//! Domain model for ministries, memberships and role seniority.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the role seniority table as immutable configuration data.
//!
//! # Invariants
//! - Every ministry is identified by a stable `MinistryId`.
//! - At most one membership exists per `(ministry_id, member_id)` pair.

pub mod member;
pub mod ministry;
pub mod role;
