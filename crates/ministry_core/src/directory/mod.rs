//! Remote member directory client.
//!
//! # Responsibility
//! - Define the directory contract consumed by the ministry service.
//! - Decode directory payloads into typed profiles.
//! - Absorb every directory failure into an empty result.
//!
//! # Invariants
//! - `FallbackDirectory` never returns an error and never panics on bad data.
//! - Directory failures never propagate past the ministry service boundary.

use crate::model::member::MemberId;
use crate::model::ministry::Criteria;
use chrono::{Local, NaiveDate};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod http;
mod payload;

pub use http::HttpMemberDirectory;
pub use payload::{decode_member_list, ContactInfo, MemberProfile, MemberRecord, PersonalInfo};

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Directory call failures.
#[derive(Debug)]
pub enum DirectoryError {
    /// Connection, timeout or client setup failure.
    Transport(String),
    /// Directory answered with a non-success HTTP status.
    Status(u16),
    /// Response body is not a member list.
    Decode(String),
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "directory transport failure: {message}"),
            Self::Status(code) => write!(f, "directory returned status {code}"),
            Self::Decode(message) => write!(f, "directory payload decode failure: {message}"),
        }
    }
}

impl Error for DirectoryError {}

/// Query-string filters for directory searches, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSearchFilters {
    pairs: Vec<(&'static str, String)>,
}

impl MemberSearchFilters {
    /// Filters derived from ministry criteria; `ALL` values are omitted.
    pub fn from_criteria(criteria: &Criteria) -> Self {
        Self {
            pairs: criteria.active_filters(),
        }
    }

    /// Explicit demographic filters; blank values are omitted.
    pub fn demographic(age: &str, gender: &str, marital_status: &str) -> Self {
        let pairs = [("age", age), ("gender", gender), ("maritalStatus", marital_status)]
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| (key, value.trim().to_string()))
            .collect();
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Contract of the remote member directory.
pub trait MemberDirectory {
    fn search_members(&self, filters: &MemberSearchFilters) -> DirectoryResult<Vec<MemberRecord>>;
    fn members_by_ids(&self, ids: &BTreeSet<MemberId>) -> DirectoryResult<Vec<MemberRecord>>;
}

/// Directory wrapper that turns every failure into an empty list.
pub struct FallbackDirectory<D: MemberDirectory> {
    inner: D,
    today: Option<NaiveDate>,
}

impl<D: MemberDirectory> FallbackDirectory<D> {
    pub fn new(inner: D) -> Self {
        Self { inner, today: None }
    }

    /// Pins the reference date used for age derivation.
    pub fn with_today(inner: D, today: NaiveDate) -> Self {
        Self {
            inner,
            today: Some(today),
        }
    }

    /// Searches the directory; failure yields an empty list.
    pub fn search_members(&self, filters: &MemberSearchFilters) -> Vec<MemberProfile> {
        let records = self.inner.search_members(filters);
        self.project("search_members", records)
    }

    /// Loads profiles by id; failure yields an empty list.
    pub fn members_by_ids(&self, ids: &BTreeSet<MemberId>) -> Vec<MemberProfile> {
        if ids.is_empty() {
            return Vec::new();
        }
        let records = self.inner.members_by_ids(ids);
        self.project("members_by_ids", records)
    }

    fn project(
        &self,
        operation: &'static str,
        records: DirectoryResult<Vec<MemberRecord>>,
    ) -> Vec<MemberProfile> {
        match records {
            Ok(records) => {
                let today = self.today.unwrap_or_else(|| Local::now().date_naive());
                let received = records.len();
                let profiles: Vec<MemberProfile> = records
                    .into_iter()
                    .filter_map(|record| MemberProfile::from_record(record, today))
                    .collect();
                debug!(
                    "event=directory_call module=directory status=ok op={} received={} kept={}",
                    operation,
                    received,
                    profiles.len()
                );
                profiles
            }
            Err(err) => {
                warn!(
                    "event=directory_fallback module=directory status=error op={} error={}",
                    operation, err
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DirectoryError, DirectoryResult, FallbackDirectory, MemberDirectory, MemberRecord,
        MemberSearchFilters,
    };
    use crate::model::member::MemberId;
    use crate::model::ministry::Criteria;
    use std::collections::BTreeSet;

    struct DownDirectory;

    impl MemberDirectory for DownDirectory {
        fn search_members(&self, _: &MemberSearchFilters) -> DirectoryResult<Vec<MemberRecord>> {
            Err(DirectoryError::Transport("connection refused".to_string()))
        }

        fn members_by_ids(&self, _: &BTreeSet<MemberId>) -> DirectoryResult<Vec<MemberRecord>> {
            Err(DirectoryError::Status(503))
        }
    }

    #[test]
    fn failures_become_empty_lists() {
        let directory = FallbackDirectory::new(DownDirectory);
        let ids = BTreeSet::from(["m-1".to_string()]);
        assert!(directory
            .search_members(&MemberSearchFilters::default())
            .is_empty());
        assert!(directory.members_by_ids(&ids).is_empty());
    }

    #[test]
    fn criteria_filters_skip_all() {
        let criteria = Criteria {
            gender: Some("MALE".to_string()),
            age_group: Some("ALL".to_string()),
            marital_status: None,
        };
        let filters = MemberSearchFilters::from_criteria(&criteria);
        assert_eq!(filters.pairs(), &[("gender", "MALE".to_string())]);
    }

    #[test]
    fn demographic_filters_drop_blank_values() {
        let filters = MemberSearchFilters::demographic("30", " ", "SINGLE");
        assert_eq!(
            filters.pairs(),
            &[("age", "30".to_string()), ("maritalStatus", "SINGLE".to_string())]
        );
    }
}
