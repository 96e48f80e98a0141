//! Ministry (organizational unit) domain model.
//!
//! # Responsibility
//! - Define the ministry record and its membership eligibility criteria.
//! - Validate ministry fields before they reach storage.
//!
//! # Invariants
//! - `id` is stable and never reused for another ministry.
//! - `name` is non-blank and unique across all ministries (enforced by storage).
//! - `term_end` is not earlier than `term_start` when both are set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable ministry identifier.
pub type MinistryId = Uuid;

/// Criteria value meaning "no restriction".
pub const CRITERIA_ALL: &str = "ALL";

/// Kind of ministry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MinistryType {
    Ministry,
    Department,
    Committee,
    Fellowship,
    Choir,
}

impl MinistryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ministry => "MINISTRY",
            Self::Department => "DEPARTMENT",
            Self::Committee => "COMMITTEE",
            Self::Fellowship => "FELLOWSHIP",
            Self::Choir => "CHOIR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MINISTRY" => Some(Self::Ministry),
            "DEPARTMENT" => Some(Self::Department),
            "COMMITTEE" => Some(Self::Committee),
            "FELLOWSHIP" => Some(Self::Fellowship),
            "CHOIR" => Some(Self::Choir),
            _ => None,
        }
    }
}

/// Membership eligibility filters used when searching the member directory.
///
/// Each field is either `ALL`/absent (no restriction) or a directory value,
/// e.g. gender `MALE`, age group `KID` (< 12) / `ADULT`, marital status `MARRIED`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    pub gender: Option<String>,
    pub age_group: Option<String>,
    pub marital_status: Option<String>,
}

impl Criteria {
    /// Returns the restricting `(filter_key, value)` pairs, skipping `ALL`.
    pub fn active_filters(&self) -> Vec<(&'static str, String)> {
        [
            ("gender", self.gender.as_deref()),
            ("ageGroup", self.age_group.as_deref()),
            ("maritalStatus", self.marital_status.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            let value = value?.trim();
            if value.is_empty() || value.eq_ignore_ascii_case(CRITERIA_ALL) {
                None
            } else {
                Some((key, value.to_string()))
            }
        })
        .collect()
    }
}

/// Ministry record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ministry {
    pub id: MinistryId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<MinistryType>,
    pub established_date: Option<NaiveDate>,
    /// `None` means the ministry is a root of the forest.
    pub parent_id: Option<MinistryId>,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
    pub criteria: Criteria,
    pub active: bool,
}

impl Ministry {
    /// Creates an active root ministry with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: None,
            established_date: None,
            parent_id: None,
            term_start: None,
            term_end: None,
            criteria: Criteria::default(),
            active: true,
        }
    }

    /// Validates field-level invariants.
    pub fn validate(&self) -> Result<(), MinistryValidationError> {
        if self.name.trim().is_empty() {
            return Err(MinistryValidationError::BlankName);
        }
        if let (Some(start), Some(end)) = (self.term_start, self.term_end) {
            if end < start {
                return Err(MinistryValidationError::TermEndsBeforeStart { start, end });
            }
        }
        if self.parent_id == Some(self.id) {
            return Err(MinistryValidationError::SelfParent(self.id));
        }
        Ok(())
    }
}

/// Field-level ministry validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinistryValidationError {
    BlankName,
    TermEndsBeforeStart { start: NaiveDate, end: NaiveDate },
    SelfParent(MinistryId),
}

impl Display for MinistryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "ministry name must not be blank"),
            Self::TermEndsBeforeStart { start, end } => {
                write!(f, "term end {end} is before term start {start}")
            }
            Self::SelfParent(id) => write!(f, "ministry cannot be its own parent: {id}"),
        }
    }
}

impl Error for MinistryValidationError {}
