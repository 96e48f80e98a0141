//! Typed member-directory payloads and profile projection.
//!
//! # Invariants
//! - Every wire field is optional; missing values become `None`.
//! - Unknown wire fields are ignored.
//! - A malformed record is dropped on its own; the rest of the batch survives.

use super::{DirectoryError, DirectoryResult};
use crate::model::member::MemberId;
use chrono::{Datelike, NaiveDate};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw member record as returned by the directory service.
///
/// Search endpoints return either nested `personalInfo`/`contact` objects or
/// flat name/age/gender fields; both shapes decode into this struct.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberRecord {
    pub id: Option<String>,
    pub picture_url: Option<String>,
    pub photo_url: Option<String>,
    pub personal_info: Option<PersonalInfo>,
    pub contact: Option<ContactInfo>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    /// Numbers and numeric strings are both accepted.
    pub age: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// ISO date, e.g. `1964-04-13`.
    pub birthdate: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactInfo {
    pub mobile_phone_number: Option<String>,
}

/// Member profile consumed by ministry listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub id: MemberId,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub age: Option<u32>,
    pub marital_status: Option<String>,
    pub photo_url: Option<String>,
    pub phone: Option<String>,
}

impl MemberProfile {
    /// Projects a wire record; records without an id are dropped.
    pub fn from_record(record: MemberRecord, today: NaiveDate) -> Option<Self> {
        let id = record.id.filter(|value| !value.trim().is_empty())?;
        let info = record.personal_info.unwrap_or_default();

        let first_name = info.first_name.or(record.first_name);
        let last_name = info.last_name.or(record.last_name);
        let name = match (&first_name, &last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        };
        let age = info
            .birthdate
            .as_deref()
            .and_then(parse_birthdate)
            .and_then(|birth| age_on(birth, today))
            .or_else(|| record.age.as_ref().and_then(parse_age));

        Some(Self {
            id,
            name,
            first_name,
            last_name,
            gender: info.gender.or(record.gender),
            age,
            marital_status: info.marital_status.or(record.marital_status),
            photo_url: record.picture_url.or(record.photo_url),
            phone: record.contact.and_then(|contact| contact.mobile_phone_number),
        })
    }
}

/// Decodes a directory response body record by record.
///
/// Only a body that is not a JSON array fails as a whole.
pub fn decode_member_list(body: &str) -> DirectoryResult<Vec<MemberRecord>> {
    let items: Vec<Value> =
        serde_json::from_str(body).map_err(|err| DirectoryError::Decode(err.to_string()))?;
    let received = items.len();
    let records: Vec<MemberRecord> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if records.len() < received {
        warn!(
            "event=directory_decode module=directory status=partial received={} dropped={}",
            received,
            received - records.len()
        );
    }
    Ok(records)
}

fn parse_birthdate(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok())
}

/// Full years between `birth` and `today`; `None` for future birthdates.
fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

fn parse_age(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|age| u32::try_from(age).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
