//! Blocking HTTP implementation of the member directory.

use super::{
    decode_member_list, DirectoryError, DirectoryResult, MemberDirectory, MemberRecord,
    MemberSearchFilters,
};
use crate::model::member::MemberId;
use reqwest::blocking::{Client, Response};
use std::collections::BTreeSet;
use std::time::Duration;

const API_PREFIX: &str = "/api/v1";

/// Member directory reached over HTTP/JSON.
pub struct HttpMemberDirectory {
    base_url: String,
    client: Client,
}

impl HttpMemberDirectory {
    /// Builds a client with a per-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> DirectoryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DirectoryError::Transport(err.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> DirectoryResult<Vec<MemberRecord>> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .map_err(|err| DirectoryError::Transport(err.to_string()))?;
        decode_members(response)
    }
}

impl MemberDirectory for HttpMemberDirectory {
    fn search_members(&self, filters: &MemberSearchFilters) -> DirectoryResult<Vec<MemberRecord>> {
        self.get("/members/search", filters.pairs())
    }

    fn members_by_ids(&self, ids: &BTreeSet<MemberId>) -> DirectoryResult<Vec<MemberRecord>> {
        let joined = ids.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        self.get("/members", &[("ids", joined)])
    }
}

fn decode_members(response: Response) -> DirectoryResult<Vec<MemberRecord>> {
    let status = response.status();
    if !status.is_success() {
        return Err(DirectoryError::Status(status.as_u16()));
    }
    let body = response
        .text()
        .map_err(|err| DirectoryError::Transport(err.to_string()))?;
    decode_member_list(&body)
}
