//! Display filtering for the approvals list.
//!
//! Filtering never touches the store: the page fetches every request (newest
//! first) and narrows the list here on each render.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::approval::AdminRequest;
use crate::types::RequestStatus;

/// Exact-match status filter. `all` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(RequestStatus),
}

impl StatusFilter {
    #[must_use]
    pub fn matches(self, status: RequestStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }

    /// Query-string value for this filter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(status) => status.as_str(),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Self::All),
            other => other.parse().map(Self::Only),
        }
    }
}

impl Serialize for StatusFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Text and status filter over admin requests.
///
/// The text query is a case-insensitive substring match against the full name
/// or the email; an empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    #[serde(default, rename = "q")]
    pub query: String,
    #[serde(default)]
    pub status: StatusFilter,
}

impl RequestFilter {
    #[must_use]
    pub fn new(query: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            query: query.into(),
            status,
        }
    }

    #[must_use]
    pub fn matches(&self, request: &AdminRequest) -> bool {
        if !self.status.matches(request.status) {
            return false;
        }
        let needle = self.query.trim().to_lowercase();
        needle.is_empty()
            || request.full_name.to_lowercase().contains(&needle)
            || request.email.as_str().to_lowercase().contains(&needle)
    }

    /// Keep matching requests, preserving order.
    #[must_use]
    pub fn apply<'a>(&self, requests: &'a [AdminRequest]) -> Vec<&'a AdminRequest> {
        requests.iter().filter(|r| self.matches(r)).collect()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty() || self.status != StatusFilter::All
    }
}
