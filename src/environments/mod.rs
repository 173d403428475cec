//! Branch listings for the frontend and backend projects.
//!
//! Listings come from an upstream GitLab-style API, are categorized into
//! `main` and `feature` groups and cached in a single durable slot.

pub mod cache;
pub mod categorize;
pub mod service;
pub mod upstream;

pub use self::cache::{CacheEntry, CacheStore, FileCacheStore, MemoryCacheStore};
pub use self::categorize::{categorize, categorize_with, EXCLUDED_BRANCHES, MAIN_BRANCHES};
pub use self::service::{
    Clock, EnvironmentService, EnvironmentsConfig, EnvironmentsError, SystemClock, CACHE_TTL,
};
pub use self::upstream::{BranchSource, GitLabClient, UPSTREAM_TIMEOUT};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Branches of one project, in upstream listing order.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchGroup {
    pub main: Vec<String>,
    pub feature: Vec<String>,
}

impl BranchGroup {
    /// Only `main`, used when no listing is available.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            main: vec![crate::branch::DEFAULT_BRANCH.to_string()],
            feature: Vec::new(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentsData {
    pub frontend: BranchGroup,
    pub backend: BranchGroup,
}

/// Body of `GET /dev-ops/environments`.
///
/// Fresh listings carry `cached` and `timestamp`; the fallback carries `error`.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentsResponse {
    #[serde(flatten)]
    pub data: EnvironmentsData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnvironmentsResponse {
    /// `main` only for both axes, with the reason the listing is unavailable.
    #[must_use]
    pub fn fallback(error: &str) -> Self {
        Self {
            data: EnvironmentsData {
                frontend: BranchGroup::fallback(),
                backend: BranchGroup::fallback(),
            },
            cached: None,
            timestamp: None,
            error: Some(error.to_string()),
        }
    }
}

/// Serialized `EnvironmentsResponse` exactly as served and cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentsJson(String);

impl EnvironmentsJson {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// # Errors
    /// Returns an error if the body is not a valid `EnvironmentsResponse`.
    pub fn parse(&self) -> serde_json::Result<EnvironmentsResponse> {
        serde_json::from_str(&self.0)
    }
}

impl From<String> for EnvironmentsJson {
    fn from(body: String) -> Self {
        Self(body)
    }
}
