//! Branch selection: slugs, hosts, cookie scoping and reconciliation.
//!
//! Everything here is synchronous and works over an abstract [`CookieStore`],
//! so the same logic drives the HTTP handlers and in-memory tests.

pub mod cookies;
pub mod host;
pub mod reconcile;
pub mod slug;
pub mod target;

pub use self::cookies::{CookieScope, CookieScopeManager, CookieStore, CookieWrite, MemoryJar};
pub use self::host::{extract_branch, Host};
pub use self::reconcile::{
    reconcile, resolve_on_load, switch_branch, CurrentBranches, Resolution, SwitchError,
    SwitchOutcome,
};
pub use self::slug::normalize;
pub use self::target::api_base_url;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// Cookie holding the selected frontend branch.
pub const FRONTEND_COOKIE: &str = "x_target_frontend";

/// Cookie holding the selected backend branch.
pub const BACKEND_COOKIE: &str = "x_target_backend";

/// Branch used when neither the URL nor a cookie names one.
pub const DEFAULT_BRANCH: &str = "main";

/// One day.
pub const COOKIE_MAX_AGE_SECONDS: u64 = 86_400;

/// One of the two independent branch selections.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Frontend,
    Backend,
}

impl Axis {
    #[must_use]
    pub const fn cookie_name(self) -> &'static str {
        match self {
            Self::Frontend => FRONTEND_COOKIE,
            Self::Backend => BACKEND_COOKIE,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frontend => f.write_str("frontend"),
            Self::Backend => f.write_str("backend"),
        }
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frontend" => Ok(Self::Frontend),
            "backend" => Ok(Self::Backend),
            other => Err(format!("unknown axis: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_cookie_names_are_independent() {
        assert_eq!(Axis::Frontend.cookie_name(), "x_target_frontend");
        assert_eq!(Axis::Backend.cookie_name(), "x_target_backend");
    }

    #[test]
    fn axis_parses_case_insensitively() {
        assert_eq!("Frontend".parse::<Axis>(), Ok(Axis::Frontend));
        assert_eq!(" backend ".parse::<Axis>(), Ok(Axis::Backend));
        assert!("database".parse::<Axis>().is_err());
    }

    #[test]
    fn axis_serializes_lowercase() {
        let json = serde_json::to_string(&Axis::Backend).unwrap_or_default();
        assert_eq!(json, "\"backend\"");
    }
}
