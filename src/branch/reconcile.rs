//! Page-load reconciliation and user-initiated branch switching.

use super::{
    cookies::{CookieScopeManager, CookieStore},
    host::Host,
    slug::normalize,
    Axis, BACKEND_COOKIE, COOKIE_MAX_AGE_SECONDS, DEFAULT_BRANCH, FRONTEND_COOKIE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;
use utoipa::ToSchema;

/// Result of reconciling the URL branch with the cookie branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Authoritative current branch.
    pub branch: String,
    /// Value the cookie must be overwritten with, if any.
    pub rewrite: Option<String>,
}

/// Authoritative branch per axis after page load.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CurrentBranches {
    pub frontend: String,
    pub backend: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Full navigation to a host naming the new frontend branch.
    Navigate(Url),
    /// Reload the current URL; only the cookie changed.
    Reload(Url),
}

impl SwitchOutcome {
    #[must_use]
    pub const fn location(&self) -> &Url {
        match self {
            Self::Navigate(url) | Self::Reload(url) => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwitchError {
    #[error("branch name is required")]
    EmptyBranch,
    #[error("branch name {0:?} has no valid subdomain form")]
    InvalidBranch(String),
    #[error("branch name {0:?} cannot be stored in a cookie")]
    UnsafeCookieValue(String),
    #[error("cannot rewrite host to {0:?}")]
    InvalidHost(String),
}

/// Combines the URL branch and the cookie branch into one current branch.
///
/// The URL wins whenever it names a branch, lowercased; a case-insensitive
/// match keeps the cookie's original spelling and needs no rewrite. Without a
/// URL branch the cookie is used, defaulting to `main`.
#[must_use]
pub fn reconcile(url_branch: Option<&str>, cookie_branch: Option<&str>) -> Resolution {
    let url_branch = url_branch.filter(|b| !b.is_empty());
    let cookie_branch = cookie_branch.filter(|b| !b.is_empty());

    match (url_branch, cookie_branch) {
        (None, cookie) => Resolution {
            branch: cookie.unwrap_or(DEFAULT_BRANCH).to_string(),
            rewrite: None,
        },
        (Some(url), Some(cookie)) if url.to_lowercase() == cookie.to_lowercase() => Resolution {
            branch: cookie.to_string(),
            rewrite: None,
        },
        (Some(url), _) => {
            let branch = url.to_lowercase();
            Resolution {
                rewrite: Some(branch.clone()),
                branch,
            }
        }
    }
}

/// Establishes the current frontend and backend branches for a page load.
///
/// The frontend cookie is rewritten when the URL names a different branch.
/// The backend branch is never derived from the URL.
pub fn resolve_on_load<S: CookieStore>(manager: &mut CookieScopeManager<S>) -> CurrentBranches {
    let url_branch = manager.host().branch_label().map(str::to_string);
    let cookie_branch = manager.get(FRONTEND_COOKIE);

    let resolution = reconcile(url_branch.as_deref(), cookie_branch.as_deref());
    if let Some(value) = &resolution.rewrite {
        debug!(
            "frontend cookie {:?} replaced by URL branch {value:?}",
            cookie_branch
        );
        manager.set(FRONTEND_COOKIE, value, COOKIE_MAX_AGE_SECONDS);
    }

    CurrentBranches {
        frontend: resolution.branch,
        backend: manager
            .get(BACKEND_COOKIE)
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
    }
}

/// Switches `axis` to `branch`, writing the cookie before anything else.
///
/// Frontend switches navigate to the current URL with the first host label
/// replaced by the branch slug; on local hosts, which cannot encode a branch,
/// they reload instead. Backend switches always reload.
///
/// # Errors
///
/// Returns an error, without touching any cookie, when the branch is empty,
/// normalizes to an empty slug or contains characters a cookie value cannot hold.
pub fn switch_branch<S: CookieStore>(
    manager: &mut CookieScopeManager<S>,
    current_url: &Url,
    axis: Axis,
    branch: &str,
) -> Result<SwitchOutcome, SwitchError> {
    let branch = branch.trim();
    if branch.is_empty() {
        return Err(SwitchError::EmptyBranch);
    }
    let slug = normalize(branch);
    if slug.is_empty() {
        return Err(SwitchError::InvalidBranch(branch.to_string()));
    }
    if !is_cookie_safe(branch) {
        return Err(SwitchError::UnsafeCookieValue(branch.to_string()));
    }

    let target = match axis {
        Axis::Frontend => {
            let host = current_url.host_str().map_or_else(
                || manager.host().clone(),
                Host::parse,
            );
            match host.with_branch_label(&slug) {
                Some(new_host) => {
                    let mut url = current_url.clone();
                    url.set_host(Some(&new_host))
                        .map_err(|_| SwitchError::InvalidHost(new_host.clone()))?;
                    SwitchOutcome::Navigate(url)
                }
                None => SwitchOutcome::Reload(current_url.clone()),
            }
        }
        Axis::Backend => SwitchOutcome::Reload(current_url.clone()),
    };

    manager.set(axis.cookie_name(), branch, COOKIE_MAX_AGE_SECONDS);
    debug!("switched {axis} to {branch:?}");

    Ok(target)
}

// RFC 6265 cookie-octet: no controls, whitespace, DQUOTE, comma, semicolon or backslash.
fn is_cookie_safe(value: &str) -> bool {
    value
        .bytes()
        .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}
