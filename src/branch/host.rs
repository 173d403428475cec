//! Hostname classification and URL branch extraction.
//!
//! Review hosts always carry at least three labels (`branch.discovery.wang` or
//! `branch.api.discovery.wang`); the first label is the branch. A bare apex
//! (`discovery.wang`), `localhost` and IPv4 addresses carry no branch.

use once_cell::sync::Lazy;
use regex::Regex;

static IPV4_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+\.\d+$").ok());

/// A request hostname, lowercased and without port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    /// `localhost`, a dotted-quad IPv4 address or a single-label name.
    /// Cookies for these hosts are host-only.
    Local(String),
    /// Two or more dot-separated labels.
    Named(Vec<String>),
}

impl Host {
    /// Parses a hostname or a `Host` header value (`name[:port]`).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let host = strip_port(raw.trim()).trim_end_matches('.').to_ascii_lowercase();
        if is_local(&host) {
            return Self::Local(host);
        }
        let labels: Vec<String> = host.split('.').map(str::to_string).collect();
        if labels.len() < 2 || labels.iter().any(String::is_empty) {
            return Self::Local(host);
        }
        Self::Named(labels)
    }

    #[must_use]
    pub fn hostname(&self) -> String {
        match self {
            Self::Local(host) => host.clone(),
            Self::Named(labels) => labels.join("."),
        }
    }

    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// The two-label root shared by every review subdomain, e.g. `discovery.wang`.
    #[must_use]
    pub fn apex(&self) -> Option<String> {
        match self {
            Self::Local(_) => None,
            Self::Named(labels) => Some(labels[labels.len() - 2..].join(".")),
        }
    }

    /// First label of a named host with three or more labels.
    #[must_use]
    pub fn branch_label(&self) -> Option<&str> {
        match self {
            Self::Named(labels) if labels.len() >= 3 => Some(labels[0].as_str()),
            _ => None,
        }
    }

    /// Returns the host with its first label replaced by `slug`.
    ///
    /// A bare apex gets `slug` prepended instead, since it has no branch label
    /// to replace. Local hosts cannot encode a branch and yield `None`.
    #[must_use]
    pub fn with_branch_label(&self, slug: &str) -> Option<String> {
        match self {
            Self::Local(_) => None,
            Self::Named(labels) if labels.len() >= 3 => {
                let mut labels = labels.clone();
                labels[0] = slug.to_string();
                Some(labels.join("."))
            }
            Self::Named(labels) => Some(format!("{slug}.{}", labels.join("."))),
        }
    }
}

/// Derives the candidate branch name from a hostname.
///
/// Returns `None` for `localhost`, IPv4 addresses and hosts with fewer than
/// three labels. Otherwise the first label is the branch, even when a later
/// label is empty (`main..discovery.wang`); an empty first label yields `None`.
#[must_use]
pub fn extract_branch(hostname: &str) -> Option<String> {
    let host = strip_port(hostname.trim()).trim_end_matches('.').to_ascii_lowercase();
    if is_local(&host) {
        return None;
    }
    let labels: Vec<&str> = host.split('.').collect();
    match labels.first() {
        Some(first) if labels.len() >= 3 && !first.is_empty() => Some((*first).to_string()),
        _ => None,
    }
}

fn is_local(host: &str) -> bool {
    host == "localhost"
        || IPV4_RE
            .as_ref()
            .map_or(false, |re| re.is_match(host))
}

fn strip_port(raw: &str) -> &str {
    // Bracketed IPv6 literals keep their colons.
    if raw.starts_with('[') {
        return raw;
    }
    match raw.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => raw,
    }
}
