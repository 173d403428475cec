//! Cookie scoping across multi-level review domains.
//!
//! Browsers keep one cookie per `(name, domain scope)`, so a value written at
//! `.feature-x.discovery.wang` and another at `.discovery.wang` coexist and
//! either may be read back. [`CookieScopeManager::set`] clears every scope the
//! current host could have written before writing the apex-scoped value.

use super::host::Host;
use std::collections::BTreeMap;

/// Where a cookie is scoped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CookieScope {
    /// No `Domain` attribute; only the exact host sees the cookie.
    HostOnly,
    /// `Domain=<value>` as written, e.g. `.discovery.wang`.
    Domain(String),
}

/// A single `Set-Cookie` instruction. `max_age == 0` expires the cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieWrite {
    pub name: String,
    pub value: String,
    pub scope: CookieScope,
    pub max_age: u64,
}

impl CookieWrite {
    #[must_use]
    pub fn removal(name: &str, scope: CookieScope) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            scope,
            max_age: 0,
        }
    }

    #[must_use]
    pub const fn is_removal(&self) -> bool {
        self.max_age == 0
    }

    /// Renders the write as a `Set-Cookie` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; SameSite=Lax; Max-Age={}",
            self.name, self.value, self.max_age
        );
        if let CookieScope::Domain(domain) = &self.scope {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        cookie
    }
}

/// An external key/value cookie store with last-writer-wins semantics.
pub trait CookieStore {
    /// Value visible to the current host, if any.
    fn get(&self, name: &str) -> Option<String>;

    /// Apply a write (or removal) at the given scope.
    fn put(&mut self, write: CookieWrite);
}

impl<S: CookieStore + ?Sized> CookieStore for &mut S {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }

    fn put(&mut self, write: CookieWrite) {
        (**self).put(write);
    }
}

/// Reads and writes named cookies at the right scope for one host.
#[derive(Debug)]
pub struct CookieScopeManager<S> {
    host: Host,
    store: S,
}

impl<S: CookieStore> CookieScopeManager<S> {
    pub const fn new(host: Host, store: S) -> Self {
        Self { host, store }
    }

    pub const fn host(&self) -> &Host {
        &self.host
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Scope new cookies are written at: the apex for named hosts, host-only otherwise.
    #[must_use]
    pub fn write_scope(&self) -> CookieScope {
        self.host
            .apex()
            .map_or(CookieScope::HostOnly, |apex| CookieScope::Domain(format!(".{apex}")))
    }

    /// Every scope a cookie for this host might have been written at.
    ///
    /// Host-only, the exact hostname, the apex and each suffix formed by
    /// dropping leading labels. Local hosts only have the host-only scope.
    #[must_use]
    pub fn clearing_scopes(&self) -> Vec<CookieScope> {
        let mut scopes = vec![CookieScope::HostOnly];
        let Host::Named(labels) = &self.host else {
            return scopes;
        };

        let mut push = |scope: CookieScope| {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        };

        push(CookieScope::Domain(self.host.hostname()));
        if let Some(apex) = self.host.apex() {
            push(CookieScope::Domain(format!(".{apex}")));
        }
        for i in 0..labels.len() - 1 {
            push(CookieScope::Domain(format!(".{}", labels[i..].join("."))));
        }
        scopes
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.store.get(name).filter(|value| !value.is_empty())
    }

    /// Clears `name` at every plausible scope, then writes it at [`Self::write_scope`].
    pub fn set(&mut self, name: &str, value: &str, max_age: u64) {
        for scope in self.clearing_scopes() {
            self.store.put(CookieWrite::removal(name, scope));
        }
        let scope = self.write_scope();
        self.store.put(CookieWrite {
            name: name.to_string(),
            value: value.to_string(),
            scope,
            max_age,
        });
    }

    /// Expires `name` at the apex (named hosts) or host-only (local hosts).
    pub fn delete(&mut self, name: &str) {
        let scope = self.write_scope();
        self.store.put(CookieWrite::removal(name, scope));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum StoredScope {
    // Ordered so host-only cookies sort first, as browsers send them first.
    HostOnly(String),
    Domain(String),
}

/// In-memory, browser-like cookie jar for a current host.
///
/// Domain attributes are matched the way browsers do: a leading dot is
/// ignored, and a write is dropped when the current host is not inside the
/// domain. Reads return the most specific visible cookie.
#[derive(Debug, Clone, Default)]
pub struct MemoryJar {
    current_host: String,
    cookies: BTreeMap<(String, StoredScope), String>,
}

impl MemoryJar {
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        Self {
            current_host: Host::parse(host).hostname(),
            cookies: BTreeMap::new(),
        }
    }

    /// Navigate to another host, keeping the stored cookies.
    pub fn visit(&mut self, host: &str) {
        self.current_host = Host::parse(host).hostname();
    }

    /// Every stored cookie named `name`, visible or not, as `(scope, value)`.
    #[must_use]
    pub fn entries(&self, name: &str) -> Vec<(CookieScope, String)> {
        self.cookies
            .iter()
            .filter(|((n, _), _)| n == name)
            .map(|((_, scope), value)| {
                let scope = match scope {
                    StoredScope::HostOnly(_) => CookieScope::HostOnly,
                    StoredScope::Domain(domain) => CookieScope::Domain(format!(".{domain}")),
                };
                (scope, value.clone())
            })
            .collect()
    }

    fn stored_scope(&self, scope: &CookieScope) -> Option<StoredScope> {
        match scope {
            CookieScope::HostOnly => Some(StoredScope::HostOnly(self.current_host.clone())),
            CookieScope::Domain(domain) => {
                let domain = domain.trim_start_matches('.').to_ascii_lowercase();
                domain_matches(&self.current_host, &domain).then_some(StoredScope::Domain(domain))
            }
        }
    }

    fn visible(&self, scope: &StoredScope) -> bool {
        match scope {
            StoredScope::HostOnly(host) => *host == self.current_host,
            StoredScope::Domain(domain) => domain_matches(&self.current_host, domain),
        }
    }
}

impl CookieStore for MemoryJar {
    fn get(&self, name: &str) -> Option<String> {
        let mut visible: Vec<(&StoredScope, &String)> = self
            .cookies
            .iter()
            .filter(|((n, scope), _)| n == name && self.visible(scope))
            .map(|((_, scope), value)| (scope, value))
            .collect();
        // Most specific first: host-only, then the longest domain.
        visible.sort_by_key(|(scope, _)| match scope {
            StoredScope::HostOnly(_) => (0, 0),
            StoredScope::Domain(domain) => (1, usize::MAX - domain.len()),
        });
        visible.first().map(|(_, value)| (*value).clone())
    }

    fn put(&mut self, write: CookieWrite) {
        let Some(scope) = self.stored_scope(&write.scope) else {
            return;
        };
        let key = (write.name, scope);
        if write.max_age == 0 {
            self.cookies.remove(&key);
        } else {
            self.cookies.insert(key, write.value);
        }
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    !domain.is_empty()
        && (host == domain
            || host
                .strip_suffix(domain)
                .map_or(false, |prefix| prefix.ends_with('.')))
}
