//! Cookie store backed by HTTP headers.
//!
//! Reads come from the request `Cookie` header; writes are recorded and
//! rendered as `Set-Cookie` response headers.

use crate::branch::{CookieStore, CookieWrite};
use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use tracing::warn;

#[derive(Debug, Default)]
pub struct HeaderJar {
    incoming: Vec<(String, String)>,
    writes: Vec<CookieWrite>,
}

impl HeaderJar {
    /// Parses every `Cookie` header of the request.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = Vec::new();
        for header in headers.get_all(COOKIE) {
            let Ok(value) = header.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                let mut parts = pair.trim().splitn(2, '=');
                let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                    continue;
                };
                let key = key.trim();
                if !key.is_empty() {
                    incoming.push((key.to_string(), val.trim().to_string()));
                }
            }
        }
        Self {
            incoming,
            writes: Vec::new(),
        }
    }

    #[must_use]
    pub fn writes(&self) -> &[CookieWrite] {
        &self.writes
    }

    /// `Set-Cookie` headers for every recorded write, in order.
    #[must_use]
    pub fn set_cookie_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for write in &self.writes {
            match HeaderValue::from_str(&write.header_value()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(err) => warn!("Dropping unrepresentable cookie {}: {err}", write.name),
            }
        }
        headers
    }
}

impl CookieStore for HeaderJar {
    fn get(&self, name: &str) -> Option<String> {
        // A write in this response supersedes what the browser sent.
        if let Some(write) = self.writes.iter().rev().find(|w| w.name == name) {
            return (!write.is_removal()).then(|| write.value.clone());
        }
        // Browsers send the most specific cookie first.
        self.incoming
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn put(&mut self, write: CookieWrite) {
        self.writes.push(write);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::{CookieScope, CookieScopeManager, Host};

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.insert(COOKIE, value);
        }
        headers
    }

    #[test]
    fn parses_cookie_header() {
        let jar = HeaderJar::from_headers(&headers(
            "x_target_frontend=feature/x; other=1;x_target_backend=staging",
        ));
        assert_eq!(jar.get("x_target_frontend"), Some("feature/x".to_string()));
        assert_eq!(jar.get("x_target_backend"), Some("staging".to_string()));
        assert_eq!(jar.get("missing"), None);
    }

    #[test]
    fn first_duplicate_wins() {
        let jar = HeaderJar::from_headers(&headers("k=narrow; k=apex"));
        assert_eq!(jar.get("k"), Some("narrow".to_string()));
    }

    #[test]
    fn writes_supersede_incoming() {
        let mut jar = HeaderJar::from_headers(&headers("k=old"));
        jar.put(CookieWrite {
            name: "k".to_string(),
            value: "new".to_string(),
            scope: CookieScope::HostOnly,
            max_age: 60,
        });
        assert_eq!(jar.get("k"), Some("new".to_string()));
        jar.put(CookieWrite::removal("k", CookieScope::HostOnly));
        assert_eq!(jar.get("k"), None);
    }

    #[test]
    fn set_renders_clears_then_apex() {
        let mut manager =
            CookieScopeManager::new(Host::parse("feature-x.discovery.wang"), HeaderJar::default());
        manager.set("x_target_frontend", "feature-x", 86_400);

        let rendered: Vec<String> = manager
            .store()
            .set_cookie_headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        assert_eq!(
            rendered,
            vec![
                "x_target_frontend=; Path=/; SameSite=Lax; Max-Age=0",
                "x_target_frontend=; Path=/; SameSite=Lax; Max-Age=0; Domain=feature-x.discovery.wang",
                "x_target_frontend=; Path=/; SameSite=Lax; Max-Age=0; Domain=.discovery.wang",
                "x_target_frontend=; Path=/; SameSite=Lax; Max-Age=0; Domain=.feature-x.discovery.wang",
                "x_target_frontend=feature-x; Path=/; SameSite=Lax; Max-Age=86400; Domain=.discovery.wang",
            ]
        );
    }
}
