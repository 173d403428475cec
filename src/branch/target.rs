//! Backend API base URL for the selected backend branch.

use super::{host::Host, slug::normalize, DEFAULT_BRANCH};
use url::Url;

/// Builds `<scheme>://<slug>.api.<apex>` for the backend branch.
///
/// Without a backend cookie the frontend branch label of the host is used,
/// then `main`. Local hosts have no apex and yield `None`.
#[must_use]
pub fn api_base_url(scheme: &str, host: &Host, backend_branch: Option<&str>) -> Option<Url> {
    let apex = host.apex()?;
    let slug = backend_branch
        .map(normalize)
        .filter(|slug| !slug.is_empty())
        .or_else(|| host.branch_label().map(normalize))
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    Url::parse(&format!("{scheme}://{slug}.api.{apex}")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_backend_cookie_slug() {
        let host = Host::parse("main.discovery.wang");
        let url = api_base_url("https", &host, Some("feature/API-2"));
        assert_eq!(
            url.map(|u| u.to_string()),
            Some("https://feature-api-2.api.discovery.wang/".to_string())
        );
    }

    #[test]
    fn falls_back_to_frontend_label_then_main() {
        let host = Host::parse("develop.discovery.wang");
        assert_eq!(
            api_base_url("http", &host, None).map(|u| u.to_string()),
            Some("http://develop.api.discovery.wang/".to_string())
        );

        let apex = Host::parse("discovery.wang");
        assert_eq!(
            api_base_url("https", &apex, Some("///")).map(|u| u.to_string()),
            Some("https://main.api.discovery.wang/".to_string())
        );
    }

    #[test]
    fn local_hosts_have_no_api_host() {
        assert_eq!(api_base_url("http", &Host::parse("localhost"), Some("main")), None);
    }
}
