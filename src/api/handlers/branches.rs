//! Branch reconciliation and switching over HTTP.
//!
//! The browser's `Host` and `Cookie` headers stand in for `window.location`
//! and `document.cookie`; cookie changes go back as `Set-Cookie` headers.

use crate::{
    api::jar::HeaderJar,
    branch::{
        api_base_url, resolve_on_load, switch_branch, Axis, CookieScopeManager, CurrentBranches,
        Host, SwitchOutcome, BACKEND_COOKIE,
    },
};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{
        header::{HOST, REFERER},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;
use utoipa::ToSchema;

const DEFAULT_SCHEME: &str = "https";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct BranchesResponse {
    #[serde(flatten)]
    pub current: CurrentBranches,
    /// Backend API base URL for the selected backend branch; absent on local hosts.
    pub api_base_url: Option<String>,
    pub metadata: DeployMetadata,
}

/// Pipeline and deploy time of the running deployment; `null` when not configured.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployMetadata {
    pub pipeline_id: Option<String>,
    pub deploy_time: Option<String>,
}

impl DeployMetadata {
    /// Blank values count as unset.
    #[must_use]
    pub fn new(pipeline_id: Option<String>, deploy_time: Option<String>) -> Self {
        let present = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            pipeline_id: present(pipeline_id),
            deploy_time: present(deploy_time),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SwitchRequest {
    pub axis: Axis,
    pub branch: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SwitchAction {
    Navigate,
    Reload,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SwitchResponse {
    pub action: SwitchAction,
    pub location: String,
}

fn bad_request(error: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// First value of a possibly comma-separated forwarding header.
fn forwarded(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn request_host(headers: &HeaderMap) -> Option<String> {
    forwarded(headers, "x-forwarded-host").or_else(|| {
        headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

fn request_scheme(headers: &HeaderMap) -> String {
    forwarded(headers, "x-forwarded-proto")
        .filter(|proto| proto == "http" || proto == "https")
        .unwrap_or_else(|| DEFAULT_SCHEME.to_string())
}

/// The page the user is on: the `Referer` when it belongs to the same host,
/// otherwise the root of the requesting host.
fn current_url(headers: &HeaderMap, scheme: &str, raw_host: &str) -> Option<Url> {
    let host = Host::parse(raw_host).hostname();
    let referer = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Url::parse(v).ok())
        .filter(|url| url.host_str().map(str::to_ascii_lowercase) == Some(host.clone()));
    referer.or_else(|| Url::parse(&format!("{scheme}://{raw_host}/")).ok())
}

#[utoipa::path(
    get,
    path = "/dev-ops/branches",
    responses(
        (status = 200, description = "Current frontend and backend branches; may set cookies", body = BranchesResponse, content_type = "application/json"),
        (status = 400, description = "Missing Host header", body = ErrorResponse),
    ),
    tag = "branches"
)]
/// Reconcile the URL branch with the stored cookies for this page load.
///
/// When the host names a frontend branch different from the cookie, the
/// response rewrites the cookie at the apex domain.
#[instrument(skip(metadata, headers))]
pub async fn branches(metadata: Extension<DeployMetadata>, headers: HeaderMap) -> Response {
    let Some(raw_host) = request_host(&headers) else {
        return bad_request("missing Host header");
    };
    let scheme = request_scheme(&headers);

    let mut manager =
        CookieScopeManager::new(Host::parse(&raw_host), HeaderJar::from_headers(&headers));
    let current = resolve_on_load(&mut manager);
    let backend_cookie = manager.get(BACKEND_COOKIE);
    let api_base_url = api_base_url(&scheme, manager.host(), backend_cookie.as_deref())
        .map(|url| url.as_str().trim_end_matches('/').to_string());

    debug!("Resolved {current:?} for {raw_host}");
    let cookies = manager.store().set_cookie_headers();
    let body = BranchesResponse {
        current,
        api_base_url,
        metadata: metadata.0,
    };
    (StatusCode::OK, cookies, Json(body)).into_response()
}

#[utoipa::path(
    post,
    path = "/dev-ops/switch",
    request_body = SwitchRequest,
    responses(
        (status = 200, description = "Cookie set; follow `location` (navigate) or reload", body = SwitchResponse, content_type = "application/json"),
        (status = 400, description = "Invalid axis or branch name", body = ErrorResponse),
    ),
    tag = "branches"
)]
/// Switch the frontend or backend branch.
///
/// Nothing is written when the request is rejected.
#[instrument(skip(headers, payload))]
pub async fn switch(
    headers: HeaderMap,
    payload: Result<Json<SwitchRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let Some(raw_host) = request_host(&headers) else {
        return bad_request("missing Host header");
    };
    let scheme = request_scheme(&headers);
    let Some(current) = current_url(&headers, &scheme, &raw_host) else {
        return bad_request(format!("invalid host: {raw_host}"));
    };

    let mut manager =
        CookieScopeManager::new(Host::parse(&raw_host), HeaderJar::from_headers(&headers));
    let outcome = match switch_branch(&mut manager, &current, request.axis, &request.branch) {
        Ok(outcome) => outcome,
        Err(err) => return bad_request(err.to_string()),
    };

    info!("Switched {} to {:?}", request.axis, request.branch);
    let action = match outcome {
        SwitchOutcome::Navigate(_) => SwitchAction::Navigate,
        SwitchOutcome::Reload(_) => SwitchAction::Reload,
    };
    let body = SwitchResponse {
        action,
        location: outcome.location().to_string(),
    };
    (StatusCode::OK, manager.store().set_cookie_headers(), Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(*name, value);
            }
        }
        headers
    }

    #[test]
    fn deploy_metadata_ignores_blank_values() {
        assert_eq!(
            DeployMetadata::new(Some(" 48213 ".to_string()), Some("  ".to_string())),
            DeployMetadata {
                pipeline_id: Some("48213".to_string()),
                deploy_time: None,
            }
        );
        assert_eq!(DeployMetadata::new(None, None), DeployMetadata::default());
    }

    #[test]
    fn forwarded_host_takes_precedence() {
        let h = headers(&[
            ("host", "internal:8080"),
            ("x-forwarded-host", "main.discovery.wang, proxy.local"),
        ]);
        assert_eq!(request_host(&h), Some("main.discovery.wang".to_string()));
        assert_eq!(request_host(&HeaderMap::new()), None);
    }

    #[test]
    fn scheme_defaults_to_https() {
        assert_eq!(request_scheme(&HeaderMap::new()), "https");
        assert_eq!(
            request_scheme(&headers(&[("x-forwarded-proto", "http")])),
            "http"
        );
        assert_eq!(
            request_scheme(&headers(&[("x-forwarded-proto", "gopher")])),
            "https"
        );
    }

    #[test]
    fn current_url_uses_same_host_referer() {
        let h = headers(&[("referer", "https://main.discovery.wang/users?page=2")]);
        assert_eq!(
            current_url(&h, "https", "main.discovery.wang").map(|u| u.to_string()),
            Some("https://main.discovery.wang/users?page=2".to_string())
        );

        let foreign = headers(&[("referer", "https://evil.example/phish")]);
        assert_eq!(
            current_url(&foreign, "https", "main.discovery.wang").map(|u| u.to_string()),
            Some("https://main.discovery.wang/".to_string())
        );
    }
}
