//! Upstream branch listing client.
//!
//! Listings are fetched from a GitLab-compatible API:
//! `GET {api_url}/projects/{project_id}/repository/branches` with a
//! `PRIVATE-TOKEN` header. Any failure yields an empty listing for that project.

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{future::Future, time::Duration};
use tracing::{debug, error, instrument};
use url::Url;

/// Per-request timeout for upstream listings.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of raw branch names for a project.
pub trait BranchSource: Send + Sync {
    /// Branch names in upstream order; empty when the listing is unavailable.
    fn list_branches(
        &self,
        api_url: &str,
        token: &SecretString,
        project_id: &str,
    ) -> impl Future<Output = Vec<String>> + Send;
}

#[derive(Deserialize, Debug)]
struct UpstreamBranch {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone)]
pub struct GitLabClient {
    client: Client,
}

impl GitLabClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl BranchSource for GitLabClient {
    #[instrument(skip(self, token))]
    async fn list_branches(
        &self,
        api_url: &str,
        token: &SecretString,
        project_id: &str,
    ) -> Vec<String> {
        let Some(url) = branches_url(api_url, project_id) else {
            error!("Invalid upstream API URL: {api_url}");
            return Vec::new();
        };

        let response = match self
            .client
            .get(url)
            .header("PRIVATE-TOKEN", token.expose_secret())
            .header("Content-Type", "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Upstream request failed for project {project_id}: {e}");
                return Vec::new();
            }
        };

        if response.status() != StatusCode::OK {
            error!(
                "Upstream API error: HTTP {} for project {project_id}",
                response.status().as_u16()
            );
            return Vec::new();
        }

        match response.json::<Vec<UpstreamBranch>>().await {
            Ok(branches) => {
                debug!("Fetched {} branches for project {project_id}", branches.len());
                branches
                    .into_iter()
                    .map(|b| b.name)
                    .filter(|name| !name.is_empty())
                    .collect()
            }
            Err(e) => {
                error!("Failed to decode branches for project {project_id}: {e}");
                Vec::new()
            }
        }
    }
}

/// `{api_url}/projects/{project_id}/repository/branches`, with the project id
/// encoded as a single path segment so `group/project` ids work.
fn branches_url(api_url: &str, project_id: &str) -> Option<Url> {
    let mut url = Url::parse(api_url).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["projects", project_id, "repository", "branches"]);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn token() -> SecretString {
        SecretString::from("glpat-test".to_string())
    }

    #[test]
    fn branches_url_encodes_project_path() {
        let url = branches_url("https://gitlab.com/api/v4", "group/app");
        assert_eq!(
            url.map(|u| u.to_string()),
            Some("https://gitlab.com/api/v4/projects/group%2Fapp/repository/branches".to_string())
        );
        let url = branches_url("https://gitlab.example/api/v4/", "42");
        assert_eq!(
            url.map(|u| u.to_string()),
            Some("https://gitlab.example/api/v4/projects/42/repository/branches".to_string())
        );
        assert_eq!(branches_url("not a url", "42"), None);
    }

    #[tokio::test]
    async fn lists_branch_names_with_private_token() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/42/repository/branches"))
            .and(header("PRIVATE-TOKEN", "glpat-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "main", "merged": false },
                { "name": "feature/login" },
                { "protected": true }
            ])))
            .mount(&server)
            .await;

        let client = GitLabClient::new()?;
        let branches = client
            .list_branches(&format!("{}/api/v4", server.uri()), &token(), "42")
            .await;
        assert_eq!(branches, vec!["main", "feature/login"]);
        Ok(())
    }

    #[tokio::test]
    async fn non_200_yields_empty_listing() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/7/repository/branches"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "401 Unauthorized"
            })))
            .mount(&server)
            .await;

        let client = GitLabClient::new()?;
        let branches = client.list_branches(&server.uri(), &token(), "7").await;
        assert!(branches.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_body_yields_empty_listing() -> anyhow::Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/7/repository/branches"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = GitLabClient::new()?;
        let branches = client.list_branches(&server.uri(), &token(), "7").await;
        assert!(branches.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_upstream_yields_empty_listing() -> anyhow::Result<()> {
        let client = GitLabClient::new()?;
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let branches = client
            .list_branches("http://127.0.0.1:9", &token(), "7")
            .await;
        assert!(branches.is_empty());
        Ok(())
    }
}
