//! Cached environment listing.
//!
//! [`EnvironmentService::get_environments`] never fails: configuration
//! problems and unexpected errors produce the `main`-only fallback payload,
//! and upstream failures degrade only the affected project.

use super::{
    cache::{CacheEntry, CacheStore},
    categorize::categorize,
    upstream::BranchSource,
    EnvironmentsData, EnvironmentsJson, EnvironmentsResponse,
};
use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Maximum age of a cached listing.
pub const CACHE_TTL: Duration = Duration::from_secs(60);

pub const DEFAULT_API_URL: &str = "https://gitlab.com/api/v4";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Upstream settings; missing values select the fallback payload.
#[derive(Debug, Clone)]
pub struct EnvironmentsConfig {
    pub api_url: String,
    pub token: Option<SecretString>,
    pub frontend_project_id: Option<String>,
    pub backend_project_id: Option<String>,
}

impl Default for EnvironmentsConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            frontend_project_id: None,
            backend_project_id: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum EnvironmentsError {
    #[error("GITLAB_ACCESS_TOKEN not configured")]
    MissingToken,
    #[error("Project IDs not configured")]
    MissingProjectIds,
    #[error("failed to serialize environments: {0}")]
    Serialize(#[from] serde_json::Error),
}

struct Upstream<'a> {
    token: &'a SecretString,
    frontend: &'a str,
    backend: &'a str,
}

impl EnvironmentsConfig {
    fn upstream(&self) -> Result<Upstream<'_>, EnvironmentsError> {
        use secrecy::ExposeSecret;

        let token = self
            .token
            .as_ref()
            .filter(|t| !t.expose_secret().trim().is_empty())
            .ok_or(EnvironmentsError::MissingToken)?;

        match (
            non_empty(&self.frontend_project_id),
            non_empty(&self.backend_project_id),
        ) {
            (Some(frontend), Some(backend)) => Ok(Upstream {
                token,
                frontend,
                backend,
            }),
            _ => Err(EnvironmentsError::MissingProjectIds),
        }
    }
}

fn non_empty(id: &Option<String>) -> Option<&str> {
    id.as_deref().map(str::trim).filter(|id| !id.is_empty())
}

pub struct EnvironmentService<S, C> {
    config: EnvironmentsConfig,
    source: S,
    cache: C,
    clock: Arc<dyn Clock>,
}

impl<S: BranchSource, C: CacheStore> EnvironmentService<S, C> {
    pub fn new(config: EnvironmentsConfig, source: S, cache: C) -> Self {
        Self {
            config,
            source,
            cache,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns the categorized listing for both projects.
    ///
    /// A fresh cache entry is returned byte for byte, including its original
    /// `cached` and `timestamp` fields.
    #[instrument(skip(self))]
    pub async fn get_environments(&self) -> EnvironmentsJson {
        match self.try_get_environments().await {
            Ok(body) => body,
            Err(err) => {
                error!("Serving fallback environments: {err}");
                fallback(&err.to_string())
            }
        }
    }

    async fn try_get_environments(&self) -> Result<EnvironmentsJson, EnvironmentsError> {
        let upstream = self.config.upstream()?;

        let now = self.clock.now();
        let ttl_ms = i64::try_from(CACHE_TTL.as_millis()).unwrap_or(i64::MAX);
        if let Some(entry) = self.cache.read() {
            if entry.is_fresh(now.timestamp_millis(), ttl_ms) {
                debug!("Serving cached environments");
                return Ok(EnvironmentsJson::from(entry.body));
            }
        }

        let api_url = self.config.api_url.as_str();
        let (frontend, backend) = tokio::join!(
            self.source
                .list_branches(api_url, upstream.token, upstream.frontend),
            self.source
                .list_branches(api_url, upstream.token, upstream.backend),
        );
        info!(
            "Fetched {} frontend and {} backend branches",
            frontend.len(),
            backend.len()
        );

        let response = EnvironmentsResponse {
            data: EnvironmentsData {
                frontend: categorize(&frontend),
                backend: categorize(&backend),
            },
            cached: Some(false),
            timestamp: Some(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
            error: None,
        };
        let body = serde_json::to_string_pretty(&response)?;

        let entry = CacheEntry {
            written_at: now.timestamp_millis(),
            body,
        };
        if let Err(err) = self.cache.write(&entry) {
            warn!("Failed to write environments cache: {err:#}");
        }

        Ok(EnvironmentsJson::from(entry.body))
    }
}

fn fallback(error: &str) -> EnvironmentsJson {
    let body = serde_json::to_string(&EnvironmentsResponse::fallback(error)).unwrap_or_else(|_| {
        serde_json::json!({
            "frontend": { "main": ["main"], "feature": [] },
            "backend": { "main": ["main"], "feature": [] },
            "error": error,
        })
        .to_string()
    });
    EnvironmentsJson::from(body)
}
