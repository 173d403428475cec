use crate::{
    api::{self, DeployMetadata},
    environments::{
        cache::migrate_legacy_files, CacheStore, EnvironmentService, EnvironmentsConfig,
        FileCacheStore, GitLabClient,
    },
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub api_url: String,
    pub token: Option<SecretString>,
    pub frontend_project_id: Option<String>,
    pub backend_project_id: Option<String>,
    pub cache_dir: PathBuf,
    pub pipeline_id: Option<String>,
    pub deploy_time: Option<String>,
}

impl Args {
    fn environments_config(&self) -> EnvironmentsConfig {
        EnvironmentsConfig {
            api_url: self.api_url.clone(),
            token: self.token.clone(),
            frontend_project_id: self.frontend_project_id.clone(),
            backend_project_id: self.backend_project_id.clone(),
        }
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the HTTP client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    match migrate_legacy_files(&args.cache_dir) {
        Ok(0) => {}
        Ok(removed) => info!("Removed {removed} legacy cache file(s)"),
        Err(err) => warn!("Legacy cache cleanup failed: {err:#}"),
    }

    let client = GitLabClient::new().context("Could not build upstream HTTP client")?;
    let cache: Arc<dyn CacheStore> = Arc::new(FileCacheStore::new(args.cache_dir.clone()));
    let service = EnvironmentService::new(args.environments_config(), client, cache);

    let metadata = DeployMetadata::new(args.pipeline_id, args.deploy_time);

    api::new(args.port, Arc::new(service), metadata).await
}

fn log_startup_args(args: &Args) {
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "none".to_string());
    let token_set = args
        .token
        .as_ref()
        .is_some_and(|token| !token.expose_secret().trim().is_empty());

    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("gitlab_api_url", args.api_url.clone()),
        ("gitlab_token_set", token_set.to_string()),
        ("frontend_project_id", optional(&args.frontend_project_id)),
        ("backend_project_id", optional(&args.backend_project_id)),
        ("cache_dir", args.cache_dir.display().to_string()),
        ("pipeline_id", optional(&args.pipeline_id)),
        ("deploy_time", optional(&args.deploy_time)),
    ];
    info!("{}", startup_message("Startup configuration", &entries));
}

fn startup_message(title: &str, entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_commit() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit(" abc "), "abc");
    }

    #[test]
    fn test_startup_message_aligns_keys() {
        let message = startup_message(
            "Startup configuration",
            &[
                ("listen", "tcp:8080".to_string()),
                ("gitlab_token_set", "false".to_string()),
            ],
        );
        assert!(message.contains("\n  listen:           tcp:8080"));
        assert!(message.contains("\n  gitlab_token_set: false"));
    }

    #[test]
    fn test_args_debug_redacts_token() {
        let args = Args {
            port: 8080,
            api_url: "https://gitlab.com/api/v4".to_string(),
            token: Some(SecretString::from("glpat-secret")),
            frontend_project_id: Some("10".to_string()),
            backend_project_id: None,
            cache_dir: PathBuf::from("/tmp"),
            pipeline_id: None,
            deploy_time: None,
        };
        assert!(!format!("{args:?}").contains("glpat-secret"));

        let config = args.environments_config();
        assert_eq!(config.frontend_project_id.as_deref(), Some("10"));
        assert_eq!(
            config.token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("glpat-secret".to_string())
        );
    }
}
