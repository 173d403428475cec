use crate::cli::actions::{server::Args, Action};
use crate::environments::service::DEFAULT_API_URL;
use anyhow::Result;
use secrecy::SecretString;
use std::path::PathBuf;

/// Default cache directory: `switchyard` under the system temp dir.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join(env!("CARGO_PKG_NAME"))
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let api_url = matches
        .get_one::<String>("gitlab-api-url")
        .cloned()
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let token = matches
        .get_one::<String>("gitlab-token")
        .cloned()
        .map(SecretString::from);
    let frontend_project_id = matches.get_one::<String>("frontend-project-id").cloned();
    let backend_project_id = matches.get_one::<String>("backend-project-id").cloned();
    let cache_dir = matches
        .get_one::<PathBuf>("cache-dir")
        .cloned()
        .unwrap_or_else(default_cache_dir);
    let pipeline_id = matches.get_one::<String>("pipeline-id").cloned();
    let deploy_time = matches.get_one::<String>("deploy-time").cloned();

    Ok(Action::Server(Args {
        port,
        api_url,
        token,
        frontend_project_id,
        backend_project_id,
        cache_dir,
        pipeline_id,
        deploy_time,
    }))
}
