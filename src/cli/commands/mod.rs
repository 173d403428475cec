use crate::environments::service::DEFAULT_API_URL;
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};
use std::path::PathBuf;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    Command::new("switchyard")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("SWITCHYARD_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("gitlab-api-url")
                .long("gitlab-api-url")
                .help("GitLab API base URL")
                .default_value(DEFAULT_API_URL)
                .env("GITLAB_API_URL"),
        )
        .arg(
            Arg::new("gitlab-token")
                .long("gitlab-token")
                .help("GitLab access token used to list branches")
                .long_help(
                    "GitLab access token used to list branches. Without it the environments endpoint serves the main-only fallback.",
                )
                .env("GITLAB_ACCESS_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("frontend-project-id")
                .long("frontend-project-id")
                .help("GitLab project id or path of the frontend")
                .env("FRONTEND_PROJECT_ID"),
        )
        .arg(
            Arg::new("backend-project-id")
                .long("backend-project-id")
                .help("GitLab project id or path of the backend")
                .env("BACKEND_PROJECT_ID"),
        )
        .arg(
            Arg::new("cache-dir")
                .long("cache-dir")
                .help("Directory holding the environments cache")
                .long_help(
                    "Directory holding the environments cache. Defaults to `switchyard` under the system temp dir.",
                )
                .env("SWITCHYARD_CACHE_DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("pipeline-id")
                .long("pipeline-id")
                .help("CI pipeline that produced this deployment")
                .env("PIPELINE_ID"),
        )
        .arg(
            Arg::new("deploy-time")
                .long("deploy-time")
                .help("When this deployment was made, e.g. 2026-03-01T12:00:00Z")
                .env("DEPLOY_TIME"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("SWITCHYARD_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "switchyard");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_args() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "switchyard",
            "--port",
            "9090",
            "--gitlab-api-url",
            "https://gitlab.example/api/v4",
            "--gitlab-token",
            "glpat-abc",
            "--frontend-project-id",
            "10",
            "--backend-project-id",
            "20",
        ]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
        assert_eq!(
            matches.get_one::<String>("gitlab-api-url").cloned(),
            Some("https://gitlab.example/api/v4".to_string())
        );
        assert_eq!(
            matches.get_one::<String>("gitlab-token").cloned(),
            Some("glpat-abc".to_string())
        );
        assert_eq!(
            matches.get_one::<String>("frontend-project-id").cloned(),
            Some("10".to_string())
        );
        assert_eq!(
            matches.get_one::<String>("backend-project-id").cloned(),
            Some("20".to_string())
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("SWITCHYARD_PORT", Some("443")),
                ("GITLAB_API_URL", Some("https://gitlab.example/api/v4")),
                ("GITLAB_ACCESS_TOKEN", Some("glpat-env")),
                ("FRONTEND_PROJECT_ID", Some("10")),
                ("BACKEND_PROJECT_ID", Some("20")),
                ("SWITCHYARD_CACHE_DIR", Some("/var/cache/switchyard")),
                ("SWITCHYARD_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["switchyard"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>("gitlab-token").cloned(),
                    Some("glpat-env".to_string())
                );
                assert_eq!(
                    matches.get_one::<PathBuf>("cache-dir").cloned(),
                    Some(PathBuf::from("/var/cache/switchyard"))
                );
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_deploy_metadata_args() {
        temp_env::with_vars(
            [
                ("PIPELINE_ID", Some("48213")),
                ("DEPLOY_TIME", None::<&str>),
            ],
            || {
                let matches = new().get_matches_from(vec![
                    "switchyard",
                    "--deploy-time",
                    "2026-03-01T12:00:00Z",
                ]);
                assert_eq!(
                    matches.get_one::<String>("pipeline-id").cloned(),
                    Some("48213".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("deploy-time").cloned(),
                    Some("2026-03-01T12:00:00Z".to_string())
                );
            },
        );
    }

    #[test]
    fn test_default_api_url() {
        temp_env::with_vars([("GITLAB_API_URL", None::<&str>)], || {
            let matches = new().get_matches_from(vec!["switchyard"]);
            assert_eq!(
                matches.get_one::<String>("gitlab-api-url").cloned(),
                Some(DEFAULT_API_URL.to_string())
            );
        });
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("SWITCHYARD_LOG_LEVEL", Some(level))], || {
                let command = new();
                let matches = command.get_matches_from(vec!["switchyard"]);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("SWITCHYARD_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["switchyard".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_invalid_port() {
        let result = new().try_get_matches_from(vec!["switchyard", "--port", "70000"]);
        assert_eq!(
            result.map_err(|e| e.kind()),
            Err(clap::error::ErrorKind::ValueValidation)
        );
    }
}
