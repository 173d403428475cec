use crate::api::handlers::{branches, environments, health};
use utoipa::openapi::{InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Router for every documented route.
///
/// `OPTIONS /health` and `/` are added by the server and stay undocumented.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(package_openapi())
        .routes(routes!(health::health))
        .routes(routes!(environments::environments))
        .routes(routes!(branches::branches))
        .routes(routes!(branches::switch));

    let tags = [
        ("environments", "Cached branch listings per project"),
        ("branches", "Current branch resolution and switching"),
        ("health", "Service health"),
    ];
    router.get_openapi_mut().tags = Some(
        tags.into_iter()
            .map(|(name, description)| {
                let mut tag = Tag::new(name);
                tag.description = Some(description.to_string());
                tag
            })
            .collect(),
    );

    router
}

fn package_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    let license = env!("CARGO_PKG_LICENSE");
    if !license.is_empty() {
        let mut spdx = License::new(license);
        spdx.identifier = Some(license.to_string());
        info.license = Some(spdx);
    }

    OpenApiBuilder::new().info(info).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = openapi();
        for path in [
            "/health",
            "/dev-ops/environments",
            "/dev-ops/branches",
            "/dev-ops/switch",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn info_comes_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, "switchyard");
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            doc.info.license.map(|l| l.name),
            Some("BSD-3-Clause".to_string())
        );
    }
}
