//! # Switchyard (Review-App Environment Switcher)
//!
//! `switchyard` lets someone browsing a preview deployment choose which frontend
//! branch and which backend branch they talk to, without rebuilding or
//! redeploying anything. The choice lives in two apex-scoped cookies
//! (`x_target_frontend`, `x_target_backend`) and, for the frontend, in the first
//! label of the hostname (`feature-x.discovery.wang`).
//!
//! ## Branch Resolution
//!
//! - **Slugs:** Branch names are normalized to DNS-safe labels (`[a-z0-9-]`).
//!   Distinct branch names may collide on the same slug; this is not resolved.
//! - **Reconciliation:** On load the URL branch wins over the cookie when the
//!   host encodes one; local and IP hosts fall back to the cookie (default `main`).
//! - **Cookie scoping:** Cookies are written at the apex domain so every review
//!   subdomain shares them. Writes first clear every narrower scope so a stale
//!   subdomain cookie can never shadow the apex one.
//!
//! ## Environment Listing
//!
//! `GET /dev-ops/environments` lists the branches of the frontend and backend
//! projects, categorized into `main` and `feature` groups. Upstream listings are
//! cached in a single durable slot for 60 seconds. Every failure degrades to a
//! valid payload, at worst `main` only for both axes.

pub mod api;
pub mod branch;
pub mod cli;
pub mod environments;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
