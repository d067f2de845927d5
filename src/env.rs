//! Hosting-environment detection and endpoint selection.
//!
//! When an application runs embedded in the Tridyme platform, the host
//! injects the backend base URL; standalone installs have no such URL and
//! talk to fixed or domain-derived endpoints instead.

use tracing::debug;

use crate::storage::{KeyValueStorage, USER_STORAGE_KEY};

/// Environment variable carrying the host-injected backend base URL.
pub const BACKEND_URL_VAR: &str = "TRIDYME_BACKEND_URL";

/// Environment variable selecting the runtime mode.
pub const MODE_VAR: &str = "TRIDYME_ENV";

/// Environment variable carrying the production domain, overridable per
/// application through [`crate::model::ApplicationConfig`].
pub const FULL_DOMAIN_VAR: &str = "TRIDYME_FULL_DOMAIN";

/// Probe over the host-injected globals of the execution environment.
pub trait EnvironmentProbe: Send + Sync {
    /// The backend base URL injected by the host platform, if any.
    fn injected_backend_url(&self) -> Option<String>;
}

/// Probe backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl EnvironmentProbe for SystemEnvironment {
    fn injected_backend_url(&self) -> Option<String> {
        std::env::var(BACKEND_URL_VAR).ok().filter(|v| !v.is_empty())
    }
}

/// Return the platform-injected backend URL, or `None` in standalone mode.
/// A missing URL is an expected outcome, not an error; no retry is made.
pub fn detect_backend_url(probe: &dyn EnvironmentProbe) -> Option<String> {
    let url = probe.injected_backend_url();
    if let Some(u) = url.as_deref() {
        debug!(backend_url = u, "detected host-injected backend URL");
    }
    url
}

/// True iff a backend URL is injected AND a non-null user record exists.
pub fn is_platform_context(
    probe: &dyn EnvironmentProbe,
    storage: &dyn KeyValueStorage,
) -> bool {
    let has_backend_url = probe.injected_backend_url().is_some();
    let has_user = storage
        .get(USER_STORAGE_KEY)
        .map(|raw| raw != "null")
        .unwrap_or(false);
    has_backend_url && has_user
}

/// Logical negation of [`is_platform_context`].
pub fn is_standalone_context(
    probe: &dyn EnvironmentProbe,
    storage: &dyn KeyValueStorage,
) -> bool {
    !is_platform_context(probe, storage)
}

/// Build mode of the hosting application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    Development,
    #[default]
    Production,
}

impl RuntimeMode {
    /// Resolve the mode from `TRIDYME_ENV`; anything other than
    /// `development` selects production.
    pub fn from_env() -> Self {
        match std::env::var(MODE_VAR).as_deref() {
            Ok("development") => RuntimeMode::Development,
            _ => RuntimeMode::Production,
        }
    }
}

/// Resolve an API endpoint for the given runtime mode.
///
/// Development always targets the fixed local endpoint regardless of
/// `full_domain`; every other mode derives an HTTPS URL from it. This
/// policy determines reachability in each deployment mode and is shared
/// by the analysis call.
pub fn api_url(mode: RuntimeMode, full_domain: &str, endpoint: &str) -> String {
    match mode {
        RuntimeMode::Development => format!("http://localhost:8000{endpoint}"),
        RuntimeMode::Production => format!("https://{full_domain}{endpoint}"),
    }
}
