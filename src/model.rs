use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form application state: a schema-less field mapping representing a
/// user's in-progress work. Opaque to this layer; unknown keys survive
/// round trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationState {
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ApplicationState {
    /// Display name conventionally stored under `projet.value` in `data`.
    pub fn project_name(&self) -> Option<&str> {
        self.data
            .get("projet")
            .and_then(|field| field.get("value"))
            .and_then(Value::as_str)
    }
}

/// Persisted wrapper around an [`ApplicationState`].
///
/// Created in memory on first save; the backend assigns `_id` on creation
/// and subsequent saves are updates keyed by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "projectId", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub name: String,
    pub application: String,
    pub data: ApplicationState,
    pub user: String,
}

/// User identity record held in durable local storage across sessions.
/// Extra fields beyond the identifier are carried through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Route parameters the hosting application resolved for the current view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParams {
    pub application_id: String,
    pub model_id: Option<String>,
    pub project_id: Option<String>,
}

/// Static configuration supplied by the hosting application.
#[derive(Debug, Clone, Default)]
pub struct ApplicationConfig {
    /// Overrides the `TRIDYME_FULL_DOMAIN` environment variable when set.
    pub full_domain: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
    Warning,
}

/// Transient UI notification. Never persisted; `message` and `severity`
/// are overwritten by the next notification, `open` is cleared on dismiss.
#[derive(Debug, Clone, PartialEq)]
pub struct Snackbar {
    pub open: bool,
    pub message: String,
    pub severity: Severity,
}

impl Default for Snackbar {
    fn default() -> Self {
        Self {
            open: false,
            message: String::new(),
            severity: Severity::Success,
        }
    }
}
