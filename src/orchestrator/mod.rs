//! Application lifecycle orchestration.
//!
//! Composes environment detection, the user store, and the backend client
//! into the load / analyze / save flow of a hosted application, and owns
//! the transient snackbar notification state. Network errors never escape
//! the public operations here; everything user-visible goes through the
//! snackbar.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, warn};

use crate::client::Backend;
use crate::env::{detect_backend_url, EnvironmentProbe, FULL_DOMAIN_VAR};
use crate::model::{
    ApplicationConfig, ApplicationState, Model, RouteParams, Severity, Snackbar,
};
use crate::user::UserStore;

/// Sentinel route id meaning "start from a blank model".
pub const NEW_MODEL_ID: &str = "new";

/// Navigation callback supplied by the hosting application's router.
pub type Navigator = Box<dyn Fn(&str) + Send + Sync>;

/// Options supplied by the hosting application at construction.
///
/// `initial_state` and `route` are required in practice; their absence is
/// reported through the snackbar but does not halt initialization.
pub struct ApplicationOptions {
    pub initial_state: Option<ApplicationState>,
    pub route: Option<RouteParams>,
    pub config: ApplicationConfig,
    pub navigate: Option<Navigator>,
}

/// Per-instance application orchestrator.
///
/// Lifecycle: construct, then [`init`](Self::init) once; afterwards
/// [`analyze`](Self::analyze) and [`save`](Self::save) may be called any
/// number of times. Concurrent overlapping calls are neither coordinated
/// nor prevented.
pub struct Application<B: Backend> {
    backend: B,
    users: Arc<UserStore>,
    probe: Arc<dyn EnvironmentProbe>,
    config: ApplicationConfig,
    route: RouteParams,
    navigate: Option<Navigator>,
    state: ApplicationState,
    loading: bool,
    current_url: Option<String>,
    model_id: Option<String>,
    snackbar: Snackbar,
    current_path: Option<String>,
    alive: Arc<AtomicBool>,
}

impl<B: Backend> Application<B> {
    pub fn new(
        backend: B,
        users: Arc<UserStore>,
        probe: Arc<dyn EnvironmentProbe>,
        options: ApplicationOptions,
    ) -> Self {
        let ApplicationOptions {
            initial_state,
            route,
            config,
            navigate,
        } = options;

        let mut snackbar = Snackbar::default();
        if route.is_none() || initial_state.is_none() {
            error!("required options missing: route match or initial state");
            snackbar = Snackbar {
                open: true,
                message: "Paramètres obligatoires manquants : match ou initialState".into(),
                severity: Severity::Error,
            };
        }
        if navigate.is_none() {
            warn!("no navigation callback supplied, navigation disabled");
            snackbar = Snackbar {
                open: true,
                message: "Option navigate non fournie, navigation désactivée".into(),
                severity: Severity::Warning,
            };
        }

        let route = route.unwrap_or_default();
        let model_id = route.model_id.clone();

        Self {
            backend,
            users,
            probe,
            config,
            route,
            navigate,
            state: initial_state.unwrap_or_default(),
            loading: true,
            current_url: None,
            model_id,
            snackbar,
            current_path: None,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Detect the backend URL and load the routed model, if any.
    ///
    /// Always ends in the ready state with the loading flag cleared: a
    /// failed fetch is indistinguishable from having nothing to load, and
    /// the caller-supplied initial state is kept in that case.
    pub async fn init(&mut self) {
        let detected = detect_backend_url(self.probe.as_ref());
        self.current_url = detected.clone();

        if let (Some(id), Some(url)) = (self.model_id.clone(), detected) {
            if id != NEW_MODEL_ID {
                if let Some(model) = self.backend.get_model(&id, &url).await {
                    if self.alive() {
                        self.state = model.data;
                    }
                }
            }
        }

        if self.alive() {
            self.loading = false;
        }
    }

    /// Submit the current state for analysis and shallow-merge the result
    /// into `data`: returned keys overwrite same-named existing keys,
    /// everything else is preserved. On failure the state is left
    /// unchanged and an error snackbar is shown.
    pub async fn analyze(&mut self) {
        let full_domain = self.full_domain();
        match self.backend.run_analysis(&self.state, &full_domain).await {
            Ok(results) => {
                if !self.alive() {
                    return;
                }
                for (key, value) in results {
                    self.state.data.insert(key, value);
                }
            }
            Err(e) => {
                error!(error = %e, "analysis failed");
                if !self.alive() {
                    return;
                }
                self.notify("Erreur lors de l'analyse", Severity::Error);
            }
        }
    }

    /// Persist the current state as a model.
    ///
    /// Requires a resolved backend URL and a known user id; when either is
    /// missing an error snackbar is shown and no network call is made. A
    /// held non-"new" id means update; otherwise the model is created, the
    /// backend-assigned id is captured, and the navigation callback (or
    /// the recorded path fallback) receives the conventional model route.
    pub async fn save(&mut self) {
        let (url, user_id) = match (self.current_url.clone(), self.users.user_id()) {
            (Some(url), Some(user_id)) => (url, user_id),
            _ => {
                self.notify(
                    "Impossible de sauvegarder : URL ou utilisateur manquant",
                    Severity::Error,
                );
                return;
            }
        };

        let existing_id = self
            .model_id
            .clone()
            .filter(|id| id != NEW_MODEL_ID);
        let model = Model {
            id: existing_id.clone(),
            project_id: self.route.project_id.clone(),
            name: self
                .state
                .project_name()
                .unwrap_or("Sans nom")
                .to_string(),
            application: self.route.application_id.clone(),
            data: self.state.clone(),
            user: user_id,
        };

        match self.backend.save_model(&model, &url).await {
            Ok(saved) => {
                if !self.alive() {
                    return;
                }
                if existing_id.is_some() {
                    self.notify("Calcul enregistré", Severity::Success);
                } else if let Some(assigned) = saved.and_then(|m| m.id) {
                    self.model_id = Some(assigned.clone());
                    let path = model_path(
                        self.route.project_id.as_deref(),
                        &self.route.application_id,
                        &assigned,
                    );
                    match &self.navigate {
                        Some(navigate) => navigate(&path),
                        None => self.current_path = Some(path),
                    }
                    self.notify("Calcul enregistré", Severity::Success);
                }
            }
            Err(e) => {
                error!(error = %e, "save failed");
                if !self.alive() {
                    return;
                }
                self.notify("Erreur : Calcul non enregistré", Severity::Error);
            }
        }
    }

    /// Dismiss the snackbar. Message and severity are left in place; the
    /// next notification overwrites them.
    pub fn close_snackbar(&mut self) {
        self.snackbar.open = false;
    }

    /// Mark the hosting component as gone. In-flight operations complete
    /// but no longer mutate orchestrator state.
    pub fn detach(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }

    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    pub fn set_state(&mut self, state: ApplicationState) {
        self.state = state;
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    pub fn snackbar(&self) -> &Snackbar {
        &self.snackbar
    }

    /// Path recorded by the history fallback when no navigator is supplied.
    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    fn alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    fn full_domain(&self) -> String {
        self.config
            .full_domain
            .clone()
            .or_else(|| std::env::var(FULL_DOMAIN_VAR).ok())
            .unwrap_or_default()
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        self.snackbar = Snackbar {
            open: true,
            message: message.to_string(),
            severity,
        };
    }
}

/// Conventional route to a saved model.
pub fn model_path(project_id: Option<&str>, application_id: &str, model_id: &str) -> String {
    match project_id {
        Some(project_id) => {
            format!("/projects/{project_id}/applications/{application_id}/models/{model_id}")
        }
        None => format!("/applications/{application_id}/models/{model_id}"),
    }
}
