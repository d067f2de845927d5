//! Integration SDK for applications hosted on the Tridyme platform.
//!
//! Detects whether the application runs embedded in the platform or
//! standalone, loads and persists models through the platform REST
//! backend, keeps the local user record synchronized across contexts,
//! and drives remote analysis runs.
//!
//! The entry point is [`Application`], built over a [`Backend`]
//! implementation (normally [`BackendClient`]), a [`UserStore`], and an
//! [`env::EnvironmentProbe`].

pub mod client;
pub mod env;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod storage;
pub mod user;

pub use client::{Backend, BackendClient, ANALYSIS_ENDPOINT};
pub use error::SdkError;
pub use model::{
    ApplicationConfig, ApplicationState, Model, RouteParams, Severity, Snackbar, User,
};
pub use orchestrator::{Application, ApplicationOptions, Navigator, NEW_MODEL_ID};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, USER_STORAGE_KEY};
pub use user::UserStore;
