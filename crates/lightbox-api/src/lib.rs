pub mod auth;
pub mod error;
pub mod files;
pub mod layout;
pub mod pages;
pub mod registry;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

/// Modules discovered under `src/callbacks/` by `build.rs`.
mod callbacks {
    include!(concat!(env!("OUT_DIR"), "/callbacks.rs"));
}

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::auth::Authenticator;
use crate::files::FileStore;
use crate::registry::{Registry, RegistryError};
use crate::session::{FileSessionStore, SessionSettings};
use crate::state::AppStateInner;

/// Discover pages and callbacks and assemble the application router.
pub fn build_app(
    auth: Arc<dyn Authenticator>,
    files: Arc<dyn FileStore>,
    sessions: FileSessionStore,
    settings: &SessionSettings,
) -> Result<Router, RegistryError> {
    let (pages, callbacks) = Registry::discover()?.into_parts();

    let state = Arc::new(AppStateInner { auth, files, pages });

    Ok(Router::new()
        .merge(callbacks)
        .route("/health", get(health))
        .fallback(pages::serve)
        .with_state(state)
        .layer(settings.layer(sessions)))
}

async fn health() -> &'static str {
    "ok"
}
