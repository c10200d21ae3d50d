//! Page and callback registration.
//!
//! `build.rs` generates the list of callback modules from `src/callbacks/`;
//! [`Registry::discover`] runs each module's `register` at startup. Any
//! failure aborts startup.

use std::collections::BTreeSet;

use axum::Router;
use axum::routing::MethodRouter;
use thiserror::Error;
use tracing::{error, info};

use crate::pages::{Page, PageTable};
use crate::state::AppState;

/// One generated entry of the discovered-module list.
pub struct CallbackModule {
    pub name: &'static str,
    pub register: fn(&mut Registry) -> Result<(), RegistryError>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("page path {0} is already registered")]
    DuplicatePage(&'static str),

    #[error("callback route {0} is already registered")]
    DuplicateCallback(String),
}

/// Collects pages and callback routes. Registration order never matters:
/// a path claimed twice is an error, not an override.
#[derive(Default)]
pub struct Registry {
    pages: PageTable,
    claimed: BTreeSet<String>,
    router: Router<AppState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every module `build.rs` found under `src/callbacks/`.
    pub fn discover() -> Result<Self, RegistryError> {
        Self::from_modules(crate::callbacks::DISCOVERED)
    }

    pub fn from_modules(modules: &[CallbackModule]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for module in modules {
            (module.register)(&mut registry).inspect_err(|e| {
                error!("Callback module {} failed to register: {}", module.name, e);
            })?;
            info!("Registered callbacks from {}", module.name);
        }
        info!(
            "{} modules registered {} pages and {} callback routes",
            modules.len(),
            registry.pages.len(),
            registry.claimed.len() - registry.pages.len()
        );
        Ok(registry)
    }

    pub fn page(&mut self, page: Page) -> Result<(), RegistryError> {
        if !self.claimed.insert(page.path.to_string()) || !self.pages.insert(page) {
            return Err(RegistryError::DuplicatePage(page.path));
        }
        Ok(())
    }

    pub fn callback(&mut self, path: &str, route: MethodRouter<AppState>) -> Result<(), RegistryError> {
        if !self.claimed.insert(path.to_string()) {
            return Err(RegistryError::DuplicateCallback(path.to_string()));
        }
        self.router = std::mem::take(&mut self.router).route(path, route);
        Ok(())
    }

    pub fn pages(&self) -> &PageTable {
        &self.pages
    }

    pub fn into_parts(self) -> (PageTable, Router<AppState>) {
        (self.pages, self.router)
    }
}
