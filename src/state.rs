//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::files::{RegistrationService, ResolutionService};
use crate::storage::BlobStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pub registration: RegistrationService,
    pub resolution: ResolutionService,
}

impl AppState {
    /// Create a new application state over a blob store
    ///
    /// The services capture what they need from the configuration; the
    /// state does not hold it afterwards.
    pub fn new(config: &Config, store: Arc<dyn BlobStore>) -> Self {
        let registration = RegistrationService::new(store.clone(), &config.storage);
        let resolution = ResolutionService::new(store, &config.storage);
        Self {
            inner: Arc::new(AppStateInner {
                registration,
                resolution,
            }),
        }
    }

    /// Get the registration service
    pub fn registration(&self) -> &RegistrationService {
        &self.inner.registration
    }

    /// Get the resolution service
    pub fn resolution(&self) -> &ResolutionService {
        &self.inner.resolution
    }
}
