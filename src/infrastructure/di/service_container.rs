//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{ChangeWatcher, SweepService};
use crate::config::Settings;
use crate::domain::Document;
use crate::infrastructure::di::Session;
use crate::infrastructure::traits::StaticEnvironment;
use crate::infrastructure::InfraResult;

/// Container holding all application services.
///
/// The sweep service is built once; watchers and sessions get their own copy.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    sweeper: SweepService,
}

impl ServiceContainer {
    /// Fails when a configured shape does not parse.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let settings = Arc::new(settings);
        let sweeper = SweepService::new(Arc::clone(&settings))?;

        Ok(Self { settings, sweeper })
    }

    pub fn sweep_service(&self) -> &SweepService {
        &self.sweeper
    }

    pub fn watcher(&self) -> ChangeWatcher {
        ChangeWatcher::new(self.sweeper.clone())
    }

    /// Unstarted session over `document`.
    pub fn session(&self, document: Document, env: StaticEnvironment) -> Session {
        Session::new(document, env, self.watcher())
    }
}
