//! Application state shared across handlers.

use std::sync::Arc;

use rollcall_core::{
    AdmissionController, AttendanceRegister, AttendanceStore, ClassroomRegistry, Clock, Config,
    JsonFileStore, MemoryStore, StorageBackend, SystemClock,
};
use tracing::info;

/// State handed to every handler.
pub type SharedState = Arc<AppState>;

/// Services built once from configuration.
///
/// All mutable data lives behind the store, so handlers only need shared
/// references.
pub struct AppState {
    config: Config,
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    admission: AdmissionController,
    registry: ClassroomRegistry,
    register: AttendanceRegister,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store.backend_name())
            .field("admission", &self.admission)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Builds state for `config`, opening the configured store backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON backend has no usable data directory.
    pub fn from_config(config: Config) -> anyhow::Result<SharedState> {
        let store: Arc<dyn AttendanceStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Json => {
                let data_dir = config.storage.resolved_data_dir()?;
                info!(data_dir = %data_dir.display(), "Using JSON file store");
                Arc::new(JsonFileStore::new(data_dir))
            }
        };
        Ok(Self::with_store(config, store, Arc::new(SystemClock)))
    }

    /// Builds state around an existing store and clock.
    pub fn with_store(
        config: Config,
        store: Arc<dyn AttendanceStore>,
        clock: Arc<dyn Clock>,
    ) -> SharedState {
        let admission = AdmissionController::new(
            Arc::clone(&store),
            config.admission_policy(),
            config.calendar_policy(),
        )
        .with_clock(Arc::clone(&clock));
        let registry = ClassroomRegistry::new(Arc::clone(&store), config.enrollment.email_domain.clone())
            .with_clock(Arc::clone(&clock));
        let register = AttendanceRegister::new(Arc::clone(&store), config.calendar_policy());

        Arc::new(Self {
            config,
            store,
            clock,
            admission,
            registry,
            register,
        })
    }

    /// Active configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Name of the store backend in use.
    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Clock used for "today".
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Admission pipeline.
    pub const fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Classroom creation and enrollment.
    pub const fn registry(&self) -> &ClassroomRegistry {
        &self.registry
    }

    /// Attendance register views.
    pub const fn register(&self) -> &AttendanceRegister {
        &self.register
    }
}
