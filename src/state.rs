use crate::config::settings::AppConfig;
use crate::infrastructure::storage::StorageLayout;
use crate::workers::JobDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub storage: StorageLayout,
    pub dispatcher: JobDispatcher,
}

impl AppState {
    pub fn new(config: AppConfig, storage: StorageLayout, dispatcher: JobDispatcher) -> Self {
        Self {
            config,
            storage,
            dispatcher,
        }
    }
}
