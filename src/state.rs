use crate::{config::Settings, error::Result, fcm_sender::FcmClient};
use std::sync::Arc;

/// Shared application state.
///
/// The FCM client is constructed once here and injected everywhere it is
/// used, so tests can substitute a mock implementation.
pub struct AppState {
    pub settings: Settings,
    pub fcm_client: Arc<FcmClient>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        let fcm_client = Arc::new(FcmClient::new(&settings.fcm)?);
        tracing::info!(
            project_id = %settings.fcm.project_id,
            concurrency = settings.dispatch.concurrency,
            "Application state initialized"
        );
        Ok(AppState {
            settings,
            fcm_client,
        })
    }

    /// State with an injected sender implementation, used by tests.
    pub fn new_with_client(settings: Settings, fcm_client: Arc<FcmClient>) -> Self {
        AppState {
            settings,
            fcm_client,
        }
    }
}
