use std::sync::Arc;
use std::time::Duration;

use tracing::info;

// Export modules
pub mod api;
pub mod config;
pub mod error;
pub mod guards;
pub mod session;
pub mod users;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use error::{ConsoleError, ConsoleResult};

use api::client::{ApiClient, TokenSource, UnauthorizedHandler};
use api::endpoints::AuthApi;
use api::transport::{HttpTransport, ReqwestTransport};
use session::manager::SessionManager;
use session::scheduler::RefreshScheduler;
use session::store::SessionStore;
use users::directory::UserDirectory;

/// Main application state.
///
/// Wires the session manager, refresh scheduler, authenticated API client
/// and user directory together from a [`Config`] and a single transport
/// chosen at construction time. Built once at process start and shared for
/// the lifetime of the process; every consumer receives references to the
/// same instances — there is no global session state.
pub struct AppState {
    /// Session owner; also the API client's token source
    pub session: Arc<SessionManager>,
    /// Authenticated client used by the management screens
    pub api: Arc<ApiClient>,
    /// User management data layer
    pub users: UserDirectory,
    /// Proactive token refresh timer
    scheduler: RefreshScheduler,
}

impl AppState {
    /// Create the application state with the native HTTP transport
    pub fn new(config: &Config) -> ConsoleResult<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
            Duration::from_secs(config.api.timeout_seconds),
        )?);
        Self::with_transport(config, transport)
    }

    /// Create the application state with an explicitly supplied transport
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
    ) -> ConsoleResult<Self> {
        let store = SessionStore::new(&config.storage.data_dir)?;
        let auth = AuthApi::new(config.api.base_url.clone(), Arc::clone(&transport));
        let session = Arc::new(SessionManager::new(auth, store, config.device_id.clone()));

        // The scheduler subscribes before any session is restored so the
        // adoption event arms its timer.
        let scheduler = RefreshScheduler::start(&session);

        let token_source: TokenSource = {
            let session = Arc::clone(&session);
            Arc::new(move || session.access_token())
        };

        // A 401 anywhere in the management API ends the session
        let on_unauthorized: UnauthorizedHandler = {
            let session = Arc::clone(&session);
            Arc::new(move || {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    session.logout().await;
                });
            })
        };

        let api = Arc::new(ApiClient::new(
            config.api.base_url.clone(),
            transport,
            token_source,
            on_unauthorized,
        ));

        let users = UserDirectory::new(Arc::clone(&api));

        Ok(Self {
            session,
            api,
            users,
            scheduler,
        })
    }

    /// Restore any persisted session and finish startup
    pub async fn initialize(&self) {
        self.session.initialize().await;
        info!(
            authenticated = self.session.is_authenticated(),
            "Console core initialized"
        );
    }

    /// Stop background work
    pub fn shutdown(&self) {
        self.scheduler.stop();
    }
}
