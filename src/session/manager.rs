use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::endpoints::{AuthApi, RegistrationRequest};
use crate::error::{ConsoleError, ConsoleResult};
use crate::session::permissions;
use crate::session::store::SessionStore;
use crate::session::token::{decode_expiry, Session, TokenPair};
use crate::users::model::{User, UserPermissions};

/// Capacity of the session event channel
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Session lifecycle events, consumed by the refresh scheduler and by the
/// shell (a `LoggedOut` event is the cue to navigate to the login surface).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session was established through an interactive login
    LoggedIn { expires_at: DateTime<Utc> },
    /// A persisted session was adopted at startup
    Adopted { expires_at: DateTime<Utc> },
    /// The session was replaced by a successful token refresh
    Refreshed { expires_at: DateTime<Utc> },
    /// The session ended (logout or irrecoverable refresh failure)
    LoggedOut,
}

/// Point-in-time view of the session state, used by guards and screens
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session: Option<Session>,
    pub is_loading: bool,
}

impl SessionSnapshot {
    /// A stale session that outlived a failed refresh stops counting as
    /// authenticated the moment it expires, so gates flip to redirecting
    /// without anyone having to clear it first.
    pub fn is_authenticated(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_expired())
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn permissions(&self) -> Option<&UserPermissions> {
        self.session.as_ref().and_then(|s| s.permissions.as_ref())
    }
}

/// Owner of the active session.
///
/// Constructed once at process start and shared by `Arc`; there is no
/// module-level session state anywhere in the crate. The persisted copy in
/// [`SessionStore`] is a cache of what the backend issued — login, refresh
/// and logout each replace or remove it wholesale, never patch it.
pub struct SessionManager {
    auth: AuthApi,
    store: SessionStore,
    device_id: String,
    active: RwLock<Option<Session>>,
    loading: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(auth: AuthApi, store: SessionStore, device_id: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            auth,
            store,
            device_id: device_id.into(),
            active: RwLock::new(None),
            loading: AtomicBool::new(true),
            events,
        }
    }

    /// Subscribe to session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Whether session restoration is still in progress
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Whether an active session exists
    pub fn is_authenticated(&self) -> bool {
        self.active.read().unwrap().is_some()
    }

    /// Clone of the active session, if any
    pub fn current(&self) -> Option<Session> {
        self.active.read().unwrap().clone()
    }

    /// The active access token; this is the API client's token source
    pub fn access_token(&self) -> Option<String> {
        self.active
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Point-in-time view for guards and screens
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.current(),
            is_loading: self.is_loading(),
        }
    }

    /// Check a single permission against the active session
    pub fn has_permission(&self, name: &str) -> bool {
        let active = self.active.read().unwrap();
        permissions::has_permission(active.as_ref().and_then(|s| s.permissions.as_ref()), name)
    }

    /// Check that at least one of the given permissions is granted
    pub fn has_any_permission<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let active = self.active.read().unwrap();
        permissions::has_any_permission(
            active.as_ref().and_then(|s| s.permissions.as_ref()),
            names,
        )
    }

    /// Check that every one of the given permissions is granted
    pub fn has_all_permissions<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let active = self.active.read().unwrap();
        permissions::has_all_permissions(
            active.as_ref().and_then(|s| s.permissions.as_ref()),
            names,
        )
    }

    /// Check a role against the active session
    pub fn has_role(&self, role_name: &str) -> bool {
        let active = self.active.read().unwrap();
        permissions::has_role(active.as_ref().and_then(|s| s.permissions.as_ref()), role_name)
    }

    /// Establish a session from a freshly issued token pair.
    ///
    /// Decodes the access token's expiry claim, fetches the user profile,
    /// and fetches permissions best-effort (their absence does not abort the
    /// login). The resulting session is persisted, overwriting any prior
    /// one, and becomes the active session.
    pub async fn login(&self, tokens: TokenPair) -> ConsoleResult<()> {
        // An undecodable token fails before anything is written
        let expires_at = decode_expiry(&tokens.access_token)?;

        let user = self
            .auth
            .fetch_profile(&tokens.access_token)
            .await
            .map_err(|e| ConsoleError::profile_fetch(e))?;

        let permissions = match self.auth.fetch_permissions(&tokens.access_token).await {
            Ok(permissions) => Some(permissions),
            Err(e) => {
                warn!(error = %e, "Could not load permissions during login");
                None
            }
        };

        let session = Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user,
            permissions,
            expires_at,
        };

        self.store.save(&session)?;
        *self.active.write().unwrap() = Some(session);

        info!(expires_at = %expires_at, "Session established");
        let _ = self.events.send(SessionEvent::LoggedIn { expires_at });

        Ok(())
    }

    /// Request an OTP dispatch for the given phone number
    pub async fn send_otp(&self, phone: &str) -> ConsoleResult<()> {
        self.auth.send_otp(phone).await?;
        Ok(())
    }

    /// Complete the OTP login flow: exchange the phone/code pair for tokens,
    /// then establish the session.
    pub async fn login_with_otp(&self, phone: &str, code: &str) -> ConsoleResult<()> {
        let tokens = self.auth.verify_otp(phone, code, &self.device_id).await?;
        self.login(tokens).await
    }

    /// Start a registration; the backend dispatches an OTP to the new phone
    pub async fn register(&self, registration: &RegistrationRequest) -> ConsoleResult<()> {
        self.auth.register(registration).await?;
        Ok(())
    }

    /// Complete a registration with the received code and log straight in
    pub async fn complete_registration(
        &self,
        code: &str,
        registration: &RegistrationRequest,
    ) -> ConsoleResult<()> {
        let tokens = self.auth.register_verify(code, registration).await?;
        self.login(tokens).await
    }

    /// End the session.
    ///
    /// The backend is notified best-effort; regardless of the outcome the
    /// persisted and active session state is cleared unconditionally.
    pub async fn logout(&self) {
        let access_token = self.access_token();

        if let Some(token) = access_token {
            if let Err(e) = self.auth.logout(&token).await {
                debug!(error = %e, "Logout notification failed, clearing session anyway");
            }
        }

        self.clear();
        info!("Session ended");
    }

    /// Replace the session using the stored refresh token.
    ///
    /// Fails closed: a missing stored token, a failed refresh call, an
    /// undecodable new token, or a failed profile fetch all yield `false`
    /// without touching the current session.
    pub async fn refresh_session(&self) -> bool {
        let Some(refresh_token) = self.store.refresh_token() else {
            debug!("No stored refresh token, refresh skipped");
            return false;
        };

        let tokens = match self.auth.refresh(&refresh_token, &self.device_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!(error = %e, "Token refresh call failed");
                return false;
            }
        };

        let expires_at = match decode_expiry(&tokens.access_token) {
            Ok(expires_at) => expires_at,
            Err(e) => {
                debug!(error = %e, "Refreshed access token is undecodable");
                return false;
            }
        };

        let user = match self.auth.fetch_profile(&tokens.access_token).await {
            Ok(user) => user,
            Err(e) => {
                debug!(error = %e, "Profile fetch after refresh failed");
                return false;
            }
        };

        let permissions = match self.auth.fetch_permissions(&tokens.access_token).await {
            Ok(permissions) => Some(permissions),
            Err(e) => {
                warn!(error = %e, "Could not load permissions after refresh");
                None
            }
        };

        let session = Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user,
            permissions,
            expires_at,
        };

        if let Err(e) = self.store.save(&session) {
            warn!(error = %e, "Failed to persist refreshed session");
            return false;
        }
        *self.active.write().unwrap() = Some(session);

        debug!(expires_at = %expires_at, "Session refreshed");
        let _ = self.events.send(SessionEvent::Refreshed { expires_at });

        true
    }

    /// Restore session state at process start.
    ///
    /// An expired persisted session gets exactly one refresh attempt and is
    /// cleared on failure. A live one is adopted directly; when it was
    /// persisted without permissions, those are fetched in the background
    /// without blocking startup.
    pub async fn initialize(self: &Arc<Self>) {
        match self.store.load() {
            Some(session) if session.is_expired() => {
                info!("Persisted session has expired, attempting refresh");
                if !self.refresh_session().await {
                    self.clear();
                }
            }
            Some(session) => {
                let expires_at = session.expires_at;
                let needs_permissions = session.permissions.is_none();
                let access_token = session.access_token.clone();

                *self.active.write().unwrap() = Some(session);
                info!(expires_at = %expires_at, "Adopted persisted session");
                let _ = self.events.send(SessionEvent::Adopted { expires_at });

                if needs_permissions {
                    let manager = Arc::clone(self);
                    tokio::spawn(async move {
                        manager.backfill_permissions(access_token).await;
                    });
                }
            }
            None => {
                debug!("No persisted session found");
            }
        }

        self.loading.store(false, Ordering::Release);
    }

    /// Fetch permissions for an adopted session that was persisted without
    /// them, then re-persist the whole record.
    async fn backfill_permissions(&self, access_token: String) {
        let permissions = match self.auth.fetch_permissions(&access_token).await {
            Ok(permissions) => permissions,
            Err(e) => {
                warn!(error = %e, "Background permission fetch failed");
                return;
            }
        };

        let updated = {
            let mut active = self.active.write().unwrap();
            match active.as_mut() {
                // Only attach to the session the fetch was made for; a
                // concurrent refresh already carries its own permissions.
                Some(session) if session.access_token == access_token => {
                    session.permissions = Some(permissions);
                    Some(session.clone())
                }
                _ => None,
            }
        };

        if let Some(session) = updated {
            if let Err(e) = self.store.save(&session) {
                warn!(error = %e, "Failed to persist backfilled permissions");
            }
        }
    }

    /// Drop persisted and active session state and announce the end
    fn clear(&self) {
        self.store.clear();
        *self.active.write().unwrap() = None;
        let _ = self.events.send(SessionEvent::LoggedOut);
    }
}
