use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::principal::Identity;
use super::storage::DurableStore;
use crate::api::models::{LoginRequest, RegisterRequest};
use crate::api::{ApiClient, TokenSource};
use crate::error::RequestResult;

/// Storage key of the bearer token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Storage key of the JSON identity snapshot.
pub const AUTH_USER_KEY: &str = "auth_user";

/// What guards and pages observe about the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    /// Restoration from durable storage has not finished yet.
    pub loading: bool,
    pub identity: Option<Identity>,
}

impl SessionView {
    pub fn is_authenticated(&self) -> bool { self.identity.is_some() }
}

/// Session state for one client. Created in the loading state, settled by
/// [`Session::restore`], then changed only by login, register, set-user and
/// logout. Every change is published to subscribers.
pub struct Session {
    store: Arc<dyn DurableStore>,
    state: watch::Sender<SessionView>,
}

impl Session {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        let (state, _) = watch::channel(SessionView { loading: true, identity: None });
        Self { store, state }
    }

    /// New session rehydrated from `store`.
    pub fn open(store: Arc<dyn DurableStore>) -> Self {
        let s = Self::new(store);
        s.restore();
        s
    }

    /// Rehydrate from durable storage. Missing or malformed state leaves the
    /// session unauthenticated; malformed entries are cleared.
    pub fn restore(&self) -> Option<Identity> {
        let identity = self.read_persisted();
        match &identity {
            Some(id) => info!(user = %id.id, role = %id.role, "session restored"),
            None => debug!("no persisted session"),
        }
        self.state.send_replace(SessionView { loading: false, identity: identity.clone() });
        identity
    }

    fn read_persisted(&self) -> Option<Identity> {
        let token = match self.store.get(AUTH_TOKEN_KEY) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "could not read persisted token");
                return None;
            }
        };
        let user = match self.store.get(AUTH_USER_KEY) {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "could not read persisted user");
                return None;
            }
        };
        match (token, user) {
            (None, None) => None,
            (Some(token), Some(raw)) if !token.is_empty() => match serde_json::from_str::<Identity>(&raw) {
                Ok(mut id) => {
                    id.token = token;
                    Some(id)
                }
                Err(e) => {
                    warn!(error = %e, "persisted user snapshot is malformed; clearing");
                    self.clear_persisted();
                    None
                }
            },
            _ => {
                warn!("persisted session is incomplete; clearing");
                self.clear_persisted();
                None
            }
        }
    }

    pub fn snapshot(&self) -> SessionView { self.state.borrow().clone() }

    /// Receiver that sees every later change of the session.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> { self.state.subscribe() }

    pub fn current_identity(&self) -> Option<Identity> { self.state.borrow().identity.clone() }

    pub fn is_loading(&self) -> bool { self.state.borrow().loading }

    pub fn is_authenticated(&self) -> bool { self.state.borrow().identity.is_some() }

    /// Install `identity` as the current user and persist it.
    pub fn set_user(&self, identity: Identity) {
        self.persist(&identity);
        info!(user = %identity.id, role = %identity.role, "session established");
        self.state.send_replace(SessionView { loading: false, identity: Some(identity) });
    }

    /// Authenticate against the API. A failed call leaves the session untouched
    /// and hands the request error back as is.
    pub async fn login(&self, api: &ApiClient, req: &LoginRequest) -> RequestResult<Identity> {
        let resp = api.login(req).await?;
        let identity = Identity::from_auth(&resp);
        self.set_user(identity.clone());
        Ok(identity)
    }

    pub async fn register(&self, api: &ApiClient, req: &RegisterRequest) -> RequestResult<Identity> {
        let resp = api.register(req).await?;
        let identity = Identity::from_auth(&resp);
        self.set_user(identity.clone());
        Ok(identity)
    }

    pub fn logout(&self) {
        self.clear_persisted();
        let previous = self.state.send_replace(SessionView { loading: false, identity: None });
        if let Some(id) = previous.identity {
            info!(user = %id.id, "session closed");
        }
    }

    // Storage failures do not undo the in-memory change; the session just
    // will not survive a restart.
    fn persist(&self, identity: &Identity) {
        if let Err(e) = self.store.set(AUTH_TOKEN_KEY, &identity.token) {
            warn!(error = %e, "could not persist token");
        }
        match serde_json::to_string(identity) {
            Ok(raw) => {
                if let Err(e) = self.store.set(AUTH_USER_KEY, &raw) {
                    warn!(error = %e, "could not persist user snapshot");
                }
            }
            Err(e) => warn!(error = %e, "could not encode user snapshot"),
        }
    }

    fn clear_persisted(&self) {
        for key in [AUTH_TOKEN_KEY, AUTH_USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "could not clear persisted session entry");
            }
        }
    }
}

impl TokenSource for Session {
    fn bearer_token(&self) -> Option<String> {
        self.state.borrow().identity.as_ref().map(|id| id.token.clone()).filter(|t| !t.is_empty())
    }
}
