//! Route protection.
//!
//! A guard turns the observed session into one of four states. Deciding is a
//! pure function ([`evaluate`]); performing a redirect is a separate effect the
//! navigation layer drains with [`AccessGuard::take_redirect`] once it has
//! finished rendering the state that produced it.

use tokio::sync::watch;
use tracing::debug;

use super::policy::{role_has_policy, Policy};
use super::principal::Role;
use super::session::SessionView;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Session restoration still pending; render a placeholder.
    Loading,
    Authorized,
    RedirectLogin,
    RedirectHome,
}

impl GuardState {
    pub fn is_redirect(self) -> bool {
        matches!(self, GuardState::RedirectLogin | GuardState::RedirectHome)
    }

    /// Target path for redirect states.
    pub fn redirect_target(self) -> Option<&'static str> {
        match self {
            GuardState::RedirectLogin => Some(LOGIN_PATH),
            GuardState::RedirectHome => Some(HOME_PATH),
            GuardState::Loading | GuardState::Authorized => None,
        }
    }
}

/// What a protected view demands. An empty requirement only asks for a
/// signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardRequirements {
    pub allowed_roles: Option<Vec<Role>>,
    pub required_policy: Option<Policy>,
}

impl GuardRequirements {
    pub fn authenticated() -> Self { Self::default() }

    pub fn policy(policy: Policy) -> Self {
        Self { allowed_roles: None, required_policy: Some(policy) }
    }

    pub fn roles<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        Self { allowed_roles: Some(roles.into_iter().collect()), required_policy: None }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.required_policy = Some(policy);
        self
    }
}

/// Guard decision for one session observation.
pub fn evaluate(view: &SessionView, req: &GuardRequirements) -> GuardState {
    if view.loading {
        return GuardState::Loading;
    }
    let Some(identity) = view.identity.as_ref() else {
        return GuardState::RedirectLogin;
    };
    if let Some(allowed) = req.allowed_roles.as_ref() {
        if !allowed.contains(&identity.role) {
            return GuardState::RedirectHome;
        }
    }
    if let Some(policy) = req.required_policy {
        if !role_has_policy(&identity.role, policy) {
            return GuardState::RedirectHome;
        }
    }
    GuardState::Authorized
}

/// Receives redirect decisions from guards.
pub trait Navigator {
    fn navigate(&mut self, path: &str);
}

/// Navigator that only records where it was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingNavigator {
    pub visited: Vec<String>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, path: &str) {
        self.visited.push(path.to_string());
    }
}

/// Guard instance for one mounted protected view.
///
/// Redirect states are terminal: once a redirect has been decided, later
/// observations do not change it. `Loading` and `Authorized` are re-evaluated
/// on every observation, so a late login or a logout is picked up.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    requirements: GuardRequirements,
    state: GuardState,
    pending_redirect: Option<&'static str>,
}

impl AccessGuard {
    pub fn new(requirements: GuardRequirements) -> Self {
        Self { requirements, state: GuardState::Loading, pending_redirect: None }
    }

    pub fn requirements(&self) -> &GuardRequirements { &self.requirements }

    pub fn state(&self) -> GuardState { self.state }

    /// Feed a session observation. Returns the state to render. A transition
    /// into a redirect state schedules the redirect instead of performing it.
    pub fn observe(&mut self, view: &SessionView) -> GuardState {
        if self.state.is_redirect() {
            return self.state;
        }
        let next = evaluate(view, &self.requirements);
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "guard transition");
            self.state = next;
            self.pending_redirect = next.redirect_target();
        }
        self.state
    }

    /// Scheduled redirect, handed out once.
    pub fn take_redirect(&mut self) -> Option<&'static str> { self.pending_redirect.take() }

    /// Run the scheduled redirect, if any, against `nav`.
    pub fn flush<N: Navigator + ?Sized>(&mut self, nav: &mut N) -> bool {
        match self.take_redirect() {
            Some(path) => {
                nav.navigate(path);
                true
            }
            None => false,
        }
    }

    /// Observe `rx` until the guard leaves `Loading`, re-evaluating on every
    /// session change. Returns `Loading` only if the session was dropped first.
    pub async fn settle(&mut self, rx: &mut watch::Receiver<SessionView>) -> GuardState {
        loop {
            let view = rx.borrow_and_update().clone();
            let state = self.observe(&view);
            if state != GuardState::Loading {
                return state;
            }
            if rx.changed().await.is_err() {
                return self.state;
            }
        }
    }
}
