//! Identity, session and access control for the platform client.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod policy;
mod storage;
mod session;
mod guard;
mod routes;

pub use principal::{Identity, Role};
pub use policy::{policies_for, role_has_policy, Policy};
pub use storage::{DurableStore, FileStore, MemoryStore, SESSION_FILE};
pub use session::{Session, SessionView, AUTH_TOKEN_KEY, AUTH_USER_KEY};
pub use guard::{evaluate, AccessGuard, GuardRequirements, GuardState, Navigator, RecordingNavigator, HOME_PATH, LOGIN_PATH};
pub use routes::{Access, Route, RouteTable};
