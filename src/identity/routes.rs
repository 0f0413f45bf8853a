use super::guard::{AccessGuard, GuardRequirements};
use super::policy::Policy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected(GuardRequirements),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub title: &'static str,
    pub access: Access,
}

impl Route {
    pub fn is_public(&self) -> bool { matches!(self.access, Access::Public) }

    /// Fresh guard for mounting this route; public routes need none.
    pub fn guard(&self) -> Option<AccessGuard> {
        match &self.access {
            Access::Public => None,
            Access::Protected(req) => Some(AccessGuard::new(req.clone())),
        }
    }
}

/// The front end's page map: which paths exist and what each demands.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let public = |path, title| Route { path, title, access: Access::Public };
        let guarded = |path, title, policy| Route {
            path,
            title,
            access: Access::Protected(GuardRequirements::policy(policy)),
        };
        Self {
            routes: vec![
                public("/", "Home"),
                public("/login", "Login"),
                public("/register", "Register"),
                public("/register-ong", "Register organization"),
                public("/dashboard", "Dashboard"),
                guarded("/volunteer-dashboard", "Volunteer dashboard", Policy::VolunteerRead),
                guarded("/volunteer-history", "Volunteer history", Policy::VolunteerRead),
                guarded("/volunteer-certificates", "Volunteer certificates", Policy::VolunteerRead),
                guarded("/volunteer-profile", "Volunteer profile", Policy::VolunteerRead),
                guarded("/ong/volunteers", "Available volunteers", Policy::VolunteerWrite),
            ],
        }
    }
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self { Self { routes } }

    /// Exact match after dropping query string, fragment and trailing slash.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let path = normalize(path);
        self.routes.iter().find(|r| r.path == path)
    }

    pub fn routes(&self) -> &[Route] { &self.routes }
}

fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let p = path[..end].trim();
    if p.len() > 1 { p.trim_end_matches('/') } else { p }
}
