use serde::{Deserialize, Serialize};

use crate::api::models::AuthResponse;

/// Account role as issued by the platform. Anything the client does not know
/// is kept verbatim so it can be shown, but it grants no policies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Ong,
    Company,
    Volunteer,
    User,
    Unknown(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "ADMIN",
            Role::Ong => "ONG",
            Role::Company => "COMPANY",
            Role::Volunteer => "VOLUNTEER",
            Role::User => "USER",
            Role::Unknown(raw) => raw.as_str(),
        }
    }

    pub fn is_known(&self) -> bool { !matches!(self, Role::Unknown(_)) }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "ADMIN" => Role::Admin,
            "ONG" => Role::Ong,
            "COMPANY" => Role::Company,
            "VOLUNTEER" => Role::Volunteer,
            "USER" => Role::User,
            _ => Role::Unknown(raw),
        }
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self { Role::from(raw.to_string()) }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user held by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub token: String,
}

impl Identity {
    /// Build the identity carried by a login/register answer. The display
    /// name joins whichever of first and last name the server sent.
    pub fn from_auth(resp: &AuthResponse) -> Self {
        let parts: Vec<&str> = [resp.first_name.as_deref(), resp.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let display_name = if parts.is_empty() { None } else { Some(parts.join(" ")) };
        Self {
            id: resp.user_id.clone(),
            email: resp.email.clone(),
            role: Role::from(resp.role.clone()),
            display_name,
            token: resp.token.clone(),
        }
    }

    /// Name to greet the user with.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(n) => n,
            None if !self.email.is_empty() => &self.email,
            None => &self.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(first: Option<&str>, last: Option<&str>) -> AuthResponse {
        AuthResponse {
            user_id: "u1".into(),
            email: "a@b.com".into(),
            role: "VOLUNTEER".into(),
            token: "t1".into(),
            message: None,
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
        }
    }

    #[test]
    fn role_parses_known_names_case_sensitively() {
        assert_eq!(Role::from("ONG"), Role::Ong);
        assert_eq!(Role::from("ADMIN"), Role::Admin);
        assert_eq!(Role::from("ong"), Role::Unknown("ong".into()));
        assert!(!Role::from("GUEST").is_known());
        assert_eq!(String::from(Role::Unknown("GUEST".into())), "GUEST");
        assert_eq!(Role::Company.to_string(), "COMPANY");
    }

    #[test]
    fn role_serde_is_plain_string() {
        let json = serde_json::to_string(&Role::Volunteer).unwrap();
        assert_eq!(json, "\"VOLUNTEER\"");
        let r: Role = serde_json::from_str("\"PARTNER\"").unwrap();
        assert_eq!(r, Role::Unknown("PARTNER".into()));
    }

    #[test]
    fn identity_from_auth_joins_names() {
        let id = Identity::from_auth(&auth(Some("Ana"), Some("Souza")));
        assert_eq!(id.id, "u1");
        assert_eq!(id.role, Role::Volunteer);
        assert_eq!(id.display_name.as_deref(), Some("Ana Souza"));
        assert_eq!(id.label(), "Ana Souza");

        let only_first = Identity::from_auth(&auth(Some("Ana"), Some("  ")));
        assert_eq!(only_first.display_name.as_deref(), Some("Ana"));

        let anonymous = Identity::from_auth(&auth(None, None));
        assert!(anonymous.display_name.is_none());
        assert_eq!(anonymous.label(), "a@b.com");
    }

    #[test]
    fn identity_snapshot_uses_camel_case() {
        let id = Identity::from_auth(&auth(Some("Ana"), None));
        let v = serde_json::to_value(&id).unwrap();
        assert_eq!(v["displayName"], "Ana");
        assert_eq!(v["role"], "VOLUNTEER");
        let back: Identity = serde_json::from_value(v).unwrap();
        assert_eq!(back, id);
    }
}
