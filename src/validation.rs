//! Client-side form checks. Every form is validated completely before any
//! request is built; a failing form never reaches the network.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::models::{LoginRequest, OngRegistrationRequest, RegisterRequest};
use crate::error::{FieldIssue, ValidationError};
use crate::identity::Role;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;
pub const MIN_CNPJ_LEN: usize = 14;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

pub fn is_valid_email(s: &str) -> bool { EMAIL_RE.is_match(s.trim()) }

#[derive(Default)]
struct Issues(Vec<FieldIssue>);

impl Issues {
    fn push(&mut self, field: &'static str, message: &str) {
        self.0.push(FieldIssue { field, message: message.to_string() });
    }

    fn email(&mut self, field: &'static str, value: &str) {
        if !is_valid_email(value) {
            self.push(field, "invalid email");
        }
    }

    fn min_len(&mut self, field: &'static str, value: &str, min: usize, message: &str) {
        if value.chars().count() < min {
            self.push(field, message);
        }
    }

    fn required(&mut self, field: &'static str, value: &Option<String>, message: &str) {
        if value.as_deref().map(str::trim).unwrap_or("").is_empty() {
            self.push(field, message);
        }
    }

    fn finish<T>(self, ok: T) -> Result<T, ValidationError> {
        if self.0.is_empty() { Ok(ok) } else { Err(ValidationError { issues: self.0 }) }
    }
}

fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, ValidationError> {
        let mut issues = Issues::default();
        issues.email("email", &self.email);
        if self.password.is_empty() {
            issues.push("password", "password is required");
        }
        issues.finish(LoginRequest { email: self.email.trim().to_string(), password: self.password.clone() })
    }
}

/// General sign-up form. Which optional fields are required depends on the
/// chosen role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub role: String,
    pub organization_name: Option<String>,
    pub cnpj: Option<String>,
    pub company_name: Option<String>,
    pub company_cnpj: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl RegisterForm {
    pub fn new(email: &str, password: &str, role: &str) -> Self {
        Self { email: email.to_string(), password: password.to_string(), role: role.to_string(), ..Default::default() }
    }

    pub fn validate(&self) -> Result<RegisterRequest, ValidationError> {
        let mut issues = Issues::default();
        issues.email("email", &self.email);
        issues.min_len("password", &self.password, MIN_PASSWORD_LEN, "password must have at least 6 characters");

        // ADMIN accounts are provisioned, never self-registered.
        let role = Role::from(self.role.as_str());
        match role {
            Role::Ong => {
                issues.required("organizationName", &self.organization_name, "organization name is required for organizations");
                issues.required("cnpj", &self.cnpj, "CNPJ is required for organizations");
            }
            Role::Company => {
                issues.required("companyName", &self.company_name, "company name is required for companies");
                issues.required("companyCnpj", &self.company_cnpj, "company CNPJ is required for companies");
            }
            Role::Volunteer => {
                issues.required("firstName", &self.first_name, "first name is required for volunteers");
                issues.required("lastName", &self.last_name, "last name is required for volunteers");
            }
            Role::User => {}
            Role::Admin | Role::Unknown(_) => issues.push("role", "role must be one of ONG, COMPANY, VOLUNTEER, USER"),
        }

        issues.finish(RegisterRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            role: role.as_str().to_string(),
            organization_name: non_blank(&self.organization_name),
            cnpj: non_blank(&self.cnpj),
            company_name: non_blank(&self.company_name),
            company_cnpj: non_blank(&self.company_cnpj),
            first_name: non_blank(&self.first_name),
            last_name: non_blank(&self.last_name),
            phone: non_blank(&self.phone),
            address: None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OngRegistrationForm {
    pub organization_name: String,
    pub cnpj: String,
    pub admin_first_name: String,
    pub admin_last_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl OngRegistrationForm {
    pub fn validate(&self) -> Result<OngRegistrationRequest, ValidationError> {
        let mut issues = Issues::default();
        issues.min_len("organizationName", self.organization_name.trim(), MIN_NAME_LEN, "organization name must have at least 2 characters");
        issues.min_len("cnpj", self.cnpj.trim(), MIN_CNPJ_LEN, "invalid CNPJ");
        issues.min_len("adminFirstName", self.admin_first_name.trim(), MIN_NAME_LEN, "first name must have at least 2 characters");
        issues.min_len("adminLastName", self.admin_last_name.trim(), MIN_NAME_LEN, "last name must have at least 2 characters");
        issues.email("adminEmail", &self.admin_email);
        issues.min_len("adminPassword", &self.admin_password, MIN_PASSWORD_LEN, "password must have at least 6 characters");
        issues.finish(OngRegistrationRequest {
            organization_name: self.organization_name.trim().to_string(),
            cnpj: self.cnpj.trim().to_string(),
            admin_first_name: self.admin_first_name.trim().to_string(),
            admin_last_name: self.admin_last_name.trim().to_string(),
            admin_email: self.admin_email.trim().to_string(),
            admin_password: self.admin_password.clone(),
        })
    }
}

/// Add a tag typed by the user. Blank input and duplicates are ignored;
/// returns whether the list changed.
pub fn add_tag(tags: &mut Vec<String>, input: &str) -> bool {
    let tag = input.trim();
    if tag.is_empty() || tags.iter().any(|t| t == tag) {
        return false;
    }
    tags.push(tag.to_string());
    true
}

pub fn remove_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let before = tags.len();
    tags.retain(|t| t != tag);
    tags.len() != before
}

/// Trimmed, non-empty, first occurrence kept.
pub fn normalize_tags<I, S>(input: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for t in input {
        add_tag(&mut out, t.as_ref());
    }
    out
}
