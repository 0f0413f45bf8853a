//! Error model shared by the API client, session state and form validation.
//! Authorization failures are not errors here: the access guard resolves them
//! into redirect decisions instead.

use serde_json::Value;
use thiserror::Error;

/// Failure of a call against the remote API: transport error, non-success HTTP
/// status, undecodable body, or an envelope reporting `success: false`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RequestError {
    message: String,
    status: Option<u16>,
    code: Option<Value>,
}

impl RequestError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into(), status: None, code: None }
    }

    /// Failure tied to an HTTP response.
    pub fn http<S: Into<String>>(message: S, status: u16) -> Self {
        Self { message: message.into(), status: Some(status), code: None }
    }

    /// Envelope answered with `success: false`. The carrying response was a success status.
    pub fn envelope<S: Into<String>>(message: S, status: u16, code: Value) -> Self {
        Self { message: message.into(), status: Some(status), code: Some(code) }
    }

    /// The request never produced a response (connect, DNS, TLS, body read).
    pub fn transport(err: &reqwest::Error) -> Self {
        Self { message: format!("network error: {}", err), status: err.status().map(|s| s.as_u16()), code: None }
    }

    pub fn message(&self) -> &str { &self.message }

    pub fn status(&self) -> Option<u16> { self.status }

    /// Envelope `code`, only present for envelope failures.
    pub fn code(&self) -> Option<&Value> { self.code.as_ref() }

    pub fn is_unauthorized(&self) -> bool { matches!(self.status, Some(401) | Some(403)) }

    pub fn is_not_found(&self) -> bool { self.status == Some(404) }
}

/// One violated form constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

/// Client-side form validation failure. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid form: {}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn single<S: Into<String>>(field: &'static str, message: S) -> Self {
        Self { issues: vec![FieldIssue { field, message: message.into() }] }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }

    pub fn first_message(&self) -> Option<&str> {
        self.issues.first().map(|i| i.message.as_str())
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Durable key-value storage failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage file {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type RequestResult<T> = Result<T, RequestError>;
