//! Response decoding.
//!
//! Endpoints answer either with the payload itself or with the tagged envelope
//! `{ code, success, model, errorMessage? }`. Which one is decided per body by
//! the sentinel keys, so callers never need to know what a given endpoint
//! speaks.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{RequestError, RequestResult};

const GENERIC_FAILURE: &str = "Request failed";

/// A successful response body, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiEnvelope {
    Wrapped {
        code: Value,
        success: bool,
        model: Value,
        error_message: Option<String>,
    },
    Raw(Value),
}

impl ApiEnvelope {
    pub fn classify(body: Value) -> Self {
        match body {
            Value::Object(map) if is_envelope(&map) => {
                let mut map = map;
                let code = map.remove("code").unwrap_or(Value::Null);
                let success = map.remove("success").map(|v| truthy(&v)).unwrap_or(false);
                let model = map.remove("model").unwrap_or(Value::Null);
                let error_message = map
                    .remove("errorMessage")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .filter(|s| !s.is_empty());
                ApiEnvelope::Wrapped { code, success, model, error_message }
            }
            other => ApiEnvelope::Raw(other),
        }
    }

    pub fn is_wrapped(&self) -> bool { matches!(self, ApiEnvelope::Wrapped { .. }) }

    /// The payload, or the envelope's failure. `status` is the HTTP status of
    /// the carrying response.
    pub fn into_model(self, status: u16) -> RequestResult<Value> {
        match self {
            ApiEnvelope::Raw(v) => Ok(v),
            ApiEnvelope::Wrapped { success: true, model, .. } => Ok(model),
            ApiEnvelope::Wrapped { success: false, code, error_message, .. } => {
                let msg = error_message.unwrap_or_else(|| GENERIC_FAILURE.to_string());
                Err(RequestError::envelope(msg, status, code))
            }
        }
    }
}

// All three sentinel keys mark an envelope. A failure report may leave out
// `model`; `code` plus a falsy `success` is enough for that case.
fn is_envelope(map: &Map<String, Value>) -> bool {
    if !(map.contains_key("code") && map.contains_key("success")) {
        return false;
    }
    map.contains_key("model") || !map.get("success").map(truthy).unwrap_or(false)
}

// Loose boolean reading of `success`, matching what a JSON-first client would accept.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Error for a non-success status. Uses the body's `message` (or
/// `errorMessage`) when the body is JSON; otherwise a generic message that
/// names the status.
pub fn failure_from_body(status: u16, body: &[u8]) -> RequestError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    match parsed {
        Some(v) => {
            let msg = ["message", "errorMessage", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).filter(|s| !s.is_empty()))
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status));
            RequestError::http(msg, status)
        }
        None => RequestError::http(format!("{} (HTTP {})", GENERIC_FAILURE, status), status),
    }
}

/// Decode the JSON body of a successful response into a raw value, unwrapping
/// the envelope when there is one. An empty body decodes as `null`.
pub fn unwrap_success(status: u16, body: &[u8]) -> RequestResult<Value> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Null);
    }
    let json: Value = serde_json::from_slice(body)
        .map_err(|e| RequestError::http(format!("invalid JSON in response: {}", e), status))?;
    ApiEnvelope::classify(json).into_model(status)
}

/// Full response decoding: status check, envelope handling, typed conversion.
pub fn decode_response<T: DeserializeOwned>(status: u16, body: &[u8]) -> RequestResult<T> {
    if !(200..300).contains(&status) {
        return Err(failure_from_body(status, body));
    }
    let model = unwrap_success(status, body)?;
    serde_json::from_value(model)
        .map_err(|e| RequestError::http(format!("unexpected response shape: {}", e), status))
}
