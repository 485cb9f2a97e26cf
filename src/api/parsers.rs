/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::api::RequestError;
use serde_json::{Map, Value};

pub(crate) const PARSE_ERROR_MESSAGE: &str = "Unable to parse response";

/// A body that arrived fine over the wire but could not be turned into a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentFailure {
    pub error: RequestError,
    pub message: String,
}

impl ContentFailure {
    pub fn parse() -> Self {
        Self {
            error: RequestError::ParseError,
            message: PARSE_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn content(message: impl Into<String>) -> Self {
        Self {
            error: RequestError::UnknownContentError,
            message: message.into(),
        }
    }
}

/// Turns a raw body into the request result
pub(crate) type ResponseParser = fn(&[u8]) -> Result<Value, ContentFailure>;

/// Data API responses: JSON, where a top level `error` member means failure.
pub(crate) fn parse_api_response(body: &[u8]) -> Result<Value, ContentFailure> {
    let value: Value = serde_json::from_slice(body).map_err(|err| {
        log::debug!("Api malformed response: {err}");
        ContentFailure::parse()
    })?;
    match embedded_error(&value) {
        Some(message) => Err(ContentFailure::content(message)),
        None => Ok(value),
    }
}

// Some endpoints (token revocation) answer with an empty or non-JSON body on
// success. Anything unparseable becomes `null`.
pub(crate) fn parse_lenient_response(body: &[u8]) -> Result<Value, ContentFailure> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => match embedded_error(&value) {
            Some(message) => Err(ContentFailure::content(message)),
            None => Ok(value),
        },
        Err(_) => Ok(Value::Null),
    }
}

/// Message of an error object carried inside an otherwise valid payload.
///
/// Handles both the Data API shape (`{"error": {"message": ..}}`) and the
/// OAuth2 shape (`{"error": "invalid_grant", "error_description": ..}`).
pub(crate) fn embedded_error(payload: &Value) -> Option<String> {
    let error = payload.get("error").filter(|e| !e.is_null())?;
    let message = match error {
        Value::Object(obj) => obj
            .get("message")
            .or_else(|| obj.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(code) => Some(
            payload
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or(code)
                .to_string(),
        ),
        _ => None,
    };
    Some(message.unwrap_or_else(|| error.to_string()))
}

/// String form of an identity field, whether the server sent it as text or a number.
pub(crate) fn identity_of(item: &Map<String, Value>, field: &str) -> Option<String> {
    match item.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
