//! JSON-RPC envelopes and response interpretation.
//!
//! Requests look like
//!
//! ```json
//! {"id": 1, "method": "get", "params": [{"url": "/dvmdb/adom"}], "session": "..."}
//! ```
//!
//! and responses carry one result per parameter block:
//!
//! ```json
//! {"id": 1, "result": [{"status": {"code": 0, "message": "OK"}, "url": "/dvmdb/adom", "data": [...]}]}
//! ```

use serde_json::{Map, Value, json};

use crate::api::Verb;
use crate::error::{Error, Result};

/// Successful, interpreted response.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcOutcome {
    /// The `data` member of the result, `Null` when absent.
    pub data: Value,
    /// Session token, only present on login responses.
    pub session: Option<String>,
}

/// Build a request body.
pub fn request_body(id: u64, verb: Verb, url: &str, payload: &Value, session: Option<&str>) -> Value {
    let mut params = Map::new();
    params.insert("url".to_string(), Value::String(url.to_string()));

    match (verb, payload) {
        (_, Value::Null) => {}
        (Verb::Get, Value::Object(extra)) => {
            for (key, value) in extra {
                params.insert(key.clone(), value.clone());
            }
        }
        (_, data) => {
            params.insert("data".to_string(), data.clone());
        }
    }

    let mut body = json!({
        "id": id,
        "method": verb.as_str(),
        "params": [Value::Object(params)],
    });
    if let (Some(token), Some(object)) = (session, body.as_object_mut()) {
        object.insert("session".to_string(), Value::String(token.to_string()));
    }
    body
}

/// Interpret a decoded response body for the call made on `url`.
pub fn interpret(body: &Value, url: &str) -> Result<RpcOutcome> {
    let Some(result) = first_result(body) else {
        return Err(match extract_error_message(body) {
            Some(message) => Error::api(error_code(body).unwrap_or(-1), url, message),
            None => Error::malformed_response(url, "response has no result"),
        });
    };

    let code = result
        .get("status")
        .and_then(|s| s.get("code"))
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::malformed_response(url, "result has no status code"))?;

    if code != 0 {
        let message = extract_error_message(body).unwrap_or_else(|| "unknown error".to_string());
        return Err(Error::api(code, url, message));
    }

    Ok(RpcOutcome {
        data: result.get("data").cloned().unwrap_or(Value::Null),
        session: body
            .get("session")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Pull a human-readable error message out of a response body.
///
/// Different endpoints and failure modes report the detail in different
/// places; the first non-empty one wins.
pub fn extract_error_message(body: &Value) -> Option<String> {
    let result = first_result(body);
    let candidates = [
        result.and_then(|r| r.get("status")).and_then(|s| s.get("message")),
        body.get("error").and_then(|e| e.get("message")),
        body.get("error").filter(|e| e.is_string()),
        result.and_then(|r| r.get("message")),
        body.get("message"),
        body.get("detail"),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
}

fn first_result(body: &Value) -> Option<&Value> {
    match body.get("result")? {
        Value::Array(results) => results.first(),
        object @ Value::Object(_) => Some(object),
        _ => None,
    }
}

fn error_code(body: &Value) -> Option<i64> {
    body.get("error")
        .and_then(|e| e.get("code"))
        .and_then(Value::as_i64)
}
