// Result envelope
//
// Every pipeline call that reaches the server and gets an ordinary answer
// produces an `SmcResult`, success or not. Validation failures are data.

use serde_json::Value;

use crate::types::{Etag, Href};

/// Decoded response body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Content {
    /// JSON document.
    Json(Value),
    /// Non-JSON UTF-8 text.
    Text(String),
    /// No body.
    #[default]
    Empty,
}

impl Content {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Outcome of a single request through the pipeline.
///
/// Consumed once and discarded; there is no identity beyond its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SmcResult {
    /// `true` for any 2xx status.
    pub success: bool,
    /// HTTP status code.
    pub status: u16,
    /// Href of the affected resource (the new one, for `create`).
    pub href: Option<Href>,
    /// Concurrency token from the `ETag` header, if the server sent one.
    pub etag: Option<Etag>,
    /// Parsed or raw body.
    pub content: Content,
    /// Human-readable diagnostic for failures.
    pub message: Option<String>,
}

impl SmcResult {
    pub fn json(&self) -> Option<&Value> {
        self.content.as_json()
    }

    /// The JSON body as an object map, if it is one.
    pub fn object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.json().and_then(Value::as_object)
    }

    pub fn into_json(self) -> Option<Value> {
        match self.content {
            Content::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// Flatten a server error body into one line of diagnostic text.
///
/// The API answers failures with `{"message": "...", "details": ["..."]}`;
/// anything else is shown raw.
pub(crate) fn diagnostic(content: &Content, status: u16) -> String {
    match content {
        Content::Json(v) => {
            let message = v.get("message").and_then(Value::as_str);
            let details: Vec<&str> = v
                .get("details")
                .and_then(Value::as_array)
                .map(|d| d.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            match (message, details.is_empty()) {
                (Some(m), true) => m.to_owned(),
                (Some(m), false) => format!("{m}: {}", details.join("; ")),
                (None, false) => details.join("; "),
                (None, true) => v.to_string(),
            }
        }
        Content::Text(t) if !t.trim().is_empty() => t.trim().to_owned(),
        _ => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn diagnostic_joins_message_and_details() {
        let body = Content::Json(json!({
            "message": "Element already exists",
            "details": ["name 'net-10' is in use"]
        }));
        assert_eq!(
            diagnostic(&body, 400),
            "Element already exists: name 'net-10' is in use"
        );
    }

    #[test]
    fn diagnostic_falls_back_to_status() {
        assert_eq!(diagnostic(&Content::Empty, 500), "HTTP 500");
        assert_eq!(
            diagnostic(&Content::Text("  boom \n".into()), 500),
            "boom"
        );
    }
}
