//! HTTP response wrapper.

use http::StatusCode;
use serde_json::Value;

/// Longest error message kept from a response body.
const MAX_MESSAGE_LEN: usize = 512;

/// Fully read HTTP response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    body: Vec<u8>,
}

impl Response {
    /// Read a reqwest response to the end.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> reqwest::Result<Self> {
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        Ok(Self { status, body })
    }

    /// Build a response from parts.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Parse the body as JSON. An empty body is `null`.
    pub fn json(&self) -> serde_json::Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
    }

    /// Human-readable error message: the body text, or the reason phrase.
    pub fn message(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if text.is_empty() {
            return self
                .status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string();
        }
        match text.char_indices().nth(MAX_MESSAGE_LEN) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_null() {
        let response = Response::new(StatusCode::OK, "  \n");
        assert_eq!(response.json().unwrap(), Value::Null);
    }

    #[test]
    fn test_message_falls_back_to_reason() {
        let response = Response::new(StatusCode::NOT_FOUND, "");
        assert_eq!(response.message(), "Not Found");

        let response = Response::new(StatusCode::BAD_REQUEST, r#"{"detail":"bad id"}"#);
        assert_eq!(response.message(), r#"{"detail":"bad id"}"#);
    }

    #[test]
    fn test_message_is_truncated() {
        let response = Response::new(StatusCode::BAD_GATEWAY, "x".repeat(2000));
        assert_eq!(response.message().len(), MAX_MESSAGE_LEN + 3);
    }
}
