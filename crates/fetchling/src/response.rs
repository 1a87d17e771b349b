//! Materialized responses with eagerly derived body forms.

use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A materialized HTTP response.
///
/// The body is read exactly once and stored, so every accessor is
/// idempotent. When the content type declares JSON or plain text the parsed
/// form is derived eagerly and carried alongside the raw bytes.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    status: StatusCode,
    headers: HeaderMap,
    url: String,
    body: Bytes,
    json: Option<Value>,
    text: Option<String>,
}

impl ResponseEnvelope {
    /// Read the transport response and derive the typed body forms.
    pub(crate) async fn materialize(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let body = response.bytes().await.map_err(Error::Transport)?;

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let (json, text) = derive_body(content_type.as_deref(), &body);

        Ok(Self {
            status,
            headers,
            url,
            body,
            json,
            text,
        })
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL of the exchange.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw body bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Declared content type, parameters included.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body parsed as JSON, when the content type declared JSON and the
    /// body parsed cleanly.
    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    /// Body as text, when the content type declared plain text.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Decode the body as `T`, regardless of the declared content type.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|source| Error::Decode {
            status: self.status.as_u16(),
            body: String::from_utf8_lossy(&self.body).into_owned(),
            source,
        })
    }
}

/// Derive the typed body forms from the declared content type.
///
/// Derivation is lenient: a body that does not parse leaves the derived
/// field unset instead of failing, so an envelope can always be attached
/// to the error path. Strict decoding goes through
/// [`ResponseEnvelope::json_as`].
fn derive_body(content_type: Option<&str>, body: &Bytes) -> (Option<Value>, Option<String>) {
    let Some(content_type) = content_type else {
        return (None, None);
    };
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if media_type == "application/json" || media_type.ends_with("+json") {
        (serde_json::from_slice(body).ok(), None)
    } else if media_type == "text/plain" {
        (None, Some(String::from_utf8_lossy(body).into_owned()))
    } else {
        (None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_content_type_derives_json() {
        let body = Bytes::from_static(br#"{"id": 7}"#);
        let (parsed, text) = derive_body(Some("application/json"), &body);
        assert_eq!(parsed, Some(json!({"id": 7})));
        assert!(text.is_none());
    }

    #[test]
    fn test_json_suffix_content_type_derives_json() {
        let body = Bytes::from_static(br#"{"ok": true}"#);
        let (parsed, _) = derive_body(Some("application/problem+json"), &body);
        assert_eq!(parsed, Some(json!({"ok": true})));
    }

    #[test]
    fn test_content_type_parameters_are_ignored() {
        let body = Bytes::from_static(b"hello");
        let (parsed, text) = derive_body(Some("text/plain; charset=utf-8"), &body);
        assert!(parsed.is_none());
        assert_eq!(text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_other_content_types_derive_nothing() {
        let body = Bytes::from_static(b"<html></html>");
        let (parsed, text) = derive_body(Some("text/html"), &body);
        assert!(parsed.is_none());
        assert!(text.is_none());
    }

    #[test]
    fn test_missing_content_type_derives_nothing() {
        let body = Bytes::from_static(b"anything");
        assert_eq!(derive_body(None, &body), (None, None));
    }

    #[test]
    fn test_malformed_json_is_left_unparsed() {
        let body = Bytes::from_static(b"not json");
        let (parsed, _) = derive_body(Some("application/json"), &body);
        assert!(parsed.is_none());
    }
}
