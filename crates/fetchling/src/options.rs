//! Transport options and merge precedence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Transport options attached to a request.
///
/// Options come from up to three sources per request: the client's static
/// defaults, the dynamic options provider, and the per-call overrides.
/// Merging works per leaf: each header name is one leaf and header maps
/// merge key-by-key, while every other field is replaced wholesale when a
/// higher-precedence source sets it. See [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Header name/value pairs. Names compare case-insensitively.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout, overriding the transport-wide one.
    #[serde(
        default,
        with = "duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
    /// Bearer token for the `Authorization` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    /// Username and optional password for basic auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<(String, Option<String>)>,
}

impl RequestOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(&name.into(), &value.into());
        self
    }

    /// Add multiple headers.
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        for (name, value) in headers {
            self.set_header(&name, &value);
        }
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set basic-auth credentials.
    pub fn basic_auth(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some((user.into(), password));
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Remove a header by case-insensitive name.
    pub(crate) fn remove_header(&mut self, name: &str) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
    }

    /// Insert a header, replacing any existing header with the same
    /// case-insensitive name.
    pub(crate) fn set_header(&mut self, name: &str, value: &str) {
        self.remove_header(name);
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Overlay `overlay` onto these options, the overlay winning per leaf.
    pub fn merged_with(&self, overlay: &Self) -> Self {
        let mut merged = self.clone();
        for (name, value) in &overlay.headers {
            merged.set_header(name, value);
        }
        if overlay.timeout.is_some() {
            merged.timeout = overlay.timeout;
        }
        if overlay.bearer_token.is_some() {
            merged.bearer_token = overlay.bearer_token.clone();
        }
        if overlay.basic_auth.is_some() {
            merged.basic_auth = overlay.basic_auth.clone();
        }
        merged
    }
}

/// Resolve the effective options for one request.
///
/// Static defaults first, then the dynamic provider result, then the
/// per-call overrides, later sources winning on conflicting leaves. With
/// `use_defaults == false` the per-call options are used exactly as given.
pub(crate) fn resolve(
    defaults: &RequestOptions,
    dynamic: Option<&RequestOptions>,
    per_call: &RequestOptions,
    use_defaults: bool,
) -> RequestOptions {
    if !use_defaults {
        return per_call.clone();
    }
    let base = match dynamic {
        Some(dynamic) => defaults.merged_with(dynamic),
        None => defaults.clone(),
    };
    base.merged_with(per_call)
}

mod duration_secs {
    //! `Option<Duration>` as whole seconds.

    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => d.as_secs().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_only_leaf_survives() {
        let defaults = RequestOptions::new().header("X-Base", "1");
        let merged = resolve(&defaults, None, &RequestOptions::new(), true);
        assert_eq!(merged.get_header("x-base"), Some("1"));
    }

    #[test]
    fn test_per_call_beats_static() {
        let defaults = RequestOptions::new()
            .header("X-Base", "1")
            .timeout(Duration::from_secs(30));
        let per_call = RequestOptions::new()
            .header("X-Base", "2")
            .timeout(Duration::from_secs(5));
        let merged = resolve(&defaults, None, &per_call, true);
        assert_eq!(merged.get_header("X-Base"), Some("2"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_dynamic_beats_static_and_loses_to_per_call() {
        let defaults = RequestOptions::new()
            .header("X-A", "static")
            .header("X-B", "static")
            .header("X-C", "static");
        let dynamic = RequestOptions::new()
            .header("X-B", "dynamic")
            .header("X-C", "dynamic");
        let per_call = RequestOptions::new().header("X-C", "call");

        let merged = resolve(&defaults, Some(&dynamic), &per_call, true);
        assert_eq!(merged.get_header("X-A"), Some("static"));
        assert_eq!(merged.get_header("X-B"), Some("dynamic"));
        assert_eq!(merged.get_header("X-C"), Some("call"));
    }

    #[test]
    fn test_header_names_merge_case_insensitively() {
        let defaults = RequestOptions::new().header("Content-Type", "text/xml");
        let per_call = RequestOptions::new().header("content-type", "application/json");
        let merged = resolve(&defaults, None, &per_call, true);

        assert_eq!(merged.headers.len(), 1);
        assert_eq!(merged.get_header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_untouched_leaves_survive_overlay() {
        let defaults = RequestOptions::new()
            .bearer_token("secret")
            .timeout(Duration::from_secs(10));
        let per_call = RequestOptions::new().header("X-Only", "call");
        let merged = resolve(&defaults, None, &per_call, true);

        assert_eq!(merged.bearer_token.as_deref(), Some("secret"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(10)));
        assert_eq!(merged.get_header("X-Only"), Some("call"));
    }

    #[test]
    fn test_use_defaults_false_bypasses_everything() {
        let defaults = RequestOptions::new().header("X-Base", "1");
        let dynamic = RequestOptions::new().header("X-Dyn", "1");
        let per_call = RequestOptions::new().header("X-Call", "1");

        let merged = resolve(&defaults, Some(&dynamic), &per_call, false);
        assert_eq!(merged, per_call);
    }

    #[test]
    fn test_basic_auth_replaced_wholesale() {
        let defaults = RequestOptions::new().basic_auth("root", Some("old".to_string()));
        let per_call = RequestOptions::new().basic_auth("admin", None);
        let merged = resolve(&defaults, None, &per_call, true);

        assert_eq!(merged.basic_auth, Some(("admin".to_string(), None)));
    }

    #[test]
    fn test_serde_round_trip() {
        let options = RequestOptions::new()
            .header("X-Api", "k")
            .timeout(Duration::from_secs(7));
        let json = serde_json::to_string(&options).unwrap();
        let back: RequestOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
