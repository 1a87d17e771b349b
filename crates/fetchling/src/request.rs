//! HTTP verbs, the per-call request builder, and URL helpers.

use crate::client::Client;
use crate::multipart::{Attachments, FileGroup, FilePart};
use crate::options::RequestOptions;
use crate::response::ResponseEnvelope;
use crate::Result;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// The six supported HTTP verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Verbs that route `data` to the URL query string instead of the body.
    pub fn routes_data_to_query(self) -> bool {
        matches!(self, Method::Get | Method::Head | Method::Delete)
    }

    /// Upper-case verb name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Verb used by the default error-message template.
    pub(crate) fn error_verb(self) -> &'static str {
        match self {
            Method::Get | Method::Head => "fetching",
            Method::Post => "adding",
            Method::Put | Method::Patch => "updating",
            Method::Delete => "deleting",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `url` is an absolute reference: a leading scheme token
/// (`[A-Za-z][A-Za-z0-9+.-]*:`) that is not a Windows drive path
/// (`[A-Za-z]:\`).
pub(crate) fn is_absolute_url(url: &str) -> bool {
    let Some(colon) = url.find(':') else {
        return false;
    };
    let scheme = &url[..colon];
    let mut chars = scheme.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-')) {
        return false;
    }
    // a lone drive letter followed by a backslash is a path, not a scheme
    if scheme.len() == 1 && url[colon + 1..].starts_with('\\') {
        return false;
    }
    true
}

/// Prefix a relative reference with the configured base URL.
pub(crate) fn join_base(base: Option<&str>, url: &str) -> String {
    match base {
        Some(base) if !is_absolute_url(url) => {
            format!("{}{}", base.trim_end_matches('/'), url)
        }
        _ => url.to_string(),
    }
}

/// Append an already-encoded `?query` to a URL, joining with `&` when the
/// URL carries a query string of its own.
pub(crate) fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    if url.contains('?') {
        format!("{}&{}", url, query.trim_start_matches('?'))
    } else {
        format!("{url}{query}")
    }
}

/// Everything describing one request. Lives for one call.
#[derive(Debug, Clone)]
pub(crate) struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub data: Map<String, Value>,
    pub url_params: Map<String, Value>,
    pub files: Option<Attachments>,
    pub error_msg: Option<String>,
    pub error_noun: Option<String>,
    pub use_before_hook: bool,
    pub use_after_hook: bool,
    pub use_defaults: bool,
    pub options: RequestOptions,
}

impl RequestSpec {
    pub(crate) fn new(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            data: Map::new(),
            url_params: Map::new(),
            files: None,
            error_msg: None,
            error_noun: None,
            use_before_hook: true,
            use_after_hook: true,
            use_defaults: true,
            options: RequestOptions::default(),
        }
    }
}

/// Builder for a single request, created by the [`Client`] verb methods.
#[must_use = "a request builder does nothing until `send` is awaited"]
pub struct RequestBuilder<'a> {
    client: &'a Client,
    spec: RequestSpec,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a Client, method: Method, url: impl Into<String>) -> Self {
        Self {
            client,
            spec: RequestSpec::new(method, url.into()),
        }
    }

    /// Add one `data` entry. `data` is routed to the query string or the
    /// request body depending on the verb.
    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.spec.data.insert(key.into(), value.into());
        self
    }

    /// Replace the whole `data` mapping.
    pub fn data_map(mut self, data: Map<String, Value>) -> Self {
        self.spec.data = data;
        self
    }

    /// Add one URL parameter. URL parameters always become part of the
    /// query string, regardless of the verb.
    pub fn url_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.spec.url_params.insert(key.into(), value.into());
        self
    }

    /// Replace the whole URL-parameter mapping.
    pub fn url_params(mut self, params: Map<String, Value>) -> Self {
        self.spec.url_params = params;
        self
    }

    /// Attach a single file, uploaded under the field name `file`.
    pub fn file(mut self, file: FilePart) -> Self {
        self.spec.files = Some(Attachments::Single(file));
        self
    }

    /// Attach an ordered list of files, each uploaded under `files[]`.
    pub fn files(mut self, files: Vec<FilePart>) -> Self {
        self.spec.files = Some(Attachments::List(files));
        self
    }

    /// Attach one file under a named category.
    pub fn named_file(self, category: impl Into<String>, file: FilePart) -> Self {
        self.push_group(category.into(), FileGroup::One(file))
    }

    /// Attach a file sequence under a named category (uploaded as
    /// `<category>[]`).
    pub fn named_files(self, category: impl Into<String>, files: Vec<FilePart>) -> Self {
        self.push_group(category.into(), FileGroup::Many(files))
    }

    fn push_group(mut self, category: String, group: FileGroup) -> Self {
        match &mut self.spec.files {
            Some(Attachments::Named(categories)) => categories.push((category, group)),
            _ => self.spec.files = Some(Attachments::Named(vec![(category, group)])),
        }
        self
    }

    /// Explicit user-facing message handed to the error handler on failure.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.spec.error_msg = Some(msg.into());
        self
    }

    /// Noun substituted into the error-message template on failure.
    /// Supplying a noun (or an explicit message) opts this call into the
    /// configured error handler.
    pub fn error_noun(mut self, noun: impl Into<String>) -> Self {
        self.spec.error_noun = Some(noun.into());
        self
    }

    /// Toggle the before-send hook for this call. Defaults to on.
    pub fn before_hook(mut self, enabled: bool) -> Self {
        self.spec.use_before_hook = enabled;
        self
    }

    /// Toggle the after-send hook for this call. Defaults to on.
    pub fn after_hook(mut self, enabled: bool) -> Self {
        self.spec.use_after_hook = enabled;
        self
    }

    /// Toggle static and dynamic default options for this call. Defaults
    /// to on; when off, only the per-call options reach the transport.
    pub fn defaults(mut self, enabled: bool) -> Self {
        self.spec.use_defaults = enabled;
        self
    }

    /// Replace the per-call transport options wholesale.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.spec.options = options;
        self
    }

    /// Add one per-call header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.options = self.spec.options.header(name, value);
        self
    }

    /// Set a per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.spec.options = self.spec.options.timeout(timeout);
        self
    }

    /// Set a per-call bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.spec.options = self.spec.options.bearer_token(token);
        self
    }

    /// Set per-call basic-auth credentials.
    pub fn basic_auth(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.spec.options = self.spec.options.basic_auth(user, password);
        self
    }

    /// Execute the request.
    pub async fn send(self) -> Result<ResponseEnvelope> {
        self.client.execute(self.spec).await
    }
}
