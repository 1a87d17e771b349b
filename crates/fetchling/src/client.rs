//! Client construction and the request orchestrator.

use crate::encode::{encode_form, encode_query};
use crate::error::{Error, Result};
use crate::hooks::{
    AfterSend, BeforeSend, ErrorReport, HandleError, ProvideOptions, RequestSnapshot,
};
use crate::multipart::{build_form, Attachments};
use crate::options::{resolve, RequestOptions};
use crate::request::{append_query, join_base, Method, RequestBuilder, RequestSpec};
use crate::response::ResponseEnvelope;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the underlying HTTP transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Transport-wide request timeout.
    pub request_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Maximum idle connections per host.
    pub pool_max_idle_per_host: usize,
    /// Enable gzip decompression.
    pub gzip: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("fetchling/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 10,
            gzip: true,
        }
    }
}

/// Build a configured transport client.
pub fn build_transport(config: &TransportConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .pool_max_idle_per_host(config.pool_max_idle_per_host);

    if config.gzip {
        builder = builder.gzip(true);
    }

    builder.build().map_err(Error::TransportBuild)
}

/// User-facing failure message template, keyed by verb and noun.
pub type MessageTemplate = dyn Fn(Method, &str) -> String + Send + Sync;

/// Default user-facing failure message: `Error <verb> <noun>`.
pub fn default_message(method: Method, noun: &str) -> String {
    format!("Error {} {}", method.error_verb(), noun)
}

struct ClientConfig {
    base_url: Option<String>,
    defaults: RequestOptions,
    provider: Option<Arc<dyn ProvideOptions>>,
    before_send: Option<Arc<dyn BeforeSend>>,
    after_send: Option<Arc<dyn AfterSend>>,
    error_handler: Option<Arc<dyn HandleError>>,
    message_template: Option<Arc<MessageTemplate>>,
}

/// A configured HTTP client.
///
/// Cheap to clone; the configuration is immutable after construction, so
/// in-flight requests share it read-only. Request-time variation flows
/// through the [`ProvideOptions`] seam.
#[derive(Clone)]
pub struct Client {
    transport: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client with default transport settings and no base URL.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Start building a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &reqwest::Client {
        &self.transport
    }

    /// Start a request with an explicit verb.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, method, url)
    }

    /// Start a GET request.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Get, url)
    }

    /// Start a HEAD request.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Head, url)
    }

    /// Start a POST request.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Post, url)
    }

    /// Start a PUT request.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Put, url)
    }

    /// Start a PATCH request.
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Patch, url)
    }

    /// Start a DELETE request.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        self.request(Method::Delete, url)
    }

    pub(crate) async fn execute(&self, spec: RequestSpec) -> Result<ResponseEnvelope> {
        // caller mistakes surface before any transport work and never
        // reach the error handler
        if spec.method.routes_data_to_query() && !spec.data.is_empty() && !spec.url_params.is_empty()
        {
            return Err(Error::AmbiguousParams(spec.method));
        }
        if spec.files.is_some() && spec.method.routes_data_to_query() {
            return Err(Error::config(format!(
                "file attachments require a body-carrying method, got {}",
                spec.method
            )));
        }

        let dynamic = match (&self.config.provider, spec.use_defaults) {
            (Some(provider), true) => {
                Some(provider.provide().await.map_err(Error::DynamicOptions)?)
            }
            _ => None,
        };
        let mut options = resolve(
            &self.config.defaults,
            dynamic.as_ref(),
            &spec.options,
            spec.use_defaults,
        );

        let body = plan_body(&spec, &mut options);
        let url = self.resolve_url(&spec);

        if spec.use_before_hook {
            if let Some(hook) = &self.config.before_send {
                let snapshot = RequestSnapshot {
                    method: spec.method,
                    url: url.clone(),
                    options: options.clone(),
                    data: spec.data.clone(),
                    url_params: spec.url_params.clone(),
                    files: spec.files.clone(),
                    error_msg: spec.error_msg.clone(),
                    error_noun: spec.error_noun.clone(),
                    use_after_hook: spec.use_after_hook,
                    use_defaults: spec.use_defaults,
                };
                hook.before_send(&snapshot).await.map_err(Error::BeforeSend)?;
            }
        }

        tracing::debug!(method = %spec.method, url = %url, "sending request");
        match self.exchange(spec.method, &url, &options, body).await {
            Ok(envelope) => {
                tracing::debug!(
                    method = %spec.method,
                    url = %url,
                    status = envelope.status().as_u16(),
                    "request succeeded"
                );
                if spec.use_after_hook {
                    if let Some(hook) = &self.config.after_send {
                        hook.after_send(&envelope).await.map_err(Error::AfterSend)?;
                    }
                }
                Ok(envelope)
            }
            Err(error) => Err(self.report_failure(error, &spec).await),
        }
    }

    /// Send the request and classify the outcome: a non-2xx status is a
    /// failure carrying the materialized envelope.
    async fn exchange(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
        body: BodyPlan,
    ) -> Result<ResponseEnvelope> {
        let mut request = self.transport.request(method.to_reqwest(), url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        if let Some(token) = &options.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some((user, password)) = &options.basic_auth {
            request = request.basic_auth(user, password.as_ref());
        }
        request = match body {
            BodyPlan::None => request,
            BodyPlan::Json(value) => request.body(value.to_string()),
            BodyPlan::Form(encoded) => request.body(encoded),
            BodyPlan::Multipart { files, fields } => {
                request.multipart(build_form(&files, &fields)?)
            }
        };

        let response = request.send().await.map_err(Error::Transport)?;
        let status = response.status();
        let envelope = ResponseEnvelope::materialize(response).await?;
        if status.is_success() {
            Ok(envelope)
        } else {
            Err(Error::Status {
                status: status.as_u16(),
                response: Box::new(envelope),
            })
        }
    }

    fn resolve_url(&self, spec: &RequestSpec) -> String {
        let url = join_base(self.config.base_url.as_deref(), &spec.url);
        let query = if spec.method.routes_data_to_query() && !spec.data.is_empty() {
            encode_query(&spec.data)
        } else {
            encode_query(&spec.url_params)
        };
        append_query(&url, &query)
    }

    /// Run the configured error handler when the call opted in, then hand
    /// the error back for the caller to observe.
    async fn report_failure(&self, error: Error, spec: &RequestSpec) -> Error {
        tracing::warn!(method = %spec.method, url = %spec.url, error = %error, "request failed");

        let opted_in = spec.error_msg.is_some() || spec.error_noun.is_some();
        if opted_in {
            if let Some(handler) = &self.config.error_handler {
                let user_message = match &spec.error_msg {
                    Some(msg) => msg.clone(),
                    None => {
                        let noun = spec.error_noun.as_deref().unwrap_or_default();
                        self.user_message(spec.method, noun)
                    }
                };
                let report = ErrorReport {
                    error: &error,
                    response: error.response(),
                    user_message: &user_message,
                };
                handler.handle(report).await;
            }
        }
        error
    }

    fn user_message(&self, method: Method, noun: &str) -> String {
        match &self.config.message_template {
            Some(template) => (**template)(method, noun),
            None => default_message(method, noun),
        }
    }
}

/// How `data` reaches the wire.
#[derive(Debug)]
enum BodyPlan {
    None,
    Json(Value),
    Form(String),
    Multipart {
        files: Attachments,
        fields: Map<String, Value>,
    },
}

/// Decide how `data` reaches the wire and derive the content-type default.
///
/// Only the `Content-Type` leaf of the merged options is touched.
fn plan_body(spec: &RequestSpec, options: &mut RequestOptions) -> BodyPlan {
    if let Some(files) = &spec.files {
        // the transport must set the multipart boundary itself
        options.remove_header("content-type");
        return BodyPlan::Multipart {
            files: files.clone(),
            fields: spec.data.clone(),
        };
    }
    if spec.method.routes_data_to_query() || spec.data.is_empty() {
        return BodyPlan::None;
    }

    let form_declared = options
        .get_header("content-type")
        .is_some_and(|v| v.to_ascii_lowercase().contains("application/x-www-form-urlencoded"));
    if form_declared {
        BodyPlan::Form(encode_form(&spec.data))
    } else {
        options.set_header("Content-Type", "application/json");
        BodyPlan::Json(Value::Object(spec.data.clone()))
    }
}

/// Builder for [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    transport: Option<reqwest::Client>,
    transport_config: TransportConfig,
    base_url: Option<String>,
    defaults: RequestOptions,
    provider: Option<Arc<dyn ProvideOptions>>,
    before_send: Option<Arc<dyn BeforeSend>>,
    after_send: Option<Arc<dyn AfterSend>>,
    error_handler: Option<Arc<dyn HandleError>>,
    message_template: Option<Arc<MessageTemplate>>,
}

impl ClientBuilder {
    /// Create a builder with default transport settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL prefixed onto relative request URLs.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Static default transport options, lowest merge precedence.
    pub fn default_options(mut self, options: RequestOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Add one static default header.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults = self.defaults.header(name, value);
        self
    }

    /// Dynamic options provider, invoked fresh for every request that uses
    /// defaults; merges over the static defaults and under per-call
    /// overrides.
    pub fn options_provider(mut self, provider: impl ProvideOptions + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Hook observing the resolved request before it is sent.
    pub fn before_send(mut self, hook: impl BeforeSend + 'static) -> Self {
        self.before_send = Some(Arc::new(hook));
        self
    }

    /// Hook observing the response envelope after a successful exchange.
    pub fn after_send(mut self, hook: impl AfterSend + 'static) -> Self {
        self.after_send = Some(Arc::new(hook));
        self
    }

    /// Handler receiving request failures for calls that opted in with an
    /// error message or noun.
    pub fn error_handler(mut self, handler: impl HandleError + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Override the `Error <verb> <noun>` message template.
    pub fn message_template(
        mut self,
        template: impl Fn(Method, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.message_template = Some(Arc::new(template));
        self
    }

    /// Use an externally constructed transport instead of building one.
    pub fn transport(mut self, transport: reqwest::Client) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Tune the transport built by this builder. Ignored when an external
    /// transport was supplied.
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => build_transport(&self.transport_config)?,
        };
        Ok(Client {
            transport,
            config: Arc::new(ClientConfig {
                base_url: self.base_url,
                defaults: self.defaults,
                provider: self.provider,
                before_send: self.before_send,
                after_send: self.after_send,
                error_handler: self.error_handler,
                message_template: self.message_template,
            }),
        })
    }
}
