//! Lifecycle seams around a single request.
//!
//! Every seam is an async trait awaited unconditionally; a synchronous
//! implementation is simply an async fn that never awaits.

use crate::error::{BoxError, Error};
use crate::multipart::Attachments;
use crate::options::RequestOptions;
use crate::request::Method;
use crate::response::ResponseEnvelope;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Computes request options at call time, e.g. from an externally stored
/// credential.
///
/// Invoked fresh for every request that uses defaults; the result merges
/// over the static defaults and under the per-call overrides. This is the
/// only seam whose output participates in option merging.
#[async_trait]
pub trait ProvideOptions: Send + Sync {
    async fn provide(&self) -> Result<RequestOptions, BoxError>;
}

/// Observes the fully resolved request before it is sent.
///
/// The hook is observational only: its outcome never feeds back into the
/// transport options. Returning an error aborts the call before the
/// transport is invoked.
#[async_trait]
pub trait BeforeSend: Send + Sync {
    async fn before_send(&self, request: &RequestSnapshot) -> Result<(), BoxError>;
}

/// Observes the response envelope after a successful exchange.
#[async_trait]
pub trait AfterSend: Send + Sync {
    async fn after_send(&self, response: &ResponseEnvelope) -> Result<(), BoxError>;
}

/// Receives request failures together with the computed user-facing
/// message.
///
/// Runs only for transport and status failures, and only when the call
/// supplied an error message or noun; the error is re-raised to the caller
/// afterwards either way.
#[async_trait]
pub trait HandleError: Send + Sync {
    async fn handle(&self, report: ErrorReport<'_>);
}

/// The resolved request handed to [`BeforeSend`].
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: Method,
    /// Final absolute URL, query string included.
    pub url: String,
    /// Fully merged transport options.
    pub options: RequestOptions,
    pub data: Map<String, Value>,
    pub url_params: Map<String, Value>,
    pub files: Option<Attachments>,
    pub error_msg: Option<String>,
    pub error_noun: Option<String>,
    pub use_after_hook: bool,
    pub use_defaults: bool,
}

/// A request failure as seen by [`HandleError`].
#[derive(Debug)]
pub struct ErrorReport<'a> {
    pub error: &'a Error,
    /// The response envelope, when the failure carries one.
    pub response: Option<&'a ResponseEnvelope>,
    /// The explicit per-call message, or the templated `Error <verb> <noun>`.
    pub user_message: &'a str,
}
