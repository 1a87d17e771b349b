//! Thin convenience layer over reqwest: option merging, lifecycle hooks,
//! and a uniform error-reporting pipeline across six HTTP verbs.

pub mod client;
pub mod encode;
pub mod error;
pub mod hooks;
pub mod multipart;
pub mod options;
pub mod request;
pub mod response;

pub use client::{build_transport, Client, ClientBuilder, TransportConfig};
pub use error::{BoxError, Error, Result};
pub use hooks::{
    AfterSend, BeforeSend, ErrorReport, HandleError, ProvideOptions, RequestSnapshot,
};
pub use multipart::{Attachments, FileGroup, FilePart};
pub use options::RequestOptions;
pub use request::{Method, RequestBuilder};
pub use response::ResponseEnvelope;
