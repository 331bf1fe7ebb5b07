//! StatusCake API client library.
//!
//! Resolves credentials from layered INI configuration and environment variables,
//! dispatches authenticated requests to the StatusCake REST API and decodes the JSON
//! responses into a success value or a typed [`Error`].

pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod transport;

pub use client::{Client, ClientBuilder, BASE_URL};
pub use config::{default_config_paths, ConfigurationManager};
pub use error::{ApiError, ConfigError, Error, HttpError, InvalidResponse, NetworkError};
pub use helpers::{ParamValue, Params};
pub use reqwest::Method;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Timeout, Transport};

/// Library version for User-Agent and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
