//! # Omnia Timeseries client
//!
//! Credentialed request engine for the Omnia Timeseries API: resolves the token scope for an
//! environment, picks an Azure identity, caches tokens per scope, and dispatches HTTP calls
//! with bounded retries and a one-shot token refresh on 401/403.
//!
//! Modules:
//! - `resolver` — environments and scope resolution
//! - `credentials` — identity backends and credential selection
//! - `cache` — access tokens and the per-scope token cache
//! - `transport` — the HTTP boundary and retrying transport
//! - `client` — request dispatch and decoding
//! - `api` — Omnia Timeseries operations
//! - `config` — YAML client configuration

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod resilience;
pub mod resolver;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::api::TimeseriesApi;
pub use crate::client::{Client, ClientOptions, ContentType, QueryParams, ResponseBody};
pub use crate::config::ClientConfig;
pub use crate::error::{Error, Result};
pub use crate::resolver::{Environment, TimeseriesVersion};
