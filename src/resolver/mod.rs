//! Environments and the resource-id → scope/endpoint resolution rules.

pub mod environment;
pub mod scope;

pub use environment::{Environment, EnvironmentPreset, TimeseriesVersion};
pub use scope::{resolve, resolve_identity, ResolvedIdentity};
