//! Credential strategies: where access tokens come from.
//!
//! The cache and transport only see [`CredentialProvider`]. [`CredentialKind`] groups the two
//! strategies the client can pick between, and [`signals::select_credential`] decides which
//! one applies from observable environment signals.

use std::future::Future;

use http::StatusCode;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

use crate::cache::token::AccessToken;
use crate::config::settings::IdentityConfig;
use crate::error::Result;

pub mod ambient;
pub mod client_secret;
pub mod managed_identity;
pub mod signals;
pub mod token_response;

use ambient::AmbientCredential;
use managed_identity::ManagedIdentityCredential;
use signals::{select_credential, CredentialStrategy, EnvironmentSignals};

/// Failure reported by an identity backend. Never retried by the provider itself.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("identity endpoint unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("identity endpoint rejected the request with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Capability: get a token for a scope.
pub trait CredentialProvider: Send + Sync {
    fn get_token(
        &self,
        scope: &str,
    ) -> impl Future<Output = std::result::Result<AccessToken, CredentialError>> + Send;

    /// Short label for logs and metrics.
    fn kind(&self) -> &'static str {
        "custom"
    }
}

#[derive(Debug, Clone)]
pub enum CredentialKind {
    /// user-assigned managed identity, selected by client id
    Explicit(ManagedIdentityCredential),
    /// whatever identity the hosting environment provides
    Ambient(AmbientCredential),
}

impl CredentialKind {
    /// Pick and build the credential for this process.
    pub fn from_config(identity: &IdentityConfig, signals: &EnvironmentSignals, http: Client) -> Result<Self> {
        let strategy = select_credential(identity.mode, identity.client_id.as_deref(), signals)?;
        info!(strategy = ?strategy, in_cluster = signals.in_cluster, "credential strategy selected");

        Ok(match strategy {
            CredentialStrategy::Explicit { client_id } => CredentialKind::Explicit(
                ManagedIdentityCredential::from_signals(Some(client_id), identity, signals, http),
            ),
            CredentialStrategy::Ambient => {
                CredentialKind::Ambient(AmbientCredential::from_signals(identity, signals, http))
            }
        })
    }
}

impl CredentialProvider for CredentialKind {
    async fn get_token(&self, scope: &str) -> std::result::Result<AccessToken, CredentialError> {
        match self {
            CredentialKind::Explicit(c) => c.get_token(scope).await,
            CredentialKind::Ambient(c) => c.get_token(scope).await,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            CredentialKind::Explicit(c) => c.kind(),
            CredentialKind::Ambient(c) => c.kind(),
        }
    }
}
