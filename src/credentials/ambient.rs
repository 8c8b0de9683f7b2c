use reqwest::Client;

use crate::cache::token::AccessToken;
use crate::config::settings::IdentityConfig;
use crate::credentials::client_secret::ClientSecretCredential;
use crate::credentials::managed_identity::ManagedIdentityCredential;
use crate::credentials::signals::EnvironmentSignals;
use crate::credentials::{CredentialError, CredentialProvider};
use crate::utils::constants::AUTHORITY_HOST;

/// The identity the hosting environment provides, without an explicit identifier.
///
/// The source is fixed at construction: a fully configured service principal in the
/// environment, otherwise the system-assigned managed identity. A failing source is reported
/// as is, it never falls through to the next one.
#[derive(Debug, Clone)]
pub enum AmbientCredential {
    ServicePrincipal(ClientSecretCredential),
    SystemManagedIdentity(ManagedIdentityCredential),
}

impl AmbientCredential {
    pub fn from_signals(identity: &IdentityConfig, signals: &EnvironmentSignals, client: Client) -> Self {
        match (&signals.tenant_id, &signals.client_id, &signals.client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                AmbientCredential::ServicePrincipal(ClientSecretCredential::new(
                    tenant_id.to_owned(),
                    client_id.to_owned(),
                    client_secret.to_owned(),
                    identity
                        .authority_host
                        .clone()
                        .unwrap_or_else(|| AUTHORITY_HOST.to_owned()),
                    client,
                ))
            }
            _ => AmbientCredential::SystemManagedIdentity(ManagedIdentityCredential::from_signals(
                None, identity, signals, client,
            )),
        }
    }
}

impl CredentialProvider for AmbientCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        match self {
            AmbientCredential::ServicePrincipal(c) => c.get_token(scope).await,
            AmbientCredential::SystemManagedIdentity(c) => c.get_token(scope).await,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AmbientCredential::ServicePrincipal(c) => c.kind(),
            AmbientCredential::SystemManagedIdentity(c) => c.kind(),
        }
    }
}
