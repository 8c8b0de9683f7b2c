use std::fmt;

use reqwest::Client;
use tracing::{debug, warn};

use crate::cache::token::AccessToken;
use crate::config::settings::IdentityConfig;
use crate::credentials::signals::EnvironmentSignals;
use crate::credentials::token_response::{error_description, parse_managed_identity};
use crate::credentials::{CredentialError, CredentialProvider};
use crate::utils::constants::{APP_SERVICE_API_VERSION, DEFAULT_SCOPE_SUFFIX, IMDS_API_VERSION, IMDS_ENDPOINT};

/// Where the managed identity token is requested from.
#[derive(Clone)]
pub enum ManagedIdentityEndpoint {
    /// Instance metadata service (VMs, AKS nodes)
    Imds { url: String },
    /// App Service / Functions identity endpoint
    AppService { url: String, header: String },
}

impl fmt::Debug for ManagedIdentityEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagedIdentityEndpoint::Imds { url } => f.debug_struct("Imds").field("url", url).finish(),
            ManagedIdentityEndpoint::AppService { url, .. } => f
                .debug_struct("AppService")
                .field("url", url)
                .field("header", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManagedIdentityCredential {
    /// `None` means the system-assigned identity
    pub client_id: Option<String>,
    pub endpoint: ManagedIdentityEndpoint,
    client: Client,
}

impl ManagedIdentityCredential {
    pub fn new(client_id: Option<String>, endpoint: ManagedIdentityEndpoint, client: Client) -> Self {
        Self { client_id, endpoint, client }
    }

    /// App Service variables win over IMDS; a configured IMDS url overrides the default one.
    pub fn from_signals(
        client_id: Option<String>,
        identity: &IdentityConfig,
        signals: &EnvironmentSignals,
        client: Client,
    ) -> Self {
        let endpoint = match (&signals.identity_endpoint, &signals.identity_header) {
            (Some(url), Some(header)) => ManagedIdentityEndpoint::AppService {
                url: url.to_owned(),
                header: header.to_owned(),
            },
            _ => ManagedIdentityEndpoint::Imds {
                url: identity
                    .imds_endpoint
                    .clone()
                    .unwrap_or_else(|| IMDS_ENDPOINT.to_owned()),
            },
        };
        Self::new(client_id, endpoint, client)
    }
}

impl CredentialProvider for ManagedIdentityCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        // managed identity endpoints take a resource, not a v2 scope
        let resource = scope.strip_suffix(DEFAULT_SCOPE_SUFFIX).unwrap_or(scope);

        let mut query: Vec<(&str, &str)> = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let request = match &self.endpoint {
            ManagedIdentityEndpoint::Imds { url } => {
                query.push(("api-version", IMDS_API_VERSION));
                self.client.get(url).header("Metadata", "true")
            }
            ManagedIdentityEndpoint::AppService { url, header } => {
                query.push(("api-version", APP_SERVICE_API_VERSION));
                self.client.get(url).header("X-IDENTITY-HEADER", header)
            }
        };

        debug!(resource, client_id = ?self.client_id, "requesting managed identity token");
        let response = request
            .query(&query)
            .send()
            .await
            .map_err(CredentialError::Unreachable)?;

        let status = response.status();
        let body = response.bytes().await.map_err(CredentialError::Unreachable)?;
        if !status.is_success() {
            let body = error_description(&body);
            warn!(%status, resource, "managed identity token request failed");
            return Err(CredentialError::Rejected { status, body });
        }

        let token = parse_managed_identity(&body)?;
        debug!(token = %token.redacted(), expires_at = token.expires_at(), "managed identity token acquired");
        Ok(token)
    }

    fn kind(&self) -> &'static str {
        "managed_identity"
    }
}
