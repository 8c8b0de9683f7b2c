use std::fmt;

use reqwest::Client;
use tracing::{debug, warn};

use crate::cache::token::AccessToken;
use crate::credentials::token_response::{error_description, parse_oauth2};
use crate::credentials::{CredentialError, CredentialProvider};

/// Service principal with a client secret, as provided through `AZURE_*` variables.
#[derive(Clone)]
pub struct ClientSecretCredential {
    pub tenant_id: String,
    pub client_id: String,
    client_secret: String,
    pub authority_host: String,
    client: Client,
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authority_host", &self.authority_host)
            .finish()
    }
}

impl ClientSecretCredential {
    pub fn new(
        tenant_id: String,
        client_id: String,
        client_secret: String,
        authority_host: String,
        client: Client,
    ) -> Self {
        Self {
            tenant_id,
            client_id,
            client_secret,
            authority_host: authority_host.trim_end_matches('/').to_owned(),
            client,
        }
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_host, self.tenant_id)
    }
}

impl CredentialProvider for ClientSecretCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        debug!(tenant_id = %self.tenant_id, scope, "requesting client credentials token");
        let response = self
            .client
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(CredentialError::Unreachable)?;

        let status = response.status();
        let body = response.bytes().await.map_err(CredentialError::Unreachable)?;
        if !status.is_success() {
            warn!(%status, scope, "client credentials token request failed");
            return Err(CredentialError::Rejected { status, body: error_description(&body) });
        }

        parse_oauth2(&body)
    }

    fn kind(&self) -> &'static str {
        "client_secret"
    }
}
