use std::fmt;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::utils::constants::{
    ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_CLUSTER_MARKER, ENV_IDENTITY_ENDPOINT, ENV_IDENTITY_HEADER,
    ENV_TENANT_ID,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    /// decide from environment signals
    #[default]
    Auto,
    Explicit,
    Ambient,
}

/// Identity related facts about the process environment, captured once.
#[derive(Clone, Default)]
pub struct EnvironmentSignals {
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_secret: Option<String>,
    pub identity_endpoint: Option<String>,
    pub identity_header: Option<String>,
    /// running inside an orchestrated cluster
    pub in_cluster: bool,
}

impl EnvironmentSignals {
    pub fn from_env() -> Self {
        Self {
            client_id: non_empty_var(ENV_CLIENT_ID),
            tenant_id: non_empty_var(ENV_TENANT_ID),
            client_secret: non_empty_var(ENV_CLIENT_SECRET),
            identity_endpoint: non_empty_var(ENV_IDENTITY_ENDPOINT),
            identity_header: non_empty_var(ENV_IDENTITY_HEADER),
            in_cluster: non_empty_var(ENV_CLUSTER_MARKER).is_some(),
        }
    }

    /// Tenant, client id and secret are all present.
    pub fn has_service_principal(&self) -> bool {
        self.tenant_id.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

impl fmt::Debug for EnvironmentSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentSignals")
            .field("client_id", &self.client_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("identity_endpoint", &self.identity_endpoint)
            .field("identity_header", &self.identity_header.as_ref().map(|_| "<redacted>"))
            .field("in_cluster", &self.in_cluster)
            .finish()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    Explicit { client_id: String },
    Ambient,
}

/// Deterministic credential selection.
///
/// A configured client id wins over `AZURE_CLIENT_ID`. Inside a cluster an explicit identity is
/// mandatory: the ambient identity there is the node's, not the workload's. So in a cluster
/// `AZURE_CLIENT_ID` always names a user-assigned managed identity, even next to
/// `AZURE_TENANT_ID` and `AZURE_CLIENT_SECRET`; use `mode: ambient` to authenticate as that
/// service principal. Outside a cluster, auto mode with all three variables and no configured
/// client id selects the ambient strategy, which uses the service principal.
pub fn select_credential(
    mode: IdentityMode,
    configured_client_id: Option<&str>,
    signals: &EnvironmentSignals,
) -> Result<CredentialStrategy> {
    let client_id = configured_client_id
        .map(str::to_owned)
        .or_else(|| signals.client_id.clone());

    match (mode, client_id) {
        (IdentityMode::Ambient, _) => Ok(CredentialStrategy::Ambient),
        (IdentityMode::Auto, _)
            if configured_client_id.is_none() && !signals.in_cluster && signals.has_service_principal() =>
        {
            Ok(CredentialStrategy::Ambient)
        }
        (IdentityMode::Explicit | IdentityMode::Auto, Some(client_id)) => {
            Ok(CredentialStrategy::Explicit { client_id })
        }
        (IdentityMode::Explicit, None) => Err(Error::Configuration(format!(
            "explicit identity requested but no client id configured (set identity.client_id or {ENV_CLIENT_ID})"
        ))),
        (IdentityMode::Auto, None) if signals.in_cluster => Err(Error::Configuration(format!(
            "running in a cluster ({ENV_CLUSTER_MARKER} is set) requires an explicit identity; set identity.client_id or {ENV_CLIENT_ID}"
        ))),
        (IdentityMode::Auto, None) => Ok(CredentialStrategy::Ambient),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serial_test::serial;

    fn signals(client_id: Option<&str>, in_cluster: bool) -> EnvironmentSignals {
        EnvironmentSignals {
            client_id: client_id.map(str::to_owned),
            in_cluster,
            ..Default::default()
        }
    }

    #[test]
    fn auto_mode_policy() {
        assert_eq!(
            select_credential(IdentityMode::Auto, None, &signals(Some("env-id"), true)).unwrap(),
            CredentialStrategy::Explicit { client_id: "env-id".into() }
        );
        assert_eq!(
            select_credential(IdentityMode::Auto, None, &signals(None, false)).unwrap(),
            CredentialStrategy::Ambient
        );
        assert!(matches!(
            select_credential(IdentityMode::Auto, None, &signals(None, true)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn auto_mode_prefers_a_complete_service_principal() {
        let sp = EnvironmentSignals {
            client_id: Some("app-id".into()),
            tenant_id: Some("tenant".into()),
            client_secret: Some("secret".into()),
            ..Default::default()
        };
        assert_eq!(
            select_credential(IdentityMode::Auto, None, &sp).unwrap(),
            CredentialStrategy::Ambient
        );

        let in_cluster = EnvironmentSignals { in_cluster: true, ..sp.clone() };
        assert_eq!(
            select_credential(IdentityMode::Auto, None, &in_cluster).unwrap(),
            CredentialStrategy::Explicit { client_id: "app-id".into() }
        );
        assert_eq!(
            select_credential(IdentityMode::Auto, Some("cfg-id"), &sp).unwrap(),
            CredentialStrategy::Explicit { client_id: "cfg-id".into() }
        );

        let no_secret = EnvironmentSignals { client_secret: None, ..sp };
        assert_eq!(
            select_credential(IdentityMode::Auto, None, &no_secret).unwrap(),
            CredentialStrategy::Explicit { client_id: "app-id".into() }
        );
    }

    #[test]
    fn configured_client_id_wins_over_environment() {
        assert_eq!(
            select_credential(IdentityMode::Auto, Some("cfg-id"), &signals(Some("env-id"), false)).unwrap(),
            CredentialStrategy::Explicit { client_id: "cfg-id".into() }
        );
    }

    #[test]
    fn forced_modes() {
        assert!(matches!(
            select_credential(IdentityMode::Explicit, None, &signals(None, false)),
            Err(Error::Configuration(_))
        ));
        assert_eq!(
            select_credential(IdentityMode::Ambient, None, &signals(Some("env-id"), true)).unwrap(),
            CredentialStrategy::Ambient
        );
    }

    #[test]
    #[serial]
    fn reads_markers_from_process_environment() {
        std::env::set_var(ENV_CLIENT_ID, "from-env");
        std::env::set_var(ENV_CLUSTER_MARKER, "10.0.0.1");
        std::env::set_var(ENV_CLIENT_SECRET, "hunter2");
        let captured = EnvironmentSignals::from_env();
        std::env::remove_var(ENV_CLIENT_ID);
        std::env::remove_var(ENV_CLUSTER_MARKER);
        std::env::remove_var(ENV_CLIENT_SECRET);

        assert_eq!(captured.client_id.as_deref(), Some("from-env"));
        assert!(captured.in_cluster);
        assert!(!format!("{captured:?}").contains("hunter2"));
    }
}
