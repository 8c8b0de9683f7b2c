use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::resolver::environment::Environment;
use crate::utils::constants::{DEFAULT_SCOPE_SUFFIX, MANAGEMENT_ENDPOINT, MANAGEMENT_SCOPE, ML_HOST_FRAGMENT};

static ML_ALIAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bml\b").expect("static regex"));

/// Scope and endpoint actually used for an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub scope: String,
    /// Replaces the environment base URL when set.
    pub endpoint_override: Option<String>,
}

/// Ids that name an ML workspace need the shared management scope, not a service scope.
pub fn is_management_alias(value: &str) -> bool {
    let lowered = value.to_lowercase();
    ML_ALIAS.is_match(&lowered) || lowered.contains(ML_HOST_FRAGMENT)
}

/// Map a resource id to the scope requested from the identity provider.
pub fn resolve(resource_id: &str) -> String {
    if is_management_alias(resource_id) {
        warn!(resource_id, scope = MANAGEMENT_SCOPE, "resource id refers to an ML workspace, using management scope");
        return MANAGEMENT_SCOPE.to_owned();
    }

    let resource = resource_id.trim_end_matches('/');
    if resource.ends_with(DEFAULT_SCOPE_SUFFIX) {
        resource.to_owned()
    } else {
        format!("{resource}{DEFAULT_SCOPE_SUFFIX}")
    }
}

pub fn resolve_identity(environment: &Environment) -> ResolvedIdentity {
    let endpoint_override = is_management_alias(environment.base_url()).then(|| {
        warn!(
            base_url = environment.base_url(),
            endpoint = MANAGEMENT_ENDPOINT,
            "base url refers to an ML workspace, using management endpoint"
        );
        MANAGEMENT_ENDPOINT.to_owned()
    });

    ResolvedIdentity {
        scope: resolve(environment.resource_id()),
        endpoint_override,
    }
}
