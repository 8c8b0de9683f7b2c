//! Shared constants and invariants

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_REQUEST_DEADLINE_MS: u64 = 60_000;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 8000;

// Scopes and endpoints
pub const DEFAULT_SCOPE_SUFFIX: &str = "/.default";
pub const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
pub const ML_HOST_FRAGMENT: &str = "ml.azure.com";

pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
pub const IMDS_API_VERSION: &str = "2018-02-01";
pub const APP_SERVICE_API_VERSION: &str = "2019-08-01";
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

// Environment signals
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const ENV_IDENTITY_ENDPOINT: &str = "IDENTITY_ENDPOINT";
pub const ENV_IDENTITY_HEADER: &str = "IDENTITY_HEADER";
pub const ENV_CLUSTER_MARKER: &str = "KUBERNETES_SERVICE_HOST";

/// Characters of a token value that may appear in diagnostics.
pub const TOKEN_PREFIX_LEN: usize = 6;
