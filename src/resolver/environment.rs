use std::fmt;

use serde::Deserialize;

const NON_PROD_RESOURCE_ID: &str = "32f2a909-8a98-4eb8-b22d-1208d9350cb0";
const PROD_RESOURCE_ID: &str = "141369bd-3dca-4b55-825b-56ad4a69b1fc";

/// Supported API versions. Appears in the base URL as `v1.6` / `v1.7`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "VersionRepr")]
pub enum TimeseriesVersion {
    V1_6,
    #[default]
    V1_7,
}

impl TimeseriesVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeseriesVersion::V1_6 => "1.6",
            TimeseriesVersion::V1_7 => "1.7",
        }
    }
}

impl fmt::Display for TimeseriesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// YAML reads an unquoted `1.7` as a float, so accept both spellings.
#[derive(Deserialize)]
#[serde(untagged)]
enum VersionRepr {
    Text(String),
    Number(f64),
}

impl TryFrom<VersionRepr> for TimeseriesVersion {
    type Error = String;

    fn try_from(value: VersionRepr) -> Result<Self, Self::Error> {
        let text = match value {
            VersionRepr::Text(text) => text,
            VersionRepr::Number(number) => format!("{number:.1}"),
        };
        match text.trim().trim_start_matches('v') {
            "1.6" => Ok(TimeseriesVersion::V1_6),
            "1.7" => Ok(TimeseriesVersion::V1_7),
            other => Err(format!("unsupported timeseries API version '{other}', expected 1.6 or 1.7")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentPreset {
    Dev,
    Test,
    Prod,
}

/// Which API deployment the client talks to and which app registration issues its tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    resource_id: String,
    base_url: String,
}

impl Environment {
    pub fn new(resource_id: impl Into<String>, base_url: impl AsRef<str>) -> Self {
        Self {
            resource_id: resource_id.into(),
            base_url: base_url.as_ref().trim_end_matches('/').to_owned(),
        }
    }

    pub fn preset(preset: EnvironmentPreset, version: TimeseriesVersion) -> Self {
        match preset {
            EnvironmentPreset::Dev => Self::dev(version),
            EnvironmentPreset::Test => Self::test(version),
            EnvironmentPreset::Prod => Self::prod(version),
        }
    }

    /// Non-production dev environment.
    pub fn dev(version: TimeseriesVersion) -> Self {
        Self::new(
            NON_PROD_RESOURCE_ID,
            format!("https://api-dev.gateway.equinor.com/plant/timeseries/v{version}"),
        )
    }

    /// Non-production test environment.
    pub fn test(version: TimeseriesVersion) -> Self {
        Self::new(
            NON_PROD_RESOURCE_ID,
            format!("https://api-test.gateway.equinor.com/plant/timeseries/v{version}"),
        )
    }

    pub fn prod(version: TimeseriesVersion) -> Self {
        Self::new(
            PROD_RESOURCE_ID,
            format!("https://api.gateway.equinor.com/plant/timeseries/v{version}"),
        )
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
