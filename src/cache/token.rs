use std::fmt;

use crate::helpers::time::now_i64;
use crate::utils::constants::TOKEN_PREFIX_LEN;

/// Bearer token issued for one scope.
///
/// `Debug` never prints the whole value; use [`AccessToken::redacted`] for diagnostics.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: i64, // UNIX TIMESTAMP
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: i64) -> Self {
        Self { value: value.into(), expires_at }
    }

    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        now_i64() >= self.expires_at
    }

    /// When a token acquired now should be replaced.
    ///
    /// `safety_margin_seconds` before expiry, unless the token was issued with less lifetime
    /// than the margin; then it is used until it actually expires.
    pub fn refresh_at(&self, safety_margin_seconds: u64) -> i64 {
        let margin = safety_margin_seconds as i64;
        if self.expires_at - now_i64() > margin {
            self.expires_at - margin
        } else {
            self.expires_at
        }
    }

    /// Short non-secret prefix for log lines.
    pub fn redacted(&self) -> String {
        let prefix: String = self.value.chars().take(TOKEN_PREFIX_LEN).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &self.redacted())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let token = AccessToken::new("eyJ0eXAiOiJKV1QiLCJhbGciOi.secret-part", now_i64() + 3600);
        let printed = format!("{token:?}");
        assert!(printed.contains("eyJ0eX..."));
        assert!(!printed.contains("secret-part"));
    }

    #[test]
    fn safety_margin_moves_refresh_point() {
        let expires_at = now_i64() + 3600;
        let token = AccessToken::new("t", expires_at);
        assert_eq!(token.refresh_at(60), expires_at - 60);
        assert_eq!(token.refresh_at(0), expires_at);
        assert!(AccessToken::new("t", now_i64() - 1).is_expired());
    }

    #[test]
    fn short_lived_token_is_kept_until_expiry() {
        let expires_at = now_i64() + 30;
        let token = AccessToken::new("t", expires_at);
        assert!(!token.is_expired());
        assert_eq!(token.refresh_at(60), expires_at);
    }
}
