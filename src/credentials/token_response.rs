use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::token::AccessToken;
use crate::credentials::CredentialError;
use crate::helpers::time::now_i64;

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: i64,
}

/// `expires_on` is a string on IMDS and App Service, a number on some other hosts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct ManagedIdentityResponse {
    access_token: String,
    expires_on: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
struct OAuth2Response {
    access_token: String,
    expires_in: Option<i64>,
}

/// Parse a managed identity token response.
///
/// Falls back to the JWT `exp` claim when `expires_on` is missing.
pub fn parse_managed_identity(body: &[u8]) -> Result<AccessToken, CredentialError> {
    let response: ManagedIdentityResponse = serde_json::from_slice(body)
        .map_err(|e| CredentialError::InvalidResponse(format!("malformed managed identity response: {e}")))?;

    let expires_at = match response.expires_on {
        Some(Timestamp::Number(ts)) => ts,
        Some(Timestamp::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map_err(|e| CredentialError::InvalidResponse(format!("invalid expires_on value '{text}': {e}")))?,
        None => get_jwt_token_expiration(&response.access_token)?,
    };

    Ok(AccessToken::new(response.access_token, expires_at))
}

/// Parse an OAuth2 client credentials response (`expires_in` seconds from now).
pub fn parse_oauth2(body: &[u8]) -> Result<AccessToken, CredentialError> {
    let response: OAuth2Response = serde_json::from_slice(body)
        .map_err(|e| CredentialError::InvalidResponse(format!("malformed token response: {e}")))?;

    let expires_at = match response.expires_in {
        Some(seconds) => now_i64() + seconds,
        None => get_jwt_token_expiration(&response.access_token)?,
    };

    Ok(AccessToken::new(response.access_token, expires_at))
}

/// Best effort: the `error_description` of an identity error body, otherwise the raw text.
pub fn error_description(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error_description")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

fn decode_jwt_from_string(token_string: &str) -> Result<JwtClaims, CredentialError> {
    let parts: Vec<&str> = token_string.split('.').collect();
    if parts.len() != 3 {
        return Err(CredentialError::InvalidResponse(
            "token has no expiry and is not a JWT".to_string(),
        ));
    }

    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| CredentialError::InvalidResponse(format!("base64 decode error: {}", e)))?;

    serde_json::from_slice::<JwtClaims>(&decoded)
        .map_err(|e| CredentialError::InvalidResponse(format!("invalid JWT payload: {}", e)))
}

fn get_jwt_token_expiration(token_value: &str) -> Result<i64, CredentialError> {
    let exp = decode_jwt_from_string(token_value)?.exp;
    debug!(expires_at = exp, "expiry taken from jwt claims");
    Ok(exp)
}

#[cfg(test)]
mod test {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn sample_jwt(exp: i64) -> String {
        // minimal unsigned JWT for tests: {"exp": exp}
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp))
        )
    }

    #[test]
    fn expires_on_as_string_or_number() {
        let body = json!({"access_token": "abc", "expires_on": "1900000000", "token_type": "Bearer"});
        let token = parse_managed_identity(body.to_string().as_bytes()).unwrap();
        assert_eq!(token.expires_at(), 1_900_000_000);

        let body = json!({"access_token": "abc", "expires_on": 1900000001});
        let token = parse_managed_identity(body.to_string().as_bytes()).unwrap();
        assert_eq!(token.expires_at(), 1_900_000_001);
    }

    #[test]
    fn missing_expiry_falls_back_to_jwt_claim() {
        let jwt = sample_jwt(1_900_000_123);
        let body = json!({"access_token": jwt});
        let token = parse_managed_identity(body.to_string().as_bytes()).unwrap();
        assert_eq!(token.expires_at(), 1_900_000_123);
    }

    #[test]
    fn opaque_token_without_expiry_is_rejected() {
        let body = json!({"access_token": "opaque"});
        assert!(matches!(
            parse_oauth2(body.to_string().as_bytes()),
            Err(CredentialError::InvalidResponse(_))
        ));
    }

    #[test]
    fn oauth2_expires_in_is_relative() {
        let body = json!({"access_token": "abc", "expires_in": 3599, "token_type": "Bearer"});
        let token = parse_oauth2(body.to_string().as_bytes()).unwrap();
        let delta = token.expires_at() - now_i64();
        assert!((3598..=3599).contains(&delta));
    }

    #[test]
    fn error_description_is_extracted() {
        let body = br#"{"error":"invalid_request","error_description":"Identity not found"}"#;
        assert_eq!(error_description(body), "Identity not found");
        assert_eq!(error_description(b"plain failure"), "plain failure");
    }
}
