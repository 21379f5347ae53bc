//! Authentication records exchanged with the API.

use serde::{Deserialize, Serialize};

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Email address or nickname.
    pub email: &'a str,
    /// Password.
    pub password: &'a str,
}

/// Signup request body.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest<'a> {
    /// Email address or nickname.
    pub email: &'a str,
    /// Account role.
    pub role: &'a str,
    /// Initial deposit, as a decimal string.
    pub bybit_deposit: &'a str,
}

/// Token fields of a login or signup response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    /// Bearer token.
    pub access_token: String,
    /// Absolute expiry as a unix timestamp.
    #[serde(default)]
    pub valid_thru: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_request_wire_shape() {
        let body = serde_json::to_value(LoginRequest {
            email: "user@example.com",
            password: "secret",
        })
        .unwrap();
        assert_eq!(body, json!({"email": "user@example.com", "password": "secret"}));
    }

    #[test]
    fn test_token_grant_without_expiry() {
        let grant: TokenGrant = serde_json::from_value(json!({"access_token": "abc"})).unwrap();
        assert_eq!(grant.access_token, "abc");
        assert_eq!(grant.valid_thru, None);

        let grant: TokenGrant =
            serde_json::from_value(json!({"access_token": "abc", "valid_thru": 1700000000}))
                .unwrap();
        assert_eq!(grant.valid_thru, Some(1_700_000_000));
    }
}
