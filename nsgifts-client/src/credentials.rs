//! Credential store: the login identity and the current access token.

use parking_lot::RwLock;
use std::fmt;

/// Login identity used to obtain and refresh tokens.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Email address or nickname.
    pub identifier: String,
    /// Password.
    pub secret: String,
}

impl Credentials {
    /// Create credentials from an identifier and secret.
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Whether both fields are present.
    pub fn is_complete(&self) -> bool {
        !self.identifier.is_empty() && !self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Access token with its absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// Bearer token value.
    pub value: String,
    /// Unix timestamp after which the server rejects the token.
    pub expires_at: i64,
}

impl Token {
    /// Create a token.
    pub fn new(value: impl Into<String>, expires_at: i64) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Seconds left before expiry at `now` (negative once expired).
    pub fn seconds_left(&self, now: i64) -> i64 {
        self.expires_at.saturating_sub(now)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Holds the identity and the current token.
///
/// Both are replaced wholesale; readers always see a complete value.
#[derive(Debug, Default)]
pub struct CredentialStore {
    credentials: RwLock<Credentials>,
    token: RwLock<Option<Token>>,
}

impl CredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored identity.
    pub fn set_credentials(&self, identifier: impl Into<String>, secret: impl Into<String>) {
        *self.credentials.write() = Credentials::new(identifier, secret);
    }

    /// Whether both identifier and secret are set.
    pub fn has_credentials(&self) -> bool {
        self.credentials.read().is_complete()
    }

    /// Snapshot of the stored identity.
    pub fn credentials(&self) -> Credentials {
        self.credentials.read().clone()
    }

    /// Snapshot of the current token.
    pub fn token(&self) -> Option<Token> {
        self.token.read().clone()
    }

    /// Current bearer value, if a token is installed.
    pub fn bearer(&self) -> Option<String> {
        self.token.read().as_ref().map(|t| t.value.clone())
    }

    /// Replace the current token.
    pub fn install_token(&self, token: Token) {
        *self.token.write() = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_credentials_requires_both_fields() {
        let store = CredentialStore::new();
        assert!(!store.has_credentials());

        store.set_credentials("user@example.com", "");
        assert!(!store.has_credentials());

        store.set_credentials("user@example.com", "hunter2");
        assert!(store.has_credentials());
        assert_eq!(store.credentials().identifier, "user@example.com");
    }

    #[test]
    fn test_install_token_overwrites() {
        let store = CredentialStore::new();
        assert!(store.token().is_none());

        store.install_token(Token::new("first", 100));
        store.install_token(Token::new("second", 200));

        assert_eq!(store.bearer().as_deref(), Some("second"));
        assert_eq!(store.token().map(|t| t.expires_at), Some(200));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("user", "hunter2");
        let token = Token::new("abc.def", 1);
        assert!(!format!("{:?}", creds).contains("hunter2"));
        assert!(!format!("{:?}", token).contains("abc.def"));
    }
}
