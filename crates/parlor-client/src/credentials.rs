//! Credential provider boundary.
//!
//! Authentication storage is someone else's problem: the app's sign-in
//! stack owns tokens and refresh, and the session core only ever *asks* for
//! the current values through this trait. Nothing here persists anything.

use parlor_core::SessionIdentity;

/// Supplies the current bearer token and user identity.
///
/// Implementations are queried at request time, so token refresh on the
/// provider's side is picked up automatically.
pub trait CredentialProvider: Send + Sync + 'static {
    /// Current bearer token. `None` while signed out.
    fn bearer_token(&self) -> Option<String>;

    /// Identity the session acts as.
    fn identity(&self) -> SessionIdentity;
}

/// Fixed credentials, for tests and development tooling.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    token: Option<String>,
    identity: SessionIdentity,
}

impl StaticCredentials {
    /// Create a provider that always returns the given token and identity.
    pub fn new(token: impl Into<String>, identity: SessionIdentity) -> Self {
        Self { token: Some(token.into()), identity }
    }

    /// Create a signed-out provider: an identity but no token.
    pub fn signed_out(identity: SessionIdentity) -> Self {
        Self { token: None, identity }
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn identity(&self) -> SessionIdentity {
        self.identity.clone()
    }
}
