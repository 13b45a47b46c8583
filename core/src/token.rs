//! Auth token storage seam.
//!
//! The transport reads the token through `TokenStore` on every request;
//! sign-in and sign-out flows write it. Persistence is up to the
//! implementation. `MemoryTokenStore` keeps it in process.

use std::fmt;
use std::sync::RwLock;

/// Opaque bearer token. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("token store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store holding the current auth token.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Result<Option<AuthToken>, TokenStoreError>;
    fn set(&self, token: AuthToken) -> Result<(), TokenStoreError>;
    fn clear(&self) -> Result<(), TokenStoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<AuthToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AuthToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<AuthToken>, TokenStoreError> {
        let guard = self
            .token
            .read()
            .map_err(|e| TokenStoreError::Unavailable(e.to_string()))?;
        Ok(guard.clone())
    }

    fn set(&self, token: AuthToken) -> Result<(), TokenStoreError> {
        let mut guard = self
            .token
            .write()
            .map_err(|e| TokenStoreError::Unavailable(e.to_string()))?;
        *guard = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        let mut guard = self
            .token
            .write()
            .map_err(|e| TokenStoreError::Unavailable(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}
