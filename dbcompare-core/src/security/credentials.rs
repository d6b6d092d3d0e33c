//! Endpoint credentials with automatic memory zeroing.
//!
//! # Security
//! - Username and secret live in `Zeroizing<String>` containers
//! - `Debug` output never shows the secret
//! - Only the wire layer reads the secret, when building a request body

use serde::Deserialize;
use zeroize::Zeroizing;

/// Username and secret for one endpoint.
///
/// # Example
///
/// ```rust
/// use dbcompare_core::security::Credentials;
///
/// let creds = Credentials::new("scott", "tiger");
/// assert_eq!(creds.username(), "scott");
/// assert!(creds.has_secret());
/// assert!(!format!("{creds:?}").contains("tiger"));
/// ```
#[derive(Clone, Deserialize)]
pub struct Credentials {
    username: Zeroizing<String>,
    #[serde(default, alias = "secret")]
    password: Zeroizing<String>,
}

impl Credentials {
    /// Creates credentials; both values are zeroed when dropped.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: Zeroizing::new(username.into()),
            password: Zeroizing::new(secret.into()),
        }
    }

    /// Gets the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Checks if a secret is present without exposing it.
    pub fn has_secret(&self) -> bool {
        !self.password.is_empty()
    }

    /// Returns a copy with the secret replaced.
    ///
    /// Used when the secret is supplied out of band (environment or prompt)
    /// after the rest of the endpoint was loaded from a file.
    pub fn with_secret(&self, secret: impl Into<String>) -> Self {
        Self {
            username: self.username.clone(),
            password: Zeroizing::new(secret.into()),
        }
    }

    pub(crate) fn secret(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username.as_str())
            .field("password", &if self.has_secret() { "****" } else { "" })
            .finish()
    }
}
