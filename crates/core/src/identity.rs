//! Identity provider contract.

use crate::errors::Result;

pub trait IdentityProvider: Send + Sync {
    /// Verifies a bearer token and returns the subject id it was issued to.
    ///
    /// Fails with `Error::Unauthorized` for invalid or expired tokens.
    fn verify(&self, token: &str) -> Result<String>;
}
