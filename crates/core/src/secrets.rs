//! Credential provider contract.
//!
//! Used to obtain mutual-TLS material for the provider client. Where the bytes
//! come from (files, a secrets manager) is up to the implementation.

use crate::errors::Result;

pub trait CredentialProvider: Send + Sync {
    /// Returns the raw bytes of the named credential.
    fn get_credential(&self, name: &str) -> Result<Vec<u8>>;
}
