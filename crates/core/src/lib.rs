//! Finlink Core - reconciliation and categorization of linked bank accounts.
//!
//! This crate holds the record model, the collaborator traits and the services
//! built on them. It is storage- and transport-agnostic: the `storage-sqlite`
//! crate implements [`store::KeyValueStore`], the `teller` crate implements
//! [`provider::AccountProviderClient`].

pub mod account_links;
pub mod accounts;
pub mod errors;
pub mod identity;
pub mod provider;
pub mod reconciliation;
pub mod records;
pub mod secrets;
pub mod store;
pub mod transactions;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
