//! Teller API integration for finlink.
//!
//! [`TellerClient`] implements the core `AccountProviderClient` contract on top
//! of the Teller REST API. Requests authenticate with HTTP basic auth (the
//! enrollment access token as user name) over a mutual-TLS connection whose
//! client identity is loaded once by [`CertificateCache`].

mod certificates;
mod client;

pub use certificates::CertificateCache;
pub use client::{TellerClient, TellerConfig, DEFAULT_TELLER_API_URL, PROVIDER_NAME};
