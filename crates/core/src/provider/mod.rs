//! External account provider: payload models and client contract.

mod provider_model;
mod provider_traits;

pub use provider_model::*;
pub use provider_traits::AccountProviderClient;
