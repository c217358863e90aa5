//! Account link registry - the mapping between a user and a provider credential.

mod account_links_model;
mod account_links_service;
mod account_links_traits;


pub use account_links_model::{AccountLink, AccountLinkData, NewAccountLink};
pub use account_links_service::AccountLinkService;
pub use account_links_traits::AccountLinkServiceTrait;
