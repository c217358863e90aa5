//! Categorized account view: debit and credit buckets plus net worth.

mod accounts_constants;
mod accounts_model;
mod accounts_service;
mod accounts_traits;


pub use accounts_constants::*;
pub use accounts_model::{
    categorize_accounts, AccountCategory, CategorizedAccount, CategorizedAccounts, CategoryBucket,
};
pub use accounts_service::CategorizationService;
pub use accounts_traits::CategorizationServiceTrait;
