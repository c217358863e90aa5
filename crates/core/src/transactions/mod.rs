//! Transaction sync: insert-or-patch of provider transactions.

mod transactions_model;
mod transactions_service;
mod transactions_traits;


pub use transactions_model::{transaction_deltas, TransactionSyncSummary, MONITORED_FIELDS};
pub use transactions_service::TransactionSyncService;
pub use transactions_traits::TransactionSyncServiceTrait;
