//! Reconciliation engine: fetch provider state, merge it into the store.

mod reconciliation_model;
mod reconciliation_service;
mod reconciliation_traits;


pub use reconciliation_model::*;
pub use reconciliation_service::ReconciliationService;
pub use reconciliation_traits::ReconciliationServiceTrait;
