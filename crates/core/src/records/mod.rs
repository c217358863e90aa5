//! Single-table record envelope shared by every persisted entity.

mod keys;
mod records_model;

pub use keys::*;
pub use records_model::*;

#[cfg(test)]
mod records_model_tests;
