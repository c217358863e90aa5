//! Payload models of the account-data provider.
//!
//! These are persisted verbatim as `EntityData` of `Account`, `Balance` and
//! `Transaction` records. Monetary fields are decimal text.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::records::{Entity, EntityPayload, EntityType};
use crate::utils::decimal_text::{self, parse_amount, parse_optional_amount};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Institution {
    pub id: String,
    pub name: String,
}

/// An account as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderAccount {
    pub id: String,
    /// The provider's institution connection this account belongs to.
    pub enrollment_id: String,
    pub institution: Institution,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub subtype: String,
    pub currency: String,
    #[serde(default)]
    pub last_four: Option<String>,
    pub status: String,
}

impl EntityPayload for ProviderAccount {
    const ENTITY_TYPE: EntityType = EntityType::Account;
}

/// Balance snapshot of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderBalance {
    pub account_id: String,
    /// Posted, cleared balance.
    #[serde(default, deserialize_with = "decimal_text::deserialize_option")]
    pub ledger: Option<String>,
    /// Balance usable for new transactions.
    #[serde(default, deserialize_with = "decimal_text::deserialize_option")]
    pub available: Option<String>,
}

impl ProviderBalance {
    pub fn ledger_amount(&self) -> Decimal {
        parse_optional_amount(self.ledger.as_deref())
    }

    pub fn available_amount(&self) -> Decimal {
        parse_optional_amount(self.available.as_deref())
    }
}

impl EntityPayload for ProviderBalance {
    const ENTITY_TYPE: EntityType = EntityType::Balance;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Counterparty {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub counterparty_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TransactionDetails {
    /// "pending" or "complete" on the provider side.
    pub processing_status: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub counterparty: Option<Counterparty>,
}

/// A transaction as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderTransaction {
    pub id: String,
    pub account_id: String,
    #[serde(deserialize_with = "decimal_text::deserialize")]
    pub amount: String,
    /// ISO date (`YYYY-MM-DD`).
    pub date: String,
    pub description: String,
    /// "posted" or "pending".
    pub status: String,
    #[serde(rename = "type")]
    pub transaction_type: String,
    #[serde(default, deserialize_with = "decimal_text::deserialize_option")]
    pub running_balance: Option<String>,
    pub details: TransactionDetails,
}

impl ProviderTransaction {
    pub fn amount_value(&self) -> Decimal {
        parse_amount(&self.amount)
    }
}

impl EntityPayload for ProviderTransaction {
    const ENTITY_TYPE: EntityType = EntityType::Transaction;
}

/// A persisted `Account` record (insert-once snapshot).
pub type AccountRecord = Entity<ProviderAccount>;

/// A persisted `Balance` record (one per account, overwritten on every run).
pub type BalanceRecord = Entity<ProviderBalance>;

/// A persisted `Transaction` record.
pub type TransactionRecord = Entity<ProviderTransaction>;
