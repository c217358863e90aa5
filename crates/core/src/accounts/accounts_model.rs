use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::accounts_constants::{CREDIT_SUBTYPES, DEPOSITORY_SUBTYPES};
use crate::provider::{ProviderAccount, ProviderBalance};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCategory {
    Debit,
    Credit,
}

impl AccountCategory {
    /// Classifies a provider subtype. Unknown subtypes belong to neither bucket.
    pub fn from_subtype(subtype: &str) -> Option<Self> {
        if DEPOSITORY_SUBTYPES.contains(&subtype) {
            Some(AccountCategory::Debit)
        } else if CREDIT_SUBTYPES.contains(&subtype) {
            Some(AccountCategory::Credit)
        } else {
            None
        }
    }
}

/// A persisted account joined with its persisted balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedAccount {
    pub details: ProviderAccount,
    pub balance: ProviderBalance,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBucket {
    pub accounts: Vec<CategorizedAccount>,
    pub total_ledger: Decimal,
    pub total_available: Decimal,
}

/// Categorized view of a user's accounts.
///
/// The credit bucket's `total_ledger` is the negated sum of credit ledgers,
/// so `net_worth` is the plain sum of both bucket ledgers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedAccounts {
    pub debit: CategoryBucket,
    pub credit: CategoryBucket,
    pub net_worth: Decimal,
}

/// Splits joined accounts into buckets and computes the totals.
pub fn categorize_accounts(accounts: Vec<CategorizedAccount>) -> CategorizedAccounts {
    let mut result = CategorizedAccounts::default();

    for account in accounts {
        let ledger = account.balance.ledger_amount();
        let available = account.balance.available_amount();
        match AccountCategory::from_subtype(&account.details.subtype) {
            Some(AccountCategory::Debit) => {
                result.debit.total_ledger += ledger;
                result.debit.total_available += available;
                result.debit.accounts.push(account);
            }
            Some(AccountCategory::Credit) => {
                result.credit.total_ledger -= ledger;
                result.credit.total_available += available;
                result.credit.accounts.push(account);
            }
            None => debug!(
                "Account {} has uncategorized subtype '{}'",
                account.details.id, account.details.subtype
            ),
        }
    }

    for bucket in [&mut result.debit, &mut result.credit] {
        bucket.accounts.sort_by(|a, b| {
            a.details
                .institution
                .name
                .cmp(&b.details.institution.name)
                .then_with(|| a.details.name.cmp(&b.details.name))
                .then_with(|| a.details.id.cmp(&b.details.id))
        });
    }

    result.net_worth = result.debit.total_ledger + result.credit.total_ledger;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{account, balance};
    use rust_decimal_macros::dec;

    fn joined(id: &str, subtype: &str, ledger: &str, available: &str) -> CategorizedAccount {
        CategorizedAccount {
            details: account(id, "enr_1", subtype),
            balance: balance(id, ledger, available),
        }
    }

    #[test]
    fn test_subtype_classification() {
        for subtype in DEPOSITORY_SUBTYPES {
            assert_eq!(AccountCategory::from_subtype(subtype), Some(AccountCategory::Debit));
        }
        assert_eq!(
            AccountCategory::from_subtype("credit_card"),
            Some(AccountCategory::Credit)
        );
        assert_eq!(AccountCategory::from_subtype("brokerage"), None);
        assert_eq!(AccountCategory::from_subtype("Checking"), None);
    }

    #[test]
    fn test_credit_ledger_is_negated_in_net_worth() {
        let result = categorize_accounts(vec![
            joined("acc_1", "checking", "100.0", "90.0"),
            joined("acc_2", "credit_card", "50.0", "10.0"),
        ]);

        assert_eq!(result.debit.total_ledger, dec!(100.0));
        assert_eq!(result.debit.total_available, dec!(90.0));
        assert_eq!(result.credit.total_ledger, dec!(-50.0));
        assert_eq!(result.credit.total_available, dec!(10.0));
        assert_eq!(result.net_worth, dec!(50.0));
    }

    #[test]
    fn test_unknown_subtype_is_excluded() {
        let result = categorize_accounts(vec![
            joined("acc_1", "savings", "10.00", "10.00"),
            joined("acc_2", "mortgage", "99999.00", "0"),
        ]);

        assert_eq!(result.debit.accounts.len(), 1);
        assert!(result.credit.accounts.is_empty());
        assert_eq!(result.net_worth, dec!(10.00));
    }

    #[test]
    fn test_unparseable_balances_count_as_zero() {
        let mut broken = joined("acc_1", "checking", "n/a", "5.00");
        broken.balance.ledger = None;
        let result = categorize_accounts(vec![broken, joined("acc_2", "checking", "n/a", "1")]);

        assert_eq!(result.debit.total_ledger, Decimal::ZERO);
        assert_eq!(result.debit.total_available, dec!(6.00));
    }

    #[test]
    fn test_accounts_ordered_by_institution_then_name() {
        let mut zeta = joined("acc_1", "checking", "1", "1");
        zeta.details.institution.name = "Zeta Bank".to_string();
        let mut alpha_savings = joined("acc_2", "savings", "1", "1");
        alpha_savings.details.institution.name = "Alpha Bank".to_string();
        alpha_savings.details.name = "Savings".to_string();
        let mut alpha_checking = joined("acc_3", "checking", "1", "1");
        alpha_checking.details.institution.name = "Alpha Bank".to_string();
        alpha_checking.details.name = "Checking".to_string();

        let result = categorize_accounts(vec![zeta, alpha_savings, alpha_checking]);
        let ids: Vec<_> = result
            .debit
            .accounts
            .iter()
            .map(|a| a.details.id.as_str())
            .collect();
        assert_eq!(ids, vec!["acc_3", "acc_2", "acc_1"]);
    }

    #[test]
    fn test_serializes_totals_as_numbers() {
        let result = categorize_accounts(vec![joined("acc_1", "checking", "12.5", "12.5")]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["debit"]["totalLedger"], serde_json::json!(12.5));
        assert_eq!(value["netWorth"], serde_json::json!(12.5));
        assert!(value["credit"]["accounts"].as_array().unwrap().is_empty());
    }
}
