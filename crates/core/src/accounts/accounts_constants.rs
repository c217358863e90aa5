/// Subtypes whose balances count as assets.
pub const DEPOSITORY_SUBTYPES: &[&str] = &[
    "checking",
    "savings",
    "money_market",
    "certificate_of_deposit",
    "treasury",
    "sweep",
];

/// Subtypes whose balances count as liabilities.
pub const CREDIT_SUBTYPES: &[&str] = &["credit_card"];
