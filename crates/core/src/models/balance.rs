use serde::{Deserialize, Serialize};

/// Account-level balance summary.
///
/// `Default` is the zeroed placeholder that getters hand out before the
/// first successful refresh — callers never see an absent value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Cash available for trading, in the account's base currency.
    pub available_cash: f64,

    /// Total asset value: securities valuation plus available cash.
    pub total_assets: f64,

    /// Aggregate unrealized profit/loss.
    pub total_pl: f64,

    /// Aggregate unrealized profit/loss as a percentage.
    pub total_pl_percent: f64,
}
