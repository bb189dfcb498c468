use serde::{Deserialize, Serialize};

/// A single held instrument, as shown on the positions page.
///
/// Snapshots are replaced wholesale on every successful refresh;
/// there is no incremental merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Broker symbol code (e.g., "005930").
    pub symbol: String,

    /// Human-readable instrument name. Falls back to the raw symbol code
    /// when the name lookup fails.
    pub name: String,

    /// Number of shares held.
    pub quantity: f64,

    /// Current price per share.
    pub price: f64,

    /// Total market value of the holding.
    pub market_value: f64,

    /// Unrealized profit/loss on the holding.
    pub unrealized_pl: f64,

    /// Unrealized profit/loss as a percentage.
    pub unrealized_pl_percent: f64,
}
