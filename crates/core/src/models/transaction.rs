use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Buy/sell direction of an executed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "Buy"),
            TradeSide::Sell => write!(f, "Sell"),
        }
    }
}

/// One executed order within the trailing transaction window.
///
/// Only orders with a nonzero executed quantity appear here; unfilled
/// orders are dropped during refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub time: NaiveTime,

    /// Display id derived from the broker order number ("TX{order_id}").
    pub id: String,

    /// Instrument name, or the raw symbol code if the lookup failed.
    pub symbol: String,

    pub side: TradeSide,
    pub quantity: u64,

    /// Executed price per share.
    pub price: f64,

    /// price × quantity.
    pub total: f64,

    /// Which team within the fund placed the order.
    pub team: String,
}
