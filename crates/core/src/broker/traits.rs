use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::transaction::TradeSide;

/// Account balance as reported by the broker: per-holding detail plus
/// account-level aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    pub holdings: Vec<Holding>,
    /// Deposits keyed by currency code (e.g., "KRW").
    pub cash_by_currency: HashMap<String, f64>,
    /// Current valuation of all held securities (excludes cash).
    pub securities_value: f64,
    /// Aggregate unrealized profit/loss.
    pub profit: f64,
    /// Aggregate unrealized profit/loss as a percentage.
    pub profit_rate: f64,
}

/// One held instrument inside an [`AccountBalance`].
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    /// Broker symbol code.
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    /// Market value of the holding.
    pub amount: f64,
    pub profit: f64,
    pub profit_rate: f64,
}

/// Market quote for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteData {
    pub price: f64,
    pub change: f64,
    pub rate: f64,
    pub volume: u64,
    pub market_cap: f64,
}

/// One order from the broker's daily order history.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    /// Broker symbol code.
    pub symbol: String,
    pub order_id: String,
    pub side: TradeSide,
    /// Executed (filled) quantity — zero for unfilled orders.
    pub executed_quantity: u64,
    /// Executed price per share.
    pub price: f64,
    pub executed_at: NaiveDateTime,
}

/// One realized profit record.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedProfit {
    pub realized_on: NaiveDate,
    pub profit: f64,
}

/// Realized profits since a given date.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedProfits {
    pub records: Vec<RealizedProfit>,
    pub total_profit: f64,
}

/// Trait abstraction over the brokerage API entry point.
///
/// The data service is constructed with a boxed client, so tests inject a
/// fake broker and the real implementation can be swapped without touching
/// the cache. Authentication failures surface as `MissingCredential`,
/// `Handshake`, or `AuthExpired` so callers can react structurally.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Human-readable broker name (for logs/errors).
    fn name(&self) -> &str;

    /// Open an authenticated session. May perform network I/O.
    async fn authenticate(&self) -> Result<Box<dyn BrokerSession>, CoreError>;
}

/// An authenticated broker session. All operations may fail with
/// `CoreError::AuthExpired` once the underlying token lapses; the data
/// service responds by re-authenticating through the client.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Account balance with per-holding detail.
    async fn balance(&self) -> Result<AccountBalance, CoreError>;

    /// Human-readable instrument name for a symbol code. Best-effort;
    /// callers fall back to the raw code on failure.
    async fn instrument_name(&self, symbol: &str) -> Result<String, CoreError>;

    /// Current market quote for a symbol code.
    async fn quote(&self, symbol: &str) -> Result<QuoteData, CoreError>;

    /// Orders executed within a date range (inclusive).
    async fn orders(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<OrderRecord>, CoreError>;

    /// Realized profit records since a date.
    async fn realized_profits(&self, since: NaiveDate) -> Result<RealizedProfits, CoreError>;
}
