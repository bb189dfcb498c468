use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest market quote for one instrument, keyed by symbol code in the
/// cache's quote map. Entries are updated one-by-one during a refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Last traded price.
    pub price: f64,

    /// Absolute change versus the previous close.
    pub change: f64,

    /// Change as a percentage of the previous close.
    pub rate: f64,

    /// Accumulated traded volume for the day.
    pub volume: u64,

    /// Market capitalization, when the upstream reports it.
    pub market_cap: f64,

    /// When this quote was fetched — quotes can be individually stale.
    pub fetched_at: DateTime<Utc>,
}
