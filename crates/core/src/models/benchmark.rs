use chrono::{Duration, NaiveDate};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// Trailing window covered by the benchmark series, in days.
pub const BENCHMARK_WINDOW_DAYS: i64 = 30;

/// Daily drift and volatility of each synthesized index, in percent.
///
/// Placeholder for a real market-data feed: the series is a random walk
/// with index-specific parameters, not historical data.
const INDEX_PROFILES: [(&str, f64, f64); 7] = [
    ("Portfolio", 0.2, 1.2),
    ("KOSPI", 0.1, 1.0),
    ("KOSPI 200", 0.08, 0.9),
    ("KOSDAQ", 0.3, 1.5),
    ("S&P 500", 0.15, 0.8),
    ("DJIA", 0.12, 0.7),
    ("USD/KRW", -0.05, 0.3),
];

/// Cumulative return track for one named index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTrack {
    pub name: String,
    /// One value per date in the owning series, cumulative percent return.
    pub values: Vec<f64>,
}

/// Benchmark comparison series over a trailing window.
///
/// Independent of the broker connection; synthesized locally each refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSeries {
    /// Dates covered, oldest first.
    pub dates: Vec<NaiveDate>,
    /// One track per index, in a fixed display order.
    pub tracks: Vec<BenchmarkTrack>,
}

impl BenchmarkSeries {
    /// Synthesize a random-walk series of `days` points ending at `end`.
    ///
    /// Seeding from the wall clock modulo 1000 keeps the series stable
    /// across refreshes that land within the same instant bucket, so the
    /// dashboard charts do not jitter on every page render.
    #[must_use]
    pub fn synthesize(end: NaiveDate, days: i64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let dates = Self::window(end, days);

        let tracks = INDEX_PROFILES
            .iter()
            .map(|&(name, drift, volatility)| {
                let values = match Normal::new(drift, volatility) {
                    Ok(dist) => {
                        let mut cumulative = 0.0;
                        (0..days)
                            .map(|_| {
                                cumulative += rng.sample(dist);
                                cumulative
                            })
                            .collect()
                    }
                    Err(_) => vec![0.0; days as usize],
                };
                BenchmarkTrack {
                    name: name.to_string(),
                    values,
                }
            })
            .collect();

        Self { dates, tracks }
    }

    /// Zero-valued series with all index names present — the typed-empty
    /// placeholder for the benchmarks getter.
    #[must_use]
    pub fn zeroed(end: NaiveDate, days: i64) -> Self {
        Self {
            dates: Self::window(end, days),
            tracks: INDEX_PROFILES
                .iter()
                .map(|&(name, _, _)| BenchmarkTrack {
                    name: name.to_string(),
                    values: vec![0.0; days as usize],
                })
                .collect(),
        }
    }

    /// Look up a track by index name.
    #[must_use]
    pub fn track(&self, name: &str) -> Option<&BenchmarkTrack> {
        self.tracks.iter().find(|t| t.name == name)
    }

    fn window(end: NaiveDate, days: i64) -> Vec<NaiveDate> {
        (0..days)
            .map(|i| end - Duration::days(days - 1 - i))
            .collect()
    }
}
