use chrono::NaiveDate;
use fund_dashboard_core::models::balance::Balance;
use fund_dashboard_core::models::benchmark::{BenchmarkSeries, BENCHMARK_WINDOW_DAYS};
use fund_dashboard_core::models::pnl::{PlPoint, ReportPeriod};
use fund_dashboard_core::models::transaction::TradeSide;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
//  ReportPeriod & P&L series
// ═══════════════════════════════════════════════════════════════════

mod pnl {
    use super::*;

    #[test]
    fn report_period_day_counts() {
        assert_eq!(ReportPeriod::Daily.days(), 7);
        assert_eq!(ReportPeriod::MonthToDate.days(), 30);
        assert_eq!(ReportPeriod::YearToDate.days(), 365);
    }

    #[test]
    fn zeroed_series_covers_window_ending_at_date() {
        let end = d(2026, 8, 28);
        let series = PlPoint::zeroed_series(end, 7);

        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, d(2026, 8, 22));
        assert_eq!(series[6].date, end);
        assert!(series
            .iter()
            .all(|p| p.daily_pl == 0.0 && p.cumulative_pl == 0.0));
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Balance & Transaction
// ═══════════════════════════════════════════════════════════════════

mod balance {
    use super::*;

    #[test]
    fn default_is_the_zeroed_placeholder() {
        let balance = Balance::default();
        assert_eq!(balance.available_cash, 0.0);
        assert_eq!(balance.total_assets, 0.0);
        assert_eq!(balance.total_pl, 0.0);
        assert_eq!(balance.total_pl_percent, 0.0);
    }
}

mod transaction {
    use super::*;

    #[test]
    fn trade_side_display() {
        assert_eq!(TradeSide::Buy.to_string(), "Buy");
        assert_eq!(TradeSide::Sell.to_string(), "Sell");
    }
}

// ═══════════════════════════════════════════════════════════════════
//  BenchmarkSeries
// ═══════════════════════════════════════════════════════════════════

mod benchmark {
    use super::*;

    #[test]
    fn synthesized_series_shape() {
        let end = d(2026, 8, 28);
        let series = BenchmarkSeries::synthesize(end, BENCHMARK_WINDOW_DAYS, 42);

        assert_eq!(series.dates.len(), 30);
        assert_eq!(*series.dates.last().unwrap(), end);
        assert_eq!(series.tracks.len(), 7);
        for track in &series.tracks {
            assert_eq!(track.values.len(), 30);
        }
    }

    #[test]
    fn synthesis_is_deterministic_per_seed() {
        let end = d(2026, 8, 28);
        let a = BenchmarkSeries::synthesize(end, 30, 7);
        let b = BenchmarkSeries::synthesize(end, 30, 7);
        let c = BenchmarkSeries::synthesize(end, 30, 8);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn zeroed_series_still_names_every_index() {
        let series = BenchmarkSeries::zeroed(d(2026, 8, 28), 30);

        for name in [
            "Portfolio",
            "KOSPI",
            "KOSPI 200",
            "KOSDAQ",
            "S&P 500",
            "DJIA",
            "USD/KRW",
        ] {
            let track = series.track(name).unwrap();
            assert!(track.values.iter().all(|v| *v == 0.0));
        }
        assert!(series.track("NASDAQ").is_none());
    }
}
