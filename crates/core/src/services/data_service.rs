use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker::traits::{BrokerClient, BrokerSession};
use crate::errors::CoreError;
use crate::models::balance::Balance;
use crate::models::benchmark::{BenchmarkSeries, BENCHMARK_WINDOW_DAYS};
use crate::models::pnl::{PlPoint, ReportPeriod};
use crate::models::position::Position;
use crate::models::quote::Quote;
use crate::models::transaction::Transaction;

/// Tunables for the data service. `Default` matches the production
/// dashboard; tests typically disable `auto_refresh` so upstream call
/// counts stay deterministic.
#[derive(Debug, Clone)]
pub struct DataServiceConfig {
    /// Sleep between auto-refresh cycles.
    pub refresh_interval: Duration,
    /// Unforced refreshes younger than this are a no-op (upstream
    /// throttling guard).
    pub min_refresh_interval: Duration,
    /// Sleep after a cycle in which at least one dataset failed.
    pub error_backoff: Duration,
    /// How long `shutdown` waits for the worker to join.
    pub shutdown_timeout: Duration,
    /// Trailing window of the transactions dataset, in days.
    pub transaction_window_days: i64,
    /// Trailing window of the refreshed P&L series, in days.
    pub pnl_window_days: i64,
    /// Team label stamped on every transaction.
    pub team_label: String,
    /// Whether the background worker actually refreshes each cycle.
    pub auto_refresh: bool,
}

impl Default for DataServiceConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(120),
            min_refresh_interval: Duration::from_secs(60),
            error_backoff: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(5),
            transaction_window_days: 7,
            pnl_window_days: 30,
            team_label: "Team Alpha".to_string(),
            auto_refresh: true,
        }
    }
}

/// Everything behind the cache lock. One lock guards the whole cache:
/// refreshes are infrequent and not performance-sensitive, and a single
/// guard is what upholds the wholesale-replacement guarantee (a reader
/// never observes a half-written snapshot).
#[derive(Default)]
struct CacheState {
    session: Option<Box<dyn BrokerSession>>,
    connected: bool,
    positions: Option<Vec<Position>>,
    balance: Option<Balance>,
    quotes: HashMap<String, Quote>,
    transactions: Option<Vec<Transaction>>,
    profit_loss: Option<Vec<PlPoint>>,
    benchmarks: Option<BenchmarkSeries>,
    last_update: Option<DateTime<Utc>>,
}

struct ServiceInner {
    client: Box<dyn BrokerClient>,
    config: DataServiceConfig,
    state: Mutex<CacheState>,
}

/// Periodic-refresh cache over a brokerage session.
///
/// Owns the broker session and a single background worker that refreshes
/// five datasets (positions, balance, quotes, transactions, P&L) plus a
/// locally synthesized benchmark series on a fixed interval. Getters
/// serve the most recent snapshot as an owned copy; a getter only blocks
/// on upstream I/O when its slot has never been populated, in which case
/// it runs one forced refresh before falling back to a typed-empty value.
///
/// Construction never fails: missing credentials or a failed handshake
/// degrade to disconnected state and the dashboard renders placeholders.
pub struct DataService {
    inner: Arc<ServiceInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl DataService {
    /// Build the cache, attempt the initial broker handshake, and spawn
    /// the auto-refresh worker. The worker runs regardless of connection
    /// state; it keeps the benchmark series fresh and retries the full
    /// refresh on its next tick once a connection exists.
    pub async fn start(client: Box<dyn BrokerClient>, config: DataServiceConfig) -> Self {
        let inner = Arc::new(ServiceInner {
            client,
            config,
            state: Mutex::new(CacheState::default()),
        });

        {
            let mut state = inner.state.lock().await;
            inner.reconnect_locked(&mut state).await;
        }

        let shutdown = CancellationToken::new();
        let worker = spawn_worker(Arc::clone(&inner), shutdown.clone());

        Self {
            inner,
            worker: Mutex::new(Some(worker)),
            shutdown,
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.state.lock().await.connected
    }

    /// When the last full refresh cycle completed, for staleness display.
    /// Global across all datasets.
    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().await.last_update
    }

    /// Refresh every dataset from the broker.
    ///
    /// Unforced calls within `min_refresh_interval` of the previous
    /// completed cycle skip the upstream work; the benchmark series is
    /// refreshed even then, since it has no upstream dependency. Errors
    /// never surface here — each dataset is fault-isolated, a failed one
    /// has its slot cleared, and the rest proceed.
    pub async fn refresh_all(&self, force: bool) {
        let mut state = self.inner.state.lock().await;
        self.inner.refresh_all_locked(&mut state, force).await;
    }

    /// Current positions snapshot, most recent first in broker order.
    pub async fn positions(&self) -> Vec<Position> {
        let mut state = self.inner.state.lock().await;
        let missing = state.positions.as_ref().is_none_or(|p| p.is_empty());
        if missing && (!state.connected || state.positions.is_none()) {
            self.inner.refresh_all_locked(&mut state, true).await;
        }
        state.positions.clone().unwrap_or_default()
    }

    /// Account balance summary; zeroed placeholder before the first
    /// successful refresh.
    pub async fn balance(&self) -> Balance {
        let mut state = self.inner.state.lock().await;
        if state.balance.is_none() {
            self.inner.refresh_all_locked(&mut state, true).await;
        }
        state.balance.clone().unwrap_or_default()
    }

    /// Latest quotes keyed by symbol code. Plain read — quote entries are
    /// refreshed as part of the normal cycle and can be individually stale.
    pub async fn quotes(&self) -> HashMap<String, Quote> {
        self.inner.state.lock().await.quotes.clone()
    }

    /// Executed transactions within the trailing window, newest first.
    pub async fn transactions(&self) -> Vec<Transaction> {
        let mut state = self.inner.state.lock().await;
        let missing = state.transactions.as_ref().is_none_or(|t| t.is_empty());
        if missing && (!state.connected || state.transactions.is_none()) {
            self.inner.refresh_all_locked(&mut state, true).await;
        }
        state.transactions.clone().unwrap_or_default()
    }

    /// Daily/cumulative P&L series.
    ///
    /// The refreshed series always covers the fixed configured window
    /// (30 days); the period selector only sizes the zero-filled
    /// placeholder returned while no data exists.
    pub async fn profit_loss(&self, period: ReportPeriod) -> Vec<PlPoint> {
        let mut state = self.inner.state.lock().await;
        let missing = state.profit_loss.as_ref().is_none_or(|s| s.is_empty());
        if missing && (!state.connected || state.profit_loss.is_none()) {
            self.inner.refresh_all_locked(&mut state, true).await;
        }
        match &state.profit_loss {
            Some(series) if !series.is_empty() => series.clone(),
            _ => PlPoint::zeroed_series(Utc::now().date_naive(), period.days()),
        }
    }

    /// Benchmark comparison series. No connection gating — the series is
    /// synthesized locally, so a miss is refilled synchronously in place.
    pub async fn benchmarks(&self) -> BenchmarkSeries {
        let mut state = self.inner.state.lock().await;
        if state.benchmarks.is_none() {
            self.inner.refresh_benchmarks(&mut state);
        }
        state
            .benchmarks
            .clone()
            .unwrap_or_else(|| BenchmarkSeries::zeroed(Utc::now().date_naive(), BENCHMARK_WINDOW_DAYS))
    }

    /// Stop the worker: cancel its wait and join with a bounded timeout.
    /// Best-effort — an in-flight upstream call is not interrupted, and
    /// shutdown proceeds even if the join times out. Idempotent.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            match tokio::time::timeout(self.inner.config.shutdown_timeout, handle).await {
                Ok(Ok(())) => debug!("Auto-refresh worker joined"),
                Ok(Err(e)) => warn!(error = %e, "Auto-refresh worker task failed"),
                Err(_) => warn!(
                    timeout_secs = self.inner.config.shutdown_timeout.as_secs(),
                    "Auto-refresh worker did not stop in time; proceeding"
                ),
            }
        }
    }
}

impl Drop for DataService {
    fn drop(&mut self) {
        // The worker holds its own Arc of the inner state, so without
        // this it would keep ticking after the service is gone.
        self.shutdown.cancel();
    }
}

fn spawn_worker(inner: Arc<ServiceInner>, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = inner.config.refresh_interval.as_secs(),
            "Auto-refresh worker started"
        );
        loop {
            let wait = if inner.config.auto_refresh {
                let failures = {
                    let mut state = inner.state.lock().await;
                    inner.refresh_all_locked(&mut state, false).await
                };
                if failures > 0 {
                    warn!(failures, "Refresh cycle had errors; backing off");
                    inner.config.error_backoff
                } else {
                    inner.config.refresh_interval
                }
            } else {
                inner.config.refresh_interval
            };

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }
        }
        info!("Auto-refresh worker stopped");
    })
}

impl ServiceInner {
    /// Tear down any existing session and try to open a fresh one,
    /// confirmed with one lightweight balance call. Never fails: a
    /// missing credential file or a bad handshake leaves the cache in
    /// disconnected state and the caller keeps serving placeholders.
    async fn reconnect_locked(&self, state: &mut CacheState) {
        state.session = None;
        state.connected = false;

        match self.client.authenticate().await {
            Ok(session) => match session.balance().await {
                Ok(_) => {
                    info!(broker = self.client.name(), "Broker session established");
                    state.session = Some(session);
                    state.connected = true;
                }
                Err(e) => {
                    warn!(broker = self.client.name(), error = %e, "Session check failed; staying disconnected");
                }
            },
            Err(CoreError::MissingCredential(path)) => {
                info!(%path, "No credential file; running disconnected");
            }
            Err(e) => {
                warn!(broker = self.client.name(), error = %e, "Broker handshake failed; running disconnected");
            }
        }
    }

    /// One full refresh cycle under the cache lock. Returns the number of
    /// failed sub-refreshes so the worker can decide to back off.
    async fn refresh_all_locked(&self, state: &mut CacheState, force: bool) -> usize {
        let now = Utc::now();
        if !force {
            if let Some(last) = state.last_update {
                let age = (now - last).num_seconds();
                if age < self.config.min_refresh_interval.as_secs() as i64 {
                    debug!(age_secs = age, "Refresh skipped, data is fresh");
                    self.refresh_benchmarks(state);
                    return 0;
                }
            }
        }

        let mut failures = 0;
        let mut auth_expired = false;

        if state.connected {
            // Positions strictly before quotes: quotes are fetched for
            // the symbol list just computed.
            if let Err(e) = self.refresh_positions(state).await {
                warn!(error = %e, "Positions refresh failed");
                state.positions = None;
                auth_expired |= e.is_auth_expired();
                failures += 1;
            }
            if let Err(e) = self.refresh_balance(state).await {
                warn!(error = %e, "Balance refresh failed");
                state.balance = None;
                auth_expired |= e.is_auth_expired();
                failures += 1;
            }
            if let Err(e) = self.refresh_quotes(state).await {
                warn!(error = %e, "Quote refresh failed");
                state.quotes.clear();
                auth_expired |= e.is_auth_expired();
                failures += 1;
            }
            if let Err(e) = self.refresh_transactions(state).await {
                warn!(error = %e, "Transaction refresh failed");
                state.transactions = None;
                auth_expired |= e.is_auth_expired();
                failures += 1;
            }
            if let Err(e) = self.refresh_profit_loss(state).await {
                warn!(error = %e, "P&L refresh failed");
                state.profit_loss = None;
                auth_expired |= e.is_auth_expired();
                failures += 1;
            }
        }

        // No upstream dependency; runs even while disconnected.
        self.refresh_benchmarks(state);

        state.last_update = Some(Utc::now());

        // At most one reconnection per cycle, however many datasets saw
        // the session expire.
        if auth_expired {
            warn!("Broker session expired; reconnecting");
            self.reconnect_locked(state).await;
        }

        failures
    }

    async fn refresh_positions(&self, state: &mut CacheState) -> Result<(), CoreError> {
        let session = active_session(&state.session)?;
        let account = session.balance().await?;

        let mut positions = Vec::with_capacity(account.holdings.len());
        for holding in &account.holdings {
            let name = match session.instrument_name(&holding.symbol).await {
                Ok(name) => name,
                Err(e) => {
                    debug!(symbol = %holding.symbol, error = %e, "Name lookup failed, using raw code");
                    holding.symbol.clone()
                }
            };
            positions.push(Position {
                symbol: holding.symbol.clone(),
                name,
                quantity: holding.quantity,
                price: holding.price,
                market_value: holding.amount,
                unrealized_pl: holding.profit,
                unrealized_pl_percent: holding.profit_rate,
            });
        }

        state.positions = Some(positions);
        Ok(())
    }

    async fn refresh_balance(&self, state: &mut CacheState) -> Result<(), CoreError> {
        let session = active_session(&state.session)?;
        let account = session.balance().await?;

        let cash: f64 = account.cash_by_currency.values().sum();
        state.balance = Some(Balance {
            available_cash: cash,
            total_assets: account.securities_value + cash,
            total_pl: account.profit,
            total_pl_percent: account.profit_rate,
        });
        Ok(())
    }

    /// Update quote entries for every symbol in the cached positions
    /// snapshot. A single bad symbol is logged and skipped; only an
    /// expired session aborts the sub-refresh.
    async fn refresh_quotes(&self, state: &mut CacheState) -> Result<(), CoreError> {
        let symbols: Vec<String> = state
            .positions
            .as_ref()
            .map(|positions| positions.iter().map(|p| p.symbol.clone()).collect())
            .unwrap_or_default();
        if symbols.is_empty() {
            return Ok(());
        }

        let session = active_session(&state.session)?;
        let mut fetched = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            match session.quote(symbol).await {
                Ok(quote) => fetched.push((
                    symbol.clone(),
                    Quote {
                        price: quote.price,
                        change: quote.change,
                        rate: quote.rate,
                        volume: quote.volume,
                        market_cap: quote.market_cap,
                        fetched_at: Utc::now(),
                    },
                )),
                Err(e) if e.is_auth_expired() => return Err(e),
                Err(e) => warn!(%symbol, error = %e, "Quote fetch failed for symbol"),
            }
        }

        for (symbol, quote) in fetched {
            state.quotes.insert(symbol, quote);
        }
        Ok(())
    }

    async fn refresh_transactions(&self, state: &mut CacheState) -> Result<(), CoreError> {
        let session = active_session(&state.session)?;
        let to = Utc::now().date_naive();
        let from = to - ChronoDuration::days(self.config.transaction_window_days);
        let orders = session.orders(from, to).await?;

        // Symbol-code → display-name memo so repeat trades in the same
        // instrument cost one lookup.
        let mut names: HashMap<String, String> = HashMap::new();
        let mut transactions = Vec::new();
        for order in orders.iter().filter(|o| o.executed_quantity > 0) {
            let name = match names.get(&order.symbol) {
                Some(name) => name.clone(),
                None => {
                    let name = session
                        .instrument_name(&order.symbol)
                        .await
                        .unwrap_or_else(|_| order.symbol.clone());
                    names.insert(order.symbol.clone(), name.clone());
                    name
                }
            };
            transactions.push(Transaction {
                date: order.executed_at.date(),
                time: order.executed_at.time(),
                id: format!("TX{}", order.order_id),
                symbol: name,
                side: order.side,
                quantity: order.executed_quantity,
                price: order.price,
                total: order.price * order.executed_quantity as f64,
                team: self.config.team_label.clone(),
            });
        }
        transactions.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));

        state.transactions = Some(transactions);
        Ok(())
    }

    /// Build the P&L series from realized-profit records, or fall back to
    /// spreading the cached unrealized P&L linearly across the window.
    /// The fallback is an explicit approximation, not a reconstruction.
    async fn refresh_profit_loss(&self, state: &mut CacheState) -> Result<(), CoreError> {
        let session = active_session(&state.session)?;
        let days = self.config.pnl_window_days;
        let end = Utc::now().date_naive();
        let since = end - ChronoDuration::days(days - 1);

        let realized = session.realized_profits(since).await?;

        let series = if realized.records.is_empty() {
            match &state.balance {
                Some(balance) if balance.total_pl != 0.0 => {
                    linear_series(since, days, balance.total_pl)
                }
                _ => PlPoint::zeroed_series(end, days),
            }
        } else {
            let mut by_day: HashMap<NaiveDate, f64> = HashMap::new();
            for record in &realized.records {
                *by_day.entry(record.realized_on).or_insert(0.0) += record.profit;
            }
            let mut cumulative = 0.0;
            (0..days)
                .map(|i| {
                    let date = since + ChronoDuration::days(i);
                    let daily = by_day.get(&date).copied().unwrap_or(0.0);
                    cumulative += daily;
                    PlPoint {
                        date,
                        daily_pl: daily,
                        cumulative_pl: cumulative,
                    }
                })
                .collect()
        };

        state.profit_loss = Some(series);
        Ok(())
    }

    /// Synthesize the benchmark series. The seed is bucketed wall-clock
    /// time so back-to-back renders see the same chart.
    fn refresh_benchmarks(&self, state: &mut CacheState) {
        let end = Utc::now().date_naive();
        let seed = Utc::now().timestamp().unsigned_abs() % 1000;
        state.benchmarks = Some(BenchmarkSeries::synthesize(end, BENCHMARK_WINDOW_DAYS, seed));
    }
}

/// Borrow the live session, or report it as expired so the caller's
/// cycle reconnects. `connected` without a session cannot normally
/// happen; treating it as expiry self-heals if it ever does.
fn active_session(
    session: &Option<Box<dyn BrokerSession>>,
) -> Result<&dyn BrokerSession, CoreError> {
    session
        .as_deref()
        .ok_or_else(|| CoreError::AuthExpired("no active broker session".to_string()))
}

/// Linear distribution of `total` over `days` points starting at `start`:
/// each day carries `total / days`, cumulative at day k is `total * k / days`.
fn linear_series(start: NaiveDate, days: i64, total: f64) -> Vec<PlPoint> {
    let daily = total / days as f64;
    (0..days)
        .map(|i| PlPoint {
            date: start + ChronoDuration::days(i),
            daily_pl: daily,
            cumulative_pl: total * (i + 1) as f64 / days as f64,
        })
        .collect()
}
