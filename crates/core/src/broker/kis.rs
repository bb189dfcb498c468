use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::broker::credentials::BrokerCredentials;
use crate::broker::traits::{
    AccountBalance, BrokerClient, BrokerSession, Holding, OrderRecord, QuoteData, RealizedProfit,
    RealizedProfits,
};
use crate::errors::CoreError;
use crate::models::transaction::TradeSide;

const BROKER_NAME: &str = "KIS";

const REAL_BASE_URL: &str = "https://openapi.koreainvestment.com:9443";
const VIRTUAL_BASE_URL: &str = "https://openapivts.koreainvestment.com:29443";

// Transaction ids for the real-account endpoints we use.
const TR_BALANCE: &str = "TTTC8434R";
const TR_SEARCH_INFO: &str = "CTPF1604R";
const TR_PRICE: &str = "FHKST01010100";
const TR_DAILY_ORDERS: &str = "TTTC8001R";
const TR_PERIOD_PROFIT: &str = "TTTC8715R";

/// Gateway error codes that mean the access token is invalid or expired.
const TOKEN_ERROR_CODES: [&str; 3] = ["EGW00121", "EGW00123", "EGW00201"];

/// KIS OpenAPI client — the brokerage upstream of the dashboard.
///
/// Credentials are loaded lazily on `authenticate`, so a missing secret
/// file surfaces as `MissingCredential` and the data service can start in
/// disconnected mode instead of failing construction.
pub struct KisClient {
    secret_path: PathBuf,
    http: Client,
}

impl KisClient {
    pub fn new(secret_path: impl Into<PathBuf>) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        Self {
            secret_path: secret_path.into(),
            http: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl BrokerClient for KisClient {
    fn name(&self) -> &str {
        BROKER_NAME
    }

    async fn authenticate(&self) -> Result<Box<dyn BrokerSession>, CoreError> {
        let credentials = BrokerCredentials::load(&self.secret_path)?;
        let base_url = if credentials.virtual_account {
            VIRTUAL_BASE_URL
        } else {
            REAL_BASE_URL
        };

        let body = serde_json::json!({
            "grant_type": "client_credentials",
            "appkey": credentials.app_key,
            "appsecret": credentials.app_secret,
        });

        let resp = self
            .http
            .post(format!("{base_url}/oauth2/tokenP"))
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CoreError::Handshake(format!(
                "token request failed (HTTP {status}): {text}"
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::Handshake(format!("invalid token response: {e}")))?;

        Ok(Box::new(KisSession {
            http: self.http.clone(),
            base_url: base_url.to_string(),
            token: token.access_token,
            credentials,
        }))
    }
}

/// An authenticated KIS session holding a bearer token.
///
/// The token is never refreshed in place; once the gateway reports it
/// expired the session returns `AuthExpired` and the owner re-authenticates
/// through the client, replacing the whole session.
pub struct KisSession {
    http: Client,
    base_url: String,
    token: String,
    credentials: BrokerCredentials,
}

#[async_trait]
impl BrokerSession for KisSession {
    async fn balance(&self) -> Result<AccountBalance, CoreError> {
        let (cano, prdt_cd) = self.credentials.account_parts();
        let query = [
            ("CANO", cano),
            ("ACNT_PRDT_CD", prdt_cd),
            ("AFHR_FLPR_YN", "N".into()),
            ("OFL_YN", String::new()),
            ("INQR_DVSN", "02".into()),
            ("UNPR_DVSN", "01".into()),
            ("FUND_STTL_ICLD_YN", "N".into()),
            ("FNCG_AMT_AUTO_RDPT_YN", "N".into()),
            ("PRCS_DVSN", "00".into()),
            ("CTX_AREA_FK100", String::new()),
            ("CTX_AREA_NK100", String::new()),
        ];

        let resp: BalanceResponse = self
            .get_json("/uapi/domestic-stock/v1/trading/inquire-balance", TR_BALANCE, &query)
            .await?;
        check_envelope(&resp.rt_cd, &resp.msg_cd, &resp.msg1)?;

        let holdings = resp
            .output1
            .iter()
            .filter(|row| qty(&row.hldg_qty) > 0)
            .map(|row| Holding {
                symbol: row.pdno.clone(),
                quantity: num(&row.hldg_qty),
                price: num(&row.prpr),
                amount: num(&row.evlu_amt),
                profit: num(&row.evlu_pfls_amt),
                profit_rate: num(&row.evlu_pfls_rt),
            })
            .collect();

        let summary = resp.output2.first();
        let mut cash_by_currency = HashMap::new();
        if let Some(s) = summary {
            cash_by_currency.insert("KRW".to_string(), num(&s.dnca_tot_amt));
        }

        Ok(AccountBalance {
            holdings,
            cash_by_currency,
            securities_value: summary.map_or(0.0, |s| num(&s.scts_evlu_amt)),
            profit: summary.map_or(0.0, |s| num(&s.evlu_pfls_smtl_amt)),
            profit_rate: summary.map_or(0.0, |s| num(&s.asst_icdc_erng_rt)),
        })
    }

    async fn instrument_name(&self, symbol: &str) -> Result<String, CoreError> {
        let query = [
            ("PDNO", symbol.to_string()),
            ("PRDT_TYPE_CD", "300".into()),
        ];

        let resp: SearchInfoResponse = self
            .get_json("/uapi/domestic-stock/v1/quotations/search-info", TR_SEARCH_INFO, &query)
            .await?;
        check_envelope(&resp.rt_cd, &resp.msg_cd, &resp.msg1)?;

        let output = resp.output.unwrap_or_default();
        let name = if output.prdt_abrv_name.is_empty() {
            output.prdt_name
        } else {
            output.prdt_abrv_name
        };
        if name.is_empty() {
            return Err(CoreError::Api {
                broker: BROKER_NAME.to_string(),
                message: format!("No instrument name returned for {symbol}"),
            });
        }
        Ok(name)
    }

    async fn quote(&self, symbol: &str) -> Result<QuoteData, CoreError> {
        let query = [
            ("FID_COND_MRKT_DIV_CODE", "J".to_string()),
            ("FID_INPUT_ISCD", symbol.to_string()),
        ];

        let resp: PriceResponse = self
            .get_json("/uapi/domestic-stock/v1/quotations/inquire-price", TR_PRICE, &query)
            .await?;
        check_envelope(&resp.rt_cd, &resp.msg_cd, &resp.msg1)?;

        let output = resp.output.unwrap_or_default();
        Ok(QuoteData {
            price: num(&output.stck_prpr),
            change: num(&output.prdy_vrss),
            rate: num(&output.prdy_ctrt),
            volume: qty(&output.acml_vol),
            market_cap: num(&output.hts_avls),
        })
    }

    async fn orders(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<OrderRecord>, CoreError> {
        let (cano, prdt_cd) = self.credentials.account_parts();
        let query = [
            ("CANO", cano),
            ("ACNT_PRDT_CD", prdt_cd),
            ("INQR_STRT_DT", from.format("%Y%m%d").to_string()),
            ("INQR_END_DT", to.format("%Y%m%d").to_string()),
            ("SLL_BUY_DVSN_CD", "00".into()),
            ("INQR_DVSN", "00".into()),
            ("PDNO", String::new()),
            ("CCLD_DVSN", "00".into()),
            ("ORD_GNO_BRNO", String::new()),
            ("ODNO", String::new()),
            ("INQR_DVSN_3", "00".into()),
            ("INQR_DVSN_1", String::new()),
            ("CTX_AREA_FK100", String::new()),
            ("CTX_AREA_NK100", String::new()),
        ];

        let resp: DailyOrdersResponse = self
            .get_json("/uapi/domestic-stock/v1/trading/inquire-daily-ccld", TR_DAILY_ORDERS, &query)
            .await?;
        check_envelope(&resp.rt_cd, &resp.msg_cd, &resp.msg1)?;

        let orders = resp
            .output1
            .iter()
            .map(|row| {
                let executed_quantity = qty(&row.tot_ccld_qty);
                let price = if executed_quantity > 0 {
                    num(&row.tot_ccld_amt) / executed_quantity as f64
                } else {
                    num(&row.ord_unpr)
                };
                OrderRecord {
                    symbol: row.pdno.clone(),
                    order_id: row.odno.clone(),
                    side: if row.sll_buy_dvsn_cd == "01" {
                        TradeSide::Sell
                    } else {
                        TradeSide::Buy
                    },
                    executed_quantity,
                    price,
                    executed_at: parse_order_timestamp(&row.ord_dt, &row.ord_tmd),
                }
            })
            .collect();

        Ok(orders)
    }

    async fn realized_profits(&self, since: NaiveDate) -> Result<RealizedProfits, CoreError> {
        let (cano, prdt_cd) = self.credentials.account_parts();
        let query = [
            ("CANO", cano),
            ("ACNT_PRDT_CD", prdt_cd),
            ("INQR_STRT_DT", since.format("%Y%m%d").to_string()),
            ("INQR_END_DT", Utc::now().date_naive().format("%Y%m%d").to_string()),
            ("SORT_DVSN", "00".into()),
            ("INQR_DVSN", "00".into()),
            ("CBLC_DVSN", "00".into()),
            ("PDNO", String::new()),
            ("CTX_AREA_FK100", String::new()),
            ("CTX_AREA_NK100", String::new()),
        ];

        let resp: PeriodProfitResponse = self
            .get_json("/uapi/domestic-stock/v1/trading/inquire-period-profit", TR_PERIOD_PROFIT, &query)
            .await?;
        check_envelope(&resp.rt_cd, &resp.msg_cd, &resp.msg1)?;

        let records = resp
            .output1
            .iter()
            .filter_map(|row| {
                let realized_on = NaiveDate::parse_from_str(&row.trad_dt, "%Y%m%d").ok()?;
                Some(RealizedProfit {
                    realized_on,
                    profit: num(&row.rlzt_pfls),
                })
            })
            .collect();

        Ok(RealizedProfits {
            records,
            total_profit: resp.output2.map_or(0.0, |s| num(&s.tot_rlzt_pfls)),
        })
    }
}

impl KisSession {
    /// Issue an authenticated GET against the gateway and deserialize the
    /// response. HTTP-level auth rejections become `AuthExpired` here;
    /// payload-level error codes are handled per call via `check_envelope`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        tr_id: &str,
        query: &[(&str, String)],
    ) -> Result<T, CoreError> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("authorization", format!("Bearer {}", self.token))
            .header("appkey", &self.credentials.app_key)
            .header("appsecret", &self.credentials.app_secret)
            .header("tr_id", tr_id)
            .header("custtype", "P")
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let text = resp.text().await.unwrap_or_default();
            return Err(CoreError::AuthExpired(format!("HTTP {status}: {text}")));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CoreError::Api {
                broker: BROKER_NAME.to_string(),
                message: format!("HTTP {status} from {path}: {text}"),
            });
        }

        resp.json::<T>().await.map_err(|e| CoreError::Api {
            broker: BROKER_NAME.to_string(),
            message: format!("Failed to parse response from {path}: {e}"),
        })
    }
}

/// Map a payload-level error envelope to a structured error. Token-related
/// gateway codes (and, as a fallback, token-ish message text) become
/// `AuthExpired`; everything else is a plain API error.
fn check_envelope(rt_cd: &str, msg_cd: &str, msg1: &str) -> Result<(), CoreError> {
    if rt_cd == "0" {
        return Ok(());
    }
    let lowered = msg1.to_ascii_lowercase();
    if TOKEN_ERROR_CODES.contains(&msg_cd) || lowered.contains("token") || lowered.contains("auth") {
        Err(CoreError::AuthExpired(format!("{msg_cd}: {msg1}")))
    } else {
        Err(CoreError::Api {
            broker: BROKER_NAME.to_string(),
            message: format!("{msg_cd}: {msg1}"),
        })
    }
}

/// The gateway reports every number as a string; missing or malformed
/// values degrade to zero rather than failing the whole dataset.
fn num(s: &str) -> f64 {
    s.trim().replace(',', "").parse().unwrap_or(0.0)
}

fn qty(s: &str) -> u64 {
    s.trim().replace(',', "").parse().unwrap_or(0)
}

fn parse_order_timestamp(date: &str, time: &str) -> NaiveDateTime {
    let d = NaiveDate::parse_from_str(date, "%Y%m%d");
    let t = NaiveTime::parse_from_str(time, "%H%M%S");
    match (d, t) {
        (Ok(d), Ok(t)) => d.and_time(t),
        (Ok(d), Err(_)) => d.and_time(NaiveTime::default()),
        _ => Utc::now().naive_utc(),
    }
}

// ── KIS API response types ──────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    rt_cd: String,
    #[serde(default)]
    msg_cd: String,
    #[serde(default)]
    msg1: String,
    #[serde(default)]
    output1: Vec<BalanceRow>,
    #[serde(default)]
    output2: Vec<BalanceSummaryRow>,
}

#[derive(Deserialize)]
struct BalanceRow {
    #[serde(default)]
    pdno: String,
    #[serde(default)]
    hldg_qty: String,
    #[serde(default)]
    prpr: String,
    #[serde(default)]
    evlu_amt: String,
    #[serde(default)]
    evlu_pfls_amt: String,
    #[serde(default)]
    evlu_pfls_rt: String,
}

#[derive(Deserialize)]
struct BalanceSummaryRow {
    #[serde(default)]
    dnca_tot_amt: String,
    #[serde(default)]
    scts_evlu_amt: String,
    #[serde(default)]
    evlu_pfls_smtl_amt: String,
    #[serde(default)]
    asst_icdc_erng_rt: String,
}

#[derive(Deserialize)]
struct SearchInfoResponse {
    #[serde(default)]
    rt_cd: String,
    #[serde(default)]
    msg_cd: String,
    #[serde(default)]
    msg1: String,
    output: Option<SearchInfoOutput>,
}

#[derive(Default, Deserialize)]
struct SearchInfoOutput {
    #[serde(default)]
    prdt_abrv_name: String,
    #[serde(default)]
    prdt_name: String,
}

#[derive(Deserialize)]
struct PriceResponse {
    #[serde(default)]
    rt_cd: String,
    #[serde(default)]
    msg_cd: String,
    #[serde(default)]
    msg1: String,
    output: Option<PriceOutput>,
}

#[derive(Default, Deserialize)]
struct PriceOutput {
    #[serde(default)]
    stck_prpr: String,
    #[serde(default)]
    prdy_vrss: String,
    #[serde(default)]
    prdy_ctrt: String,
    #[serde(default)]
    acml_vol: String,
    #[serde(default)]
    hts_avls: String,
}

#[derive(Deserialize)]
struct DailyOrdersResponse {
    #[serde(default)]
    rt_cd: String,
    #[serde(default)]
    msg_cd: String,
    #[serde(default)]
    msg1: String,
    #[serde(default)]
    output1: Vec<DailyOrderRow>,
}

#[derive(Deserialize)]
struct DailyOrderRow {
    #[serde(default)]
    ord_dt: String,
    #[serde(default)]
    ord_tmd: String,
    #[serde(default)]
    odno: String,
    #[serde(default)]
    pdno: String,
    #[serde(default)]
    sll_buy_dvsn_cd: String,
    #[serde(default)]
    tot_ccld_qty: String,
    #[serde(default)]
    tot_ccld_amt: String,
    #[serde(default)]
    ord_unpr: String,
}

#[derive(Deserialize)]
struct PeriodProfitResponse {
    #[serde(default)]
    rt_cd: String,
    #[serde(default)]
    msg_cd: String,
    #[serde(default)]
    msg1: String,
    #[serde(default)]
    output1: Vec<PeriodProfitRow>,
    output2: Option<PeriodProfitSummary>,
}

#[derive(Deserialize)]
struct PeriodProfitRow {
    #[serde(default)]
    trad_dt: String,
    #[serde(default)]
    rlzt_pfls: String,
}

#[derive(Deserialize)]
struct PeriodProfitSummary {
    #[serde(default)]
    tot_rlzt_pfls: String,
}
