use crate::config::Settings;
use crate::domain::mentions::MentionAggregate;
use crate::domain::metrics::FetchedMetrics;
use crate::ingest::types::{MentionsResponse, MetricsResponse};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_METRICS_PATH: &str = "/v1/metrics";
const DEFAULT_MENTIONS_PATH: &str = "/v1/mentions";
const DEFAULT_RETRIES: u32 = 3;
const METRICS_BATCH_SIZE: usize = 25;

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Snapshots keyed by upper-case ticker. Unresolvable tickers come back as
    /// `FetchedMetrics::Invalid` or are absent.
    async fn fetch_metrics(&self, tickers: &[String]) -> Result<BTreeMap<String, FetchedMetrics>>;
}

#[async_trait::async_trait]
pub trait MentionProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_mentions(
        &self,
        report_date: NaiveDate,
    ) -> Result<BTreeMap<String, MentionAggregate>>;
}

#[derive(Debug, Clone)]
pub struct HttpJsonDataProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    metrics_path: String,
    mentions_path: String,
    retries: u32,
}

fn env_path(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl HttpJsonDataProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_data_provider_base_url()?.to_string();
        let api_key = settings.data_provider_api_key.clone();

        let timeout_secs = std::env::var("DATA_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("DATA_PROVIDER_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build data provider http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            metrics_path: env_path("DATA_PROVIDER_METRICS_PATH", DEFAULT_METRICS_PATH),
            mentions_path: env_path("DATA_PROVIDER_MENTIONS_PATH", DEFAULT_MENTIONS_PATH),
            retries,
        })
    }

    fn url(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let res = self
            .http
            .get(self.url(path))
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .context("data provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read provider response")?;

        if !status.is_success() {
            anyhow::bail!("data provider HTTP {status}: {text}");
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("failed to parse provider response from {path}"))
    }

    async fn get_with_retries<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.get_once(path, query).await {
                Ok(parsed) => return Ok(parsed),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, path, ?backoff, error = %err, "data provider fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for HttpJsonDataProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_metrics(&self, tickers: &[String]) -> Result<BTreeMap<String, FetchedMetrics>> {
        let mut out = BTreeMap::new();
        for batch in tickers.chunks(METRICS_BATCH_SIZE) {
            let query = [("tickers", batch.join(","))];
            let resp = self.get_with_retries(&self.metrics_path, &query).await;
            merge_batch(&mut out, batch, resp);
        }

        let invalid = out.values().filter(|m| m.valid().is_none()).count();
        tracing::info!(
            requested = tickers.len(),
            returned = out.len(),
            invalid,
            "fetched market metrics"
        );
        Ok(out)
    }
}

#[async_trait::async_trait]
impl MentionProvider for HttpJsonDataProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_mentions(
        &self,
        report_date: NaiveDate,
    ) -> Result<BTreeMap<String, MentionAggregate>> {
        let query = [("report_date", report_date.to_string())];
        let resp: MentionsResponse = self
            .get_with_retries(&self.mentions_path, &query)
            .await
            .context("mentions fetch failed")?;
        let mentions = validate_mentions(resp, report_date)?;
        tracing::info!(%report_date, tickers = mentions.len(), "fetched mention aggregates");
        Ok(mentions)
    }
}

pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Upper-cases keys and drops entries nobody asked for.
fn normalize_metrics(
    resp: MetricsResponse,
    requested: &[String],
) -> Result<BTreeMap<String, FetchedMetrics>> {
    let mut out = BTreeMap::new();
    for (raw, metrics) in resp.metrics {
        let ticker = normalize_ticker(&raw);
        anyhow::ensure!(!ticker.is_empty(), "metrics ticker must be non-empty");
        if !requested.iter().any(|t| normalize_ticker(t) == ticker) {
            tracing::debug!(%ticker, "provider returned unrequested ticker; dropping");
            continue;
        }
        out.insert(ticker, metrics);
    }
    Ok(out)
}

/// Folds one batch into `out`. A failed batch marks its tickers invalid instead of
/// failing the whole fetch.
fn merge_batch(
    out: &mut BTreeMap<String, FetchedMetrics>,
    batch: &[String],
    resp: Result<MetricsResponse>,
) {
    let err = match resp.and_then(|r| normalize_metrics(r, batch)) {
        Ok(metrics) => {
            out.extend(metrics);
            return;
        }
        Err(err) => err,
    };

    tracing::warn!(
        first = ?batch.first(),
        size = batch.len(),
        error = %format!("{err:#}"),
        "metrics batch failed; marking tickers invalid"
    );
    for raw in batch {
        let ticker = normalize_ticker(raw);
        if ticker.is_empty() {
            continue;
        }
        out.insert(
            ticker,
            FetchedMetrics::Invalid {
                reason: format!("metrics fetch failed: {err:#}"),
            },
        );
    }
}

fn validate_mentions(
    resp: MentionsResponse,
    expected: NaiveDate,
) -> Result<BTreeMap<String, MentionAggregate>> {
    anyhow::ensure!(
        resp.report_date == expected,
        "provider report_date mismatch: expected {expected}, got {}",
        resp.report_date
    );

    let mut out = BTreeMap::new();
    for (raw, aggregate) in resp.mentions {
        let ticker = normalize_ticker(&raw);
        anyhow::ensure!(!ticker.is_empty(), "mention ticker must be non-empty");
        anyhow::ensure!(
            aggregate.avg_sentiment.is_finite(),
            "{ticker}: avg_sentiment must be finite"
        );
        out.insert(ticker, aggregate);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn normalizes_and_filters_metrics_keys() {
        let resp: MetricsResponse = serde_json::from_value(json!({
            "metrics": {
                " aapl ": {"status": "valid", "rsi": 35.0},
                "EXTRA": {"status": "valid"},
                "zzzz": {"status": "invalid", "reason": "delisted"}
            }
        }))
        .unwrap();

        let out = normalize_metrics(resp, &["AAPL".to_string(), "zzzz".to_string()]).unwrap();
        let keys: Vec<_> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["AAPL", "ZZZZ"]);
        assert_eq!(out["AAPL"].valid().unwrap().rsi, Some(35.0));
    }

    #[test]
    fn failed_batch_marks_only_its_tickers_invalid() {
        let batches: Vec<Vec<String>> = vec![
            vec!["AAPL".to_string(), "MSFT".to_string()],
            vec!["PLTR".to_string(), "SOFI".to_string()],
            vec!["NVDA".to_string()],
        ];
        let responses: Vec<Result<MetricsResponse>> = vec![
            Ok(serde_json::from_value(json!({
                "metrics": {"AAPL": {"status": "valid", "rsi": 41.0}, "MSFT": {"status": "valid"}}
            }))
            .unwrap()),
            Err(anyhow::anyhow!("data provider HTTP 502 Bad Gateway")),
            Ok(serde_json::from_value(json!({
                "metrics": {"NVDA": {"status": "valid", "rsi": 66.0}}
            }))
            .unwrap()),
        ];

        let mut out = BTreeMap::new();
        for (batch, resp) in batches.iter().zip(responses) {
            merge_batch(&mut out, batch, resp);
        }

        assert_eq!(out.len(), 5);
        assert_eq!(out["AAPL"].valid().unwrap().rsi, Some(41.0));
        assert!(out["MSFT"].valid().is_some());
        assert_eq!(out["NVDA"].valid().unwrap().rsi, Some(66.0));
        for t in ["PLTR", "SOFI"] {
            match &out[t] {
                FetchedMetrics::Invalid { reason } => assert!(reason.contains("HTTP 502")),
                other => panic!("{t} should be invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_batch_is_contained() {
        let resp: MetricsResponse = serde_json::from_value(json!({
            "metrics": {" ": {"status": "valid"}, "AAPL": {"status": "valid"}}
        }))
        .unwrap();

        let mut out = BTreeMap::new();
        merge_batch(&mut out, &["aapl".to_string()], Ok(resp));
        assert!(out["AAPL"].valid().is_none());
    }

    #[test]
    fn rejects_mentions_for_another_date() {
        let resp: MentionsResponse = serde_json::from_value(json!({
            "report_date": "2026-02-05",
            "mentions": {"PLTR": {"total_mentions": 10, "avg_sentiment": 0.2}}
        }))
        .unwrap();

        assert!(validate_mentions(resp.clone(), date(2026, 2, 6)).is_err());
        let ok = validate_mentions(resp, date(2026, 2, 5)).unwrap();
        assert_eq!(ok["PLTR"].total_mentions, 10);
    }

    #[test]
    fn rejects_blank_mention_ticker() {
        let resp: MentionsResponse = serde_json::from_value(json!({
            "report_date": "2026-02-05",
            "mentions": {"  ": {"total_mentions": 10}}
        }))
        .unwrap();
        assert!(validate_mentions(resp, date(2026, 2, 5)).is_err());
    }

    #[test]
    fn joins_base_url_and_path() {
        let settings = Settings {
            database_url: None,
            sentry_dsn: None,
            data_provider_base_url: Some("https://data.example.com/".to_string()),
            data_provider_api_key: None,
        };
        let provider = HttpJsonDataProvider::from_settings(&settings).unwrap();
        assert_eq!(provider.url("v1/metrics"), "https://data.example.com/v1/metrics");
        assert_eq!(provider.url("/v1/mentions"), "https://data.example.com/v1/mentions");
    }
}
