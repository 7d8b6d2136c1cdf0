use crate::domain::mentions::MentionAggregate;
use crate::domain::metrics::FetchedMetrics;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    /// Keyed by ticker. Requested tickers the provider omits are treated as missing.
    pub metrics: BTreeMap<String, FetchedMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionsResponse {
    pub report_date: NaiveDate,
    pub mentions: BTreeMap<String, MentionAggregate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_valid_and_invalid_metrics() {
        let v = json!({
            "metrics": {
                "AAPL": {
                    "status": "valid",
                    "name": "Apple Inc.",
                    "sector": "Technology",
                    "pe_ratio": 28.4,
                    "rsi": 41.0,
                    "insider_transactions": [{"type": "sell", "shares": 1000.0}]
                },
                "ZZZZ": {"status": "invalid", "reason": "no price history"}
            }
        });

        let parsed: MetricsResponse = serde_json::from_value(v).unwrap();
        let aapl = parsed.metrics["AAPL"].valid().unwrap();
        assert_eq!(aapl.pe_ratio, Some(28.4));
        assert_eq!(aapl.peg_ratio, None);
        assert_eq!(aapl.insider_transactions.len(), 1);
        assert!(parsed.metrics["ZZZZ"].valid().is_none());
    }

    #[test]
    fn rejects_non_numeric_metric() {
        let v = json!({
            "metrics": {"AAPL": {"status": "valid", "pe_ratio": "28.4"}}
        });
        assert!(serde_json::from_value::<MetricsResponse>(v).is_err());
    }

    #[test]
    fn parses_mentions_with_sources() {
        let v = json!({
            "report_date": "2026-02-06",
            "mentions": {
                "PLTR": {
                    "total_mentions": 42,
                    "avg_sentiment": 0.35,
                    "sources": {"reddit": {"count": 30, "sentiment": 0.4}}
                },
                "SOFI": {"total_mentions": 7, "avg_sentiment": -0.1, "watchlist_priority": true}
            }
        });

        let parsed: MentionsResponse = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.report_date, NaiveDate::from_ymd_opt(2026, 2, 6).unwrap());
        assert_eq!(parsed.mentions["PLTR"].sources["reddit"].count, 30);
        assert!(parsed.mentions["SOFI"].watchlist_priority);
        assert!(!parsed.mentions["PLTR"].watchlist_priority);
    }
}
