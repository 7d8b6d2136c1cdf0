pub mod analysis;
pub mod domain;
pub mod ingest;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub data_provider_base_url: Option<String>,
        pub data_provider_api_key: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                data_provider_base_url: std::env::var("DATA_PROVIDER_BASE_URL").ok(),
                data_provider_api_key: std::env::var("DATA_PROVIDER_API_KEY").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_data_provider_base_url(&self) -> anyhow::Result<&str> {
            self.data_provider_base_url
                .as_deref()
                .context("DATA_PROVIDER_BASE_URL is required")
        }
    }

    /// Ranking constants. Fixed for the duration of a run.
    #[derive(Debug, Clone, PartialEq)]
    pub struct AnalysisConfig {
        /// Total report size, dark horses included.
        pub top_stocks_count: usize,
        pub dark_horse_count: usize,
        pub min_mentions: u32,
        /// Tickers with a known drawdown smaller than this are not value candidates.
        pub min_drop_from_ath_pct: f64,
        pub dark_horse_max_mentions: u32,
        pub dark_horse_max_institutional_pct: f64,
        pub dark_horse_max_analysts: u32,
        pub dark_horse_min_score: f64,
        /// Universe cap applied before any filtering.
        pub max_candidates: usize,
    }

    impl Default for AnalysisConfig {
        fn default() -> Self {
            Self {
                top_stocks_count: 20,
                dark_horse_count: 2,
                min_mentions: 5,
                min_drop_from_ath_pct: 15.0,
                dark_horse_max_mentions: 50,
                dark_horse_max_institutional_pct: 40.0,
                dark_horse_max_analysts: 10,
                dark_horse_min_score: 50.0,
                max_candidates: 60,
            }
        }
    }

    impl AnalysisConfig {
        pub fn from_env() -> anyhow::Result<Self> {
            let d = Self::default();
            let out = Self {
                top_stocks_count: env_or("TOP_STOCKS_COUNT", d.top_stocks_count)?,
                dark_horse_count: env_or("DARK_HORSE_COUNT", d.dark_horse_count)?,
                min_mentions: env_or("MIN_MENTIONS", d.min_mentions)?,
                min_drop_from_ath_pct: env_or("MIN_DROP_FROM_ATH_PCT", d.min_drop_from_ath_pct)?,
                dark_horse_max_mentions: env_or(
                    "DARK_HORSE_MAX_MENTIONS",
                    d.dark_horse_max_mentions,
                )?,
                dark_horse_max_institutional_pct: env_or(
                    "DARK_HORSE_MAX_INSTITUTIONAL_PCT",
                    d.dark_horse_max_institutional_pct,
                )?,
                dark_horse_max_analysts: env_or(
                    "DARK_HORSE_MAX_ANALYSTS",
                    d.dark_horse_max_analysts,
                )?,
                dark_horse_min_score: env_or("DARK_HORSE_MIN_SCORE", d.dark_horse_min_score)?,
                max_candidates: env_or("MAX_CANDIDATES", d.max_candidates)?,
            };
            out.validate()?;
            Ok(out)
        }

        pub fn validate(&self) -> anyhow::Result<()> {
            anyhow::ensure!(
                self.top_stocks_count >= 1,
                "TOP_STOCKS_COUNT must be >= 1"
            );
            anyhow::ensure!(
                self.dark_horse_count <= self.top_stocks_count,
                "DARK_HORSE_COUNT ({}) must not exceed TOP_STOCKS_COUNT ({})",
                self.dark_horse_count,
                self.top_stocks_count
            );
            Ok(())
        }

        pub fn main_picks_count(&self) -> usize {
            self.top_stocks_count.saturating_sub(self.dark_horse_count)
        }
    }

    fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match std::env::var(key) {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{key} is invalid ({s:?}): {e}")),
            _ => Ok(default),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn default_config_is_valid() {
            let c = AnalysisConfig::default();
            c.validate().unwrap();
            assert_eq!(c.main_picks_count(), 18);
        }

        #[test]
        fn rejects_more_dark_horses_than_slots() {
            let c = AnalysisConfig {
                top_stocks_count: 2,
                dark_horse_count: 3,
                ..Default::default()
            };
            assert!(c.validate().is_err());
        }
    }
}
