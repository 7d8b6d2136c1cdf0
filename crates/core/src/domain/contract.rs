use crate::config::AnalysisConfig;
use crate::domain::report::DailyReport;
use anyhow::{bail, ensure};
use std::collections::BTreeSet;

impl DailyReport {
    /// Checks the shape invariants a report must satisfy before it is persisted.
    pub fn validate(&self, config: &AnalysisConfig) -> anyhow::Result<()> {
        let n = self.items.len();
        ensure!(n >= 1, "report must contain at least one item");
        ensure!(
            n <= config.top_stocks_count,
            "report has {n} items, more than top_stocks_count={}",
            config.top_stocks_count
        );
        ensure!(
            self.stocks_passing_criteria >= n,
            "stocks_passing_criteria ({}) is smaller than item count ({n})",
            self.stocks_passing_criteria
        );

        let mut seen_tickers = BTreeSet::<&str>::new();
        let mut seen_dark_horse = false;
        let mut dark_horses = 0usize;

        for (idx, item) in self.items.iter().enumerate() {
            let expected_rank = (idx + 1) as u32;
            if item.rank != expected_rank {
                bail!(
                    "rank gap or repeat at position {}: expected {expected_rank}, got {}",
                    idx + 1,
                    item.rank
                );
            }

            let stock = &item.stock;
            ensure!(!stock.ticker.trim().is_empty(), "ticker must be non-empty");
            ensure!(
                seen_tickers.insert(stock.ticker.as_str()),
                "duplicate ticker: {}",
                stock.ticker
            );
            ensure!(
                !stock.buy_case.trim().is_empty(),
                "buy case must be non-empty ({})",
                stock.ticker
            );
            ensure!(
                !stock.risk_factors.is_empty()
                    && stock.risk_factors.iter().all(|r| !r.trim().is_empty()),
                "risk factors must be non-empty ({})",
                stock.ticker
            );

            if stock.is_dark_horse {
                ensure!(
                    stock.dark_horse_reasons.len() >= 2,
                    "dark horse {} has fewer than 2 reasons",
                    stock.ticker
                );
                seen_dark_horse = true;
                dark_horses += 1;
            } else {
                ensure!(
                    !seen_dark_horse,
                    "main pick {} ranked after a dark horse pick",
                    stock.ticker
                );
            }
        }

        ensure!(
            dark_horses <= config.dark_horse_count,
            "report has {dark_horses} dark horses, more than dark_horse_count={}",
            config.dark_horse_count
        );

        Ok(())
    }
}
