use crate::config::AnalysisConfig;
use crate::domain::metrics::MarketCapCategory;
use crate::domain::report::AnalyzedStock;

/// Under-coverage reasons for one stock, in check order.
pub fn dark_horse_reasons(stock: &AnalyzedStock, config: &AnalysisConfig) -> Vec<String> {
    let mut reasons = Vec::new();
    let m = &stock.metrics;

    let mentions = stock.mentions.total_mentions;
    if mentions < config.dark_horse_max_mentions {
        reasons.push(format!(
            "Only {mentions} social mentions this week; under the radar"
        ));
    }

    if let Some(inst) = m
        .institutional_ownership
        .filter(|v| *v < config.dark_horse_max_institutional_pct)
    {
        reasons.push(format!(
            "Only {inst:.0}% institutional ownership; big money hasn't piled in yet"
        ));
    }

    if let Some(category) = m
        .cap_category()
        .filter(|c| matches!(c, MarketCapCategory::Small | MarketCapCategory::Mid))
    {
        reasons.push(format!(
            "{}-cap with less institutional attention",
            category.title()
        ));
    }

    if let Some(n) = m
        .analyst_count
        .filter(|n| *n < config.dark_horse_max_analysts)
    {
        reasons.push(format!(
            "Only {n} analysts covering; potentially undiscovered"
        ));
    }

    reasons
}

/// Re-flags qualifying stocks as dark horses. A stock qualifies with at least two
/// under-coverage reasons and a score above the floor. Scores are not touched and
/// input order is preserved.
pub fn select_dark_horses(
    stocks: Vec<AnalyzedStock>,
    config: &AnalysisConfig,
) -> Vec<AnalyzedStock> {
    stocks
        .into_iter()
        .map(|stock| {
            let reasons = dark_horse_reasons(&stock, config);
            if reasons.len() >= 2 && stock.score > config.dark_horse_min_score {
                tracing::debug!(
                    ticker = %stock.ticker,
                    score = stock.score,
                    reasons = reasons.len(),
                    "flagged dark horse"
                );
                stock.into_dark_horse(reasons)
            } else {
                stock
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mentions::MentionAggregate;
    use crate::domain::metrics::MetricsSnapshot;
    use crate::domain::report::{SectorCategory, SignalCounts};

    fn stock(ticker: &str, score: f64, mentions: u32, metrics: MetricsSnapshot) -> AnalyzedStock {
        AnalyzedStock {
            ticker: ticker.to_string(),
            metrics,
            mentions: MentionAggregate {
                total_mentions: mentions,
                ..Default::default()
            },
            sector_category: SectorCategory::Other,
            score,
            signals: SignalCounts::default(),
            buy_case: "x.".to_string(),
            risk_factors: vec!["y".to_string()],
            is_dark_horse: false,
            dark_horse_reasons: Vec::new(),
        }
    }

    #[test]
    fn collects_all_four_reasons() {
        let s = stock(
            "SMOL",
            80.0,
            12,
            MetricsSnapshot {
                institutional_ownership: Some(22.0),
                market_cap: Some(1.2),
                analyst_count: Some(3),
                ..Default::default()
            },
        );
        let reasons = dark_horse_reasons(&s, &AnalysisConfig::default());
        assert_eq!(
            reasons,
            vec![
                "Only 12 social mentions this week; under the radar",
                "Only 22% institutional ownership; big money hasn't piled in yet",
                "Small-cap with less institutional attention",
                "Only 3 analysts covering; potentially undiscovered",
            ]
        );
    }

    #[test]
    fn requires_two_reasons_and_score_above_floor() {
        let config = AnalysisConfig::default();
        let crowded_mega = MetricsSnapshot {
            market_cap: Some(900.0),
            institutional_ownership: Some(70.0),
            analyst_count: Some(40),
            ..Default::default()
        };
        let quiet_mid = MetricsSnapshot {
            market_cap: Some(4.0),
            ..Default::default()
        };

        let out = select_dark_horses(
            vec![
                // One reason only (mentions).
                stock("MEGA", 90.0, 10, crowded_mega),
                // Two reasons, score above the floor.
                stock("MIDQ", 70.0, 10, quiet_mid.clone()),
                // Two reasons, but score at the floor is not above it.
                stock("FLOR", 50.0, 10, quiet_mid),
            ],
            &config,
        );

        let flags: Vec<_> = out.iter().map(|s| (s.ticker.as_str(), s.is_dark_horse)).collect();
        assert_eq!(flags, vec![("MEGA", false), ("MIDQ", true), ("FLOR", false)]);
        for s in &out {
            if s.is_dark_horse {
                assert!(s.dark_horse_reasons.len() >= 2);
                assert!(s.score > config.dark_horse_min_score);
            } else {
                assert!(s.dark_horse_reasons.is_empty());
            }
        }
        // Scores are untouched.
        assert_eq!(out[1].score, 70.0);
    }

    #[test]
    fn absent_ownership_and_coverage_are_not_reasons() {
        let s = stock("NONE", 99.0, 500, MetricsSnapshot::default());
        assert!(dark_horse_reasons(&s, &AnalysisConfig::default()).is_empty());
    }
}
