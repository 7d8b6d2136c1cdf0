use crate::domain::metrics::MetricsSnapshot;

pub struct ScoreInput<'a> {
    pub metrics: &'a MetricsSnapshot,
    pub mentions: u32,
    pub sentiment: f64,
}

/// One additive scoring rule. `points` returns `None` when the rule does not apply,
/// including when any field it reads is absent.
pub struct ScoreRule {
    pub id: &'static str,
    pub points: fn(&ScoreInput<'_>) -> Option<f64>,
}

pub const SCORE_RULES: &[ScoreRule] = &[
    ScoreRule {
        id: "ath_discount",
        points: |i| {
            let pct = i.metrics.pct_from_ath?;
            if (15.0..=50.0).contains(&pct) {
                Some(pct.min(40.0) * 1.5)
            } else if pct > 50.0 {
                // Capped: deep drawdowns are often falling knives.
                Some(40.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        id: "mention_volume",
        points: |i| match i.mentions {
            10..=100 => Some(20.0),
            m if m > 100 => Some(10.0),
            _ => None,
        },
    },
    ScoreRule {
        id: "sentiment",
        points: |i| {
            if i.sentiment > 0.3 {
                Some(15.0)
            } else if i.sentiment > 0.0 {
                Some(10.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        id: "rsi_oversold",
        points: |i| {
            let rsi = i.metrics.rsi?;
            if rsi < 30.0 {
                Some(25.0)
            } else if rsi < 40.0 {
                Some(15.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        id: "pe_value",
        points: |i| {
            let pe = i.metrics.pe_ratio?;
            if pe > 5.0 && pe < 15.0 {
                Some(20.0)
            } else if (15.0..25.0).contains(&pe) {
                Some(10.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        id: "forward_pe_growth",
        points: |i| {
            let pe = i.metrics.pe_ratio.filter(|v| *v > 0.0)?;
            let fpe = i.metrics.forward_pe.filter(|v| *v > 0.0)?;
            (fpe < pe * 0.85).then_some(10.0)
        },
    },
    ScoreRule {
        id: "peg_under_one",
        points: |i| {
            let peg = i.metrics.peg_ratio?;
            (peg > 0.0 && peg < 1.0).then_some(20.0)
        },
    },
    ScoreRule {
        id: "low_leverage",
        points: |i| {
            let de = i.metrics.debt_to_equity.filter(|v| *v >= 0.0)?;
            if de < 0.5 {
                Some(15.0)
            } else if de < 1.0 {
                Some(10.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        id: "positive_fcf",
        points: |i| (i.metrics.free_cash_flow? > 0.0).then_some(15.0),
    },
    ScoreRule {
        id: "fcf_yield",
        points: |i| (i.metrics.fcf_yield_pct()? > 5.0).then_some(10.0),
    },
    ScoreRule {
        id: "insider_buying",
        points: |i| i.metrics.insider_buys().next().map(|_| 20.0),
    },
    ScoreRule {
        id: "analyst_upside",
        points: |i| {
            let upside = i.metrics.target_upside_pct()?;
            if upside > 30.0 {
                Some(20.0)
            } else if upside > 15.0 {
                Some(10.0)
            } else {
                None
            }
        },
    },
    ScoreRule {
        id: "momentum_reversal",
        points: |i| {
            let month = i.metrics.one_month_return?;
            let year = i.metrics.one_year_return?;
            (month > 0.0 && year < -20.0).then_some(10.0)
        },
    },
    ScoreRule {
        id: "dividend",
        points: |i| {
            let y = i.metrics.dividend_yield?;
            (2.0..=8.0).contains(&y).then_some(5.0)
        },
    },
];

/// Composite attractiveness score, rounded to 2 decimals. Never negative.
pub fn score(metrics: &MetricsSnapshot, mentions: u32, sentiment: f64) -> f64 {
    let input = ScoreInput {
        metrics,
        mentions,
        sentiment,
    };
    let total: f64 = SCORE_RULES
        .iter()
        .filter_map(|rule| (rule.points)(&input))
        .sum();
    (total * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::{InsiderTransaction, TransactionKind};

    fn full_snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            market_cap: Some(8.0),
            current_price: Some(40.0),
            pct_from_ath: Some(35.0),
            pe_ratio: Some(12.0),
            forward_pe: Some(9.0),
            peg_ratio: Some(0.8),
            debt_to_equity: Some(0.3),
            free_cash_flow: Some(0.9),
            dividend_yield: Some(3.0),
            rsi: Some(27.0),
            one_year_return: Some(-35.0),
            one_month_return: Some(4.0),
            target_price_mean: Some(60.0),
            insider_transactions: vec![InsiderTransaction {
                kind: TransactionKind::Buy,
                shares: Some(10_000.0),
                value: Some(400_000.0),
                insider: None,
                date: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn scores_elevated_value_candidate() {
        // 52.5 + 20 + 15 + 25 + 20 + 10 + 20 + 15 + 15 + 10 + 20 + 20 + 10 + 5
        assert_eq!(score(&full_snapshot(), 50, 0.4), 257.5);
    }

    #[test]
    fn empty_snapshot_with_no_attention_scores_zero() {
        assert_eq!(score(&MetricsSnapshot::default(), 0, 0.0), 0.0);
    }

    #[test]
    fn drawdown_is_scaled_then_capped() {
        let at = |pct: f64| {
            score(
                &MetricsSnapshot {
                    pct_from_ath: Some(pct),
                    ..Default::default()
                },
                0,
                0.0,
            )
        };
        assert_eq!(at(10.0), 0.0);
        assert_eq!(at(20.0), 30.0);
        assert_eq!(at(45.0), 60.0);
        assert_eq!(at(70.0), 40.0);
    }

    #[test]
    fn crowded_trade_scores_below_moderate_attention() {
        let s = MetricsSnapshot::default();
        assert!(score(&s, 50, 0.0) > score(&s, 500, 0.0));
        assert_eq!(score(&s, 9, 0.0), 0.0);
    }

    #[test]
    fn upside_rule_skips_zero_price() {
        let s = MetricsSnapshot {
            current_price: Some(0.0),
            target_price_mean: Some(100.0),
            ..Default::default()
        };
        assert_eq!(score(&s, 0, 0.0), 0.0);
    }

    #[test]
    fn removing_any_field_never_increases_score() {
        let full = full_snapshot();
        let base = score(&full, 50, 0.4);

        let removals: [fn(&mut MetricsSnapshot); 14] = [
            |s| s.market_cap = None,
            |s| s.current_price = None,
            |s| s.pct_from_ath = None,
            |s| s.pe_ratio = None,
            |s| s.forward_pe = None,
            |s| s.peg_ratio = None,
            |s| s.debt_to_equity = None,
            |s| s.free_cash_flow = None,
            |s| s.dividend_yield = None,
            |s| s.rsi = None,
            |s| s.one_year_return = None,
            |s| s.one_month_return = None,
            |s| s.target_price_mean = None,
            |s| s.insider_transactions.clear(),
        ];

        for remove in removals {
            let mut s = full.clone();
            remove(&mut s);
            assert!(score(&s, 50, 0.4) <= base);
        }
    }

    #[test]
    fn every_rule_is_non_negative_on_sample() {
        let s = full_snapshot();
        let input = ScoreInput {
            metrics: &s,
            mentions: 50,
            sentiment: 0.4,
        };
        for rule in SCORE_RULES {
            if let Some(p) = (rule.points)(&input) {
                assert!(p >= 0.0, "rule {} produced {p}", rule.id);
            }
        }
    }
}
