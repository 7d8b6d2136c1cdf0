use super::{evaluate, money_billions, select_top, IdentityFacts, NarrativeInput, NarrativeRule};
use crate::domain::metrics::MarketCapCategory;

pub const RISK_FACTOR_LIMIT: usize = 5;

const BEARISH_RATINGS: &[&str] = &[
    "sell",
    "strong_sell",
    "strong sell",
    "underperform",
    "underweight",
];

fn earnings_in(i: &NarrativeInput<'_>, days: std::ops::RangeInclusive<i64>) -> Option<i64> {
    i.metrics
        .days_until_earnings(i.today)
        .filter(|d| days.contains(d))
}

/// Severity is the rule weight: higher sorts first.
pub const RISK_RULES: &[NarrativeRule] = &[
    NarrativeRule {
        id: "earnings_imminent",
        weight: 95,
        render: |i| {
            let days = earnings_in(i, 0..=7)?;
            Some(match days {
                0 => "Earnings report today; expect sharp price swings".to_string(),
                1 => "Earnings report tomorrow; expect sharp price swings".to_string(),
                d => format!("Earnings report in {d} days; expect sharp price swings"),
            })
        },
    },
    NarrativeRule {
        id: "extreme_leverage",
        weight: 85,
        render: |i| {
            let de = i.metrics.debt_to_equity.filter(|v| *v > 2.0)?;
            Some(format!(
                "Debt-to-equity of {de:.2} is extreme; the debt load could squeeze the company if conditions worsen"
            ))
        },
    },
    NarrativeRule {
        id: "heavy_cash_burn",
        weight: 80,
        render: |i| {
            let fcf = i.metrics.free_cash_flow.filter(|v| *v < -0.5)?;
            Some(format!(
                "Burning {} of free cash flow a year; may need to raise capital",
                money_billions(fcf)
            ))
        },
    },
    NarrativeRule {
        id: "accelerating_decline",
        weight: 78,
        render: |i| {
            let year = i.metrics.one_year_return.filter(|y| *y < -40.0)?;
            let month = i.metrics.one_month_return.filter(|m| *m < -10.0)?;
            Some(format!(
                "Down {:.0}% over the year and another {:.0}% this month; the decline is accelerating",
                year.abs(),
                month.abs()
            ))
        },
    },
    NarrativeRule {
        id: "deep_negative_margin",
        weight: 75,
        render: |i| {
            let margin = i.metrics.profit_margin.filter(|m| *m < -20.0)?;
            Some(format!(
                "Profit margin of {margin:.1}% means the business is deeply unprofitable"
            ))
        },
    },
    NarrativeRule {
        id: "extreme_short_interest",
        weight: 72,
        render: |i| {
            let si = i.metrics.short_interest.filter(|v| *v > 20.0)?;
            Some(format!(
                "{si:.1}% of shares are sold short; many investors are betting against it"
            ))
        },
    },
    NarrativeRule {
        id: "earnings_soon",
        weight: 70,
        render: |i| {
            let days = earnings_in(i, 8..=14)?;
            Some(format!(
                "Earnings report in {days} days; expect potential price swings"
            ))
        },
    },
    NarrativeRule {
        id: "high_leverage",
        weight: 65,
        render: |i| {
            let de = i.metrics.debt_to_equity.filter(|v| *v > 1.5 && *v <= 2.0)?;
            Some(format!(
                "Debt-to-equity of {de:.2} is high and could pressure the company if conditions worsen"
            ))
        },
    },
    NarrativeRule {
        id: "cash_burn",
        weight: 60,
        render: |i| {
            let fcf = i.metrics.free_cash_flow.filter(|v| *v < 0.0 && *v >= -0.5)?;
            Some(format!(
                "Negative free cash flow ({}); needs to improve profitability or raise capital",
                money_billions(fcf)
            ))
        },
    },
    NarrativeRule {
        id: "steep_decline",
        weight: 60,
        render: |i| {
            let year = i.metrics.one_year_return.filter(|y| *y < -40.0)?;
            // Covered by accelerating_decline when the last month is also sharply down.
            if i.metrics.one_month_return.is_some_and(|m| m < -10.0) {
                return None;
            }
            Some(format!(
                "Down {:.0}% over the past year; could continue falling",
                year.abs()
            ))
        },
    },
    NarrativeRule {
        id: "bearish_consensus",
        weight: 55,
        render: |i| {
            let rating = i.metrics.analyst_rating.as_deref()?.trim().to_lowercase();
            if !BEARISH_RATINGS.contains(&rating.as_str()) {
                return None;
            }
            Some(format!(
                "Analyst consensus is {}; the street is skeptical",
                rating.replace('_', " ")
            ))
        },
    },
    NarrativeRule {
        id: "elevated_short_interest",
        weight: 55,
        render: |i| {
            let si = i.metrics.short_interest.filter(|v| *v > 15.0 && *v <= 20.0)?;
            Some(format!(
                "{si:.1}% of shares are sold short; a sizable group expects it to fall"
            ))
        },
    },
    NarrativeRule {
        id: "stretched_pe",
        weight: 50,
        render: |i| {
            let pe = i.metrics.pe_ratio.filter(|v| *v > 40.0)?;
            Some(format!(
                "P/E of {pe:.1} is stretched, leaving little room for disappointment"
            ))
        },
    },
    NarrativeRule {
        id: "small_cap",
        weight: 50,
        render: |i| {
            let category = i
                .metrics
                .cap_category()
                .filter(|c| matches!(c, MarketCapCategory::Micro | MarketCapCategory::Small))?;
            Some(format!(
                "{}-cap company with less liquidity and potentially higher risk",
                category.title()
            ))
        },
    },
    NarrativeRule {
        id: "stretched_sales",
        weight: 45,
        render: |i| {
            let ps = i.metrics.ps_ratio.filter(|v| *v > 15.0)?;
            Some(format!(
                "Price-to-sales of {ps:.1} already prices in a lot of growth"
            ))
        },
    },
    NarrativeRule {
        id: "high_beta",
        weight: 45,
        render: |i| {
            let beta = i.metrics.beta.filter(|b| *b > 1.5)?;
            Some(format!(
                "High volatility (beta {beta:.1}); expect bigger swings than the market"
            ))
        },
    },
    NarrativeRule {
        id: "thin_liquidity",
        weight: 40,
        render: |i| {
            let volume = i.metrics.avg_volume.filter(|v| *v > 0.0 && *v < 500_000.0)?;
            Some(format!(
                "Average volume of {:.0}K shares a day makes it thin to trade",
                volume / 1000.0
            ))
        },
    },
    NarrativeRule {
        id: "net_insider_selling",
        weight: 40,
        render: |i| {
            let sells = i.metrics.insider_sells().count();
            let buys = i.metrics.insider_buys().count();
            if sells <= buys {
                return None;
            }
            Some(format!(
                "Insiders sold {sells} times against {buys} buys recently"
            ))
        },
    },
    NarrativeRule {
        id: "overbought",
        weight: 35,
        render: |i| {
            let rsi = i.metrics.rsi.filter(|v| *v > 70.0)?;
            Some(format!(
                "RSI at {rsi:.0} is overbought; a pullback is possible"
            ))
        },
    },
    NarrativeRule {
        id: "limited_coverage",
        weight: 30,
        render: |i| {
            let n = i.metrics.analyst_count.filter(|n| *n < 5)?;
            Some(match n {
                0 => "No analyst coverage means less scrutiny and research available".to_string(),
                n => format!(
                    "Only {n} analysts cover it, so there is less scrutiny and research available"
                ),
            })
        },
    },
];

/// Up to five risk statements, most severe first. Never empty.
pub fn generate_risk_factors(input: &NarrativeInput<'_>) -> Vec<String> {
    let picked = select_top(evaluate(RISK_RULES, input), RISK_FACTOR_LIMIT);
    if picked.is_empty() {
        return vec![fallback(&IdentityFacts::from_snapshot(input.metrics))];
    }
    picked.into_iter().map(|c| c.text).collect()
}

fn fallback(facts: &IdentityFacts<'_>) -> String {
    if facts.is_empty() {
        return "Standard market risks apply; always do your own research".to_string();
    }

    let mut text = format!(
        "No specific red flags in the available data for {}",
        facts.subject()
    );
    if let Some(line) = facts.business_line() {
        text.push_str(&format!(" in {line}"));
    }
    text.push_str(&facts.valuation_clauses());
    text.push_str("; standard market risks still apply");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mentions::MentionAggregate;
    use crate::domain::metrics::MetricsSnapshot;
    use chrono::{Duration, NaiveDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    fn risks(m: &MetricsSnapshot) -> Vec<String> {
        generate_risk_factors(&NarrativeInput {
            metrics: m,
            mentions: &MentionAggregate::default(),
            today: today(),
        })
    }

    fn severity_of(m: &MetricsSnapshot, text: &str) -> u32 {
        let input = NarrativeInput {
            metrics: m,
            mentions: &MentionAggregate::default(),
            today: today(),
        };
        evaluate(RISK_RULES, &input)
            .into_iter()
            .find(|c| c.text == text)
            .map(|c| c.weight)
            .unwrap()
    }

    #[test]
    fn imminent_earnings_outranks_leverage_and_valuation() {
        let m = MetricsSnapshot {
            next_earnings_date: Some(today() + Duration::days(3)),
            debt_to_equity: Some(1.8),
            pe_ratio: Some(55.0),
            beta: Some(1.9),
            ..Default::default()
        };
        let out = risks(&m);
        assert_eq!(out[0], "Earnings report in 3 days; expect sharp price swings");
        assert!(severity_of(&m, &out[0]) >= 90);
        assert!(out[1].starts_with("Debt-to-equity of 1.80"));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn earnings_two_weeks_out_is_lower_severity() {
        let m = MetricsSnapshot {
            next_earnings_date: Some(today() + Duration::days(12)),
            ..Default::default()
        };
        let out = risks(&m);
        assert_eq!(out, vec!["Earnings report in 12 days; expect potential price swings"]);
        assert!(severity_of(&m, &out[0]) < 90);
    }

    #[test]
    fn earnings_window_boundaries() {
        let cases = [
            (0, "Earnings report today; expect sharp price swings", 95),
            (1, "Earnings report tomorrow; expect sharp price swings", 95),
            (7, "Earnings report in 7 days; expect sharp price swings", 95),
            (8, "Earnings report in 8 days; expect potential price swings", 70),
            (14, "Earnings report in 14 days; expect potential price swings", 70),
        ];
        for (offset, text, weight) in cases {
            let m = MetricsSnapshot {
                next_earnings_date: Some(today() + Duration::days(offset)),
                ..Default::default()
            };
            assert_eq!(risks(&m), vec![text], "day {offset}");
            assert_eq!(severity_of(&m, text), weight, "day {offset}");
        }
    }

    #[test]
    fn past_or_distant_earnings_are_ignored() {
        for offset in [-2, -1, 15, 30] {
            let m = MetricsSnapshot {
                next_earnings_date: Some(today() + Duration::days(offset)),
                name: Some("Acme".to_string()),
                ..Default::default()
            };
            assert!(risks(&m)[0].starts_with("No specific red flags"));
        }
    }

    #[test]
    fn caps_at_five_most_severe() {
        let m = MetricsSnapshot {
            debt_to_equity: Some(3.0),
            free_cash_flow: Some(-2.0),
            one_year_return: Some(-60.0),
            one_month_return: Some(-15.0),
            profit_margin: Some(-35.0),
            short_interest: Some(28.0),
            pe_ratio: Some(80.0),
            beta: Some(2.1),
            rsi: Some(75.0),
            ..Default::default()
        };
        let out = risks(&m);
        assert_eq!(out.len(), 5);
        assert!(out[0].starts_with("Debt-to-equity of 3.00 is extreme"));
        assert!(out[1].starts_with("Burning $2.0B"));
        assert!(out[2].starts_with("Down 60% over the year and another 15% this month"));
        assert!(out[3].starts_with("Profit margin of -35.0%"));
        assert!(out[4].starts_with("28.0% of shares are sold short"));
    }

    #[test]
    fn steep_and_accelerating_decline_do_not_both_fire() {
        let m = MetricsSnapshot {
            one_year_return: Some(-50.0),
            one_month_return: Some(-12.0),
            ..Default::default()
        };
        let out = risks(&m);
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("accelerating"));
    }

    #[test]
    fn small_cap_derived_from_market_cap() {
        let m = MetricsSnapshot {
            market_cap: Some(0.8),
            ..Default::default()
        };
        assert_eq!(
            risks(&m),
            vec!["Small-cap company with less liquidity and potentially higher risk"]
        );
    }

    #[test]
    fn fallback_is_fact_based_then_generic() {
        let m = MetricsSnapshot {
            name: Some("Globex".to_string()),
            sector: Some("Utilities".to_string()),
            market_cap: Some(45.0),
            ..Default::default()
        };
        assert_eq!(
            risks(&m),
            vec!["No specific red flags in the available data for Globex in Utilities, with a $45.0B market cap; standard market risks still apply"]
        );
        assert_eq!(
            risks(&MetricsSnapshot::default()),
            vec!["Standard market risks apply; always do your own research"]
        );
    }
}
