use super::{evaluate, money_billions, money_dollars, select_top, IdentityFacts, NarrativeInput, NarrativeRule};

pub const BUY_CASE_POINTS: usize = 4;

const BULLISH_RATINGS: &[&str] = &["buy", "strong_buy", "strong buy", "outperform", "overweight"];

pub const BUY_CASE_RULES: &[NarrativeRule] = &[
    NarrativeRule {
        id: "rsi_oversold",
        weight: 90,
        render: |i| {
            let rsi = i.metrics.rsi.filter(|v| *v < 30.0)?;
            Some(format!(
                "RSI at {rsi:.0} signals oversold conditions; the selling may be overdone"
            ))
        },
    },
    NarrativeRule {
        id: "peg_discount",
        weight: 85,
        render: |i| {
            let peg = i.metrics.peg_ratio.filter(|v| *v > 0.0 && *v < 1.0)?;
            Some(format!(
                "PEG ratio of {peg:.2} suggests growth at a reasonable price"
            ))
        },
    },
    NarrativeRule {
        id: "insider_buying",
        weight: 85,
        render: |i| {
            let buys: Vec<_> = i.metrics.insider_buys().collect();
            if buys.is_empty() {
                return None;
            }
            let total: f64 = buys.iter().filter_map(|t| t.value).sum();
            let noun = if buys.len() == 1 { "purchase" } else { "purchases" };
            if total > 0.0 {
                Some(format!(
                    "Insiders recently bought {} worth across {} {noun}; they are betting on the company",
                    money_dollars(total),
                    buys.len()
                ))
            } else {
                Some(format!(
                    "Insiders made {} recent {noun}; they are betting on the company",
                    buys.len()
                ))
            }
        },
    },
    NarrativeRule {
        id: "fcf_yield",
        weight: 82,
        render: |i| {
            let y = i.metrics.fcf_yield_pct().filter(|y| *y > 5.0)?;
            let fcf = i.metrics.free_cash_flow?;
            let cap = i.metrics.market_cap?;
            Some(format!(
                "Free cash flow yield of {y:.1}% ({} on a {} market cap)",
                money_billions(fcf),
                money_billions(cap)
            ))
        },
    },
    NarrativeRule {
        id: "analyst_upside",
        weight: 80,
        render: |i| {
            let upside = i.metrics.target_upside_pct().filter(|u| *u > 20.0)?;
            let target = i.metrics.target_price_mean?;
            let coverage = match i.metrics.analyst_count {
                Some(n) if n > 0 => format!(" from {n} analysts"),
                _ => String::new(),
            };
            Some(format!(
                "Analysts see {upside:.0}% upside to their ${target:.2} average price target{coverage}"
            ))
        },
    },
    NarrativeRule {
        id: "positive_fcf",
        weight: 75,
        render: |i| {
            let fcf = i.metrics.free_cash_flow.filter(|v| *v > 0.0)?;
            Some(format!(
                "Generating {} in free cash flow, showing real financial strength",
                money_billions(fcf)
            ))
        },
    },
    NarrativeRule {
        id: "ath_discount",
        weight: 70,
        render: |i| {
            let pct = i.metrics.pct_from_ath.filter(|p| *p >= 20.0)?;
            let high = match i.metrics.all_time_high {
                Some(h) if h > 0.0 => format!(" of ${h:.2}"),
                _ => String::new(),
            };
            Some(format!(
                "Trading {pct:.0}% below its all-time high{high}, a potential discount entry"
            ))
        },
    },
    NarrativeRule {
        id: "forward_pe_growth",
        weight: 65,
        render: |i| {
            let pe = i.metrics.pe_ratio.filter(|v| *v > 0.0)?;
            let fpe = i.metrics.forward_pe.filter(|v| *v > 0.0 && *v < pe * 0.85)?;
            Some(format!(
                "Forward P/E of {fpe:.1} versus trailing {pe:.1} points to expected earnings growth"
            ))
        },
    },
    NarrativeRule {
        id: "value_pe",
        weight: 60,
        render: |i| {
            let pe = i.metrics.pe_ratio.filter(|v| *v > 5.0 && *v < 15.0)?;
            Some(format!("P/E of {pe:.1} is a value multiple"))
        },
    },
    NarrativeRule {
        id: "low_debt",
        weight: 55,
        render: |i| {
            let de = i.metrics.debt_to_equity.filter(|v| (0.0..0.5).contains(v))?;
            Some(format!(
                "Debt-to-equity of {de:.2} leaves financial flexibility and lowers risk"
            ))
        },
    },
    NarrativeRule {
        id: "analyst_consensus",
        weight: 50,
        render: |i| {
            let rating = i.metrics.analyst_rating.as_deref()?.trim().to_lowercase();
            if !BULLISH_RATINGS.contains(&rating.as_str()) {
                return None;
            }
            let rating = rating.replace('_', " ");
            match i.metrics.analyst_count {
                Some(n) if n > 0 => Some(format!(
                    "Analyst consensus is {rating} across {n} analysts"
                )),
                _ => Some(format!("Analyst consensus is {rating}")),
            }
        },
    },
    NarrativeRule {
        id: "momentum_reversal",
        weight: 50,
        render: |i| {
            let month = i.metrics.one_month_return.filter(|m| *m > 0.0)?;
            let year = i.metrics.one_year_return.filter(|y| *y < -20.0)?;
            Some(format!(
                "Up {month:.1}% over the past month after a {:.0}% drop over the year, a possible reversal",
                year.abs()
            ))
        },
    },
    NarrativeRule {
        id: "earnings_beat",
        weight: 45,
        render: |i| {
            let surprise = i.metrics.earnings_surprise_pct.filter(|s| *s > 5.0)?;
            Some(format!(
                "Beat the last earnings estimate by {surprise:.1}%"
            ))
        },
    },
    NarrativeRule {
        id: "healthy_margin",
        weight: 45,
        render: |i| {
            let margin = i.metrics.profit_margin.filter(|m| *m > 20.0)?;
            Some(format!(
                "Profit margin of {margin:.1}% shows pricing power"
            ))
        },
    },
    NarrativeRule {
        id: "near_52w_low",
        weight: 40,
        render: |i| {
            let price = i.metrics.current_price.filter(|p| *p > 0.0)?;
            let low = i.metrics.fifty_two_week_low.filter(|l| *l > 0.0)?;
            if price > low * 1.10 {
                return None;
            }
            let above = ((price - low) / low * 100.0).max(0.0);
            Some(format!(
                "Trading within {above:.0}% of its 52-week low of ${low:.2}"
            ))
        },
    },
    NarrativeRule {
        id: "dividend",
        weight: 40,
        render: |i| {
            let y = i.metrics.dividend_yield.filter(|y| (2.0..=8.0).contains(y))?;
            Some(format!("Pays a {y:.1}% dividend yield while you wait"))
        },
    },
    NarrativeRule {
        id: "bullish_chatter",
        weight: 35,
        render: |i| {
            let m = i.mentions;
            if m.avg_sentiment <= 0.3 || m.total_mentions == 0 {
                return None;
            }
            Some(format!(
                "Social sentiment is notably bullish across {} mentions",
                m.total_mentions
            ))
        },
    },
];

/// Prose buy case: the four heaviest statements, or a fact-based fallback.
pub fn generate_buy_case(input: &NarrativeInput<'_>) -> String {
    let picked = select_top(evaluate(BUY_CASE_RULES, input), BUY_CASE_POINTS);
    if picked.is_empty() {
        return fallback(&IdentityFacts::from_snapshot(input.metrics));
    }

    let sentences: Vec<String> = picked.into_iter().map(|c| c.text).collect();
    format!("{}.", sentences.join(". "))
}

fn fallback(facts: &IdentityFacts<'_>) -> String {
    if facts.is_empty() {
        return "Shows potential value characteristics worth investigating further; always do your own research."
            .to_string();
    }

    let subject = facts.subject();
    match facts.business_line() {
        Some(line) => format!(
            "{subject} operates in {line}{}; no single metric stands out, so review the fundamentals directly.",
            facts.valuation_clauses()
        ),
        None => {
            let clauses = facts.valuation_clauses();
            if clauses.is_empty() {
                format!("{subject} has limited data available; review its filings before acting.")
            } else {
                format!(
                    "{subject} is on the watch list{clauses}; no single metric stands out, so review the fundamentals directly."
                )
            }
        }
    }
}
