//! Rationale text for each ranked stock.
//!
//! Both generators follow the same shape: every rule in a fixed table is checked
//! against the snapshot, matching rules emit a weighted sentence built from the
//! actual field values, and the heaviest few are kept. Equal weights keep table
//! order, so output is a pure function of the input.

pub mod buy_case;
pub mod risk;

use crate::domain::mentions::MentionAggregate;
use crate::domain::metrics::MetricsSnapshot;
use chrono::NaiveDate;

pub use buy_case::generate_buy_case;
pub use risk::generate_risk_factors;

pub struct NarrativeInput<'a> {
    pub metrics: &'a MetricsSnapshot,
    pub mentions: &'a MentionAggregate,
    /// Reference date for day counts (earnings proximity).
    pub today: NaiveDate,
}

pub struct NarrativeRule {
    pub id: &'static str,
    pub weight: u32,
    /// Guard and formatter in one: `None` when the rule does not apply.
    pub render: fn(&NarrativeInput<'_>) -> Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub rule: &'static str,
    pub weight: u32,
    pub text: String,
}

/// Candidates in table order.
pub fn evaluate(rules: &[NarrativeRule], input: &NarrativeInput<'_>) -> Vec<Candidate> {
    rules
        .iter()
        .filter_map(|rule| {
            (rule.render)(input).map(|text| Candidate {
                rule: rule.id,
                weight: rule.weight,
                text,
            })
        })
        .collect()
}

/// Heaviest `k` candidates; stable, so ties keep table order.
pub fn select_top(mut candidates: Vec<Candidate>, k: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.weight.cmp(&a.weight));
    candidates.truncate(k);
    candidates
}

/// Formats a USD amount given in billions.
pub(crate) fn money_billions(v: f64) -> String {
    if v.abs() >= 1.0 {
        format!("${:.1}B", v.abs())
    } else {
        format!("${:.0}M", v.abs() * 1000.0)
    }
}

/// Formats a USD amount given in dollars, scaled to B, M or K.
pub(crate) fn money_dollars(v: f64) -> String {
    let v = v.abs();
    if v >= 1e9 {
        format!("${:.1}B", v / 1e9)
    } else if v >= 1e6 {
        format!("${:.1}M", v / 1e6)
    } else if v >= 1e3 {
        format!("${:.0}K", v / 1e3)
    } else {
        format!("${v:.0}")
    }
}

fn known(s: Option<&str>) -> Option<&str> {
    s.map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("unknown"))
}

/// Identity and valuation facts used when no rule fires.
pub(crate) struct IdentityFacts<'a> {
    pub name: Option<&'a str>,
    pub sector: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub market_cap: Option<f64>,
    pub pct_from_ath: Option<f64>,
}

impl<'a> IdentityFacts<'a> {
    pub fn from_snapshot(m: &'a MetricsSnapshot) -> Self {
        Self {
            name: known(m.name.as_deref()),
            sector: known(m.sector.as_deref()),
            industry: known(m.industry.as_deref()),
            market_cap: m.market_cap.filter(|v| *v > 0.0),
            pct_from_ath: m.pct_from_ath,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sector.is_none()
            && self.industry.is_none()
            && self.market_cap.is_none()
            && self.pct_from_ath.is_none()
    }

    pub fn subject(&self) -> &str {
        self.name.unwrap_or("The company")
    }

    /// "Semiconductors (Technology)", "Technology", or `None`.
    pub fn business_line(&self) -> Option<String> {
        match (self.industry, self.sector) {
            (Some(i), Some(s)) if !i.eq_ignore_ascii_case(s) => Some(format!("{i} ({s})")),
            (Some(i), _) => Some(i.to_string()),
            (None, Some(s)) => Some(s.to_string()),
            (None, None) => None,
        }
    }

    /// Comma-led clauses for market cap and drawdown.
    pub fn valuation_clauses(&self) -> String {
        let mut out = String::new();
        if let Some(cap) = self.market_cap {
            out.push_str(&format!(", with a {} market cap", money_billions(cap)));
        }
        if let Some(pct) = self.pct_from_ath.filter(|p| *p > 0.0) {
            out.push_str(&format!(", trading {pct:.0}% below its all-time high"));
        }
        out
    }
}
