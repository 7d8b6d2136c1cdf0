use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    pub title: String,
    pub content: String,
}

const TIPS: &[(&str, &str)] = &[
    (
        "P/E Ratio Basics",
        "The P/E ratio shows how much you pay for each dollar of profit. A P/E of 20 means $20 per $1 of earnings. \
         A low P/E can mean undervalued or can signal problems, so compare it to the sector.",
    ),
    (
        "What Free Cash Flow Tells You",
        "Free cash flow is the cash left after expenses and capital spending. It is harder to massage than earnings, \
         and positive FCF funds dividends, buybacks and growth without new debt.",
    ),
    (
        "Understanding RSI",
        "RSI measures momentum on a 0-100 scale. Below 30 is considered oversold and above 70 overbought. \
         It is one signal among many, not a guarantee.",
    ),
    (
        "Debt-to-Equity Explained",
        "Debt-to-equity compares borrowing to shareholder equity. Under 1.0 is generally healthy. \
         Heavily indebted companies struggle more when conditions tighten.",
    ),
    (
        "Why Insider Buying Matters",
        "Executives buying their own stock with personal money is often a bullish signal. \
         Selling is less meaningful since insiders sell for many reasons.",
    ),
    (
        "The PEG Ratio Advantage",
        "PEG adjusts P/E for growth. A P/E of 30 with 30% yearly earnings growth gives a PEG of 1.0. \
         Under 1.0 often means growth at a discount.",
    ),
    (
        "Short Interest as a Contrarian Signal",
        "High short interest means many investors are betting against a stock. A surprise can force shorts to cover \
         and push the price up fast, but heavy shorting can also point to real problems.",
    ),
    (
        "Earnings Dates Matter",
        "Prices often swing hard around earnings reports. Buying right before earnings is a bet on the results; \
         some investors wait for the report to settle first.",
    ),
    (
        "The Dividend Yield Trade-off",
        "If a stock drops 50% its yield doubles, so a very high yield can reflect distress. \
         Consistent dividend growth says more than a high current yield.",
    ),
    (
        "Institutional Ownership Sweet Spot",
        "Very high institutional ownership adds stability; very low ownership can mean undiscovered value or red flags. \
         Many investors look for a middle ground: validated but not crowded.",
    ),
];

impl Tip {
    /// Same date, same tip.
    pub fn for_date(date: NaiveDate) -> Self {
        let idx = date.num_days_from_ce().rem_euclid(TIPS.len() as i32) as usize;
        let (title, content) = TIPS[idx];
        Self {
            title: title.to_string(),
            content: content.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tip_is_stable_per_date_and_rotates_daily() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(Tip::for_date(d), Tip::for_date(d));
        assert_ne!(Tip::for_date(d), Tip::for_date(d.succ_opt().unwrap()));
    }
}
