use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-ticker metrics bundle as delivered by the market-data provider.
///
/// Every field is optional. `None` means "signal not available" and is never
/// read as zero or false by the analysis stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    // Identity
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub business_summary: Option<String>,
    /// Billions (USD).
    pub market_cap: Option<f64>,
    pub market_cap_category: Option<MarketCapCategory>,

    // Price
    pub current_price: Option<f64>,
    pub all_time_high: Option<f64>,
    /// Percent below the all-time high (40.0 == 40% below).
    pub pct_from_ath: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,

    // Valuation
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub ps_ratio: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub ev_ebitda: Option<f64>,

    // Financial health
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    /// Billions (USD), trailing twelve months.
    pub free_cash_flow: Option<f64>,
    /// Margins and yields below are percentages.
    pub profit_margin: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub dividend_rate: Option<f64>,

    // Technical
    pub rsi: Option<f64>,
    pub beta: Option<f64>,
    pub avg_volume: Option<f64>,
    pub recent_volume: Option<f64>,

    // Performance (percent)
    pub one_year_return: Option<f64>,
    pub ytd_return: Option<f64>,
    pub one_month_return: Option<f64>,

    // Ownership (percent)
    pub short_interest: Option<f64>,
    pub institutional_ownership: Option<f64>,
    pub insider_ownership: Option<f64>,

    // Analysts
    pub analyst_rating: Option<String>,
    pub analyst_count: Option<u32>,
    pub target_price_low: Option<f64>,
    pub target_price_high: Option<f64>,
    pub target_price_mean: Option<f64>,

    // Earnings
    pub next_earnings_date: Option<NaiveDate>,
    pub earnings_surprise_pct: Option<f64>,

    pub insider_transactions: Vec<InsiderTransaction>,
    pub recent_news: Vec<NewsItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCapCategory {
    Micro,
    Small,
    Mid,
    Large,
    Mega,
}

impl MarketCapCategory {
    /// Buckets a market cap given in billions.
    pub fn from_billions(market_cap: f64) -> Self {
        if market_cap >= 200.0 {
            Self::Mega
        } else if market_cap >= 10.0 {
            Self::Large
        } else if market_cap >= 2.0 {
            Self::Mid
        } else if market_cap >= 0.3 {
            Self::Small
        } else {
            Self::Micro
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Micro => "micro",
            Self::Small => "small",
            Self::Mid => "mid",
            Self::Large => "large",
            Self::Mega => "mega",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Micro => "Micro",
            Self::Small => "Small",
            Self::Mid => "Mid",
            Self::Large => "Large",
            Self::Mega => "Mega",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub shares: Option<f64>,
    /// USD.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub insider: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// One provider entry. Tickers the provider could not resolve arrive as `Invalid`
/// and are dropped before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchedMetrics {
    Valid(MetricsSnapshot),
    Invalid { reason: String },
}

impl FetchedMetrics {
    pub fn valid(&self) -> Option<&MetricsSnapshot> {
        match self {
            Self::Valid(snapshot) => Some(snapshot),
            Self::Invalid { .. } => None,
        }
    }
}

impl MetricsSnapshot {
    /// Provider category when sent, otherwise derived from market cap.
    pub fn cap_category(&self) -> Option<MarketCapCategory> {
        self.market_cap_category
            .or_else(|| self.market_cap.map(MarketCapCategory::from_billions))
    }

    /// Percent upside from the current price to the mean analyst target.
    /// `None` when either side is missing or the price is not positive.
    pub fn target_upside_pct(&self) -> Option<f64> {
        let price = self.current_price.filter(|p| *p > 0.0)?;
        let target = self.target_price_mean?;
        Some((target - price) / price * 100.0)
    }

    /// FCF as a percentage of market cap; both are in billions.
    pub fn fcf_yield_pct(&self) -> Option<f64> {
        let fcf = self.free_cash_flow?;
        let cap = self.market_cap.filter(|c| *c > 0.0)?;
        Some(fcf / cap * 100.0)
    }

    pub fn insider_buys(&self) -> impl Iterator<Item = &InsiderTransaction> {
        self.insider_transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Buy)
    }

    pub fn insider_sells(&self) -> impl Iterator<Item = &InsiderTransaction> {
        self.insider_transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Sell)
    }

    /// Whole days from `today` until the next earnings date (negative when past).
    pub fn days_until_earnings(&self, today: NaiveDate) -> Option<i64> {
        self.next_earnings_date
            .map(|d| d.signed_duration_since(today).num_days())
    }
}
