use crate::domain::mentions::MentionAggregate;
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::tips::Tip;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorCategory {
    Ai,
    Tech,
    Medical,
    International,
    Other,
}

impl SectorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Tech => "tech",
            Self::Medical => "medical",
            Self::International => "international",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ai" => Some(Self::Ai),
            "tech" => Some(Self::Tech),
            "medical" => Some(Self::Medical),
            "international" => Some(Self::International),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Descriptive bullish/bearish/neutral tally. Does not feed the score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub bullish: u32,
    pub bearish: u32,
    pub neutral: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedStock {
    pub ticker: String,
    pub metrics: MetricsSnapshot,
    pub mentions: MentionAggregate,
    pub sector_category: SectorCategory,
    pub score: f64,
    pub signals: SignalCounts,
    pub buy_case: String,
    pub risk_factors: Vec<String>,
    pub is_dark_horse: bool,
    pub dark_horse_reasons: Vec<String>,
}

impl AnalyzedStock {
    /// Returns the same stock re-flagged as a dark horse pick.
    pub fn into_dark_horse(self, reasons: Vec<String>) -> Self {
        Self {
            is_dark_horse: true,
            dark_horse_reasons: reasons,
            ..self
        }
    }

    pub fn display_name(&self) -> &str {
        self.metrics.name.as_deref().unwrap_or(&self.ticker)
    }

    pub fn target_upside_pct(&self) -> Option<f64> {
        self.metrics
            .target_upside_pct()
            .map(|u| (u * 100.0).round() / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStock {
    pub rank: u32,
    #[serde(flatten)]
    pub stock: AnalyzedStock,
}

/// Output of one pipeline pass over a ticker universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingOutcome {
    pub total_candidates: usize,
    pub stocks_passing_criteria: usize,
    pub items: Vec<RankedStock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub report_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub total_candidates: usize,
    pub stocks_passing_criteria: usize,
    pub tip: Tip,
    pub items: Vec<RankedStock>,
}

impl DailyReport {
    pub fn assemble(
        report_date: NaiveDate,
        generated_at: DateTime<Utc>,
        outcome: RankingOutcome,
    ) -> Self {
        Self {
            report_date,
            generated_at,
            total_candidates: outcome.total_candidates,
            stocks_passing_criteria: outcome.stocks_passing_criteria,
            tip: Tip::for_date(report_date),
            items: outcome.items,
        }
    }
}
