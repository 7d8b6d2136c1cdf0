use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Social-attention data for one ticker, summed across all tracked sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionAggregate {
    pub total_mentions: u32,
    /// Nominally in [-1, 1]; not clamped.
    pub avg_sentiment: f64,
    /// Watchlist tickers are analyzed even below the minimum-mentions floor.
    pub watchlist_priority: bool,
    pub sources: BTreeMap<String, SourceMentions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceMentions {
    pub count: u32,
    pub sentiment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Bullish,
    Mixed,
    Bearish,
}

impl MentionAggregate {
    pub fn sentiment_label(&self) -> SentimentLabel {
        if self.avg_sentiment > 0.3 {
            SentimentLabel::Bullish
        } else if self.avg_sentiment < -0.3 {
            SentimentLabel::Bearish
        } else {
            SentimentLabel::Mixed
        }
    }
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "Bullish",
            Self::Mixed => "Mixed",
            Self::Bearish => "Bearish",
        }
    }
}
