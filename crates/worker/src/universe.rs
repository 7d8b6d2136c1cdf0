use std::collections::BTreeMap;
use stocktalk_core::domain::mentions::{MentionAggregate, SourceMentions};

pub const FALLBACK_SOURCE: &str = "curated";

/// Curated single-name equities analyzed when no mention data is available.
/// Listed in analysis priority order; duplicates are ignored.
pub const FALLBACK_TICKERS: &[&str] = &[
    // Technology and semiconductors
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "NVDA", "TSM", "AVGO", "ORCL", "AMD", "INTC",
    "QCOM", "MU", "AMAT", "LRCX", "MRVL", "ON", "NXPI", "SWKS", "WOLF",
    // Software and cloud
    "CRM", "ADBE", "NOW", "SNOW", "PANW", "CRWD", "DDOG", "ZS", "NET", "OKTA", "MDB", "PATH",
    // AI focus
    "AI", "SMCI", "ARM", "PLTR", "IONQ", "SOUN", "BBAI", "UPST",
    // Healthcare and biotech
    "UNH", "JNJ", "LLY", "PFE", "ABBV", "MRK", "AMGN", "GILD", "VRTX", "BIIB", "DXCM", "ISRG",
    "MRNA", "BNTX", "EXAS", "SRPT", "RXRX", "NTLA", "BEAM", "EDIT",
    // Financials and fintech
    "JPM", "BAC", "WFC", "C", "GS", "SCHW", "PYPL", "AFRM", "SOFI", "COIN", "HOOD",
    // Consumer
    "TSLA", "GM", "F", "RIVN", "LCID", "NKE", "LULU", "SBUX", "DIS", "NFLX", "ROKU", "ETSY",
    // Industrials and energy
    "BA", "CAT", "DE", "UPS", "FDX", "XOM", "CVX", "OXY", "ENPH", "FSLR", "PLUG",
    // International and ADRs
    "BABA", "JD", "PDD", "BIDU", "NIO", "XPEV", "LI", "SONY", "ASML", "SAP", "NVO", "SHOP",
    "MELI", "NU", "SE", "GRAB", "CPNG",
    // Small and mid-cap growth
    "CELH", "DUOL", "TOST", "BROS", "ONON", "APP", "IOT", "S", "FRSH", "MNDY", "U", "DOCU",
];

/// Every curated ticker at exactly the mention floor with neutral sentiment, so the
/// mention-based score components stay silent.
pub fn fallback_mentions(min_mentions: u32) -> BTreeMap<String, MentionAggregate> {
    FALLBACK_TICKERS
        .iter()
        .map(|t| {
            let mut sources = BTreeMap::new();
            sources.insert(
                FALLBACK_SOURCE.to_string(),
                SourceMentions {
                    count: min_mentions,
                    sentiment: 0.0,
                },
            );
            (
                t.to_string(),
                MentionAggregate {
                    total_mentions: min_mentions,
                    avg_sentiment: 0.0,
                    watchlist_priority: false,
                    sources,
                },
            )
        })
        .collect()
}

pub fn fallback_universe() -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(FALLBACK_TICKERS.len());
    for t in FALLBACK_TICKERS {
        if !out.iter().any(|seen| seen == t) {
            out.push(t.to_string());
        }
    }
    out
}

/// Analysis order for mention-driven runs: watchlist first, then most-mentioned,
/// then ticker for a stable total order.
pub fn ordered_universe(mentions: &BTreeMap<String, MentionAggregate>) -> Vec<String> {
    let mut entries: Vec<_> = mentions.iter().collect();
    entries.sort_by(|(ta, a), (tb, b)| {
        b.watchlist_priority
            .cmp(&a.watchlist_priority)
            .then_with(|| b.total_mentions.cmp(&a.total_mentions))
            .then_with(|| ta.cmp(tb))
    });
    entries.into_iter().map(|(t, _)| t.clone()).collect()
}
