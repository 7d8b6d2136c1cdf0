use crate::analysis::dark_horse::select_dark_horses;
use crate::analysis::narrative::{generate_buy_case, generate_risk_factors, NarrativeInput};
use crate::analysis::rank::assemble_ranking;
use crate::analysis::{scoring, sector, signals};
use crate::config::AnalysisConfig;
use crate::domain::mentions::MentionAggregate;
use crate::domain::metrics::{FetchedMetrics, MetricsSnapshot};
use crate::domain::report::{AnalyzedStock, RankingOutcome};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Everything one ranking pass needs from the data providers.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    /// Requested tickers in priority order. Also the final tie-break for equal scores.
    pub universe: Vec<String>,
    pub metrics: BTreeMap<String, FetchedMetrics>,
    /// Tickers missing here count as zero mentions with neutral sentiment.
    pub mentions: BTreeMap<String, MentionAggregate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exclusion {
    BelowMinMentions,
    MissingMetrics,
    InvalidMetrics,
    InsufficientDrawdown,
}

/// Builds the analyzed entity for one ticker: category, score, signals and narrative.
pub fn analyze_stock(
    ticker: &str,
    metrics: &MetricsSnapshot,
    mentions: &MentionAggregate,
    today: NaiveDate,
) -> AnalyzedStock {
    let narrative = NarrativeInput {
        metrics,
        mentions,
        today,
    };

    AnalyzedStock {
        ticker: ticker.to_string(),
        metrics: metrics.clone(),
        mentions: mentions.clone(),
        sector_category: sector::classify(metrics.sector.as_deref(), metrics.industry.as_deref()),
        score: scoring::score(metrics, mentions.total_mentions, mentions.avg_sentiment),
        signals: signals::count_signals(metrics),
        buy_case: generate_buy_case(&narrative),
        risk_factors: generate_risk_factors(&narrative),
        is_dark_horse: false,
        dark_horse_reasons: Vec::new(),
    }
}

/// Runs one complete ranking pass.
///
/// Returns `None` when no ticker survives filtering; that is an expected outcome,
/// not a failure. `today` drives earnings-proximity day counts only.
pub fn run(
    input: &PipelineInput,
    config: &AnalysisConfig,
    today: NaiveDate,
) -> Option<RankingOutcome> {
    let mut excluded = BTreeMap::<&'static str, usize>::new();
    let mut analyzed = Vec::new();

    // Dedupe before truncating so repeats never take a candidate slot.
    let mut seen = BTreeSet::<&str>::new();
    let mut universe: Vec<&str> = Vec::new();
    for ticker in input.universe.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if seen.insert(ticker) {
            universe.push(ticker);
        } else {
            *excluded.entry("duplicate").or_default() += 1;
        }
    }
    universe.truncate(config.max_candidates);

    for &ticker in &universe {
        match check_candidate(ticker, input, config) {
            Ok((metrics, mentions)) => {
                analyzed.push(analyze_stock(ticker, metrics, &mentions, today));
            }
            Err(reason) => {
                tracing::debug!(ticker, ?reason, "excluded before scoring");
                *excluded.entry(exclusion_key(reason)).or_default() += 1;
            }
        }
    }

    let passing = analyzed.len();
    if analyzed.is_empty() {
        tracing::warn!(
            candidates = universe.len(),
            ?excluded,
            "no stocks passed all criteria; no report produced"
        );
        return None;
    }

    let analyzed = select_dark_horses(analyzed, config);
    let dark_horses = analyzed.iter().filter(|s| s.is_dark_horse).count();
    let items = assemble_ranking(analyzed, config);

    tracing::info!(
        candidates = universe.len(),
        passing,
        dark_horses,
        ranked = items.len(),
        ?excluded,
        "ranking pass complete"
    );

    Some(RankingOutcome {
        total_candidates: universe.len(),
        stocks_passing_criteria: passing,
        items,
    })
}

fn check_candidate<'a>(
    ticker: &str,
    input: &'a PipelineInput,
    config: &AnalysisConfig,
) -> Result<(&'a MetricsSnapshot, MentionAggregate), Exclusion> {
    let mentions = input.mentions.get(ticker).cloned().unwrap_or_default();
    if mentions.total_mentions < config.min_mentions && !mentions.watchlist_priority {
        return Err(Exclusion::BelowMinMentions);
    }

    let metrics = match input.metrics.get(ticker) {
        None => return Err(Exclusion::MissingMetrics),
        Some(fetched) => fetched.valid().ok_or(Exclusion::InvalidMetrics)?,
    };

    // Unknown drawdown passes; only a known, too-shallow one excludes.
    if metrics
        .pct_from_ath
        .is_some_and(|pct| pct < config.min_drop_from_ath_pct)
    {
        return Err(Exclusion::InsufficientDrawdown);
    }

    Ok((metrics, mentions))
}

fn exclusion_key(reason: Exclusion) -> &'static str {
    match reason {
        Exclusion::BelowMinMentions => "below_min_mentions",
        Exclusion::MissingMetrics => "missing_metrics",
        Exclusion::InvalidMetrics => "invalid_metrics",
        Exclusion::InsufficientDrawdown => "insufficient_drawdown",
    }
}
