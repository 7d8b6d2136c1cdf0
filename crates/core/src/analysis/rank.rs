use crate::config::AnalysisConfig;
use crate::domain::report::{AnalyzedStock, RankedStock};
use std::cmp::Ordering;

/// Assembles the final report order: the best non-dark-horse stocks first, then up to
/// `dark_horse_count` dark horses, ranked 1..N.
///
/// The sort is stable, so equal scores keep their input order.
pub fn assemble_ranking(
    mut stocks: Vec<AnalyzedStock>,
    config: &AnalysisConfig,
) -> Vec<RankedStock> {
    stocks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let (dark_horses, main): (Vec<_>, Vec<_>) =
        stocks.into_iter().partition(|s| s.is_dark_horse);

    main.into_iter()
        .take(config.main_picks_count())
        .chain(dark_horses.into_iter().take(config.dark_horse_count))
        .enumerate()
        .map(|(idx, stock)| RankedStock {
            rank: (idx + 1) as u32,
            stock,
        })
        .collect()
}
