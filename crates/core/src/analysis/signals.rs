use crate::domain::metrics::MetricsSnapshot;
use crate::domain::report::SignalCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Bullish,
    Bearish,
    Neutral,
}

fn rsi(s: &MetricsSnapshot) -> Option<Signal> {
    let v = s.rsi?;
    Some(if v < 30.0 {
        Signal::Bullish
    } else if v > 70.0 {
        Signal::Bearish
    } else {
        Signal::Neutral
    })
}

fn pe(s: &MetricsSnapshot) -> Option<Signal> {
    let v = s.pe_ratio?;
    // Non-positive P/E means the company is losing money.
    Some(if v <= 0.0 || v > 30.0 {
        Signal::Bearish
    } else if v < 15.0 {
        Signal::Bullish
    } else {
        Signal::Neutral
    })
}

fn peg(s: &MetricsSnapshot) -> Option<Signal> {
    let v = s.peg_ratio?;
    Some(if v > 0.0 && v < 1.0 {
        Signal::Bullish
    } else if v > 2.0 {
        Signal::Bearish
    } else {
        Signal::Neutral
    })
}

fn debt(s: &MetricsSnapshot) -> Option<Signal> {
    let v = s.debt_to_equity?;
    Some(if (0.0..0.5).contains(&v) {
        Signal::Bullish
    } else if v > 1.5 || v < 0.0 {
        Signal::Bearish
    } else {
        Signal::Neutral
    })
}

fn free_cash_flow(s: &MetricsSnapshot) -> Option<Signal> {
    let v = s.free_cash_flow?;
    Some(if v > 0.0 {
        Signal::Bullish
    } else if v < 0.0 {
        Signal::Bearish
    } else {
        Signal::Neutral
    })
}

fn short_interest(s: &MetricsSnapshot) -> Option<Signal> {
    let v = s.short_interest?;
    Some(if v > 20.0 {
        Signal::Bearish
    } else if v < 5.0 {
        Signal::Bullish
    } else {
        Signal::Neutral
    })
}

fn insider_balance(s: &MetricsSnapshot) -> Option<Signal> {
    if s.insider_transactions.is_empty() {
        return None;
    }
    let buys = s.insider_buys().count();
    let sells = s.insider_sells().count();
    Some(match buys.cmp(&sells) {
        std::cmp::Ordering::Greater => Signal::Bullish,
        std::cmp::Ordering::Less => Signal::Bearish,
        std::cmp::Ordering::Equal => Signal::Neutral,
    })
}

fn one_year_return(s: &MetricsSnapshot) -> Option<Signal> {
    let v = s.one_year_return?;
    // A deep one-year loss reads either way: value or falling knife.
    Some(if v > 20.0 {
        Signal::Bullish
    } else {
        Signal::Neutral
    })
}

const CLASSIFIERS: &[fn(&MetricsSnapshot) -> Option<Signal>] = &[
    rsi,
    pe,
    peg,
    debt,
    free_cash_flow,
    short_interest,
    insider_balance,
    one_year_return,
];

/// Tallies each available metric into exactly one bucket. Unavailable metrics are
/// not counted anywhere.
pub fn count_signals(snapshot: &MetricsSnapshot) -> SignalCounts {
    let mut counts = SignalCounts::default();
    for signal in CLASSIFIERS.iter().filter_map(|f| f(snapshot)) {
        match signal {
            Signal::Bullish => counts.bullish += 1,
            Signal::Bearish => counts.bearish += 1,
            Signal::Neutral => counts.neutral += 1,
        }
    }
    counts
}
