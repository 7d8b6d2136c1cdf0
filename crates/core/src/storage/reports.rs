use crate::domain::mentions::{MentionAggregate, SentimentLabel};
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::report::{AnalyzedStock, DailyReport, RankedStock, SectorCategory, SignalCounts};
use crate::domain::tips::Tip;
use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use sqlx::types::Json;
use std::collections::BTreeMap;

const LOCK_NAMESPACE: i64 = 0x5354_4B54_414C; // "STKTAL"
const TOP_FEATURED_LIMIT: i64 = 10;

fn lock_key_for_date(report_date: NaiveDate) -> i64 {
    LOCK_NAMESPACE ^ i64::from(report_date.num_days_from_ce())
}

/// Replaces any report already stored for the same date.
///
/// Writers for one date are serialized by a transaction-scoped advisory lock. Returns
/// `None` without writing when another run holds it.
pub async fn persist_report(
    pool: &sqlx::PgPool,
    report: &DailyReport,
) -> anyhow::Result<Option<uuid::Uuid>> {
    anyhow::ensure!(!report.items.is_empty(), "report must have at least one item");

    let mut tx = pool.begin().await.context("begin transaction failed")?;

    let key = lock_key_for_date(report.report_date);
    let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
        .bind(key)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;
    if !acquired {
        tx.rollback().await.context("rollback transaction failed")?;
        return Ok(None);
    }

    let replaced = sqlx::query("DELETE FROM daily_reports WHERE report_date = $1")
        .bind(report.report_date)
        .execute(&mut *tx)
        .await
        .context("delete previous daily_reports failed")?
        .rows_affected();
    if replaced > 0 {
        tracing::info!(report_date = %report.report_date, "replacing existing report");
    }

    let report_id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO daily_reports (report_date, generated_at, total_candidates, stocks_passing_criteria, tip_title, tip_content) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(report.report_date)
    .bind(report.generated_at)
    .bind(to_i32(report.total_candidates)?)
    .bind(to_i32(report.stocks_passing_criteria)?)
    .bind(&report.tip.title)
    .bind(&report.tip.content)
    .fetch_one(&mut *tx)
    .await
    .context("insert daily_reports failed")?;

    for item in &report.items {
        insert_stock(&mut tx, report_id, item).await?;
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(Some(report_id))
}

async fn insert_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    report_id: uuid::Uuid,
    item: &RankedStock,
) -> anyhow::Result<()> {
    let s = &item.stock;
    sqlx::query(
        "INSERT INTO report_stocks (report_id, rank, ticker, company_name, sector_category, score, is_dark_horse, \
         dark_horse_reasons, buy_case, risk_factors, signals, mentions, metrics) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(report_id)
    .bind(item.rank as i32)
    .bind(&s.ticker)
    .bind(s.metrics.name.as_deref())
    .bind(s.sector_category.as_str())
    .bind(s.score)
    .bind(s.is_dark_horse)
    .bind(Json(&s.dark_horse_reasons))
    .bind(&s.buy_case)
    .bind(Json(&s.risk_factors))
    .bind(Json(&s.signals))
    .bind(Json(&s.mentions))
    .bind(Json(&s.metrics))
    .execute(&mut **tx)
    .await
    .with_context(|| format!("insert report_stocks failed for {}", s.ticker))?;

    Ok(())
}

fn to_i32(n: usize) -> anyhow::Result<i32> {
    i32::try_from(n).with_context(|| format!("count {n} does not fit in INTEGER"))
}

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: uuid::Uuid,
    report_date: NaiveDate,
    generated_at: DateTime<Utc>,
    total_candidates: i32,
    stocks_passing_criteria: i32,
    tip_title: String,
    tip_content: String,
}

#[derive(sqlx::FromRow)]
struct StockRow {
    rank: i32,
    ticker: String,
    sector_category: String,
    score: f64,
    is_dark_horse: bool,
    dark_horse_reasons: Json<Vec<String>>,
    buy_case: String,
    risk_factors: Json<Vec<String>>,
    signals: Json<SignalCounts>,
    mentions: Json<MentionAggregate>,
    metrics: Json<MetricsSnapshot>,
}

const REPORT_COLUMNS: &str =
    "id, report_date, generated_at, total_candidates, stocks_passing_criteria, tip_title, tip_content";

const STOCK_COLUMNS: &str = "s.rank, s.ticker, s.sector_category, s.score, s.is_dark_horse, \
     s.dark_horse_reasons, s.buy_case, s.risk_factors, s.signals, s.mentions, s.metrics";

impl StockRow {
    fn into_ranked(self) -> anyhow::Result<RankedStock> {
        let rank = u32::try_from(self.rank)
            .with_context(|| format!("{}: negative rank {}", self.ticker, self.rank))?;
        let sector_category = SectorCategory::parse(&self.sector_category).with_context(|| {
            format!("{}: unknown sector category {:?}", self.ticker, self.sector_category)
        })?;
        Ok(RankedStock {
            rank,
            stock: AnalyzedStock {
                ticker: self.ticker,
                metrics: self.metrics.0,
                mentions: self.mentions.0,
                sector_category,
                score: self.score,
                signals: self.signals.0,
                buy_case: self.buy_case,
                risk_factors: self.risk_factors.0,
                is_dark_horse: self.is_dark_horse,
                dark_horse_reasons: self.dark_horse_reasons.0,
            },
        })
    }
}

async fn load_items(pool: &sqlx::PgPool, report_id: uuid::Uuid) -> anyhow::Result<Vec<RankedStock>> {
    let rows: Vec<StockRow> = sqlx::query_as(&format!(
        "SELECT {STOCK_COLUMNS} FROM report_stocks s WHERE s.report_id = $1 ORDER BY s.rank ASC"
    ))
    .bind(report_id)
    .fetch_all(pool)
    .await
    .context("select report_stocks failed")?;

    rows.into_iter().map(StockRow::into_ranked).collect()
}

async fn hydrate(pool: &sqlx::PgPool, row: ReportRow) -> anyhow::Result<DailyReport> {
    let items = load_items(pool, row.id).await?;
    Ok(DailyReport {
        report_date: row.report_date,
        generated_at: row.generated_at,
        total_candidates: row.total_candidates.max(0) as usize,
        stocks_passing_criteria: row.stocks_passing_criteria.max(0) as usize,
        tip: Tip {
            title: row.tip_title,
            content: row.tip_content,
        },
        items,
    })
}

pub async fn fetch_latest_report(pool: &sqlx::PgPool) -> anyhow::Result<Option<DailyReport>> {
    let row: Option<ReportRow> = sqlx::query_as(&format!(
        "SELECT {REPORT_COLUMNS} FROM daily_reports ORDER BY report_date DESC LIMIT 1"
    ))
    .fetch_optional(pool)
    .await
    .context("select latest daily_reports failed")?;

    match row {
        Some(row) => Ok(Some(hydrate(pool, row).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_report(
    pool: &sqlx::PgPool,
    report_date: NaiveDate,
) -> anyhow::Result<Option<DailyReport>> {
    let row: Option<ReportRow> = sqlx::query_as(&format!(
        "SELECT {REPORT_COLUMNS} FROM daily_reports WHERE report_date = $1"
    ))
    .bind(report_date)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("select daily_reports failed for {report_date}"))?;

    match row {
        Some(row) => Ok(Some(hydrate(pool, row).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_report_stock(
    pool: &sqlx::PgPool,
    report_date: NaiveDate,
    ticker: &str,
) -> anyhow::Result<Option<RankedStock>> {
    let row: Option<StockRow> = sqlx::query_as(&format!(
        "SELECT {STOCK_COLUMNS} FROM report_stocks s JOIN daily_reports r ON r.id = s.report_id \
         WHERE r.report_date = $1 AND s.ticker = $2"
    ))
    .bind(report_date)
    .bind(ticker)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("select report_stocks failed for {report_date}/{ticker}"))?;

    row.map(StockRow::into_ranked).transpose()
}

/// One stored report without its items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub report_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub total_candidates: usize,
    pub stocks_passing_criteria: usize,
    pub stocks_in_report: usize,
    pub dark_horse_count: usize,
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    report_date: NaiveDate,
    generated_at: DateTime<Utc>,
    total_candidates: i32,
    stocks_passing_criteria: i32,
    stocks_in_report: i64,
    dark_horse_count: i64,
}

impl From<SummaryRow> for ReportSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            report_date: row.report_date,
            generated_at: row.generated_at,
            total_candidates: row.total_candidates.max(0) as usize,
            stocks_passing_criteria: row.stocks_passing_criteria.max(0) as usize,
            stocks_in_report: row.stocks_in_report.max(0) as usize,
            dark_horse_count: row.dark_horse_count.max(0) as usize,
        }
    }
}

/// Newest first. Also returns the total number of stored reports.
pub async fn list_reports(
    pool: &sqlx::PgPool,
    limit: u32,
    offset: u32,
) -> anyhow::Result<(Vec<ReportSummary>, u64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_reports")
        .fetch_one(pool)
        .await
        .context("count daily_reports failed")?;

    let rows: Vec<SummaryRow> = sqlx::query_as(
        "SELECT r.report_date, r.generated_at, r.total_candidates, r.stocks_passing_criteria, \
         COUNT(s.id) AS stocks_in_report, \
         COUNT(s.id) FILTER (WHERE s.is_dark_horse) AS dark_horse_count \
         FROM daily_reports r LEFT JOIN report_stocks s ON s.report_id = r.id \
         GROUP BY r.id ORDER BY r.report_date DESC LIMIT $1 OFFSET $2",
    )
    .bind(i64::from(limit))
    .bind(i64::from(offset))
    .fetch_all(pool)
    .await
    .context("select daily_reports page failed")?;

    Ok((
        rows.into_iter().map(ReportSummary::from).collect(),
        total.max(0) as u64,
    ))
}

/// A ticker's snapshot in one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerAppearance {
    pub report_date: NaiveDate,
    pub rank: u32,
    pub score: f64,
    pub is_dark_horse: bool,
    pub sector_category: SectorCategory,
    pub price: Option<f64>,
    pub pct_from_ath: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub rsi: Option<f64>,
    pub total_mentions: u32,
    pub sentiment: SentimentLabel,
    pub buy_case: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerHistory {
    pub ticker: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub appearances: usize,
    pub history: Vec<TickerAppearance>,
}

#[derive(sqlx::FromRow)]
struct AppearanceRow {
    report_date: NaiveDate,
    rank: i32,
    score: f64,
    is_dark_horse: bool,
    sector_category: String,
    buy_case: String,
    mentions: Json<MentionAggregate>,
    metrics: Json<MetricsSnapshot>,
}

impl AppearanceRow {
    fn into_appearance(self) -> anyhow::Result<(TickerAppearance, MetricsSnapshot)> {
        let rank = u32::try_from(self.rank)
            .with_context(|| format!("{}: negative rank {}", self.report_date, self.rank))?;
        let sector_category = SectorCategory::parse(&self.sector_category).with_context(|| {
            format!("{}: unknown sector category {:?}", self.report_date, self.sector_category)
        })?;
        let metrics = self.metrics.0;
        let appearance = TickerAppearance {
            report_date: self.report_date,
            rank,
            score: self.score,
            is_dark_horse: self.is_dark_horse,
            sector_category,
            price: metrics.current_price,
            pct_from_ath: metrics.pct_from_ath,
            pe_ratio: metrics.pe_ratio,
            rsi: metrics.rsi,
            total_mentions: self.mentions.0.total_mentions,
            sentiment: self.mentions.0.sentiment_label(),
            buy_case: self.buy_case,
        };
        Ok((appearance, metrics))
    }
}

/// Identity comes from the newest appearance. Empty rows mean the ticker was never reported.
fn build_history(ticker: &str, rows: Vec<AppearanceRow>) -> anyhow::Result<Option<TickerHistory>> {
    let mut history = Vec::with_capacity(rows.len());
    let mut identity: Option<MetricsSnapshot> = None;
    for row in rows {
        let (appearance, metrics) = row.into_appearance()?;
        if identity.is_none() {
            identity = Some(metrics);
        }
        history.push(appearance);
    }

    let Some(identity) = identity else {
        return Ok(None);
    };
    Ok(Some(TickerHistory {
        ticker: ticker.to_string(),
        name: identity.name,
        sector: identity.sector,
        industry: identity.industry,
        appearances: history.len(),
        history,
    }))
}

/// Up to `limit` appearances of `ticker`, newest report first.
pub async fn fetch_ticker_history(
    pool: &sqlx::PgPool,
    ticker: &str,
    limit: u32,
) -> anyhow::Result<Option<TickerHistory>> {
    let rows: Vec<AppearanceRow> = sqlx::query_as(
        "SELECT r.report_date, s.rank, s.score, s.is_dark_horse, s.sector_category, s.buy_case, \
         s.mentions, s.metrics \
         FROM report_stocks s JOIN daily_reports r ON r.id = s.report_id \
         WHERE s.ticker = $1 ORDER BY r.report_date DESC LIMIT $2",
    )
    .bind(ticker)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await
    .with_context(|| format!("select report_stocks history failed for {ticker}"))?;

    build_history(ticker, rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedStock {
    pub ticker: String,
    pub name: Option<String>,
    pub appearances: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportStats {
    pub total_reports: u64,
    pub total_unique_stocks: u64,
    pub top_featured_stocks: Vec<FeaturedStock>,
    /// Ranked-stock count per sector category across all reports.
    pub sector_distribution: BTreeMap<String, u64>,
}

#[derive(sqlx::FromRow)]
struct FeaturedRow {
    ticker: String,
    company_name: Option<String>,
    appearances: i64,
}

impl From<FeaturedRow> for FeaturedStock {
    fn from(row: FeaturedRow) -> Self {
        Self {
            ticker: row.ticker,
            name: row.company_name,
            appearances: row.appearances.max(0) as u64,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SectorCountRow {
    sector_category: String,
    stocks: i64,
}

fn sector_distribution(rows: Vec<SectorCountRow>) -> BTreeMap<String, u64> {
    rows.into_iter()
        .filter(|r| !r.sector_category.is_empty())
        .map(|r| (r.sector_category, r.stocks.max(0) as u64))
        .collect()
}

pub async fn fetch_stats(pool: &sqlx::PgPool) -> anyhow::Result<ReportStats> {
    let total_reports: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_reports")
        .fetch_one(pool)
        .await
        .context("count daily_reports failed")?;

    let total_unique_stocks: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT ticker) FROM report_stocks")
            .fetch_one(pool)
            .await
            .context("count distinct report_stocks tickers failed")?;

    let featured: Vec<FeaturedRow> = sqlx::query_as(
        "SELECT ticker, MAX(company_name) AS company_name, COUNT(*) AS appearances \
         FROM report_stocks GROUP BY ticker ORDER BY appearances DESC, ticker ASC LIMIT $1",
    )
    .bind(TOP_FEATURED_LIMIT)
    .fetch_all(pool)
    .await
    .context("select top featured stocks failed")?;

    let sectors: Vec<SectorCountRow> = sqlx::query_as(
        "SELECT sector_category, COUNT(*) AS stocks FROM report_stocks GROUP BY sector_category",
    )
    .fetch_all(pool)
    .await
    .context("select sector distribution failed")?;

    Ok(ReportStats {
        total_reports: total_reports.max(0) as u64,
        total_unique_stocks: total_unique_stocks.max(0) as u64,
        top_featured_stocks: featured.into_iter().map(FeaturedStock::from).collect(),
        sector_distribution: sector_distribution(sectors),
    })
}
