use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stocktalk_core::domain::report::{DailyReport, RankedStock};
use stocktalk_core::domain::tips::Tip;
use stocktalk_core::storage::reports::{self, ReportStats, ReportSummary, TickerHistory};

const DEFAULT_PAGE_LIMIT: u32 = 30;
const MAX_PAGE_LIMIT: u32 = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stocktalk_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();
    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match stocktalk_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let app = router(AppState { pool });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/reports", get(list_reports))
        .route("/reports/latest", get(get_latest_report))
        .route("/reports/:report_date", get(get_report_by_date))
        .route("/reports/:report_date/:ticker", get(get_report_stock))
        .route("/stocks/:ticker", get(get_stock_history))
        .route("/stats", get(get_stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    pool: Option<PgPool>,
}

/// A ranked stock plus the display fields derived from its snapshot.
#[derive(Debug, Serialize)]
struct ApiStock {
    #[serde(flatten)]
    item: RankedStock,
    display_name: String,
    target_upside_pct: Option<f64>,
    sentiment_label: &'static str,
    market_cap_category: Option<&'static str>,
}

impl From<RankedStock> for ApiStock {
    fn from(item: RankedStock) -> Self {
        let s = &item.stock;
        Self {
            display_name: s.display_name().to_string(),
            target_upside_pct: s.target_upside_pct(),
            sentiment_label: s.mentions.sentiment_label().as_str(),
            market_cap_category: s.metrics.cap_category().map(|c| c.as_str()),
            item,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiReport {
    report_date: NaiveDate,
    generated_at: DateTime<Utc>,
    total_candidates: usize,
    stocks_passing_criteria: usize,
    dark_horse_count: usize,
    tip: Tip,
    items: Vec<ApiStock>,
}

impl From<DailyReport> for ApiReport {
    fn from(report: DailyReport) -> Self {
        Self {
            report_date: report.report_date,
            generated_at: report.generated_at,
            total_candidates: report.total_candidates,
            stocks_passing_criteria: report.stocks_passing_criteria,
            dark_horse_count: report.items.iter().filter(|i| i.stock.is_dark_horse).count(),
            tip: report.tip,
            items: report.items.into_iter().map(ApiStock::from).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    limit: Option<u32>,
    offset: Option<u32>,
}

impl PageParams {
    fn limit(&self) -> Result<u32, StatusCode> {
        match self.limit.unwrap_or(DEFAULT_PAGE_LIMIT) {
            n @ 1..=MAX_PAGE_LIMIT => Ok(n),
            _ => Err(StatusCode::BAD_REQUEST),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiReportPage {
    reports: Vec<ReportSummary>,
    total: u64,
    limit: u32,
    offset: u32,
}

fn internal_error(e: anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(&e);
    tracing::error!(error = %format!("{e:#}"), "report query failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn parse_report_date(raw: &str) -> Result<NaiveDate, StatusCode> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| StatusCode::BAD_REQUEST)
}

async fn get_latest_report(
    State(state): State<AppState>,
) -> Result<Json<ApiReport>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let report = reports::fetch_latest_report(pool)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(report.into()))
}

async fn get_report_by_date(
    State(state): State<AppState>,
    Path(report_date): Path<String>,
) -> Result<Json<ApiReport>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let report_date = parse_report_date(&report_date)?;

    let report = reports::fetch_report(pool, report_date)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(report.into()))
}

async fn get_report_stock(
    State(state): State<AppState>,
    Path((report_date, ticker)): Path<(String, String)>,
) -> Result<Json<ApiStock>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let report_date = parse_report_date(&report_date)?;
    let ticker = stocktalk_core::ingest::provider::normalize_ticker(&ticker);

    let item = reports::fetch_report_stock(pool, report_date, &ticker)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(item.into()))
}

async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ApiReportPage>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let limit = params.limit()?;
    let offset = params.offset.unwrap_or(0);
    let (reports, total) = reports::list_reports(pool, limit, offset)
        .await
        .map_err(internal_error)?;

    Ok(Json(ApiReportPage {
        reports,
        total,
        limit,
        offset,
    }))
}

async fn get_stock_history(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<TickerHistory>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let limit = params.limit()?;
    let ticker = stocktalk_core::ingest::provider::normalize_ticker(&ticker);

    let history = reports::fetch_ticker_history(pool, &ticker, limit)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(history))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<ReportStats>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let stats = reports::fetch_stats(pool).await.map_err(internal_error)?;
    Ok(Json(stats))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &stocktalk_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocktalk_core::domain::mentions::MentionAggregate;
    use stocktalk_core::domain::metrics::MetricsSnapshot;
    use stocktalk_core::domain::report::{AnalyzedStock, SectorCategory, SignalCounts};

    fn ranked() -> RankedStock {
        RankedStock {
            rank: 1,
            stock: AnalyzedStock {
                ticker: "SOFI".to_string(),
                metrics: MetricsSnapshot {
                    current_price: Some(8.0),
                    target_price_mean: Some(10.0),
                    market_cap: Some(8.5),
                    ..Default::default()
                },
                mentions: MentionAggregate {
                    total_mentions: 40,
                    avg_sentiment: 0.45,
                    ..Default::default()
                },
                sector_category: SectorCategory::Other,
                score: 72.5,
                signals: SignalCounts::default(),
                buy_case: "Cheap.".to_string(),
                risk_factors: vec!["Volatile".to_string()],
                is_dark_horse: false,
                dark_horse_reasons: Vec::new(),
            },
        }
    }

    #[test]
    fn api_stock_adds_derived_display_fields() {
        let v = serde_json::to_value(ApiStock::from(ranked())).unwrap();
        assert_eq!(v["rank"], 1);
        assert_eq!(v["ticker"], "SOFI");
        assert_eq!(v["display_name"], "SOFI");
        assert_eq!(v["target_upside_pct"], 25.0);
        assert_eq!(v["sentiment_label"], "Bullish");
        assert_eq!(v["market_cap_category"], "mid");
    }

    #[test]
    fn bad_report_date_is_400() {
        assert_eq!(parse_report_date("2026/02/06"), Err(StatusCode::BAD_REQUEST));
        assert!(parse_report_date("2026-02-06").is_ok());
    }

    #[test]
    fn page_limit_defaults_and_bounds() {
        let page = |limit| PageParams {
            limit,
            offset: None,
        };
        assert_eq!(page(None).limit(), Ok(30));
        assert_eq!(page(Some(1)).limit(), Ok(1));
        assert_eq!(page(Some(100)).limit(), Ok(100));
        assert_eq!(page(Some(0)).limit(), Err(StatusCode::BAD_REQUEST));
        assert_eq!(page(Some(101)).limit(), Err(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn report_page_serializes_paging_fields() {
        let page = ApiReportPage {
            reports: vec![ReportSummary {
                report_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
                generated_at: Utc::now(),
                total_candidates: 60,
                stocks_passing_criteria: 14,
                stocks_in_report: 12,
                dark_horse_count: 2,
            }],
            total: 41,
            limit: 30,
            offset: 30,
        };
        let v = serde_json::to_value(page).unwrap();
        assert_eq!(v["total"], 41);
        assert_eq!(v["offset"], 30);
        assert_eq!(v["reports"][0]["report_date"], "2026-03-09");
        assert_eq!(v["reports"][0]["stocks_in_report"], 12);
    }

    #[tokio::test]
    async fn degraded_mode_returns_503() {
        let state = AppState { pool: None };
        let res = get_latest_report(State(state.clone())).await;
        assert_eq!(res.err(), Some(StatusCode::SERVICE_UNAVAILABLE));

        let res = get_stats(State(state.clone())).await;
        assert_eq!(res.err(), Some(StatusCode::SERVICE_UNAVAILABLE));

        let res = list_reports(State(state.clone()), Query(PageParams::default())).await;
        assert_eq!(res.err(), Some(StatusCode::SERVICE_UNAVAILABLE));

        let res = get_stock_history(
            State(state),
            Path("pltr".to_string()),
            Query(PageParams::default()),
        )
        .await;
        assert_eq!(res.err(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }
}
