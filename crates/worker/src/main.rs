use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use std::collections::BTreeMap;
use stocktalk_core::analysis::pipeline::{self, PipelineInput};
use stocktalk_core::config::{AnalysisConfig, Settings};
use stocktalk_core::domain::mentions::MentionAggregate;
use stocktalk_core::domain::report::DailyReport;
use stocktalk_core::ingest::provider::{HttpJsonDataProvider, MarketDataProvider, MentionProvider};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod universe;

#[derive(Debug, Parser)]
#[command(name = "stocktalk_worker")]
struct Args {
    /// Report date (YYYY-MM-DD). Defaults to the last completed US session.
    #[arg(long)]
    report_date: Option<String>,

    /// Build and validate the report, print it as JSON, skip the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(args, settings).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "daily report run failed");
        return Err(err);
    }
    Ok(())
}

async fn run(args: Args, settings: Settings) -> anyhow::Result<()> {
    let config = AnalysisConfig::from_env()?;

    let now = chrono::Utc::now();
    let report_date =
        stocktalk_core::time::us_market::resolve_report_date(args.report_date.as_deref(), now)?;
    // Earnings countdowns run from the wall-clock date, not the session being reported.
    let today = stocktalk_core::time::us_market::pacific_today(now)?;

    let provider = HttpJsonDataProvider::from_settings(&settings)?;

    let mentions = gather_mentions(&provider, report_date, &config).await;
    let mut universe = if mentions.is_fallback {
        universe::fallback_universe()
    } else {
        universe::ordered_universe(&mentions.aggregates)
    };
    universe.truncate(config.max_candidates);

    tracing::info!(
        %report_date,
        fallback = mentions.is_fallback,
        candidates = universe.len(),
        "candidate universe ready"
    );

    let metrics = provider
        .fetch_metrics(&universe)
        .await
        .context("market metrics fetch failed")?;

    let input = PipelineInput {
        universe,
        metrics,
        mentions: mentions.aggregates,
    };

    let Some(outcome) = pipeline::run(&input, &config, today) else {
        tracing::warn!(%report_date, "no report produced for this date");
        return Ok(());
    };

    let report = DailyReport::assemble(report_date, chrono::Utc::now(), outcome);
    report.validate(&config).context("report failed contract validation")?;

    if args.dry_run {
        let json = serde_json::to_string_pretty(&report).context("serialize report failed")?;
        println!("{json}");
        tracing::info!(%report_date, dry_run = true, items = report.items.len(), "report built");
        return Ok(());
    }

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    stocktalk_core::storage::migrate(&pool).await?;

    let Some(report_id) = stocktalk_core::storage::reports::persist_report(&pool, &report).await?
    else {
        tracing::warn!(%report_date, "report_date lock not acquired; another run in progress");
        return Ok(());
    };

    tracing::info!(
        %report_date,
        %report_id,
        items = report.items.len(),
        dark_horses = report.items.iter().filter(|i| i.stock.is_dark_horse).count(),
        "persisted daily report"
    );
    Ok(())
}

struct GatheredMentions {
    aggregates: BTreeMap<String, MentionAggregate>,
    is_fallback: bool,
}

async fn gather_mentions(
    provider: &HttpJsonDataProvider,
    report_date: NaiveDate,
    config: &AnalysisConfig,
) -> GatheredMentions {
    let fallback = || GatheredMentions {
        aggregates: universe::fallback_mentions(config.min_mentions),
        is_fallback: true,
    };

    match provider.fetch_mentions(report_date).await {
        Ok(aggregates) if !aggregates.is_empty() => GatheredMentions {
            aggregates,
            is_fallback: false,
        },
        Ok(_) => {
            tracing::info!(%report_date, "mention provider returned no data; using curated universe");
            fallback()
        }
        Err(err) => {
            tracing::warn!(%report_date, error = %format!("{err:#}"), "mention fetch failed; using curated universe");
            fallback()
        }
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
