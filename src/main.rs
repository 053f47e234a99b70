use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use tvratings::cli::Args;
use tvratings::config::Config;
use tvratings::error::ScraperError;
use tvratings::logging::setup_logging;
use tvratings::pipeline::{Series, SeriesReport, enrich};
use tvratings::scraper::transport::BrowserTransport;
use tvratings::scraper::{MetacriticScraper, RottenTomatoesScraper, rotten_tomatoes_browser};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        "starting tvratings"
    );

    match run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "tvratings failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, config: &Config) -> anyhow::Result<()> {
    let series = collect_series(args)?;
    if series.is_empty() {
        anyhow::bail!("no series given; pass --series TITLE=YEAR or --input FILE");
    }

    let mut reports: Vec<SeriesReport> = series.iter().map(SeriesReport::from).collect();

    if args.source.metacritic() {
        let scraper = MetacriticScraper::from_config(config)
            .await
            .context("Failed to build Metacritic scraper")?;
        let results = enrich(&scraper, &series).await;
        for (report, result) in reports.iter_mut().zip(results) {
            report.metacritic = result;
        }
    }

    if args.source.rotten_tomatoes() {
        let series = &series;
        let results = BrowserTransport::scoped(rotten_tomatoes_browser(config), |browser| async move {
            let scraper = RottenTomatoesScraper::from_config(config, browser).await?;
            Ok::<_, ScraperError>(enrich(&scraper, series).await)
        })
        .await
        .and_then(|inner| inner)
        .context("Failed to run Rotten Tomatoes scraper")?;

        for (report, result) in reports.iter_mut().zip(results) {
            report.rotten_tomatoes = result;
        }
    }

    let json = serde_json::to_string_pretty(&reports).context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}

/// Series from `--series` arguments followed by those in `--input`.
fn collect_series(args: &Args) -> anyhow::Result<Vec<Series>> {
    let mut series = args.series.clone();
    if let Some(path) = &args.input {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let from_file: Vec<Series> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        series.extend(from_file);
    }
    Ok(series)
}
