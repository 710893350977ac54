//! rate-scout command-line entry point.

mod cli;
mod config;
mod error;
mod output;

use clap::error::ErrorKind;
use clap::Parser;

use rate_scout::{
    parse_hotel_url, ChromiumRenderer, DateRange, PageRenderer, PriceRecord, Scanner,
    SnapshotRenderer, TracingSink,
};

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::Envelope;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let message = e
                .to_string()
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string();
            finish(Err(CliError::Usage(message)), false)
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = run(&cli).await;
    finish(result, cli.pretty)
}

/// Print the result envelope and exit with its code.
fn finish(result: Result<Vec<PriceRecord>, CliError>, pretty: bool) -> ! {
    let (envelope, code) = match result {
        Ok(records) => (Envelope::success(records), 0),
        Err(e) => {
            tracing::error!("{e}");
            (Envelope::failure(&e), e.exit_code())
        }
    };
    if let Err(e) = output::render(&envelope, pretty) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    std::process::exit(code)
}

async fn run(cli: &Cli) -> Result<Vec<PriceRecord>, CliError> {
    let base_url = parse_hotel_url(&cli.hotel_url)?;
    let filter = config::room_type_filter(cli.room_types.as_deref())?;
    let profile = config::load_profile(cli.profile.as_deref())?;
    let scanner = Scanner::new(&config::scan_config(&cli.timing), profile)?;

    let range = match cli.start_date {
        Some(start) => DateRange::new(start, cli.days_forward),
        None => DateRange::from_today(cli.days_forward),
    };

    let renderer = open_renderer(cli).await?;
    let result = scanner
        .run(renderer.as_ref(), &base_url, range, &filter, &TracingSink)
        .await;

    if let Err(e) = renderer.shutdown().await {
        tracing::warn!("renderer shutdown failed: {e:#}");
    }
    Ok(result?)
}

async fn open_renderer(cli: &Cli) -> Result<Box<dyn PageRenderer>, CliError> {
    match &cli.snapshot_dir {
        Some(dir) => {
            let renderer = SnapshotRenderer::from_dir(dir)
                .map_err(|e| CliError::Usage(format!("cannot read {}: {e}", dir.display())))?;
            tracing::info!(
                dates = renderer.dates().len(),
                "replaying snapshots from {}",
                dir.display()
            );
            Ok(Box::new(renderer))
        }
        None => {
            let renderer = ChromiumRenderer::launch()
                .await
                .map_err(|e| CliError::Browser(format!("{e:#}")))?;
            Ok(Box::new(renderer))
        }
    }
}
