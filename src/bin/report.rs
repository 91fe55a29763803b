//! Print indicator reports for IPs, domains and file hashes as JSON lines.

use std::path::PathBuf;

use anyhow::Context;
use vantage::{AppConfig, AppError, Reporter};

struct Args {
    config: Option<PathBuf>,
    entities: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let Some(args) = parse_args(std::env::args().skip(1))? else {
        print_usage();
        return Ok(());
    };

    let config = AppConfig::load(args.config.as_deref()).context("loading configuration")?;
    vantage::logging::init_tracing();

    let reporter = Reporter::start(config)?;
    let stdout = std::io::stdout();
    let outcome = reporter.write_reports(&args.entities, &mut stdout.lock());
    reporter.shutdown();

    let complete = outcome?;
    tracing::info!(
        entities = args.entities.len(),
        complete,
        "vantage-report finished"
    );
    Ok(())
}

/// `Ok(None)` means help was requested.
fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Option<Args>, AppError> {
    let mut config = None;
    let mut entities = Vec::new();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "-h" | "--help" | "help" => return Ok(None),
            "-c" | "--config" => {
                let path = raw
                    .next()
                    .ok_or_else(|| AppError::Usage("--config requires a path".to_owned()))?;
                config = Some(PathBuf::from(path));
            }
            other if other.starts_with('-') => {
                return Err(AppError::Usage(format!("unknown option `{other}`")));
            }
            _ => entities.push(arg),
        }
    }
    if entities.is_empty() {
        return Err(AppError::Usage(
            "at least one entity is required (see --help)".to_owned(),
        ));
    }
    Ok(Some(Args { config, entities }))
}

fn print_usage() {
    println!("usage: vantage-report [--config PATH] <ip|domain|hash>...");
    println!();
    println!("Writes one JSON report per entity to stdout. Logs go to stderr;");
    println!("set RUST_LOG to adjust verbosity.");
}
