use clap::Parser;
use robinhood_ledger::{run, summary_to_json, LedgerError, LedgerRequest};
use tracing_subscriber::EnvFilter;

/// Converts a folder of Robinhood notification mails (.eml) into a ledger workbook
#[derive(Debug, Parser)]
#[command(name = "robinhood-ledger", version)]
struct Cli {
    /// An .eml file or a directory containing .eml files
    input: String,
    /// Destination file: .xlsx workbook, or CSV when the name ends in .csv
    output: String,
    /// Value written to the "Integration Name" column
    #[arg(long)]
    integration_name: Option<String>,
    /// Print the run summary as JSON to stdout
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<(), LedgerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "robinhood_ledger=info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = LedgerRequest {
        source_path: Some(cli.input),
        output_path: Some(cli.output),
        integration_name: cli.integration_name,
    }
    .resolve()?;

    let summary = run(&config)?;
    tracing::info!(
        "{} records written, {} skipped, {} unrecognized, {} failed",
        summary.records_count,
        summary.skipped_count,
        summary.unknown_count,
        summary.failed_files_count
    );
    if cli.summary {
        println!("{}", serde_json::to_string_pretty(&summary_to_json(&summary))?);
    }
    Ok(())
}
