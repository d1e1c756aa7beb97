pub mod batch;
pub mod classify;
pub mod config;
pub mod eml_source;
pub mod error;
pub mod export;
pub mod extract;
pub mod ledger;
pub mod normalize;

pub use batch::{process_source_path, summary_to_json, BatchSummary};
pub use classify::{classify, MessageKind};
pub use config::{LedgerConfig, LedgerRequest};
pub use error::LedgerError;
pub use ledger::{build_record, sort_records, TransactionRecord};

/// Reads every mail under the configured source, writes the sorted ledger
/// and returns the run summary.
pub fn run(config: &LedgerConfig) -> error::Result<BatchSummary> {
    let (records, summary) = process_source_path(&config.source_path, &config.integration_name)?;
    export::write_ledger_file(&config.output_path, &records)?;
    Ok(summary)
}
