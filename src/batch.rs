use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::classify::{classify, MessageKind};
use crate::eml_source::{collect_eml_files, read_message, DecodedMessage};
use crate::error::Result;
use crate::ledger::{build_record, sort_records, TransactionRecord};
use crate::normalize::format_sent_date;

const MAX_REPORTED_FAILURES: usize = 20;
const MAX_PREVIEW_ROWS: usize = 10;

#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchSummary {
    pub input_files_count: usize,
    pub records_count: usize,
    pub skipped_count: usize,
    pub unknown_count: usize,
    pub failed_files_count: usize,
    pub failed_files: Vec<Value>,
    pub unknown_subjects: Vec<String>,
    pub preview_rows: Vec<TransactionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Record(TransactionRecord),
    Skipped,
    Unrecognized,
}

/// Classifies one decoded mail and builds its row, if it has one.
pub fn process_message(msg: &DecodedMessage, integration_name: &str) -> MessageOutcome {
    let kind = classify(&msg.subject, &msg.body);
    if !kind.produces_record() {
        if kind == MessageKind::Skip {
            tracing::info!("Skipped processing for subject: {}", msg.subject);
            return MessageOutcome::Skipped;
        }
        tracing::warn!(
            "Unrecognized message type for subject: {} ({})",
            msg.subject,
            msg.file_name
        );
        return MessageOutcome::Unrecognized;
    }
    let sent_date = format_sent_date(msg.sent_at);
    match build_record(kind, &msg.body, &sent_date, integration_name) {
        Some(rec) => MessageOutcome::Record(rec),
        None => MessageOutcome::Unrecognized,
    }
}

/// Runs every file through decode → classify → extract and returns the
/// date-sorted rows. A failing file is recorded in the summary and skipped.
pub fn process_files(
    files: &[PathBuf],
    integration_name: &str,
) -> (Vec<TransactionRecord>, BatchSummary) {
    let mut records = Vec::<TransactionRecord>::new();
    let mut summary = BatchSummary {
        input_files_count: files.len(),
        ..BatchSummary::default()
    };

    for file in files {
        tracing::info!("Processing File: {}", file.to_string_lossy());
        let msg = match read_message(file) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::error!("Error processing file: {} - {err}", file.to_string_lossy());
                summary.failed_files_count += 1;
                if summary.failed_files.len() < MAX_REPORTED_FAILURES {
                    summary.failed_files.push(json!({
                        "file": file.to_string_lossy().to_string(),
                        "error": err,
                    }));
                }
                continue;
            }
        };

        match process_message(&msg, integration_name) {
            MessageOutcome::Record(rec) => records.push(rec),
            MessageOutcome::Skipped => summary.skipped_count += 1,
            MessageOutcome::Unrecognized => {
                summary.unknown_count += 1;
                if summary.unknown_subjects.len() < MAX_REPORTED_FAILURES {
                    summary.unknown_subjects.push(msg.subject.clone());
                }
            }
        }
    }

    sort_records(&mut records);
    summary.records_count = records.len();
    summary.preview_rows = records.iter().take(MAX_PREVIEW_ROWS).cloned().collect();
    (records, summary)
}

pub fn process_source_path(
    source_path: &Path,
    integration_name: &str,
) -> Result<(Vec<TransactionRecord>, BatchSummary)> {
    let files = collect_eml_files(source_path)?;
    Ok(process_files(&files, integration_name))
}

pub fn summary_to_json(summary: &BatchSummary) -> Value {
    json!({
        "input_files_count": summary.input_files_count,
        "records_count": summary.records_count,
        "skipped_count": summary.skipped_count,
        "unknown_count": summary.unknown_count,
        "failed_files_count": summary.failed_files_count,
        "failed_files": summary.failed_files,
        "unknown_subjects": summary.unknown_subjects,
        "preview_rows": summary.preview_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DEFAULT_INTEGRATION_NAME;
    use chrono::{TimeZone, Utc};
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn create_temp_dir() -> PathBuf {
        let unique = format!(
            "robinhood_ledger_batch_test_{}_{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("system time before epoch")
                .as_nanos()
        );
        let dir = std::env::temp_dir().join(unique);
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn eml(subject: &str, date: &str, body: &str) -> String {
        format!(
            "Subject: {subject}\r\nDate: {date}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}\r\n"
        )
    }

    #[test]
    fn gift_message_becomes_gift_received_row() {
        let msg = DecodedMessage {
            file_name: "gift.eml".to_string(),
            subject: "A gift for you".to_string(),
            body: "You received €10 in BTC for signing up".to_string(),
            sent_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
        };
        let MessageOutcome::Record(rec) = process_message(&msg, DEFAULT_INTEGRATION_NAME) else {
            panic!("expected a record");
        };
        assert_eq!(rec.date, "01.01.2024 00:00");
        assert_eq!(rec.label, "Gift-Received");
        assert_eq!(rec.incoming_asset, "BTC");
        assert_eq!(rec.incoming_amount, "???");
        assert_eq!(rec.comment, "You received €10 in BTC for signing up");
    }

    #[test]
    fn placed_orders_and_unknown_mails_produce_no_rows() {
        let placed = DecodedMessage {
            file_name: "placed.eml".to_string(),
            subject: "Your ETH order was placed".to_string(),
            body: "Your deposit has completed".to_string(),
            sent_at: None,
        };
        assert_eq!(
            process_message(&placed, DEFAULT_INTEGRATION_NAME),
            MessageOutcome::Skipped
        );
        let unknown = DecodedMessage {
            subject: "Newsletter".to_string(),
            body: "Markets moved today".to_string(),
            ..placed
        };
        assert_eq!(
            process_message(&unknown, DEFAULT_INTEGRATION_NAME),
            MessageOutcome::Unrecognized
        );
    }

    #[test]
    fn batch_isolates_failures_and_sorts_rows() {
        let dir = create_temp_dir();
        fs::write(
            dir.join("01_trade.eml"),
            eml(
                "Your ETH order was filled",
                "Fri, 12 Apr 2024 15:00:00 +0000",
                "Amount purchased: 0,5 ETH\r\nFinal cost: €1.500,00\r\nDate completed: 12 Apr 2024 at 16:45 CEST",
            ),
        )
        .expect("write trade");
        fs::write(
            dir.join("02_deposit.eml"),
            eml(
                "Deposit",
                "Tue, 2 Jan 2024 09:00:00 +0000",
                "Your deposit has completed\r\nAmount: 100€\r\nFrom: Jane Doe",
            ),
        )
        .expect("write deposit");
        fs::write(
            dir.join("03_placed.eml"),
            eml(
                "Your ETH order was placed",
                "Fri, 12 Apr 2024 14:40:00 +0000",
                "We received your order",
            ),
        )
        .expect("write placed");
        fs::write(
            dir.join("04_news.eml"),
            eml("Weekly digest", "Mon, 1 Jan 2024 08:00:00 +0000", "Markets moved"),
        )
        .expect("write news");
        fs::write(
            dir.join("05_broken.eml"),
            "Subject: broken\r\nContent-Type: multipart/mixed; boundary=\"B\"\r\n\r\n--B\r\nContent-Type: image/png\r\n\r\nxx\r\n--B--\r\n",
        )
        .expect("write broken");

        let (records, summary) =
            process_source_path(&dir, DEFAULT_INTEGRATION_NAME).expect("process dir");

        assert_eq!(summary.input_files_count, 5);
        assert_eq!(summary.records_count, 2);
        assert_eq!(summary.skipped_count, 1);
        assert_eq!(summary.unknown_count, 1);
        assert_eq!(summary.unknown_subjects, vec!["Weekly digest".to_string()]);
        assert_eq!(summary.failed_files_count, 1);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].label, "Deposit");
        assert_eq!(records[0].date, "02.01.2024 09:00");
        assert_eq!(records[1].label, "Trade");
        assert_eq!(records[1].date, "12.04.2024 14:45");
        assert_eq!(records[1].outgoing_amount, "1500.00");

        let json = summary_to_json(&summary);
        assert_eq!(json["records_count"], 2);
        assert_eq!(json["preview_rows"].as_array().map(Vec::len), Some(2));

        let _ = fs::remove_dir_all(&dir);
    }
}
