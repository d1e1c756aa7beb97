use rust_xlsxwriter::{Format, Workbook};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::ledger::{TransactionRecord, LEDGER_HEADERS};

pub const SHEET_NAME: &str = "Transactions";

/// Output layout, picked from the destination file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    /// `.csv` writes CSV; anything else writes a workbook.
    pub fn for_path(path: &Path) -> Self {
        let is_csv = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv {
            ExportFormat::Csv
        } else {
            ExportFormat::Xlsx
        }
    }
}

pub fn write_ledger<W: Write>(writer: W, records: &[TransactionRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(LEDGER_HEADERS)?;
    for rec in records {
        wtr.write_record(rec.to_row())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Single `Transactions` sheet: bold header row, one row per record,
/// columns sized to their content. Empty fields stay blank cells.
pub fn build_workbook(records: &[TransactionRecord]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in LEDGER_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }
    for (idx, rec) in records.iter().enumerate() {
        let row = idx as u32 + 1;
        for (col, cell) in rec.to_row().iter().enumerate() {
            if !cell.is_empty() {
                worksheet.write_string(row, col as u16, *cell)?;
            }
        }
    }
    worksheet.autofit();
    Ok(workbook)
}

pub fn write_ledger_file(path: &Path, records: &[TransactionRecord]) -> Result<()> {
    match ExportFormat::for_path(path) {
        ExportFormat::Csv => write_ledger(File::create(path)?, records)?,
        ExportFormat::Xlsx => build_workbook(records)?.save(path)?,
    }
    tracing::info!(
        "Ledger file created: {} ({} rows)",
        path.to_string_lossy(),
        records.len()
    );
    Ok(())
}
