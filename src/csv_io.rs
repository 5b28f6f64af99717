// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Bulk CSV import and export of income/expense records.
//!
//! The file layout is `Category,Month,Year,Amount` with a header row.

use anyhow::{Context, Result};
use chrono::Utc;
use csv::{ReaderBuilder, Writer};
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;

use crate::models::{Month, Record, RecordId};
use crate::store::Gateway;

pub const CSV_HEADER: [&str; 4] = ["Category", "Month", "Year", "Amount"];

#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub records: Vec<Record>,
    /// Rows dropped for having too few columns or an unknown month.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub failed: usize,
}

pub fn parse_records_csv(path: &Path) -> Result<ParsedCsv> {
    let file = std::fs::File::open(path).with_context(|| format!("Open CSV {}", path.display()))?;
    parse_records(file).with_context(|| format!("Read CSV {}", path.display()))
}

/// Every parsed row becomes a new record with a fresh id. Unparsable amounts
/// are imported as zero.
pub fn parse_records<R: Read>(input: R) -> Result<ParsedCsv> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let mut parsed = ParsedCsv::default();
    for (idx, result) in rdr.records().enumerate() {
        let rec = result?;
        // header is line 1
        let line = idx + 2;
        if rec.len() < 4 {
            tracing::warn!(line, columns = rec.len(), "skipping short CSV row");
            parsed.skipped += 1;
            continue;
        }
        let month = match rec[1].trim().parse::<Month>() {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(line, "skipping CSV row: {err}");
                parsed.skipped += 1;
                continue;
            }
        };
        let amount_raw = rec[3].trim();
        let amount = amount_raw.parse::<Decimal>().unwrap_or_else(|_| {
            tracing::warn!(line, amount = amount_raw, "unparsable amount, importing as 0");
            Decimal::ZERO
        });
        let now = Utc::now();
        parsed.records.push(Record {
            id: RecordId::new(),
            category: rec[0].trim().to_string(),
            month,
            year: rec[2].trim().to_string(),
            amount,
            created_at: now,
            updated_at: now,
        });
    }
    Ok(parsed)
}

/// Inserts `records` one by one, reporting `inserted / total` after each.
/// A failed insert is logged and counted; the import carries on.
pub async fn import_records(
    gateway: &dyn Gateway<Record>,
    records: &[Record],
    progress: Option<&(dyn Fn(f32) + Send + Sync)>,
) -> ImportSummary {
    let mut summary = ImportSummary::default();
    let total = records.len().max(1) as f32;
    if let Some(p) = progress {
        p(0.0);
    }
    for (i, record) in records.iter().enumerate() {
        match gateway.insert(record).await {
            Ok(()) => summary.inserted += 1,
            Err(err) => {
                tracing::warn!(collection = %gateway.collection(), id = %record.id, "import insert failed: {err}");
                summary.failed += 1;
            }
        }
        if let Some(p) = progress {
            p((i + 1) as f32 / total);
        }
    }
    if records.is_empty() {
        if let Some(p) = progress {
            p(1.0);
        }
    }
    tracing::info!(
        collection = %gateway.collection(),
        inserted = summary.inserted,
        failed = summary.failed,
        "CSV import finished"
    );
    summary
}

pub fn export_records(path: &Path, rows: &[Record]) -> Result<usize> {
    let mut wtr =
        Writer::from_path(path).with_context(|| format!("Create CSV {}", path.display()))?;
    wtr.write_record(CSV_HEADER)?;
    for r in rows {
        wtr.write_record([
            r.category.as_str(),
            r.month.label(),
            r.year.as_str(),
            r.amount.to_string().as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(rows.len())
}
