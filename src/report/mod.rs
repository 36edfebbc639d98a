//! Raw Report Ingestion
//!
//! Turns a fulfillment-center stock report (a spreadsheet exported as rows of
//! cells) into a SKU to quantity table. Duplicate SKU rows are summed.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::ReportError;

/// Position of the SKU-indexed body inside the report sheet (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLayout {
    /// Rows before the body: the header row plus the metadata block.
    pub header_rows: usize,
    /// Column holding the SKU.
    pub sku_column: usize,
    /// Column holding the quantity.
    pub quantity_column: usize,
    /// CSV field delimiter.
    pub delimiter: u8,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            header_rows: 15,
            sku_column: 3,
            quantity_column: 19,
            delimiter: b',',
        }
    }
}

/// SKU to summed quantity table for one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReport {
    quantities: BTreeMap<String, u64>,
}

impl RawReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from sheet rows, discarding the header block.
    ///
    /// Rows without a SKU are dropped. A blank quantity counts as zero; a
    /// negative or non-numeric quantity drops the row with a warning.
    pub fn from_rows<I, R, S>(rows: I, layout: &ReportLayout) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut report = Self::new();

        for (index, row) in rows.into_iter().enumerate().skip(layout.header_rows) {
            let cells = row.as_ref();
            let sku = cells
                .get(layout.sku_column)
                .map(|cell| cell.as_ref().trim())
                .unwrap_or("");
            if sku.is_empty() {
                continue;
            }

            let raw_quantity = cells
                .get(layout.quantity_column)
                .map(|cell| cell.as_ref().trim())
                .unwrap_or("");
            if raw_quantity.is_empty() {
                report.add(sku, 0);
                continue;
            }

            match parse_quantity(raw_quantity) {
                Some(quantity) => report.add(sku, quantity),
                None => tracing::warn!(
                    row = index,
                    sku = sku,
                    value = raw_quantity,
                    "Skipping report row with invalid quantity"
                ),
            }
        }

        report
    }

    /// Read a CSV export of the report.
    ///
    /// Cells are decoded lossily, so a non-UTF-8 byte only garbles its own
    /// cell.
    pub fn from_csv_reader<R: Read>(reader: R, layout: &ReportLayout) -> Result<Self, ReportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(layout.delimiter)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in reader.byte_records() {
            let record = result?;
            rows.push(
                record
                    .iter()
                    .map(|cell| String::from_utf8_lossy(cell).into_owned())
                    .collect::<Vec<_>>(),
            );
        }

        Ok(Self::from_rows(rows, layout))
    }

    /// Read a CSV export of the report from disk.
    pub fn from_csv_path(path: &Path, layout: &ReportLayout) -> Result<Self, ReportError> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ReportError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                ReportError::Unreadable {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let report = Self::from_csv_reader(file, layout)?;
        tracing::debug!(
            path = %path.display(),
            skus = report.len(),
            "Loaded stock report"
        );
        Ok(report)
    }

    /// Add a quantity for a SKU, summing with earlier rows.
    pub fn add(&mut self, sku: &str, quantity: u64) {
        let entry = self.quantities.entry(sku.to_string()).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    /// Quantity for a SKU.
    pub fn get(&self, sku: &str) -> Option<u64> {
        self.quantities.get(sku).copied()
    }

    /// Iterate SKUs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.quantities.iter().map(|(sku, qtd)| (sku.as_str(), *qtd))
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for RawReport {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        let mut report = Self::new();
        for (sku, quantity) in iter {
            let sku: String = sku.into();
            report.add(&sku, quantity);
        }
        report
    }
}

/// Parse a non-negative quantity cell; fractional values are truncated.
pub(crate) fn parse_quantity(text: &str) -> Option<u64> {
    let trimmed = text.trim();
    trimmed
        .parse::<u64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().and_then(quantity_from_f64))
}

/// Convert a float quantity, truncating toward zero. Negative, NaN and
/// infinite values are rejected.
pub(crate) fn quantity_from_f64(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value < u64::MAX as f64 {
        Some(value.trunc() as u64)
    } else {
        None
    }
}
