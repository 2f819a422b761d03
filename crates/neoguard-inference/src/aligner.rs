//! Feature alignment
//!
//! Reindexes [`FeatureRecord`]s to the model's [`FeatureOrder`] and fills
//! missing cells. The aligned buffer is row-major `f64` with `NaN` marking a
//! cell that could not be filled.

use crate::config::MissingValuePolicy;
use crate::feature_order::FeatureOrder;
use crate::reference::ReferenceMedians;
use neoguard_core::{Error, FeatureRecord, Result};
use tracing::{debug, warn};

/// Row-major matrix of aligned feature values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl FeatureMatrix {
    /// Create from row-major data
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::alignment(format!(
                "buffer of {} values does not fit {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { data, rows, cols })
    }

    /// Create from a list of equally sized rows
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(i) = rows.iter().position(|r| r.len() != cols) {
            return Err(Error::alignment(format!(
                "row {} has {} values, expected {}",
                i,
                rows[i].len(),
                cols
            )));
        }
        Self::new(rows.len(), cols, rows.concat())
    }

    /// Matrix with every cell missing
    fn missing(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![f64::NAN; rows * cols],
            rows,
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// One row, in feature order
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        // chunks_exact panics on a zero chunk size
        let width = self.cols.max(1);
        self.data
            .chunks_exact(width)
            .take(if self.cols == 0 { 0 } else { self.rows })
    }

    /// Flat row-major values
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Whether any cell is `NaN`
    pub fn has_missing(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }

    /// Column values present (non-`NaN`) in the batch
    fn present_in_column(&self, col: usize) -> Vec<f64> {
        (0..self.rows)
            .map(|r| self.get(r, col))
            .filter(|v| !v.is_nan())
            .collect()
    }
}

/// Summary of one alignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentReport {
    /// Cells that were missing and received a fill value
    pub filled_cells: usize,
    /// Cells left as `NaN`
    pub unfilled_cells: usize,
    /// Rows that carried none of the model's features
    pub degenerate_rows: Vec<usize>,
}

impl AlignmentReport {
    pub fn is_clean(&self) -> bool {
        self.filled_cells == 0 && self.unfilled_cells == 0 && self.degenerate_rows.is_empty()
    }
}

/// Aligned buffer plus its report.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedBatch {
    pub matrix: FeatureMatrix,
    pub report: AlignmentReport,
}

/// Reindex records and fill missing cells with the batch median of their column.
///
/// A column with no value anywhere in the batch stays `NaN`.
pub fn align(records: &[FeatureRecord], order: &FeatureOrder) -> FeatureMatrix {
    let (mut matrix, _) = reindex(records, order);
    for col in 0..matrix.cols() {
        if let Some(fill) = median(matrix.present_in_column(col)) {
            fill_column(&mut matrix, col, fill);
        }
    }
    matrix
}

/// Median of the given values; mean of the two middle values for an even count.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    values.retain(|v| !v.is_nan());
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Copy record values into a missing-filled matrix; returns the indices of
/// rows that carried no feature at all.
fn reindex(records: &[FeatureRecord], order: &FeatureOrder) -> (FeatureMatrix, Vec<usize>) {
    let mut matrix = FeatureMatrix::missing(records.len(), order.len());
    let mut degenerate = Vec::new();

    for (row, record) in records.iter().enumerate() {
        let mut seen = 0;
        for (col, name) in order.iter() {
            if let Some(value) = record.get(name).filter(|v| !v.is_nan()) {
                matrix.set(row, col, value);
                seen += 1;
            }
        }
        if seen == 0 {
            degenerate.push(row);
        }
    }

    (matrix, degenerate)
}

fn fill_column(matrix: &mut FeatureMatrix, col: usize, value: f64) -> usize {
    let mut filled = 0;
    for row in 0..matrix.rows() {
        if matrix.get(row, col).is_nan() {
            matrix.set(row, col, value);
            filled += 1;
        }
    }
    filled
}

/// Feature aligner bound to a feature order and missing-value policy.
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    order: FeatureOrder,
    policy: MissingValuePolicy,
    /// Reference medians in column order
    reference: Option<Vec<Option<f64>>>,
}

impl FeatureAligner {
    /// Aligner using batch-median fill and no reference medians
    pub fn new(order: FeatureOrder) -> Self {
        Self {
            order,
            policy: MissingValuePolicy::BatchMedian,
            reference: None,
        }
    }

    /// Aligner with an explicit policy.
    ///
    /// `ReferenceMedian` requires `reference` to cover every feature in the
    /// order; for the other policies reference medians are an optional
    /// fallback for columns the batch cannot fill.
    pub fn with_policy(
        order: FeatureOrder,
        policy: MissingValuePolicy,
        reference: Option<&ReferenceMedians>,
    ) -> Result<Self> {
        let reference = match (policy, reference) {
            (MissingValuePolicy::ReferenceMedian, None) => {
                return Err(Error::config(
                    "missing value policy 'reference_median' requires reference_medians_path",
                ));
            }
            (MissingValuePolicy::ReferenceMedian, Some(medians)) => {
                Some(medians.covering(&order)?.into_iter().map(Some).collect())
            }
            (_, Some(medians)) => Some(medians.for_order(&order)),
            (_, None) => None,
        };

        Ok(Self {
            order,
            policy,
            reference,
        })
    }

    pub fn order(&self) -> &FeatureOrder {
        &self.order
    }

    pub fn policy(&self) -> MissingValuePolicy {
        self.policy
    }

    /// Align a batch of records.
    ///
    /// Fails only under [`MissingValuePolicy::Reject`] when a cell stays
    /// unfilled.
    pub fn align(&self, records: &[FeatureRecord]) -> Result<AlignedBatch> {
        let (mut matrix, degenerate_rows) = reindex(records, &self.order);
        let mut report = AlignmentReport {
            degenerate_rows,
            ..Default::default()
        };

        for col in 0..matrix.cols() {
            let fill = match self.policy {
                MissingValuePolicy::ReferenceMedian => self.reference_for(col),
                MissingValuePolicy::BatchMedian | MissingValuePolicy::Reject => {
                    median(matrix.present_in_column(col)).or_else(|| self.reference_for(col))
                }
            };
            if let Some(value) = fill {
                report.filled_cells += fill_column(&mut matrix, col, value);
            }
        }

        let unfilled: Vec<(usize, usize)> = (0..matrix.rows())
            .flat_map(|r| (0..matrix.cols()).map(move |c| (r, c)))
            .filter(|&(r, c)| matrix.get(r, c).is_nan())
            .collect();
        report.unfilled_cells = unfilled.len();

        if self.policy == MissingValuePolicy::Reject {
            if let Some(&(row, col)) = unfilled.first() {
                return Err(Error::alignment(format!(
                    "row {} has no value for '{}' and none could be filled ({} unfilled cells)",
                    row,
                    self.order.names()[col],
                    unfilled.len()
                )));
            }
        }

        if !report.degenerate_rows.is_empty() {
            warn!(
                rows = ?report.degenerate_rows,
                "Records carry none of the model features"
            );
        }
        if report.unfilled_cells > 0 {
            warn!(
                unfilled_cells = report.unfilled_cells,
                "Missing features could not be filled"
            );
        }
        debug!(
            rows = matrix.rows(),
            filled_cells = report.filled_cells,
            "Aligned feature batch"
        );

        Ok(AlignedBatch { matrix, report })
    }

    fn reference_for(&self, col: usize) -> Option<f64> {
        self.reference.as_ref().and_then(|r| r[col])
    }
}
