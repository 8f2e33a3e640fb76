//! Compressed Interleaved Sparse Row (CISR) matrix format
//!
//! CISR format stores:
//! - `values`: stored entries, interleaved lane-major across wavefronts
//! - `column_indices`: column index for each value
//! - `row_lengths`: per-row stored-element counts in lane-major generation
//!   order (lane `c`'s g-th row at slot `c + g*width`)
//!
//! The interleaving lets a fixed-width engine consume one element per lane
//! per wavefront; lane `c`'s k-th element sits at position `c + k*width`.
//! When lanes finish unevenly, the stride leaves holes that are zero-filled
//! and never consumed. Both the encoder and the SpMV kernel replay the same
//! [`RowSchedule`], which is what makes the format decodable at all: which
//! row owns which position is fully determined by `width` and `row_lengths`.

use crate::error::{CisrError, Result};
use crate::schedule::RowSchedule;
use crate::traits::Scalar;
use ndarray::{Array1, Array2};

/// Minimum row count before `spmv` dispatches to the parallel path.
#[cfg(feature = "rayon")]
const PARALLEL_ROW_THRESHOLD: usize = 256;

/// The default presence predicate: strictly positive values are stored.
///
/// Note the asymmetry: negative values are treated as absent. Callers
/// wanting nonzero or threshold semantics pass their own predicate to the
/// `*_with` constructors.
pub fn strict_positive<T: Scalar>(value: &T) -> bool {
    *value > T::zero()
}

/// Compressed Interleaved Sparse Row (CISR) matrix.
///
/// Immutable once constructed: every constructor validates the full format
/// contract, so a `CisrMatrix` is always well-formed and `spmv` can never
/// read out of bounds.
///
/// The lane width is embedded alongside the triple (the shape metadata any
/// consumer needs out-of-band otherwise); the raw arrays remain available
/// via [`CisrMatrix::into_raw_parts`].
#[derive(Debug, Clone)]
pub struct CisrMatrix<T: Scalar> {
    num_rows: usize,
    num_cols: usize,
    width: usize,
    values: Vec<T>,
    column_indices: Vec<usize>,
    row_lengths: Vec<usize>,
}

impl<T: Scalar> CisrMatrix<T> {
    /// Encode a dense matrix with the default strict-positive predicate.
    pub fn from_dense(dense: &Array2<T>, width: usize) -> Result<Self> {
        Self::from_dense_with(dense, width, strict_positive)
    }

    /// Encode a dense matrix, storing entries the predicate accepts.
    pub fn from_dense_with<F>(dense: &Array2<T>, width: usize, present: F) -> Result<Self>
    where
        F: Fn(&T) -> bool,
    {
        let (num_rows, num_cols) = dense.dim();
        check_encode_dims(num_rows, num_cols, width)?;

        let mut entries = Vec::with_capacity(num_rows);
        for i in 0..num_rows {
            let mut row_entries = Vec::new();
            for j in 0..num_cols {
                let value = dense[[i, j]];
                if present(&value) {
                    row_entries.push((j, value));
                }
            }
            entries.push(row_entries);
        }

        Self::encode_entries(num_rows, num_cols, width, entries)
    }

    /// Encode from a row-of-vectors container with the default predicate.
    ///
    /// Unlike [`CisrMatrix::from_dense`], the input can be ragged, which is
    /// rejected with `InvalidDimensions` rather than truncated or padded.
    pub fn from_rows(rows: &[Vec<T>], width: usize) -> Result<Self> {
        Self::from_rows_with(rows, width, strict_positive)
    }

    /// Encode from a row-of-vectors container with a caller predicate.
    pub fn from_rows_with<F>(rows: &[Vec<T>], width: usize, present: F) -> Result<Self>
    where
        F: Fn(&T) -> bool,
    {
        let num_rows = rows.len();
        let num_cols = rows.first().map_or(0, Vec::len);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != num_cols {
                return Err(CisrError::InvalidDimensions {
                    reason: format!(
                        "row {i} has {} columns, expected {num_cols}",
                        row.len()
                    ),
                });
            }
        }
        check_encode_dims(num_rows, num_cols, width)?;

        let entries = rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, value)| present(value))
                    .map(|(j, &value)| (j, value))
                    .collect()
            })
            .collect();

        Self::encode_entries(num_rows, num_cols, width, entries)
    }

    /// Shared encoding core: derive the lane schedule from the per-row
    /// counts, then scatter each row's entries to its scheduled positions.
    fn encode_entries(
        num_rows: usize,
        num_cols: usize,
        width: usize,
        entries: Vec<Vec<(usize, T)>>,
    ) -> Result<Self> {
        let counts: Vec<usize> = entries.iter().map(Vec::len).collect();
        let schedule = RowSchedule::from_row_counts(width, &counts)?;

        let mut values = vec![T::zero(); schedule.values_len()];
        let mut column_indices = vec![0usize; schedule.values_len()];
        let mut row_lengths = vec![0usize; schedule.row_lengths_len()];

        for (row, &slot) in schedule.row_slots().iter().enumerate() {
            row_lengths[slot] = counts[row];
        }

        // Each lane visits its rows in generation order, so walking the
        // positions with a per-row cursor reproduces the column scan order.
        let mut cursors = vec![0usize; num_rows];
        for (k, owner) in schedule.position_rows().iter().enumerate() {
            if let Some(row) = *owner {
                let (col, value) = entries[row][cursors[row]];
                cursors[row] += 1;
                values[k] = value;
                column_indices[k] = col;
            }
        }

        log::debug!(
            "encoded {num_rows}x{num_cols} matrix: width={width}, nnz={}, \
             values_len={} ({} padding)",
            schedule.nnz(),
            schedule.values_len(),
            schedule.values_len() - schedule.nnz(),
        );

        Ok(Self {
            num_rows,
            num_cols,
            width,
            values,
            column_indices,
            row_lengths,
        })
    }

    /// Assemble a matrix from a triple produced elsewhere, validating the
    /// full format contract.
    ///
    /// The lane schedule implied by `width` and `row_lengths` must account
    /// for exactly the given arrays: matching lengths, every row-length
    /// entry claimed by a lane, in-range column indices, and zero values in
    /// padding holes. Any violation is reported as `FormatInconsistency`
    /// (or `InvalidDimensions` for unusable shapes) before any element is
    /// consumed.
    pub fn from_raw_parts(
        num_rows: usize,
        num_cols: usize,
        width: usize,
        values: Vec<T>,
        column_indices: Vec<usize>,
        row_lengths: Vec<usize>,
    ) -> Result<Self> {
        check_encode_dims(num_rows, num_cols, width)?;

        if values.len() != column_indices.len() {
            return Err(CisrError::FormatInconsistency {
                reason: format!(
                    "values (len {}) and column_indices (len {}) differ",
                    values.len(),
                    column_indices.len()
                ),
            });
        }

        let schedule = RowSchedule::from_lane_major(width, num_rows, &row_lengths)?;

        if row_lengths.len() != schedule.row_lengths_len() {
            return Err(CisrError::FormatInconsistency {
                reason: format!(
                    "row_lengths has {} entries but the lane schedule uses {}",
                    row_lengths.len(),
                    schedule.row_lengths_len()
                ),
            });
        }
        let total: usize = row_lengths.iter().sum();
        if total != schedule.nnz() {
            return Err(CisrError::FormatInconsistency {
                reason: format!(
                    "row_lengths sums to {total} but the lane schedule claims {}",
                    schedule.nnz()
                ),
            });
        }
        if values.len() != schedule.values_len() {
            return Err(CisrError::FormatInconsistency {
                reason: format!(
                    "values has {} positions but the lane schedule requires {}",
                    values.len(),
                    schedule.values_len()
                ),
            });
        }
        for (k, owner) in schedule.position_rows().iter().enumerate() {
            match owner {
                Some(_) => {
                    if column_indices[k] >= num_cols {
                        return Err(CisrError::FormatInconsistency {
                            reason: format!(
                                "column index {} at position {k} exceeds {num_cols} columns",
                                column_indices[k]
                            ),
                        });
                    }
                }
                None => {
                    if values[k] != T::zero() {
                        return Err(CisrError::FormatInconsistency {
                            reason: format!(
                                "padding position {k} holds a nonzero value"
                            ),
                        });
                    }
                }
            }
        }

        Ok(Self {
            num_rows,
            num_cols,
            width,
            values,
            column_indices,
            row_lengths,
        })
    }

    /// Consume the matrix and return `(values, column_indices, row_lengths)`.
    pub fn into_raw_parts(self) -> (Vec<T>, Vec<usize>, Vec<usize>) {
        (self.values, self.column_indices, self.row_lengths)
    }

    /// Sparse matrix-vector product: y = A * x.
    ///
    /// Dispatches to the parallel implementation for large matrices when
    /// the `rayon` feature is enabled; both paths produce identical output.
    pub fn spmv(&self, x: &Array1<T>) -> Result<Array1<T>> {
        #[cfg(feature = "rayon")]
        {
            if self.num_rows >= PARALLEL_ROW_THRESHOLD {
                log::trace!("spmv: parallel path ({} rows)", self.num_rows);
                return self.spmv_parallel(x);
            }
        }

        self.spmv_sequential(x)
    }

    /// Deterministic single-threaded SpMV.
    ///
    /// Replays the lane schedule and accumulates
    /// `y[owner(k)] += values[k] * x[column_indices[k]]` over the consumed
    /// positions, skipping padding holes.
    pub fn spmv_sequential(&self, x: &Array1<T>) -> Result<Array1<T>> {
        let schedule = self.checked_schedule(x)?;

        let mut result = Array1::from_elem(self.num_rows, T::zero());
        for (k, owner) in schedule.position_rows().iter().enumerate() {
            if let Some(row) = *owner {
                result[row] += self.values[k] * x[self.column_indices[k]];
            }
        }

        Ok(result)
    }

    /// Width-way parallel SpMV.
    ///
    /// The schedule (the only shared mutable state between lanes) is
    /// resolved in one sequential pass; the accumulation then runs one
    /// rayon task per lane. Every row is owned by exactly one lane and a
    /// lane meets its rows' elements in the same order as the sequential
    /// pass, so the result is bitwise identical.
    #[cfg(feature = "rayon")]
    pub fn spmv_parallel(&self, x: &Array1<T>) -> Result<Array1<T>> {
        use rayon::prelude::*;

        let schedule = self.checked_schedule(x)?;
        let positions = schedule.position_rows();

        let lane_sums: Vec<Vec<(usize, T)>> = (0..self.width)
            .into_par_iter()
            .map(|lane| {
                let mut sums: Vec<(usize, T)> = Vec::new();
                let mut current: Option<(usize, T)> = None;
                let mut k = lane;
                while k < positions.len() {
                    if let Some(row) = positions[k] {
                        let term = self.values[k] * x[self.column_indices[k]];
                        match current.as_mut() {
                            Some((r, acc)) if *r == row => *acc += term,
                            _ => {
                                if let Some(done) = current.take() {
                                    sums.push(done);
                                }
                                current = Some((row, term));
                            }
                        }
                    }
                    k += self.width;
                }
                if let Some(done) = current {
                    sums.push(done);
                }
                sums
            })
            .collect();

        let mut result = Array1::from_elem(self.num_rows, T::zero());
        for sums in lane_sums {
            for (row, sum) in sums {
                result[row] += sum;
            }
        }

        Ok(result)
    }

    /// Decode the stored `(row, column, value)` coordinates in position
    /// order, padding holes excluded.
    pub fn entries(&self) -> Result<Vec<(usize, usize, T)>> {
        let schedule = self.schedule()?;
        Ok(schedule
            .position_rows()
            .iter()
            .enumerate()
            .filter_map(|(k, owner)| {
                owner.map(|row| (row, self.column_indices[k], self.values[k]))
            })
            .collect())
    }

    /// Number of rows of the encoded matrix.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns of the encoded matrix.
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Lane count the matrix was encoded with.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.row_lengths.iter().sum()
    }

    /// Sparsity ratio (fraction of non-zero entries)
    pub fn sparsity(&self) -> f64 {
        let total = self.num_rows * self.num_cols;
        if total == 0 {
            0.0
        } else {
            self.nnz() as f64 / total as f64
        }
    }

    /// Stored values, interleaved lane-major (holes are zero).
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Column index per stored value.
    pub fn column_indices(&self) -> &[usize] {
        &self.column_indices
    }

    /// Per-row stored-element counts in lane-major generation order.
    pub fn row_lengths(&self) -> &[usize] {
        &self.row_lengths
    }

    /// Rebuild the lane schedule from the stored triple.
    ///
    /// Construction validated the triple, so this cannot fail on a matrix
    /// obtained through the public constructors; the schedule is rebuilt
    /// fresh per call rather than cached, keeping the type free of derived
    /// state.
    fn schedule(&self) -> Result<RowSchedule> {
        RowSchedule::from_lane_major(self.width, self.num_rows, &self.row_lengths)
    }

    fn checked_schedule(&self, x: &Array1<T>) -> Result<RowSchedule> {
        if x.len() != self.num_cols {
            return Err(CisrError::InvalidDimensions {
                reason: format!(
                    "vector has length {}, expected {} columns",
                    x.len(),
                    self.num_cols
                ),
            });
        }
        self.schedule()
    }
}

fn check_encode_dims(num_rows: usize, num_cols: usize, width: usize) -> Result<()> {
    if width == 0 {
        return Err(CisrError::InvalidDimensions {
            reason: "lane width must be at least 1".to_string(),
        });
    }
    if num_rows == 0 || num_cols == 0 {
        return Err(CisrError::InvalidDimensions {
            reason: format!("matrix must be non-empty, got {num_rows}x{num_cols}"),
        });
    }
    Ok(())
}
