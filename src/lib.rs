//! CISR (Compressed Interleaved Sparse Row) encoding and SpMV
//!
//! CISR spreads the stored elements of a sparse matrix across a fixed
//! number of lanes so a fixed-width engine can consume one element per lane
//! per wavefront. This crate provides the encoder, the validating
//! interchange constructors, and the matching sparse matrix-vector product,
//! all driven by one shared lane/row schedule.
//!
//! # Features
//!
//! - **Encoder**: dense matrix to CISR triple at any lane width, with a
//!   configurable presence predicate (default: strictly positive)
//! - **SpMV**: deterministic sequential kernel, plus a per-lane parallel
//!   kernel behind the `rayon` feature
//! - **Validation**: triples from other producers are checked against the
//!   lane schedule before any element is touched
//! - **Generic Scalars**: works with f64, f32, and integer elements
//!
//! # Example
//!
//! ```
//! use cisr::CisrMatrix;
//! use ndarray::array;
//!
//! # fn main() -> cisr::Result<()> {
//! let dense = array![[1.0, 0.0, 3.0], [0.0, 2.0, 0.0]];
//! let cisr = CisrMatrix::from_dense(&dense, 2)?;
//! let y = cisr.spmv(&array![1.0, 1.0, 1.0])?;
//! assert_eq!(y, array![4.0, 2.0]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod schedule;
pub mod sparse;
pub mod traits;

// Re-export main types
pub use error::{CisrError, Result};
pub use schedule::{Frontier, RowSchedule};
pub use sparse::{strict_positive, CisrMatrix};
pub use traits::Scalar;
