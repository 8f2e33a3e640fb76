//! Sparse matrix structures (CISR format)
//!
//! This module provides the Compressed Interleaved Sparse Row (CISR)
//! format, which spreads stored elements across a fixed number of lanes
//! for balanced lockstep consumption, plus the matching SpMV kernel.

mod cisr;

pub use cisr::{strict_positive, CisrMatrix};
