//! # Binary Arithmetic Coding
//!
//! *Entropy coding to within a few bits of the Shannon bound, one symbol at a time.*
//!
//! ## Intuition First
//!
//! Picture the interval `[0, 1)`. Every message corresponds to a sub-interval:
//! the first symbol picks a slice proportional to its probability, the second
//! symbol picks a slice of that slice, and so on. After the whole message the
//! slice is tiny, and any number inside it identifies the message. Writing that
//! number down takes about `-log2(width)` bits, which is exactly the message's
//! information content.
//!
//! The catch is precision. Real coders keep the interval in a fixed number of
//! integer bits and, whenever the leading bit of both ends agrees, that bit can
//! never change again: it is emitted and the interval is doubled.
//!
//! ## The Problem
//!
//! Sometimes the interval shrinks around the midpoint without either end
//! settling its leading bit (`low = 0111..`, `high = 1000..`). If nothing is
//! done the interval collapses and precision is lost. Range coders fix this by
//! propagating carries into bytes already written. This crate uses the older
//! trick instead: drop the ambiguous second bit, count it, and once the
//! leading bit finally settles, emit that many copies of its complement.
//!
//! ## Historical Context
//!
//! ```text
//! 1948  Shannon          Entropy as the fundamental limit
//! 1976  Rissanen, Pasco  Finite-precision arithmetic coding
//! 1979  Martin           Range coding (byte-oriented, carries)
//! 1984  Cleary, Witten   PPM context modelling
//! 1987  Witten, Neal, Cleary  CACM arithmetic coder with bit deferral
//! ```
//!
//! ## Mathematical Formulation
//!
//! With state size `b`, `range = high - low + 1` and a symbol occupying
//! `[sym_low, sym_high)` of a table summing to `total`:
//!
//! ```text
//! low'  = low + floor(sym_low  * range / total)
//! high' = low + floor(sym_high * range / total) - 1
//! ```
//!
//! After renormalization `range >= 2^(b-2) + 2`, and totals are capped at
//! `min(floor((2^64 - 1) / 2^b), 2^(b-2) + 2)` so the products fit in `u64`
//! and no symbol's slice can become empty.
//!
//! ## Complexity Analysis
//!
//! - **Encode**: $O(1)$ arithmetic per symbol plus one hook call per output bit.
//! - **Decode**: $O(\log n)$ table lookups per symbol for an alphabet of size $n$.
//!
//! ## Failure Modes
//!
//! 1. **Table mismatch**: encoder and decoder must see identical tables in the
//!    same order; otherwise decoding fails with an internal fault or yields garbage.
//! 2. **Large totals**: tables above [`StateParams::max_total`] are rejected.
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - [`Encoder`] / [`Decoder`]: the coder pair, generic over bit streams.
//! - [`freq`]: frequency table trait plus flat and count-based tables.
//! - [`bitio`]: MSB-first bit reader/writer over `std::io`.
//! - [`ppm`]: a PPM byte compressor built on the coder.
//!
//! ## References
//!
//! - Witten, I., Neal, R., Cleary, J. (1987). "Arithmetic coding for data compression." CACM 30(6).
//! - Moffat, A., Neal, R., Witten, I. (1998). "Arithmetic coding revisited." ACM TOIS 16(3).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitio;
pub mod coder;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod freq;
pub mod ppm;

pub use coder::{StateParams, MAX_STATE_BITS, MIN_STATE_BITS};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use freq::{FlatFrequencyTable, FrequencyTable, SimpleFrequencyTable};
pub use ppm::{compress, decompress, PpmConfig, PpmModel};
