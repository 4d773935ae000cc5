//! Error types for arithmetic coding.

use thiserror::Error;

/// Error variants for arithmetic coding operations.
///
/// Most variants are input errors the caller can react to. The
/// internal-fault class (see [`Error::is_internal_fault`]) means the coder's
/// interval state can no longer be trusted and the instance must be discarded.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested state size lies outside `1..=63` bits.
    #[error("state size out of range: {0} (expected 1..=63)")]
    StateSizeOutOfRange(u32),

    /// The frequency table total exceeds what the configured state size can code.
    #[error("cannot code symbol because total is too large: {total} > {max_total}")]
    TotalTooLarge {
        /// Total reported by the table.
        total: u32,
        /// Largest total accepted at this state size.
        max_total: u64,
    },

    /// The symbol has zero frequency and cannot be coded.
    #[error("symbol has zero frequency: {0}")]
    ZeroFrequency(u32),

    /// The symbol is not part of the table's alphabet.
    #[error("symbol out of range: {symbol} >= {limit}")]
    SymbolOutOfRange {
        /// Offending symbol.
        symbol: u32,
        /// Alphabet size of the table.
        limit: u32,
    },

    /// The table reported an interval that breaks `low <= high <= total`.
    #[error("malformed frequency table at symbol {symbol}: low={low}, high={high}, total={total}")]
    MalformedTable {
        /// Symbol whose interval was queried.
        symbol: u32,
        /// Reported cumulative low.
        low: u32,
        /// Reported cumulative high.
        high: u32,
        /// Reported total.
        total: u32,
    },

    /// Too many deferred underflow bits in a row.
    #[error("maximum underflow reached")]
    UnderflowOverflow,

    /// A frequency or the table total would overflow `u32`.
    #[error("frequency overflow")]
    FrequencyOverflow,

    /// A frequency table needs at least one symbol.
    #[error("empty alphabet")]
    EmptyAlphabet,

    /// Invalid model parameters or model usage.
    #[error("invalid model: {0}")]
    InvalidModel(&'static str),

    /// An interval invariant failed: corrupt stream, broken table, or coder bug.
    #[error("internal coder fault: {0}")]
    InternalFault(&'static str),

    /// The coder failed earlier and its state is no longer usable.
    #[error("coder is unusable after an earlier failure")]
    Poisoned,

    /// An I/O error occurred during encoding or decoding.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures that indicate broken coder state rather than bad input.
    pub fn is_internal_fault(&self) -> bool {
        matches!(self, Error::InternalFault(_) | Error::Poisoned)
    }
}

/// A specialized Result type for arithmetic coding operations.
pub type Result<T> = std::result::Result<T, Error>;
