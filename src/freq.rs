//! Frequency tables.
//!
//! A table partitions `[0, total)` into one half-open interval per symbol.
//! The coder only ever asks for the interval of a single symbol, so tables
//! are free to store counts however they like.

use crate::error::{Error, Result};

/// Maps each symbol in `[0, symbol_limit)` to a cumulative interval `[low, high)`.
///
/// Contract: `low` is non-decreasing, `high(s) == low(s + 1)`,
/// `high(symbol_limit - 1) == total()`. Use [`check_contract`] to verify a table.
pub trait FrequencyTable {
    /// Number of symbols in the alphabet.
    fn symbol_limit(&self) -> u32;

    /// Frequency of a single symbol.
    fn get(&self, symbol: u32) -> u32 {
        self.high(symbol) - self.low(symbol)
    }

    /// Sum of all frequencies.
    fn total(&self) -> u32;

    /// Sum of the frequencies of all symbols below `symbol`.
    fn low(&self, symbol: u32) -> u32;

    /// `low(symbol) + get(symbol)`.
    fn high(&self, symbol: u32) -> u32;
}

impl<T: FrequencyTable + ?Sized> FrequencyTable for &T {
    fn symbol_limit(&self) -> u32 {
        (**self).symbol_limit()
    }

    fn get(&self, symbol: u32) -> u32 {
        (**self).get(symbol)
    }

    fn total(&self) -> u32 {
        (**self).total()
    }

    fn low(&self, symbol: u32) -> u32 {
        (**self).low(symbol)
    }

    fn high(&self, symbol: u32) -> u32 {
        (**self).high(symbol)
    }
}

/// Verify the cumulative-interval contract over the whole alphabet in O(n).
///
/// The coder does not call this; it only checks the interval of the symbol
/// being coded. Intended for tests and for callers building custom tables.
pub fn check_contract<T: FrequencyTable + ?Sized>(table: &T) -> Result<()> {
    let limit = table.symbol_limit();
    if limit == 0 {
        return Err(Error::EmptyAlphabet);
    }
    let total = table.total();
    let mut expected_low = 0u32;
    for symbol in 0..limit {
        let low = table.low(symbol);
        let high = table.high(symbol);
        if low != expected_low || high < low || high > total {
            return Err(Error::MalformedTable {
                symbol,
                low,
                high,
                total,
            });
        }
        expected_low = high;
    }
    if expected_low != total {
        return Err(Error::MalformedTable {
            symbol: limit - 1,
            low: table.low(limit - 1),
            high: expected_low,
            total,
        });
    }
    Ok(())
}

/// Every symbol has frequency 1. Immutable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlatFrequencyTable {
    num_symbols: u32,
}

impl FlatFrequencyTable {
    /// Create a uniform table over `num_symbols` symbols.
    ///
    /// # Errors
    /// Returns `Error::EmptyAlphabet` if `num_symbols` is 0.
    pub fn new(num_symbols: u32) -> Result<Self> {
        if num_symbols == 0 {
            return Err(Error::EmptyAlphabet);
        }
        Ok(Self { num_symbols })
    }
}

impl FrequencyTable for FlatFrequencyTable {
    fn symbol_limit(&self) -> u32 {
        self.num_symbols
    }

    fn get(&self, _symbol: u32) -> u32 {
        1
    }

    fn total(&self) -> u32 {
        self.num_symbols
    }

    fn low(&self, symbol: u32) -> u32 {
        symbol
    }

    fn high(&self, symbol: u32) -> u32 {
        symbol + 1
    }
}

/// Mutable table of explicit counts.
///
/// # Invariants
/// - `cumulative.len() == frequencies.len() + 1`, `cumulative[0] == 0`
/// - `cumulative[i + 1] == cumulative[i] + frequencies[i]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpleFrequencyTable {
    frequencies: Vec<u32>,
    cumulative: Vec<u32>,
}

impl SimpleFrequencyTable {
    /// Create a table from per-symbol frequencies.
    ///
    /// # Errors
    /// Returns `Error::EmptyAlphabet` for an empty slice and
    /// `Error::FrequencyOverflow` if the total does not fit in `u32`.
    pub fn new(frequencies: &[u32]) -> Result<Self> {
        if frequencies.is_empty() {
            return Err(Error::EmptyAlphabet);
        }
        if u32::try_from(frequencies.len()).is_err() {
            return Err(Error::InvalidModel("alphabet too large"));
        }
        let mut cumulative = Vec::with_capacity(frequencies.len() + 1);
        cumulative.push(0u32);
        let mut sum = 0u32;
        for &f in frequencies {
            sum = sum.checked_add(f).ok_or(Error::FrequencyOverflow)?;
            cumulative.push(sum);
        }
        Ok(Self {
            frequencies: frequencies.to_vec(),
            cumulative,
        })
    }

    /// Copy any table into a mutable one.
    pub fn from_table<T: FrequencyTable + ?Sized>(table: &T) -> Result<Self> {
        let freqs: Vec<u32> = (0..table.symbol_limit()).map(|s| table.get(s)).collect();
        Self::new(&freqs)
    }

    /// A table with every frequency zero except `symbol`, which is 1.
    pub(crate) fn with_single(num_symbols: u32, symbol: u32) -> Self {
        let n = num_symbols as usize;
        let s = symbol as usize;
        let mut frequencies = vec![0u32; n];
        frequencies[s] = 1;
        let cumulative = (0..=n).map(|i| u32::from(i > s)).collect();
        Self {
            frequencies,
            cumulative,
        }
    }

    /// Replace the frequency of `symbol`.
    ///
    /// # Errors
    /// `Error::SymbolOutOfRange` for an unknown symbol, `Error::FrequencyOverflow`
    /// if the new total would not fit in `u32`.
    pub fn set(&mut self, symbol: u32, freq: u32) -> Result<()> {
        let idx = self.index(symbol)?;
        let old = self.frequencies[idx];
        let total = self.total() - old;
        total.checked_add(freq).ok_or(Error::FrequencyOverflow)?;
        self.frequencies[idx] = freq;
        for c in &mut self.cumulative[idx + 1..] {
            *c = *c - old + freq;
        }
        Ok(())
    }

    /// Add one to the frequency of `symbol`.
    pub fn increment(&mut self, symbol: u32) -> Result<()> {
        let idx = self.index(symbol)?;
        if self.total() == u32::MAX {
            return Err(Error::FrequencyOverflow);
        }
        self.frequencies[idx] += 1;
        for c in &mut self.cumulative[idx + 1..] {
            *c += 1;
        }
        Ok(())
    }

    fn index(&self, symbol: u32) -> Result<usize> {
        let idx = symbol as usize;
        if idx >= self.frequencies.len() {
            return Err(Error::SymbolOutOfRange {
                symbol,
                limit: self.symbol_limit(),
            });
        }
        Ok(idx)
    }
}

impl FrequencyTable for SimpleFrequencyTable {
    fn symbol_limit(&self) -> u32 {
        self.frequencies.len() as u32
    }

    fn get(&self, symbol: u32) -> u32 {
        self.frequencies[symbol as usize]
    }

    fn total(&self) -> u32 {
        self.cumulative[self.frequencies.len()]
    }

    fn low(&self, symbol: u32) -> u32 {
        self.cumulative[symbol as usize]
    }

    fn high(&self, symbol: u32) -> u32 {
        self.cumulative[symbol as usize + 1]
    }
}
