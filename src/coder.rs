//! Shared interval state and renormalization.
//!
//! Both directions keep the same `[low, high]` interval and narrow it the same
//! way for every symbol. They differ only in what happens when a bit leaves
//! the window: the encoder emits it, the decoder pulls a fresh bit into its
//! code register. That difference is the [`Renormalize`] hook pair.

use tracing::trace;

use crate::error::{Error, Result};
use crate::freq::FrequencyTable;

/// Smallest supported state size in bits.
pub const MIN_STATE_BITS: u32 = 1;

/// Largest supported state size in bits.
pub const MAX_STATE_BITS: u32 = 63;

/// Fixed-point parameters derived from a state size.
///
/// All products in the narrowing step are `freq * range` with
/// `freq <= max_total` and `range <= full_range`, and
/// `max_total <= u64::MAX / full_range`, so they never overflow `u64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateParams {
    num_state_bits: u32,
    full_range: u64,
    half_range: u64,
    quarter_range: u64,
    min_range: u64,
    max_total: u64,
    mask: u64,
}

impl StateParams {
    /// Validate `state_size` and compute the derived constants.
    ///
    /// # Errors
    /// Returns `Error::StateSizeOutOfRange` unless `1 <= state_size <= 63`.
    pub fn new(state_size: u32) -> Result<Self> {
        if !(MIN_STATE_BITS..=MAX_STATE_BITS).contains(&state_size) {
            return Err(Error::StateSizeOutOfRange(state_size));
        }
        let full_range = 1u64 << state_size;
        let half_range = full_range >> 1;
        let quarter_range = half_range >> 1;
        let min_range = (full_range >> 2) + 2;
        let max_total = (u64::MAX / full_range).min(min_range);
        Ok(Self {
            num_state_bits: state_size,
            full_range,
            half_range,
            quarter_range,
            min_range,
            max_total,
            mask: full_range - 1,
        })
    }

    /// Width of the interval registers in bits.
    pub fn state_size(&self) -> u32 {
        self.num_state_bits
    }

    /// `2^state_size`.
    pub fn full_range(&self) -> u64 {
        self.full_range
    }

    /// `full_range / 2`.
    pub fn half_range(&self) -> u64 {
        self.half_range
    }

    /// `full_range / 4`.
    pub fn quarter_range(&self) -> u64 {
        self.quarter_range
    }

    /// Smallest interval width left after renormalization.
    pub fn min_range(&self) -> u64 {
        self.min_range
    }

    /// Largest frequency table total that can be coded at this state size.
    pub fn max_total(&self) -> u64 {
        self.max_total
    }

    /// `full_range - 1`.
    pub fn mask(&self) -> u64 {
        self.mask
    }
}

/// Direction-specific side of renormalization.
pub(crate) trait Renormalize {
    /// The top bit of `low` and `high` agree and is about to be shifted out.
    fn shift(&mut self, params: &StateParams, low: u64) -> Result<()>;

    /// The interval straddles the midpoint; the second-highest bit is about
    /// to be dropped and its value deferred.
    fn underflow(&mut self, params: &StateParams) -> Result<()>;
}

/// The `[low, high]` interval both coder directions maintain.
#[derive(Clone, Debug)]
pub(crate) struct CoderState {
    params: StateParams,
    low: u64,
    high: u64,
    poisoned: bool,
}

impl CoderState {
    pub(crate) fn new(state_size: u32) -> Result<Self> {
        let params = StateParams::new(state_size)?;
        trace!(state_size, max_total = params.max_total, "coder state created");
        Ok(Self {
            params,
            low: 0,
            high: params.mask,
            poisoned: false,
        })
    }

    pub(crate) fn params(&self) -> &StateParams {
        &self.params
    }

    pub(crate) fn low(&self) -> u64 {
        self.low
    }

    pub(crate) fn high(&self) -> u64 {
        self.high
    }

    pub(crate) fn range(&self) -> u64 {
        self.high - self.low + 1
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        Ok(())
    }

    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }

    /// Reject totals the fixed-point arithmetic cannot handle.
    pub(crate) fn check_total(&self, total: u32) -> Result<()> {
        if u64::from(total) > self.params.max_total {
            return Err(Error::TotalTooLarge {
                total,
                max_total: self.params.max_total,
            });
        }
        Ok(())
    }

    /// Narrow the interval to `symbol`'s share of `freqs` and renormalize.
    ///
    /// Input errors are reported before any state changes, so the caller may
    /// retry with a different symbol or table. Any failure after that point
    /// poisons the state.
    pub(crate) fn update<T, H>(&mut self, freqs: &T, symbol: u32, hooks: &mut H) -> Result<()>
    where
        T: FrequencyTable + ?Sized,
        H: Renormalize,
    {
        self.ensure_usable()?;
        if let Err(e) = self.check_invariants() {
            self.poison();
            return Err(e);
        }

        let limit = freqs.symbol_limit();
        if symbol >= limit {
            return Err(Error::SymbolOutOfRange { symbol, limit });
        }
        let total = freqs.total();
        let sym_low = freqs.low(symbol);
        let sym_high = freqs.high(symbol);
        if sym_low == sym_high {
            return Err(Error::ZeroFrequency(symbol));
        }
        self.check_total(total)?;
        if sym_low > sym_high || sym_high > total {
            return Err(Error::MalformedTable {
                symbol,
                low: sym_low,
                high: sym_high,
                total,
            });
        }

        let range = self.range();
        let total = u64::from(total);
        let new_low = self.low + u64::from(sym_low) * range / total;
        let new_high = self.low + u64::from(sym_high) * range / total - 1;
        self.low = new_low;
        self.high = new_high;

        if let Err(e) = self.renormalize(hooks) {
            tracing::warn!(error = %e, "renormalization failed; coder state discarded");
            self.poison();
            return Err(e);
        }
        Ok(())
    }

    fn check_invariants(&self) -> Result<()> {
        let mask = self.params.mask;
        if self.low >= self.high || (self.low & mask) != self.low || (self.high & mask) != self.high
        {
            return Err(Error::InternalFault("low or high out of range"));
        }
        let range = self.range();
        if range < self.params.min_range || range > self.params.full_range {
            return Err(Error::InternalFault("range out of range"));
        }
        Ok(())
    }

    fn renormalize<H: Renormalize>(&mut self, hooks: &mut H) -> Result<()> {
        let StateParams {
            half_range,
            quarter_range,
            mask,
            ..
        } = self.params;

        // Top bits agree: that bit is settled.
        while (self.low ^ self.high) & half_range == 0 {
            hooks.shift(&self.params, self.low)?;
            self.low = (self.low << 1) & mask;
            self.high = ((self.high << 1) & mask) | 1;
        }

        // low = 01..., high = 10...: drop the second bit and defer it.
        while self.low & !self.high & quarter_range != 0 {
            hooks.underflow(&self.params)?;
            self.low = (self.low << 1) & (mask >> 1);
            self.high = ((self.high << 1) & (mask >> 1)) | half_range | 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freq::{FlatFrequencyTable, SimpleFrequencyTable};

    #[derive(Default)]
    struct Recorder {
        events: Vec<char>,
    }

    impl Renormalize for Recorder {
        fn shift(&mut self, params: &StateParams, low: u64) -> Result<()> {
            let bit = low >> (params.state_size() - 1);
            self.events.push(if bit == 1 { '1' } else { '0' });
            Ok(())
        }

        fn underflow(&mut self, _params: &StateParams) -> Result<()> {
            self.events.push('u');
            Ok(())
        }
    }

    #[test]
    fn test_params_derivation() {
        let p = StateParams::new(32).unwrap();
        assert_eq!(p.full_range(), 1 << 32);
        assert_eq!(p.half_range(), 1 << 31);
        assert_eq!(p.quarter_range(), 1 << 30);
        assert_eq!(p.mask(), (1 << 32) - 1);
        assert_eq!(p.min_range(), (1 << 30) + 2);
        assert_eq!(p.max_total(), (1 << 30) + 2);

        let p = StateParams::new(63).unwrap();
        assert_eq!(p.max_total(), 1);

        let p = StateParams::new(1).unwrap();
        assert_eq!(p.quarter_range(), 0);
        assert_eq!(p.min_range(), 2);
        assert_eq!(p.max_total(), 2);
    }

    #[test]
    fn test_params_out_of_range() {
        assert!(matches!(
            StateParams::new(0),
            Err(Error::StateSizeOutOfRange(0))
        ));
        assert!(matches!(
            StateParams::new(64),
            Err(Error::StateSizeOutOfRange(64))
        ));
    }

    #[test]
    fn test_top_bit_shift() {
        let mut state = CoderState::new(8).unwrap();
        let table = SimpleFrequencyTable::new(&[1, 1]).unwrap();
        let mut rec = Recorder::default();

        // Upper half of [0, 255]: [128, 255] -> one shift, emits 1.
        state.update(&table, 1, &mut rec).unwrap();
        assert_eq!(rec.events, vec!['1']);
        assert_eq!((state.low(), state.high()), (0, 255));
    }

    #[test]
    fn test_underflow_then_resolve() {
        let mut state = CoderState::new(8).unwrap();
        // Middle quarter pair straddles the midpoint.
        let table = SimpleFrequencyTable::new(&[1, 2, 1]).unwrap();
        let mut rec = Recorder::default();

        state.update(&table, 1, &mut rec).unwrap();
        // [64, 191] -> one underflow -> [0, 255]
        assert_eq!(rec.events, vec!['u']);
        assert_eq!((state.low(), state.high()), (0, 255));

        state.update(&table, 0, &mut rec).unwrap();
        // [0, 63] -> two shifts of 0
        assert_eq!(rec.events, vec!['u', '0', '0']);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_validation_leaves_state_usable() {
        let mut state = CoderState::new(16).unwrap();
        let mut rec = Recorder::default();
        let zero = SimpleFrequencyTable::new(&[3, 0, 1]).unwrap();
        assert!(matches!(
            state.update(&zero, 1, &mut rec),
            Err(Error::ZeroFrequency(1))
        ));
        assert!(matches!(
            state.update(&zero, 3, &mut rec),
            Err(Error::SymbolOutOfRange { symbol: 3, limit: 3 })
        ));
        let big = FlatFrequencyTable::new(1 << 15).unwrap();
        assert!(matches!(
            state.update(&big, 0, &mut rec),
            Err(Error::TotalTooLarge { .. })
        ));
        assert!(rec.events.is_empty());
        state.update(&zero, 0, &mut rec).unwrap();
    }

    #[test]
    fn test_hook_failure_poisons() {
        struct Failing;
        impl Renormalize for Failing {
            fn shift(&mut self, _: &StateParams, _: u64) -> Result<()> {
                Err(Error::UnderflowOverflow)
            }
            fn underflow(&mut self, _: &StateParams) -> Result<()> {
                Err(Error::UnderflowOverflow)
            }
        }
        let mut state = CoderState::new(8).unwrap();
        let table = SimpleFrequencyTable::new(&[1, 1]).unwrap();
        assert!(matches!(
            state.update(&table, 0, &mut Failing),
            Err(Error::UnderflowOverflow)
        ));
        let err = state
            .update(&table, 0, &mut Recorder::default())
            .unwrap_err();
        assert!(err.is_internal_fault());
    }

    #[test]
    fn test_corrupt_state_is_internal_fault() {
        let mut state = CoderState::new(8).unwrap();
        state.low = 200;
        state.high = 100;
        let table = SimpleFrequencyTable::new(&[1, 1]).unwrap();
        let err = state
            .update(&table, 0, &mut Recorder::default())
            .unwrap_err();
        assert!(matches!(err, Error::InternalFault(_)));
    }
}
