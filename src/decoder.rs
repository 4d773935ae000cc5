//! Arithmetic decoder.

use tracing::trace;

use crate::bitio::BitInput;
use crate::coder::{CoderState, Renormalize, StateParams};
use crate::error::{Error, Result};
use crate::freq::FrequencyTable;

/// Input side of the decoder: the bit source plus the code register.
///
/// `code` holds the last `state_size` bits consumed, in the same transformed
/// coordinates as the interval.
#[derive(Debug)]
struct CodeWindow<R> {
    input: R,
    code: u64,
}

impl<R: BitInput> CodeWindow<R> {
    /// Next bit, with end of stream read as an endless run of zeros.
    fn next_bit(&mut self) -> Result<u64> {
        Ok(u64::from(self.input.read_bit()?.unwrap_or(0)))
    }
}

impl<R: BitInput> Renormalize for CodeWindow<R> {
    fn shift(&mut self, params: &StateParams, _low: u64) -> Result<()> {
        self.code = ((self.code << 1) & params.mask()) | self.next_bit()?;
        Ok(())
    }

    fn underflow(&mut self, params: &StateParams) -> Result<()> {
        self.code = (self.code & params.half_range())
            | ((self.code << 1) & (params.mask() >> 1))
            | self.next_bit()?;
        Ok(())
    }
}

/// Arithmetic decoder reading from a bit source.
///
/// Must be driven with the same state size and the same sequence of tables
/// the encoder used.
#[derive(Debug)]
pub struct Decoder<R> {
    state: CoderState,
    window: CodeWindow<R>,
}

impl<R: BitInput> Decoder<R> {
    /// Create a decoder and prime its code register with `state_size` bits.
    ///
    /// # Errors
    /// `Error::StateSizeOutOfRange` for a bad state size, `Error::Io` if the
    /// source fails while priming.
    pub fn new(state_size: u32, input: R) -> Result<Self> {
        let state = CoderState::new(state_size)?;
        let mut window = CodeWindow { input, code: 0 };
        for _ in 0..state_size {
            window.code = (window.code << 1) | window.next_bit()?;
        }
        trace!(state_size, code = window.code, "decoder primed");
        Ok(Self { state, window })
    }

    /// Parameters derived from the state size.
    pub fn params(&self) -> &StateParams {
        self.state.params()
    }

    /// Unwrap the underlying bit source.
    pub fn into_inner(self) -> R {
        self.window.input
    }

    /// Decode the next symbol under `freqs`.
    ///
    /// # Errors
    /// - `Error::TotalTooLarge` if `freqs.total()` exceeds [`StateParams::max_total`];
    ///   the decoder stays usable.
    /// - `Error::InternalFault` if the code register and the table disagree,
    ///   which means a corrupt stream or a table sequence different from the
    ///   encoder's. The decoder is unusable afterwards.
    pub fn read<T: FrequencyTable + ?Sized>(&mut self, freqs: &T) -> Result<u32> {
        self.state.ensure_usable()?;
        let total = freqs.total();
        self.state.check_total(total)?;
        if total == 0 {
            return Err(Error::EmptyAlphabet);
        }

        let symbol = match self.locate(freqs, u64::from(total)) {
            Ok(symbol) => symbol,
            Err(e) => {
                self.state.poison();
                return Err(e);
            }
        };

        self.state.update(freqs, symbol, &mut self.window)?;
        let code = self.window.code;
        if code < self.state.low() || code > self.state.high() {
            self.state.poison();
            return Err(Error::InternalFault("code out of range"));
        }
        Ok(symbol)
    }

    /// Map the code register back onto the table scale and find its symbol.
    fn locate<T: FrequencyTable + ?Sized>(&self, freqs: &T, total: u64) -> Result<u32> {
        let low = self.state.low();
        let code = self.window.code;
        if code < low || code > self.state.high() {
            return Err(Error::InternalFault("code out of range"));
        }
        let range = self.state.range();
        let offset = code - low;
        let value = ((offset + 1) * total - 1) / range;
        if value * range / total > offset || value >= total {
            return Err(Error::InternalFault("scaled code out of range"));
        }

        // Highest symbol with freqs.low(symbol) <= value.
        let mut start = 0u32;
        let mut end = freqs.symbol_limit();
        while end - start > 1 {
            let middle = start + (end - start) / 2;
            if u64::from(freqs.low(middle)) > value {
                end = middle;
            } else {
                start = middle;
            }
        }
        if start + 1 != end {
            return Err(Error::InternalFault("empty symbol search"));
        }

        let symbol = start;
        if offset < u64::from(freqs.low(symbol)) * range / total
            || u64::from(freqs.high(symbol)) * range / total <= offset
        {
            return Err(Error::InternalFault("decoded symbol does not cover code"));
        }
        Ok(symbol)
    }
}
