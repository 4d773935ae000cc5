//! Arithmetic encoder.

use tracing::debug;

use crate::bitio::BitOutput;
use crate::coder::{CoderState, Renormalize, StateParams};
use crate::error::{Error, Result};
use crate::freq::FrequencyTable;

/// Output side of the encoder: the bit sink plus the deferred-bit counter.
#[derive(Debug)]
struct BitEmitter<W> {
    output: W,
    num_underflow: u64,
}

impl<W: BitOutput> Renormalize for BitEmitter<W> {
    fn shift(&mut self, params: &StateParams, low: u64) -> Result<()> {
        let bit = (low >> (params.state_size() - 1)) as u8;
        self.output.write_bit(bit)?;

        // Deferred underflow bits resolve to the opposite of the settled bit.
        for _ in 0..self.num_underflow {
            self.output.write_bit(bit ^ 1)?;
        }
        self.num_underflow = 0;
        Ok(())
    }

    fn underflow(&mut self, _params: &StateParams) -> Result<()> {
        if self.num_underflow == u64::MAX {
            return Err(Error::UnderflowOverflow);
        }
        self.num_underflow += 1;
        Ok(())
    }
}

/// Arithmetic encoder writing to a bit sink.
///
/// Feed symbols with [`write`](Self::write), then call [`finish`](Self::finish)
/// exactly once. The caller owns byte alignment of the returned sink.
///
/// # Example
/// ```
/// use arithcode::bitio::BitWriter;
/// use arithcode::freq::SimpleFrequencyTable;
/// use arithcode::Encoder;
///
/// let table = SimpleFrequencyTable::new(&[1, 1, 2]).unwrap();
/// let mut encoder = Encoder::new(32, BitWriter::new(Vec::new())).unwrap();
/// for &s in &[0, 2, 1, 2, 0] {
///     encoder.write(&table, s).unwrap();
/// }
/// let bytes = encoder.finish().unwrap().finish().unwrap();
/// assert!(!bytes.is_empty());
/// ```
#[derive(Debug)]
pub struct Encoder<W> {
    state: CoderState,
    emitter: BitEmitter<W>,
}

impl<W: BitOutput> Encoder<W> {
    /// Create an encoder with a `state_size`-bit interval.
    ///
    /// # Errors
    /// Returns `Error::StateSizeOutOfRange` unless `1 <= state_size <= 63`.
    pub fn new(state_size: u32, output: W) -> Result<Self> {
        Ok(Self {
            state: CoderState::new(state_size)?,
            emitter: BitEmitter {
                output,
                num_underflow: 0,
            },
        })
    }

    /// Parameters derived from the state size.
    pub fn params(&self) -> &StateParams {
        self.state.params()
    }

    /// Borrow the underlying bit sink.
    pub fn get_ref(&self) -> &W {
        &self.emitter.output
    }

    /// Encode `symbol` under `freqs`.
    ///
    /// # Errors
    /// - `Error::ZeroFrequency` / `Error::SymbolOutOfRange` / `Error::MalformedTable`
    ///   if `symbol` cannot be coded with this table.
    /// - `Error::TotalTooLarge` if `freqs.total()` exceeds [`StateParams::max_total`].
    /// - `Error::UnderflowOverflow` or `Error::Io` from renormalization; the
    ///   encoder is unusable afterwards.
    pub fn write<T: FrequencyTable + ?Sized>(&mut self, freqs: &T, symbol: u32) -> Result<()> {
        self.state.update(freqs, symbol, &mut self.emitter)
    }

    /// Terminate the stream with a single `1` bit and hand back the sink.
    ///
    /// Deferred underflow bits need not be written: the decoder reads zeros
    /// past the end, and `1` followed by zeros lands inside the final interval.
    pub fn finish(mut self) -> Result<W> {
        self.state.ensure_usable()?;
        self.emitter.output.write_bit(1)?;
        debug!(
            state_size = self.state.params().state_size(),
            pending_underflow = self.emitter.num_underflow,
            "arithmetic encoder finished"
        );
        Ok(self.emitter.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitio::BitWriter;
    use crate::freq::SimpleFrequencyTable;

    #[test]
    fn test_single_bit_symbols() {
        // 8-bit state, two equiprobable symbols: each symbol is one bit.
        let table = SimpleFrequencyTable::new(&[1, 1]).unwrap();
        let mut encoder = Encoder::new(8, BitWriter::new(Vec::new())).unwrap();
        for &s in &[1, 0, 1, 1, 0, 0, 1] {
            encoder.write(&table, s).unwrap();
        }
        let writer = encoder.finish().unwrap();
        assert_eq!(writer.bit_len(), 8);
        assert_eq!(writer.finish().unwrap(), vec![0b1011_0011]);
    }

    #[test]
    fn test_deferred_bits_use_complement() {
        let table = SimpleFrequencyTable::new(&[1, 2, 1]).unwrap();
        let mut encoder = Encoder::new(8, BitWriter::new(Vec::new())).unwrap();
        // Middle symbol: one deferred bit. Then symbol 0 settles a 0, so the
        // deferred bit comes out as 1.
        encoder.write(&table, 1).unwrap();
        assert_eq!(encoder.emitter.num_underflow, 1);
        assert_eq!(encoder.get_ref().bit_len(), 0);
        encoder.write(&table, 0).unwrap();
        assert_eq!(encoder.emitter.num_underflow, 0);
        let bytes = encoder.finish().unwrap().finish().unwrap();
        // 0, 1 (deferred), 0, then finish bit 1.
        assert_eq!(bytes, vec![0b0101_0000]);
    }

    #[test]
    fn test_underflow_counter_saturation() {
        let mut emitter = BitEmitter {
            output: BitWriter::new(Vec::new()),
            num_underflow: u64::MAX - 1,
        };
        let params = StateParams::new(16).unwrap();
        emitter.underflow(&params).unwrap();
        assert!(matches!(
            emitter.underflow(&params),
            Err(Error::UnderflowOverflow)
        ));
    }

    #[test]
    fn test_failed_encoder_refuses_finish() {
        struct Closed;
        impl BitOutput for Closed {
            fn write_bit(&mut self, _bit: u8) -> std::io::Result<()> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
        }
        let table = SimpleFrequencyTable::new(&[1, 1]).unwrap();
        let mut encoder = Encoder::new(8, Closed).unwrap();
        assert!(matches!(encoder.write(&table, 0), Err(Error::Io(_))));
        assert!(matches!(encoder.write(&table, 0), Err(Error::Poisoned)));
        assert!(matches!(encoder.finish(), Err(Error::Poisoned)));
    }
}
