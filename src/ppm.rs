//! Prediction by Partial Matching (PPM) byte compression.
//!
//! Each byte is coded in the longest context (the preceding `order` bytes)
//! that has seen it before. Contexts that have not seen it emit an escape
//! symbol and the coder falls back to the next shorter context, down to a
//! flat order -1 table over the whole alphabet. The escape symbol doubles as
//! end of stream, so the compressed stream carries no length header.
//!
//! Memory grows as `O(257^order)` in the worst case; orders above 4 are rarely
//! worth it.

use tracing::debug;

use crate::bitio::{BitInput, BitOutput, BitReader, BitWriter};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::freq::{FlatFrequencyTable, FrequencyTable, SimpleFrequencyTable};

/// Alphabet size for byte streams: 256 byte values plus EOF.
pub const BYTE_SYMBOL_LIMIT: u32 = 257;

/// Escape / end-of-stream symbol for byte streams.
pub const EOF_SYMBOL: u32 = 256;

/// Compressor settings. Both sides must agree on every field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PpmConfig {
    /// Context length in bytes; `-1` codes every byte with the flat table.
    pub order: i32,
    /// Arithmetic coder state size in bits.
    pub state_size: u32,
}

impl Default for PpmConfig {
    fn default() -> Self {
        Self {
            order: 3,
            state_size: 32,
        }
    }
}

/// One node of the context tree.
#[derive(Clone, Debug)]
pub struct Context {
    /// Symbol counts seen in this context, escape included.
    pub frequencies: SimpleFrequencyTable,
    subcontexts: Option<Vec<Option<Box<Context>>>>,
}

impl Context {
    fn new(symbol_limit: u32, has_subcontexts: bool, escape_symbol: u32) -> Self {
        Self {
            frequencies: SimpleFrequencyTable::with_single(symbol_limit, escape_symbol),
            subcontexts: has_subcontexts.then(|| vec![None; symbol_limit as usize]),
        }
    }

    /// Child context reached by appending `symbol` to this context's history.
    pub fn subcontext(&self, symbol: u32) -> Option<&Context> {
        self.subcontexts
            .as_ref()?
            .get(symbol as usize)?
            .as_deref()
    }
}

/// Adaptive PPM model: a tree of contexts up to a fixed order.
#[derive(Clone, Debug)]
pub struct PpmModel {
    order: i32,
    symbol_limit: u32,
    escape_symbol: u32,
    root: Option<Context>,
    order_minus1: FlatFrequencyTable,
}

impl PpmModel {
    /// Create an empty model.
    ///
    /// # Errors
    /// `Error::InvalidModel` if `order < -1`, the alphabet is empty, or the
    /// escape symbol is outside the alphabet.
    pub fn new(order: i32, symbol_limit: u32, escape_symbol: u32) -> Result<Self> {
        if order < -1 {
            return Err(Error::InvalidModel("order must be at least -1"));
        }
        if symbol_limit == 0 || escape_symbol >= symbol_limit {
            return Err(Error::InvalidModel("escape symbol outside alphabet"));
        }
        let root = (order >= 0).then(|| Context::new(symbol_limit, order >= 1, escape_symbol));
        Ok(Self {
            order,
            symbol_limit,
            escape_symbol,
            root,
            order_minus1: FlatFrequencyTable::new(symbol_limit)?,
        })
    }

    /// Maximum context length.
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Symbol used to escape to a shorter context.
    pub fn escape_symbol(&self) -> u32 {
        self.escape_symbol
    }

    /// Fallback table used when every context escapes.
    pub fn order_minus1_freqs(&self) -> &FlatFrequencyTable {
        &self.order_minus1
    }

    /// Longest history length a context can have.
    fn max_history(&self) -> usize {
        usize::try_from(self.order).unwrap_or(0)
    }

    /// Context for exactly `history`, if it has been created.
    pub fn context(&self, history: &[u32]) -> Option<&Context> {
        let mut ctx = self.root.as_ref()?;
        for &sym in history {
            ctx = ctx.subcontext(sym)?;
        }
        Some(ctx)
    }

    /// Count `symbol` in the root and in every context along `history`,
    /// creating missing contexts on the way.
    pub fn increment_contexts(&mut self, history: &[u32], symbol: u32) -> Result<()> {
        let max_history = self.max_history();
        let symbol_limit = self.symbol_limit;
        let escape_symbol = self.escape_symbol;
        let Some(root) = self.root.as_mut() else {
            return Ok(());
        };
        if history.len() > max_history {
            return Err(Error::InvalidModel("history longer than model order"));
        }
        if symbol >= symbol_limit {
            return Err(Error::SymbolOutOfRange {
                symbol,
                limit: symbol_limit,
            });
        }

        let mut ctx = root;
        ctx.frequencies.increment(symbol)?;
        for (depth, &sym) in history.iter().enumerate() {
            let slot = ctx
                .subcontexts
                .as_mut()
                .ok_or(Error::InvalidModel("context has no children"))?
                .get_mut(sym as usize)
                .ok_or(Error::SymbolOutOfRange {
                    symbol: sym,
                    limit: symbol_limit,
                })?;
            let child: &mut Context = slot.get_or_insert_with(|| {
                Box::new(Context::new(
                    symbol_limit,
                    depth + 1 < max_history,
                    escape_symbol,
                ))
            });
            child.frequencies.increment(symbol)?;
            ctx = child;
        }
        Ok(())
    }
}

/// Sliding window of the most recent symbols, oldest first.
fn push_history(history: &mut Vec<u32>, max_len: usize, symbol: u32) {
    if max_len == 0 {
        return;
    }
    if history.len() == max_len {
        history.remove(0);
    }
    history.push(symbol);
}

fn encode_symbol<W: BitOutput>(
    model: &PpmModel,
    history: &[u32],
    symbol: u32,
    encoder: &mut Encoder<W>,
) -> Result<()> {
    let escape = model.escape_symbol();
    for order in (0..=history.len()).rev() {
        if let Some(ctx) = model.context(&history[history.len() - order..]) {
            if symbol != escape && ctx.frequencies.get(symbol) > 0 {
                return encoder.write(&ctx.frequencies, symbol);
            }
            encoder.write(&ctx.frequencies, escape)?;
        }
    }
    encoder.write(model.order_minus1_freqs(), symbol)
}

fn decode_symbol<R: BitInput>(
    model: &PpmModel,
    history: &[u32],
    decoder: &mut Decoder<R>,
) -> Result<u32> {
    let escape = model.escape_symbol();
    let depth = history.len().min(model.max_history());
    if model.order() >= 0 {
        for order in (0..=depth).rev() {
            if let Some(ctx) = model.context(&history[history.len() - order..]) {
                let symbol = decoder.read(&ctx.frequencies)?;
                if symbol != escape {
                    return Ok(symbol);
                }
            }
        }
    }
    decoder.read(model.order_minus1_freqs())
}

/// Compress `input` into a zero-padded byte stream.
pub fn compress(input: &[u8], config: &PpmConfig) -> Result<Vec<u8>> {
    let mut model = PpmModel::new(config.order, BYTE_SYMBOL_LIMIT, EOF_SYMBOL)?;
    let mut encoder = Encoder::new(config.state_size, BitWriter::new(Vec::new()))?;
    let max_history = model.max_history();
    let mut history = Vec::with_capacity(max_history);

    for &byte in input {
        let symbol = u32::from(byte);
        encode_symbol(&model, &history, symbol, &mut encoder)?;
        model.increment_contexts(&history, symbol)?;
        push_history(&mut history, max_history, symbol);
    }
    encode_symbol(&model, &history, EOF_SYMBOL, &mut encoder)?;

    let writer = encoder.finish()?;
    let bits = writer.bit_len();
    let out = writer.finish()?;
    debug!(
        input_len = input.len(),
        output_len = out.len(),
        bits,
        order = config.order,
        "ppm compress"
    );
    Ok(out)
}

/// Decompress a stream produced by [`compress`] with the same config.
pub fn decompress(input: &[u8], config: &PpmConfig) -> Result<Vec<u8>> {
    let mut model = PpmModel::new(config.order, BYTE_SYMBOL_LIMIT, EOF_SYMBOL)?;
    let mut decoder = Decoder::new(config.state_size, BitReader::new(input))?;
    let max_history = model.max_history();
    let mut history = Vec::with_capacity(max_history);
    let mut out = Vec::new();

    loop {
        let symbol = decode_symbol(&model, &history, &mut decoder)?;
        if symbol == EOF_SYMBOL {
            break;
        }
        let byte = u8::try_from(symbol).map_err(|_| Error::InternalFault("decoded non-byte"))?;
        out.push(byte);
        model.increment_contexts(&history, symbol)?;
        push_history(&mut history, max_history, symbol);
    }
    debug!(
        input_len = input.len(),
        output_len = out.len(),
        order = config.order,
        "ppm decompress"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(data: &[u8], config: &PpmConfig) -> Vec<u8> {
        let compressed = compress(data, config).unwrap();
        decompress(&compressed, config).unwrap()
    }

    #[test]
    fn test_model_rejects_bad_params() {
        assert!(PpmModel::new(-2, 257, 256).is_err());
        assert!(PpmModel::new(2, 257, 257).is_err());
        assert!(PpmModel::new(2, 0, 0).is_err());
    }

    #[test]
    fn test_increment_creates_contexts() {
        let mut model = PpmModel::new(2, 4, 3).unwrap();
        model.increment_contexts(&[], 1).unwrap();
        model.increment_contexts(&[1], 2).unwrap();
        model.increment_contexts(&[1, 2], 0).unwrap();

        let root = model.context(&[]).unwrap();
        assert_eq!(root.frequencies.get(3), 1);
        assert_eq!(root.frequencies.total(), 4);

        let c1 = model.context(&[1]).unwrap();
        assert_eq!(c1.frequencies.get(2), 1);
        assert_eq!(c1.frequencies.get(0), 1);
        assert_eq!(c1.frequencies.get(3), 1);

        let c12 = model.context(&[1, 2]).unwrap();
        assert_eq!(c12.frequencies.get(0), 1);
        assert!(c12.subcontext(0).is_none());
        assert!(model.context(&[2]).is_none());

        assert!(model.increment_contexts(&[0, 1, 2], 0).is_err());
    }

    #[test]
    fn test_order_minus_one_model_is_inert() {
        let mut model = PpmModel::new(-1, 257, 256).unwrap();
        model.increment_contexts(&[], 7).unwrap();
        assert!(model.context(&[]).is_none());
    }

    #[test]
    fn test_roundtrip_text() {
        let data = b"abracadabra abracadabra abracadabra, the quick brown fox";
        for order in -1..=4 {
            let config = PpmConfig {
                order,
                ..PpmConfig::default()
            };
            assert_eq!(roundtrip(data, &config), data.to_vec(), "order {order}");
        }
    }

    #[test]
    fn test_empty_input() {
        let config = PpmConfig::default();
        let compressed = compress(b"", &config).unwrap();
        assert!(compressed.len() <= 2);
        assert!(decompress(&compressed, &config).unwrap().is_empty());
    }

    #[test]
    fn test_repetitive_input_compresses() {
        let data = b"0123456789".repeat(200);
        let compressed = compress(&data, &PpmConfig::default()).unwrap();
        assert!(compressed.len() * 10 < data.len());
        assert_eq!(decompress(&compressed, &PpmConfig::default()).unwrap(), data);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_ppm_roundtrip(
            data in prop::collection::vec(any::<u8>(), 0..300),
            order in 0i32..3,
            state_size in prop::sample::select(vec![16u32, 24, 32, 40]),
        ) {
            let config = PpmConfig { order, state_size };
            prop_assert_eq!(roundtrip(&data, &config), data);
        }
    }
}
