#![no_main]
use arithcode::bitio::{BitReader, BitWriter};
use arithcode::{Decoder, Encoder, FrequencyTable, SimpleFrequencyTable, StateParams};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<u8>, Vec<u8>, u8)| {
    let (freq_bytes, input_bytes, state_size) = data;
    let state_size = u32::from(state_size % 48) + 16; // 16 to 63 bits

    if freq_bytes.len() < 2 || input_bytes.is_empty() {
        return;
    }

    // Model: one symbol per frequency byte, zero-frequency symbols skipped on input.
    let freqs: Vec<u32> = freq_bytes.iter().map(|&b| u32::from(b)).collect();
    let table = match SimpleFrequencyTable::new(&freqs) {
        Ok(t) => t,
        Err(_) => return,
    };
    let max_total = StateParams::new(state_size).unwrap().max_total();
    if u64::from(table.total()) > max_total {
        return;
    }
    let live: Vec<u32> = (0..freqs.len() as u32)
        .filter(|&s| freqs[s as usize] > 0)
        .collect();
    if live.is_empty() {
        return;
    }
    let input: Vec<u32> = input_bytes
        .iter()
        .map(|&b| live[b as usize % live.len()])
        .collect();

    let mut encoder = Encoder::new(state_size, BitWriter::new(Vec::new())).unwrap();
    for &s in &input {
        encoder.write(&table, s).unwrap();
    }
    let bytes = encoder.finish().unwrap().finish().unwrap();

    let mut decoder = Decoder::new(state_size, BitReader::new(&bytes[..])).unwrap();
    let output: Vec<u32> = (0..input.len())
        .map(|_| decoder.read(&table).unwrap())
        .collect();

    assert_eq!(input, output);
});
