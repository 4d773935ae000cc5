use arithcode::bitio::{BitReader, BitWriter};
use arithcode::{Decoder, Encoder, SimpleFrequencyTable};

fn main() {
    let input = (0..10000).map(|i| (i % 3) as u32).collect::<Vec<_>>();
    let table = SimpleFrequencyTable::new(&[128, 64, 64]).unwrap();

    for _ in 0..1000 {
        let mut encoder = Encoder::new(32, BitWriter::new(Vec::new())).unwrap();
        for &s in &input {
            encoder.write(&table, s).unwrap();
        }
        let bytes = encoder.finish().unwrap().finish().unwrap();

        let mut decoder = Decoder::new(32, BitReader::new(&bytes[..])).unwrap();
        for &expected in &input {
            let s = decoder.read(&table).unwrap();
            assert_eq!(s, expected);
        }
    }
}
