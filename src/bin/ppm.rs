//! PPM file compressor.
//!
//! Usage: `ppm compress|decompress INPUT OUTPUT`

use std::process::ExitCode;

use arithcode::{compress, decompress, PpmConfig};

fn run(mode: &str, input: &str, output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    let config = PpmConfig::default();
    let result = match mode {
        "compress" => compress(&data, &config)?,
        "decompress" => decompress(&data, &config)?,
        _ => return Err(format!("unknown mode: {mode}").into()),
    };
    std::fs::write(output, result)?;
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [mode, input, output] = args.as_slice() else {
        eprintln!("Usage: ppm compress|decompress INPUT OUTPUT");
        return ExitCode::FAILURE;
    };
    match run(mode, input, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ppm: {e}");
            ExitCode::FAILURE
        }
    }
}
