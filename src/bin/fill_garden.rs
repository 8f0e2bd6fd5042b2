//! Command-line driver: reads `FillParams` JSON from a file (or stdin
//! when no path is given) and writes the `FillResult` JSON to stdout.
//!
//! Log level follows `RUST_LOG`, defaulting to `info`.

use std::io::Read;

use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let input = match std::env::args().nth(1) {
        Some(path) => {
            info!(%path, "reading fill parameters");
            std::fs::read_to_string(path)?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let output = garden_engine::fill_json(&input)?;
    println!("{output}");
    Ok(())
}
