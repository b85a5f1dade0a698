//! Decode a capture file and print one JSON line per ensemble.
//!
//! Without `--pd0` the file is a stream of framed ensembles; with it, a
//! stream of PD0 ensembles translated into the same sections. Velocity
//! vectors are derived before printing. Set `RUST_LOG=debug` to see
//! skipped or malformed data.

use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use adcp_ensemble::{pd0, Ensemble, EnsembleSplitter, RawEnsemble, ScreenConfig};

const CHUNK: usize = 4096;

/// Print decoded ensembles from a capture file as JSON lines
#[derive(Parser, Debug)]
#[command(name = "ensemble-dump", version)]
struct Args {
    /// Input is PD0 rather than framed ensembles
    #[arg(long)]
    pd0: bool,

    /// Capture file to decode
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

fn main() {
    let args = Args::parse();
    env_logger::init();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let config = ScreenConfig::new();
    let path = args.file.display();
    let mut file = File::open(&args.file)?;
    let mut out = BufWriter::new(io::stdout().lock());

    if args.pd0 {
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let frames = pd0::scan(&data);
        log::info!("{} PD0 ensembles in {path}", frames.len());
        for frame in &frames {
            let ensemble = Ensemble::from_legacy(frame, &config);
            print_ensemble(&mut out, ensemble, &config)?;
        }
    } else {
        // Read in chunks so the splitter reassembles ensembles that straddle reads
        let mut splitter = EnsembleSplitter::new();
        let mut chunk = [0u8; CHUNK];
        let mut count = 0usize;
        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            for wire in splitter.feed(&chunk[..n]) {
                let raw = match RawEnsemble::parse(&wire) {
                    Ok(raw) => raw,
                    Err(e) => {
                        log::warn!("skipping ensemble: {e}");
                        continue;
                    }
                };
                match Ensemble::from_raw(&raw) {
                    Ok(ensemble) => {
                        print_ensemble(&mut out, ensemble, &config)?;
                        count += 1;
                    }
                    Err(e) => log::warn!("skipping ensemble {}: {e}", raw.number),
                }
            }
        }
        log::info!("{count} ensembles in {path}");
    }

    out.flush()?;
    Ok(())
}

fn print_ensemble(
    out: &mut impl Write,
    mut ensemble: Ensemble,
    config: &ScreenConfig,
) -> Result<(), Box<dyn Error>> {
    ensemble.compute_velocity_vectors(config);
    serde_json::to_writer(&mut *out, &ensemble)?;
    writeln!(out)?;
    Ok(())
}
