//! Entry point for pedisasm.
//!
//! Parses the command line with `clap`, loads the optional JSON config,
//! runs the disassembly into a buffered stdout and maps any failure to its
//! exit code.

use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use pedisasm::error::exit_code;
use pedisasm::logging::{init_tracing, init_tracing_json};
use pedisasm::{disassemble_file, DisasmConfig, PeDisasmError};

/// Linear disassembler for PE32 and PE32+ images.
///
/// Prints every code section with export and import names substituted for
/// matching addresses.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input PE file
    file: PathBuf,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Memory-map the input instead of reading it
    #[arg(long)]
    mmap: bool,

    /// Demangle MSVC names
    #[arg(long)]
    demangle: bool,

    /// Emit logs as JSON on stderr
    #[arg(long)]
    log_json: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<DisasmConfig> {
    let mut config = match &cli.config {
        Some(path) => DisasmConfig::from_json_file(path).map_err(PeDisasmError::from)?,
        None => DisasmConfig::default(),
    };

    if cli.mmap {
        config.load.use_mmap = true;
    }
    if cli.demangle {
        config.output.demangle = true;
    }
    config.validate().map_err(PeDisasmError::from)?;
    Ok(config)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let stats = disassemble_file(&cli.file, &config, &mut out)?;
    debug!(instructions = stats.instructions, "Listing written");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.log_json {
        init_tracing_json();
    } else {
        init_tracing();
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Every message already names its cause; the alternate form would repeat it
            eprintln!("{}", e);
            let code = e
                .downcast_ref::<PeDisasmError>()
                .map_or(exit_code::MALFORMED_IMAGE, PeDisasmError::exit_code);
            ExitCode::from(code as u8)
        }
    }
}
