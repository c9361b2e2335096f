//! Linear disassembler for Windows PE images.
//!
//! Loads a PE32 or PE32+ file, validates its header chain, builds an
//! address-sorted symbol table from the export and import directories, and
//! prints every code section with `module.symbol` names substituted for
//! matched addresses.

pub mod config;
pub mod demangle;
pub mod disasm;
pub mod error;
pub mod formats;
pub mod io;
pub mod logging;
pub mod symbols;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

pub use config::{DisasmConfig, LoadConfig, OutputConfig};
pub use disasm::{AddressResolver, DisasmStats, DisassemblyDriver};
pub use error::{PeDisasmError, Result};
pub use formats::pe::PeImage;
pub use io::ImageFile;
pub use symbols::{Symbol, SymbolTable};

/// Load `path` and write its listing to `out`
pub fn disassemble_file<P: AsRef<Path>, W: Write>(
    path: P,
    config: &DisasmConfig,
    out: &mut W,
) -> Result<DisasmStats> {
    let path = path.as_ref();
    let span = crate::span_trace!("disassemble_file", path = %path.display());
    let _guard = span.enter();

    let file = ImageFile::open(path, &config.load)?;
    disassemble_bytes(file.data(), &config.output, out)
}

/// Validate `data` as a PE image and write its listing to `out`.
///
/// Nothing is written unless the headers validate and the symbol table
/// builds.
pub fn disassemble_bytes<W: Write>(
    data: &[u8],
    config: &OutputConfig,
    out: &mut W,
) -> Result<DisasmStats> {
    let image = PeImage::parse(data)?;
    info!(
        machine = %image.machine(),
        pe32_plus = image.is_64bit(),
        image_base = format_args!("{:#x}", image.image_base()),
        entry_point = format_args!("{:#x}", image.entry_point()),
        sections = image.sections().len(),
        "Loaded PE image"
    );

    let symbols = Arc::new(SymbolTable::build(&image)?);
    let mut driver = DisassemblyDriver::for_image(&image, symbols, config)?;
    Ok(driver.run(&image, out)?)
}
