//! Linear sweep over code sections, writing the listing line by line

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::iced::{IcedDecoder, IcedFormatter};
use super::resolver::AddressResolver;
use super::{DecodeStatus, InstructionDecoder, InstructionFormatter, Result};
use crate::config::OutputConfig;
use crate::formats::pe::{PeImage, Section};
use crate::symbols::SymbolTable;

/// Maximum x86 instruction length
pub const MAX_INSTRUCTION_LENGTH: usize = 15;

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisasmStats {
    pub sections: usize,
    pub instructions: usize,
    pub raw_bytes: usize,
    pub labels: usize,
}

/// Drives a decoder and formatter over every code section of an image
pub struct DisassemblyDriver<D, F> {
    decoder: D,
    formatter: F,
    resolver: AddressResolver,
    byte_slots: usize,
}

impl DisassemblyDriver<IcedDecoder, IcedFormatter> {
    /// iced-x86 backed driver for `image`, mode chosen from the machine type
    pub fn for_image(
        image: &PeImage<'_>,
        symbols: Arc<SymbolTable>,
        config: &OutputConfig,
    ) -> Result<Self> {
        let resolver =
            AddressResolver::new(symbols, image.image_base()).with_demangle(config.demangle);
        let decoder = IcedDecoder::new(image.machine().decode_bitness())?;
        let formatter = IcedFormatter::with_options(
            resolver.clone(),
            config.uppercase_hex,
            config.format_buffer_size,
        )?;
        Ok(Self::new(decoder, formatter, resolver).with_byte_slots(config.byte_slots))
    }
}

impl<D, F> DisassemblyDriver<D, F>
where
    D: InstructionDecoder,
    F: InstructionFormatter<D::Instruction>,
{
    pub fn new(decoder: D, formatter: F, resolver: AddressResolver) -> Self {
        Self {
            decoder,
            formatter,
            resolver,
            byte_slots: MAX_INSTRUCTION_LENGTH,
        }
    }

    /// Width of the byte column in octets
    pub fn with_byte_slots(mut self, slots: usize) -> Self {
        self.byte_slots = slots;
        self
    }

    /// Disassemble every section flagged as code, in file order
    pub fn run<W: Write>(&mut self, image: &PeImage<'_>, out: &mut W) -> Result<DisasmStats> {
        let mut stats = DisasmStats::default();

        for section in image.section_table().code_sections() {
            let (bytes, clamped) = image.section_data(section);
            if clamped {
                warn!(
                    section = %section.name(),
                    declared = section.header.size_of_raw_data,
                    available = bytes.len(),
                    "Section raw data runs past end of file; clamped"
                );
            }
            self.run_section(section, bytes, image.image_base(), out, &mut stats)?;
            stats.sections += 1;
        }

        out.flush()?;
        info!(
            sections = stats.sections,
            instructions = stats.instructions,
            raw_bytes = stats.raw_bytes,
            labels = stats.labels,
            "Disassembly complete"
        );
        Ok(stats)
    }

    fn run_section<W: Write>(
        &mut self,
        section: &Section,
        bytes: &[u8],
        image_base: u64,
        out: &mut W,
        stats: &mut DisasmStats,
    ) -> Result<()> {
        let base = image_base.wrapping_add(section.header.virtual_address as u64);
        debug!(
            section = %section.name(),
            base = format_args!("{:#x}", base),
            size = bytes.len(),
            "Disassembling section"
        );

        let mut offset = 0usize;
        loop {
            let window = &bytes[offset..];
            let address = base.wrapping_add(offset as u64);

            let decoded = match self.decoder.decode(window, address) {
                DecodeStatus::EndOfData => break,
                DecodeStatus::Decoded {
                    instruction,
                    length,
                } => Some((instruction, length)),
                DecodeStatus::Invalid => None,
            };

            if let Some(label) = self.resolver.label(address) {
                write!(out, "\n{}:\n", label)?;
                stats.labels += 1;
            }

            match decoded {
                Some((instruction, length)) => {
                    let text = self.formatter.format(&instruction, address)?;
                    self.write_line(out, address, &window[..length], &text)?;
                    offset += length;
                    stats.instructions += 1;
                }
                None => {
                    let Some(&byte) = window.first() else { break };
                    trace!(address = format_args!("{:#x}", address), byte, "Undecodable byte");
                    self.write_line(out, address, &window[..1], &format!("db {:02x}", byte))?;
                    offset += 1;
                    stats.raw_bytes += 1;
                }
            }
        }

        Ok(())
    }

    fn write_line<W: Write>(
        &self,
        out: &mut W,
        address: u64,
        bytes: &[u8],
        text: &str,
    ) -> Result<()> {
        if self.decoder.bitness() == 64 {
            write!(out, "{:016X}  ", address)?;
        } else {
            write!(out, "{:08X}  ", address as u32)?;
        }
        for b in bytes {
            write!(out, "{:02X} ", b)?;
        }
        for _ in bytes.len()..self.byte_slots {
            out.write_all(b"   ")?;
        }
        writeln!(out, " {}", text)?;
        Ok(())
    }
}
