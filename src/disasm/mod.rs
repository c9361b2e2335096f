//! Linear disassembly of PE code sections.
//!
//! The decoder and formatter sit behind small traits; the iced-x86 adapter
//! is the backend used by the binary.

pub mod driver;
pub mod iced;
pub mod resolver;

use thiserror::Error;

pub use driver::{DisasmStats, DisassemblyDriver};
pub use iced::{IcedDecoder, IcedFormatter};
pub use resolver::AddressResolver;

/// Errors raised by decoder/formatter setup and the disassembly run
#[derive(Debug, Error)]
pub enum DisasmError {
    /// Decoder rejected the requested mode
    #[error("Failed to initialize instruction decoder for {bitness}-bit mode: {reason}")]
    DecoderInit { bitness: u32, reason: String },

    /// Formatter could not be configured
    #[error("Failed to initialize instruction formatter: {0}")]
    FormatterInit(String),

    /// Instruction could not be rendered
    #[error("Failed to format instruction at {address:#x}: {reason}")]
    Format { address: u64, reason: String },

    /// Writing the listing failed
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DisasmError>;

/// Outcome of decoding at one position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStatus<I> {
    Decoded { instruction: I, length: usize },
    /// Window exhausted, including a truncated trailing instruction
    EndOfData,
    Invalid,
}

/// Decodes one instruction from the start of a byte window
pub trait InstructionDecoder {
    type Instruction;

    /// 32 or 64
    fn bitness(&self) -> u32;

    fn decode(&mut self, window: &[u8], address: u64) -> DecodeStatus<Self::Instruction>;
}

/// Renders a decoded instruction as text
pub trait InstructionFormatter<I> {
    fn format(&mut self, instruction: &I, address: u64) -> Result<String>;
}
