//! Crate-level error type and process exit codes.

use thiserror::Error;

use crate::config::ConfigError;
use crate::disasm::DisasmError;
use crate::formats::pe::PeError;
use crate::io::LoadError;
use crate::symbols::SymbolError;

/// Exit codes reported by the binary, one per failure class
pub mod exit_code {
    pub const USAGE: i32 = 2;
    pub const FILE_OPEN: i32 = 3;
    pub const ALLOCATION: i32 = 4;
    pub const SHORT_READ: i32 = 5;
    pub const INVALID_DOS_SIGNATURE: i32 = 6;
    pub const INVALID_NT_SIGNATURE: i32 = 7;
    pub const UNSUPPORTED_ARCHITECTURE: i32 = 8;
    pub const BACKEND_INIT: i32 = 9;
    pub const MALFORMED_IMAGE: i32 = 10;
    pub const SYMBOL_TABLE: i32 = 11;
    pub const FORMAT: i32 = 12;
    pub const OUTPUT: i32 = 13;
    pub const CONFIG: i32 = 14;
}

/// Main error type for a disassembly run.
#[derive(Debug, Error)]
pub enum PeDisasmError {
    /// Loading the input file
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Header chain or section table validation
    #[error("Invalid PE image: {0}")]
    Image(#[from] PeError),

    /// Export or import directory processing
    #[error("Failed to build symbol table: {0}")]
    Symbols(#[from] SymbolError),

    /// Decoder, formatter, or listing output
    #[error(transparent)]
    Disasm(#[from] DisasmError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for top-level operations
pub type Result<T> = std::result::Result<T, PeDisasmError>;

impl PeDisasmError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            PeDisasmError::Load(e) => match e {
                LoadError::Open { .. } | LoadError::Map { .. } => exit_code::FILE_OPEN,
                LoadError::FileTooLarge { .. } | LoadError::Allocation { .. } => {
                    exit_code::ALLOCATION
                }
                LoadError::Read { .. } | LoadError::ShortRead { .. } => exit_code::SHORT_READ,
            },
            PeDisasmError::Image(e) => image_exit_code(e),
            PeDisasmError::Symbols(e) => match e {
                SymbolError::Image(_) => exit_code::MALFORMED_IMAGE,
                SymbolError::DuplicateImportAddress { .. } => exit_code::SYMBOL_TABLE,
            },
            PeDisasmError::Disasm(e) => match e {
                DisasmError::DecoderInit { .. } | DisasmError::FormatterInit(_) => {
                    exit_code::BACKEND_INIT
                }
                DisasmError::Format { .. } => exit_code::FORMAT,
                DisasmError::Output(_) => exit_code::OUTPUT,
            },
            PeDisasmError::Config(_) => exit_code::CONFIG,
        }
    }
}

fn image_exit_code(e: &PeError) -> i32 {
    match e {
        PeError::InvalidDosSignature => exit_code::INVALID_DOS_SIGNATURE,
        PeError::InvalidNtSignature => exit_code::INVALID_NT_SIGNATURE,
        e if e.is_unsupported_architecture() => exit_code::UNSUPPORTED_ARCHITECTURE,
        _ => exit_code::MALFORMED_IMAGE,
    }
}
