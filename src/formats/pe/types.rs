//! Core PE data types and structures

use std::fmt;

// PE constants
pub const DOS_SIGNATURE: u16 = 0x5A4D; // MZ
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";
pub const PE32_MAGIC: u16 = 0x10B;
pub const PE32PLUS_MAGIC: u16 = 0x20B;

pub const DOS_HEADER_SIZE: usize = 64;
pub const E_LFANEW_OFFSET: usize = 0x3C;
pub const COFF_HEADER_SIZE: usize = 20;
pub const SECTION_HEADER_SIZE: usize = 40;
pub const DATA_DIRECTORY_SIZE: usize = 8;
pub const NUMBER_OF_DIRECTORY_ENTRIES: usize = 16;

// Data directory indices
pub const IMAGE_DIRECTORY_ENTRY_EXPORT: usize = 0;
pub const IMAGE_DIRECTORY_ENTRY_IMPORT: usize = 1;

// Machine identifiers
pub const IMAGE_FILE_MACHINE_I386: u16 = 0x014C;
pub const IMAGE_FILE_MACHINE_IA64: u16 = 0x0200;
pub const IMAGE_FILE_MACHINE_AMD64: u16 = 0x8664;

// Section characteristics
pub const IMAGE_SCN_CNT_CODE: u32 = 0x00000020;
pub const IMAGE_SCN_MEM_EXECUTE: u32 = 0x20000000;

/// PE parsing error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeError {
    InvalidDosSignature,
    InvalidNtSignature,
    UnsupportedMachine(u16),
    UnsupportedMagic(u16),
    TruncatedHeader { expected: usize, actual: usize },
    OutOfBounds { offset: usize, size: usize, len: usize },
    InvalidRva { rva: u32 },
    InvalidString { offset: usize },
}

impl PeError {
    /// Both machine and magic rejections surface as one user-facing condition.
    pub fn is_unsupported_architecture(&self) -> bool {
        matches!(self, Self::UnsupportedMachine(_) | Self::UnsupportedMagic(_))
    }
}

impl fmt::Display for PeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDosSignature => write!(f, "Invalid file signature (DOS header)"),
            Self::InvalidNtSignature => write!(f, "Invalid file signature (NT headers)"),
            Self::UnsupportedMachine(m) => {
                write!(f, "Unsupported architecture: machine type 0x{:04x}", m)
            }
            Self::UnsupportedMagic(m) => {
                write!(f, "Unsupported architecture: optional header magic 0x{:04x}", m)
            }
            Self::TruncatedHeader { expected, actual } => {
                write!(
                    f,
                    "Truncated header: expected {} bytes, got {}",
                    expected, actual
                )
            }
            Self::OutOfBounds { offset, size, len } => write!(
                f,
                "Read of {} bytes at offset 0x{:x} exceeds image size 0x{:x}",
                size, offset, len
            ),
            Self::InvalidRva { rva } => write!(f, "RVA 0x{:08x} is not inside any section", rva),
            Self::InvalidString { offset } => {
                write!(f, "Invalid string at file offset 0x{:x}", offset)
            }
        }
    }
}

impl std::error::Error for PeError {}

pub type Result<T> = std::result::Result<T, PeError>;

/// Supported machine types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    I386,   // 0x014c
    IA64,   // 0x0200
    X86_64, // 0x8664
}

impl TryFrom<u16> for Machine {
    type Error = PeError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            IMAGE_FILE_MACHINE_I386 => Ok(Self::I386),
            IMAGE_FILE_MACHINE_IA64 => Ok(Self::IA64),
            IMAGE_FILE_MACHINE_AMD64 => Ok(Self::X86_64),
            other => Err(PeError::UnsupportedMachine(other)),
        }
    }
}

impl Machine {
    /// Decoder bitness: 32-bit compatibility mode for x86, long mode otherwise.
    pub fn decode_bitness(&self) -> u32 {
        match self {
            Self::I386 => 32,
            Self::IA64 | Self::X86_64 => 64,
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I386 => write!(f, "x86"),
            Self::IA64 => write!(f, "ia64"),
            Self::X86_64 => write!(f, "x86_64"),
        }
    }
}

/// Architecture tag declared by the optional header magic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitness {
    Pe32,
    Pe32Plus,
}

impl TryFrom<u16> for Bitness {
    type Error = PeError;

    fn try_from(magic: u16) -> Result<Self> {
        match magic {
            PE32_MAGIC => Ok(Self::Pe32),
            PE32PLUS_MAGIC => Ok(Self::Pe32Plus),
            other => Err(PeError::UnsupportedMagic(other)),
        }
    }
}

impl Bitness {
    pub fn is_64bit(&self) -> bool {
        matches!(self, Self::Pe32Plus)
    }

    /// Offset of the data directory array from the start of the optional header
    pub fn data_directory_offset(&self) -> usize {
        match self {
            Self::Pe32 => 96,
            Self::Pe32Plus => 112,
        }
    }
}

/// Data directory entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

impl DataDirectory {
    pub fn is_present(&self) -> bool {
        self.virtual_address != 0
    }
}

/// The fields of the header chain the rest of the crate consumes.
#[derive(Debug, Clone)]
pub struct ImageHeader {
    pub bitness: Bitness,
    pub machine: Machine,
    pub image_base: u64,
    pub entry_point: u32,
    pub number_of_sections: u16,
    pub size_of_optional_header: u16,
    pub file_alignment: u32,
    pub number_of_rva_and_sizes: u32,
    pub data_directories: [DataDirectory; NUMBER_OF_DIRECTORY_ENTRIES],
}

/// Section header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub characteristics: u32,
}

impl SectionHeader {
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.name[..end]).to_string()
    }

    pub fn contains_code(&self) -> bool {
        (self.characteristics & IMAGE_SCN_CNT_CODE) != 0
    }

    pub fn is_executable(&self) -> bool {
        (self.characteristics & IMAGE_SCN_MEM_EXECUTE) != 0
    }
}

/// Export directory (`IMAGE_EXPORT_DIRECTORY`, 40 bytes)
#[derive(Debug, Clone, Copy)]
pub struct ExportDirectory {
    pub name_rva: u32,
    pub base: u32,
    pub number_of_functions: u32,
    pub number_of_names: u32,
    pub address_of_functions: u32,
    pub address_of_names: u32,
}

/// Import descriptor (`IMAGE_IMPORT_DESCRIPTOR`, 20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportDescriptor {
    pub original_first_thunk: u32,
    pub time_date_stamp: u32,
    pub forwarder_chain: u32,
    pub name_rva: u32,
    pub first_thunk: u32,
}

impl ImportDescriptor {
    pub fn is_null(&self) -> bool {
        *self
            == Self {
                original_first_thunk: 0,
                time_date_stamp: 0,
                forwarder_chain: 0,
                name_rva: 0,
                first_thunk: 0,
            }
    }
}
