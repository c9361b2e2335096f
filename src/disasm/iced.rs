//! iced-x86 decoder and Intel-syntax formatter adapters

use iced_x86::{
    Decoder, DecoderError, DecoderOptions, Formatter, Instruction, IntelFormatter,
    MemorySizeOptions, OpKind, Register, SymbolResolver, SymbolResult,
};

use super::driver::MAX_INSTRUCTION_LENGTH;
use super::resolver::AddressResolver;
use super::{DecodeStatus, DisasmError, InstructionDecoder, InstructionFormatter, Result};

/// Default capacity of the formatted text, terminator included
pub const DEFAULT_FORMAT_BUFFER_SIZE: usize = 256;

/// Stateless x86 decoder for 32- or 64-bit mode
#[derive(Debug, Clone, Copy)]
pub struct IcedDecoder {
    bitness: u32,
}

impl IcedDecoder {
    pub fn new(bitness: u32) -> Result<Self> {
        Decoder::try_new(bitness, &[], DecoderOptions::NONE).map_err(|e| {
            DisasmError::DecoderInit {
                bitness,
                reason: e.to_string(),
            }
        })?;
        Ok(Self { bitness })
    }

    fn decode_raw(&self, window: &[u8], address: u64) -> Option<(Instruction, DecoderError)> {
        let mut decoder =
            Decoder::try_with_ip(self.bitness, window, address, DecoderOptions::NONE).ok()?;
        let instruction = decoder.decode();
        Some((instruction, decoder.last_error()))
    }

    /// iced also reports running out of bytes for an invalid opcode whose
    /// handler wants a ModRM byte. Decoding again with zero fill tells a
    /// truncated instruction apart from an undecodable one.
    fn classify_short_window(&self, window: &[u8], address: u64) -> DecodeStatus<Instruction> {
        let mut padded = [0u8; MAX_INSTRUCTION_LENGTH];
        let len = window.len().min(MAX_INSTRUCTION_LENGTH);
        padded[..len].copy_from_slice(&window[..len]);

        match self.decode_raw(&padded, address) {
            Some((instruction, DecoderError::None)) if instruction.len() <= len => {
                DecodeStatus::Decoded {
                    length: instruction.len(),
                    instruction,
                }
            }
            Some((_, DecoderError::None)) => DecodeStatus::EndOfData,
            _ => DecodeStatus::Invalid,
        }
    }
}

impl InstructionDecoder for IcedDecoder {
    type Instruction = Instruction;

    fn bitness(&self) -> u32 {
        self.bitness
    }

    fn decode(&mut self, window: &[u8], address: u64) -> DecodeStatus<Instruction> {
        if window.is_empty() {
            return DecodeStatus::EndOfData;
        }
        match self.decode_raw(window, address) {
            Some((instruction, DecoderError::None)) => DecodeStatus::Decoded {
                length: instruction.len(),
                instruction,
            },
            Some((_, DecoderError::NoMoreBytes)) => self.classify_short_window(window, address),
            _ => DecodeStatus::Invalid,
        }
    }
}

/// Routes branch targets and absolute memory operands through the resolver
struct ResolverBridge {
    resolver: AddressResolver,
}

impl SymbolResolver for ResolverBridge {
    fn symbol(
        &mut self,
        instruction: &Instruction,
        _operand: u32,
        instruction_operand: Option<u32>,
        address: u64,
        _address_size: u32,
    ) -> Option<SymbolResult<'_>> {
        // Immediates and register-relative displacements stay numeric
        let absolute = match instruction.op_kind(instruction_operand?) {
            OpKind::NearBranch16
            | OpKind::NearBranch32
            | OpKind::NearBranch64
            | OpKind::FarBranch16
            | OpKind::FarBranch32 => true,
            OpKind::Memory => is_absolute_memory(instruction),
            _ => false,
        };
        if !absolute {
            return None;
        }
        let text = self.resolver.operand_name(address)?;
        Some(SymbolResult::with_string(address, text))
    }
}

/// `[disp]` or `[rip+disp]`, where the displacement is the address itself
fn is_absolute_memory(instruction: &Instruction) -> bool {
    matches!(
        instruction.memory_base(),
        Register::None | Register::RIP | Register::EIP
    ) && instruction.memory_index() == Register::None
}

/// Intel-syntax formatter holding the address resolver
pub struct IcedFormatter {
    formatter: IntelFormatter,
    output: String,
    buffer_size: usize,
}

impl IcedFormatter {
    pub fn new(resolver: AddressResolver) -> Result<Self> {
        Self::with_options(resolver, false, DEFAULT_FORMAT_BUFFER_SIZE)
    }

    pub fn with_options(
        resolver: AddressResolver,
        uppercase_hex: bool,
        buffer_size: usize,
    ) -> Result<Self> {
        if buffer_size < 2 {
            return Err(DisasmError::FormatterInit(format!(
                "buffer size {} is too small",
                buffer_size
            )));
        }

        let mut formatter =
            IntelFormatter::with_options(Some(Box::new(ResolverBridge { resolver })), None);
        let options = formatter.options_mut();
        options.set_always_show_segment_register(true);
        options.set_memory_size_options(MemorySizeOptions::Always);
        options.set_uppercase_hex(uppercase_hex);
        options.set_hex_prefix("0x");
        options.set_hex_suffix("");
        options.set_branch_leading_zeros(false);

        Ok(Self {
            formatter,
            output: String::with_capacity(buffer_size),
            buffer_size,
        })
    }
}

impl InstructionFormatter<Instruction> for IcedFormatter {
    fn format(&mut self, instruction: &Instruction, address: u64) -> Result<String> {
        if instruction.is_invalid() {
            return Err(DisasmError::Format {
                address,
                reason: "invalid instruction".to_string(),
            });
        }

        self.output.clear();
        self.formatter.format(instruction, &mut self.output);

        // One byte is reserved for the terminator
        if self.output.len() >= self.buffer_size {
            return Err(DisasmError::Format {
                address,
                reason: format!(
                    "text of {} bytes exceeds buffer of {}",
                    self.output.len(),
                    self.buffer_size
                ),
            });
        }
        Ok(self.output.clone())
    }
}
