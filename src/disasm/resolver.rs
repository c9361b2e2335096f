//! Absolute address to symbol lookup

use std::sync::Arc;

use crate::symbols::{Symbol, SymbolTable};

/// Resolves runtime addresses against a shared symbol table
#[derive(Debug, Clone)]
pub struct AddressResolver {
    symbols: Arc<SymbolTable>,
    image_base: u64,
    demangle: bool,
}

impl AddressResolver {
    pub fn new(symbols: Arc<SymbolTable>, image_base: u64) -> Self {
        Self {
            symbols,
            image_base,
            demangle: false,
        }
    }

    pub fn with_demangle(mut self, demangle: bool) -> Self {
        self.demangle = demangle;
        self
    }

    pub fn image_base(&self) -> u64 {
        self.image_base
    }

    pub fn demangle(&self) -> bool {
        self.demangle
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Symbol at exactly `address`. Addresses below the image base never match.
    pub fn resolve(&self, address: u64) -> Option<&Symbol> {
        let relative = address.checked_sub(self.image_base)?;
        self.symbols.lookup(relative)
    }

    /// Label text for a line header: the bare symbol name
    pub fn label(&self, address: u64) -> Option<String> {
        self.resolve(address)
            .map(|s| s.display_name(self.demangle).into_owned())
    }

    /// Operand text: `module.symbol` with the module lowercased
    pub fn operand_name(&self, address: u64) -> Option<String> {
        self.resolve(address).map(|s| s.qualified_name(self.demangle))
    }
}
