//! Symbol types and the address-ordered symbol table

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::demangle;
use crate::formats::pe::PeError;

/// Errors raised while building a symbol table
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    /// Malformed export or import metadata
    #[error(transparent)]
    Image(#[from] PeError),

    /// An import slot landed on an address that already carries a symbol
    #[error("Duplicate import address {address:#x} in module {module}")]
    DuplicateImportAddress { address: u64, module: String },
}

/// Where a symbol came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolSource {
    EntryPoint,
    Export,
    Import,
}

/// A named address, keyed relative to the image base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub address: u64,
    pub module: String,
    pub name: String,
    pub source: SymbolSource,
}

impl Symbol {
    pub fn new(
        address: u64,
        module: impl Into<String>,
        name: impl Into<String>,
        source: SymbolSource,
    ) -> Self {
        Self {
            address,
            module: module.into(),
            name: name.into(),
            source,
        }
    }

    /// Symbol name, optionally run through the MSVC demangler
    pub fn display_name(&self, demangle: bool) -> Cow<'_, str> {
        if demangle {
            if let Some(readable) = demangle::demangle_msvc(&self.name) {
                return Cow::Owned(readable);
            }
        }
        Cow::Borrowed(&self.name)
    }

    /// `module.symbol` with the module lowercased, as used for operands
    pub fn qualified_name(&self, demangle: bool) -> String {
        format!(
            "{}.{}",
            self.module.to_ascii_lowercase(),
            self.display_name(demangle)
        )
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} {}.{}", self.address, self.module, self.name)
    }
}

/// Strip the file extension from a library name: text up to, not including,
/// the last `.`. Names without a `.` are kept whole.
pub fn trim_module_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    }
}

/// Symbols sorted ascending by address.
///
/// Export symbols may share an address with an existing entry; import
/// symbols never do.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            symbols: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// `Ok(index)` of an entry at `address`, or `Err(insertion point)`
    pub fn search(&self, address: u64) -> Result<usize, usize> {
        self.symbols.binary_search_by_key(&address, |s| s.address)
    }

    /// Exact-address lookup; there is no nearest-preceding fallback
    pub fn lookup(&self, address: u64) -> Option<&Symbol> {
        self.search(address).ok().map(|i| &self.symbols[i])
    }

    /// Insert at the binary-search insertion point without a uniqueness check
    pub fn insert(&mut self, symbol: Symbol) -> usize {
        let index = match self.search(symbol.address) {
            Ok(i) | Err(i) => i,
        };
        self.symbols.insert(index, symbol);
        index
    }

    /// Append without searching. Callers guarantee ordering.
    pub(crate) fn push(&mut self, symbol: Symbol) {
        self.symbols.push(symbol);
    }

    pub(crate) fn insert_at(&mut self, index: usize, symbol: Symbol) {
        self.symbols.insert(index, symbol);
    }

    /// Address of the entry at `index`, if any
    pub(crate) fn address_at(&self, index: usize) -> Option<u64> {
        self.symbols.get(index).map(|s| s.address)
    }

    /// True when addresses never decrease
    pub fn is_sorted(&self) -> bool {
        self.symbols.windows(2).all(|w| w[0].address <= w[1].address)
    }
}
