//! # Symbols Module
//!
//! Address-keyed symbol table built from a PE image's export and import
//! directories.

pub mod pe;
pub mod types;

pub use pe::build_symbol_table;
pub use types::{trim_module_name, Symbol, SymbolError, SymbolSource, SymbolTable};

impl SymbolTable {
    /// Build the table for a parsed image
    pub fn build(image: &crate::formats::pe::PeImage<'_>) -> Result<Self, SymbolError> {
        build_symbol_table(image)
    }
}
