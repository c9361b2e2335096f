//! Symbol table construction from PE export and import directories

use std::borrow::Cow;

use tracing::{debug, trace};

use super::types::{trim_module_name, Symbol, SymbolError, SymbolSource, SymbolTable};
use crate::formats::pe::directories::*;
use crate::formats::pe::{
    Bitness, PeImage, IMAGE_DIRECTORY_ENTRY_EXPORT, IMAGE_DIRECTORY_ENTRY_IMPORT,
};

pub type Result<T> = std::result::Result<T, SymbolError>;

/// Build the symbol table for `image`.
///
/// Exports (with a synthetic `EntryPoint`) are inserted first, then imports.
/// The thunk width follows the optional header magic.
pub fn build_symbol_table(image: &PeImage<'_>) -> Result<SymbolTable> {
    let mut table = SymbolTable::with_capacity(256);

    add_exports(image, &mut table)?;
    match image.bitness() {
        Bitness::Pe32 => add_imports::<Thunk32>(image, &mut table)?,
        Bitness::Pe32Plus => add_imports::<Thunk64>(image, &mut table)?,
    }

    debug!(symbols = table.len(), "Built symbol table");
    Ok(table)
}

fn add_exports(image: &PeImage<'_>, table: &mut SymbolTable) -> Result<()> {
    let dir = image.data_directory(IMAGE_DIRECTORY_ENTRY_EXPORT);
    if !dir.is_present() {
        return Ok(());
    }

    let export_dir = read_export_directory(image, dir.virtual_address)?;
    let module_name = image.read_string_at_rva(export_dir.name_rva)?;
    let module = trim_module_name(&module_name);

    table.push(Symbol::new(
        image.entry_point() as u64,
        module,
        "EntryPoint",
        SymbolSource::EntryPoint,
    ));

    let mut count = 0usize;
    for entry in ExportEntries::new(image, export_dir) {
        let entry = entry?;
        let name = match entry.name {
            ExportName::Named(name) => name.into_owned(),
            ExportName::Ordinal(ordinal) => format!("#{}", ordinal),
        };
        // No uniqueness check: exports may alias the entry point or each other
        table.insert(Symbol::new(
            entry.rva as u64,
            module,
            name,
            SymbolSource::Export,
        ));
        count += 1;
    }

    debug!(module, exports = count, "Collected exports");
    Ok(())
}

fn add_imports<W: ThunkWidth>(image: &PeImage<'_>, table: &mut SymbolTable) -> Result<()> {
    let dir = image.data_directory(IMAGE_DIRECTORY_ENTRY_IMPORT);
    if !dir.is_present() {
        return Ok(());
    }

    for descriptor in ImportDescriptors::new(image, dir.virtual_address) {
        let descriptor = descriptor?;
        if descriptor.original_first_thunk == 0 {
            trace!(
                first_thunk = descriptor.first_thunk,
                "Skipping import descriptor without lookup table"
            );
            continue;
        }

        let module_name = image.read_string_at_rva(descriptor.name_rva)?;
        let module = trim_module_name(&module_name);
        let mut address = descriptor.first_thunk as u64;
        let mut index = match table.search(address) {
            Ok(_) => {
                return Err(SymbolError::DuplicateImportAddress {
                    address,
                    module: module.to_string(),
                })
            }
            Err(i) => i,
        };

        let mut count = 0usize;
        for thunk in Thunks::<W>::new(image, descriptor.original_first_thunk) {
            let name = match thunk? {
                Thunk::ByName { hint_name_rva } => read_import_by_name(image, hint_name_rva)?,
                Thunk::ByOrdinal { .. } => Cow::Borrowed(""),
            };

            // The slot run is contiguous, but an export may sit inside it
            while table.address_at(index).is_some_and(|a| a < address) {
                index += 1;
            }
            if table.address_at(index) == Some(address) {
                return Err(SymbolError::DuplicateImportAddress {
                    address,
                    module: module.to_string(),
                });
            }

            table.insert_at(
                index,
                Symbol::new(address, module, name, SymbolSource::Import),
            );
            address += W::SIZE as u64;
            index += 1;
            count += 1;
        }

        trace!(module, imports = count, "Walked import descriptor");
    }

    Ok(())
}
