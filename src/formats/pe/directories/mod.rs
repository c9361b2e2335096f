//! Data directory readers

pub mod export;
pub mod import;

pub use export::{read_export_directory, ExportEntries, ExportEntry, ExportName};
pub use import::{read_import_by_name, ImportDescriptors, Thunk, Thunk32, Thunk64, ThunkWidth, Thunks};
