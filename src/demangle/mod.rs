//! MSVC demangling for export and import names.
//!
//! Only names in the `?`-prefixed MSVC scheme are attempted; everything else
//! is returned unchanged by callers.

/// True when `s` looks like an MSVC-decorated C++ name
pub fn is_msvc_mangled(s: &str) -> bool {
    s.len() > 1 && s.starts_with('?')
}

/// Demangled text for an MSVC name, or None
pub fn demangle_msvc(s: &str) -> Option<String> {
    if !is_msvc_mangled(s) {
        return None;
    }
    msvc_demangler::demangle(s, msvc_demangler::DemangleFlags::COMPLETE).ok()
}
