use std::ffi::CString;

use static_icon_core::intercept::ExportLookup;

use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows::core::{HSTRING, PCSTR};

/// Looks exports up in modules already loaded into this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExports;

impl ExportLookup for SystemExports {
    fn export_address(&self, module: &str, name: &str) -> Option<usize> {
        let name = CString::new(name).ok()?;
        // SAFETY: GetModuleHandleW does not take a reference on the module;
        // user32 stays loaded for the life of the shell process.
        let handle = unsafe { GetModuleHandleW(&HSTRING::from(module)) }.ok()?;
        let proc = unsafe { GetProcAddress(handle, PCSTR(name.as_ptr().cast())) }?;
        Some(proc as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user32_entry_points_are_found() {
        let exports = SystemExports;

        let class_long = exports.export_address("user32.dll", "GetClassLongPtrW");
        let wndproc = exports.export_address("user32.dll", "DefWindowProcW");

        assert!(class_long.is_some());
        assert!(wndproc.is_some());
        assert_ne!(class_long, wndproc);
    }

    #[test]
    fn unknown_names_are_not_found() {
        let exports = SystemExports;

        assert_eq!(exports.export_address("user32.dll", "NoSuchExport"), None);
        assert_eq!(exports.export_address("not-loaded.dll", "DefWindowProcW"), None);
        assert_eq!(exports.export_address("user32.dll", "Bad\0Name"), None);
    }
}

