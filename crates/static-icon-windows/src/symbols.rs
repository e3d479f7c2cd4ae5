//! Symbol resolution through DbgHelp.
//!
//! The module's PDB is located on the configured search path (by default
//! the Microsoft public symbol server, cached under the config
//! directory), every symbol is enumerated, undecorated, and fed to a
//! [`SignatureMatcher`].
//!
//! `srv*` paths only work when `symsrv.dll` sits next to the
//! `dbghelp.dll` that gets loaded. Without it DbgHelp silently falls back
//! to the export table, which is reported as a missing PDB.

use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use static_icon_core::config::{self, SymbolConfig};
use static_icon_core::hook::{ModuleImage, SignatureMatcher, SymbolResolver};

use windows::Win32::Foundation::HANDLE;
use windows::Win32::System::Diagnostics::Debug::{
    IMAGEHLP_MODULEW64, SYM_LOAD_FLAGS, SYM_TYPE, SYMBOL_INFOW, SymCleanup, SymEnumSymbolsW,
    SymExport, SymGetModuleInfoW64, SymInitializeW, SymLoadModuleExW, SymNone, SymSetOptions,
    SymUnloadModule64, UnDecorateSymbolNameW,
};
use windows::Win32::System::LibraryLoader::{GetModuleFileNameW, GetModuleHandleW};
use windows::core::{BOOL, HSTRING, PCWSTR, w};

const MICROSOFT_SYMBOL_SERVER: &str = "https://msdl.microsoft.com/download/symbols";

const SYMOPT_FAIL_CRITICAL_ERRORS: u32 = 0x0000_0200;
const SYMOPT_NO_PROMPTS: u32 = 0x0008_0000;

/// `UnDecorateSymbolNameW` flag that drops `__ptr64` qualifiers.
const UNDNAME_NO_PTR64: u32 = 0x0002_0000;

/// Longest undecorated name read back.
const UNDECORATED_CAPACITY: usize = 1024;

const PATH_CAPACITY: usize = 1024;

/// DbgHelp is single-threaded; every session in this process goes
/// through this lock.
static DBGHELP: Mutex<()> = Mutex::new(());

/// Pseudo process handle identifying our DbgHelp session, so it does
/// not collide with another component of the host using DbgHelp on the
/// real process handle.
const SESSION_HANDLE: usize = 0x5354_4943;

/// Resolves undecorated signatures with DbgHelp.
#[derive(Debug, Clone)]
pub struct DbgHelpResolver {
    search_path: String,
}

impl DbgHelpResolver {
    pub fn new(search_path: impl Into<String>) -> Self {
        Self {
            search_path: search_path.into(),
        }
    }

    /// Uses the configured search path, or the Microsoft symbol server
    /// with a local cache when none is set.
    pub fn from_config(symbols: &SymbolConfig) -> Self {
        let path = symbols.search_path.trim();
        if path.is_empty() {
            Self::new(default_search_path())
        } else {
            Self::new(path)
        }
    }

    pub fn search_path(&self) -> &str {
        &self.search_path
    }
}

/// `srv*<cache>*<server>`, or just the server if no cache dir is known.
pub fn default_search_path() -> String {
    match config::symbol_cache_dir() {
        Some(cache) => format!("srv*{}*{MICROSOFT_SYMBOL_SERVER}", cache.display()),
        None => format!("srv**{MICROSOFT_SYMBOL_SERVER}"),
    }
}

/// True if any element of `search_path` downloads through `symsrv.dll`.
pub fn uses_symbol_server(search_path: &str) -> bool {
    search_path.split(';').any(|element| {
        let element = element.trim().to_ascii_lowercase();
        element.starts_with("srv*") || element.starts_with("symsrv*")
    })
}

/// Where DbgHelp looks for `symsrv.dll`: next to the loaded `dbghelp.dll`,
/// or System32 if it is not loaded yet. `None` if the file is missing.
pub fn symbol_server_dll() -> Option<PathBuf> {
    dbghelp_directory()
        .or_else(crate::icons::system_directory)
        .map(|dir| dir.join("symsrv.dll"))
        .filter(|path| path.is_file())
}

fn dbghelp_directory() -> Option<PathBuf> {
    let module = unsafe { GetModuleHandleW(w!("dbghelp.dll")) }.ok()?;
    let mut buf = [0u16; PATH_CAPACITY];
    let len = unsafe { GetModuleFileNameW(Some(module), &mut buf) } as usize;
    if len == 0 || len >= buf.len() {
        return None;
    }
    PathBuf::from(String::from_utf16_lossy(&buf[..len]))
        .parent()
        .map(PathBuf::from)
}

/// Whether DbgHelp loaded real debug information rather than falling
/// back to exports (or nothing).
fn has_debug_info(kind: SYM_TYPE) -> bool {
    kind != SymExport && kind != SymNone
}

impl SymbolResolver for DbgHelpResolver {
    fn resolve(
        &self,
        module: &ModuleImage,
        signatures: &[&str],
    ) -> Result<Vec<Option<usize>>, String> {
        let _lock = DBGHELP.lock().unwrap_or_else(PoisonError::into_inner);
        let session = Session::open(&self.search_path)?;
        let base = session.load(module)?;

        if let Err(e) = session.require_debug_info(base, module, &self.search_path) {
            session.unload(base);
            return Err(e);
        }

        let mut matcher = SignatureMatcher::new(signatures);
        // SAFETY: `matcher` outlives the synchronous enumeration and the
        // callback is the only code that touches it meanwhile.
        let result = unsafe {
            SymEnumSymbolsW(
                session.handle(),
                base,
                w!("*"),
                Some(enum_symbol),
                Some(&mut matcher as *mut SignatureMatcher as *const c_void),
            )
        };
        session.unload(base);

        if let Err(e) = result
            && !matcher.is_complete()
        {
            return Err(format!("enumerating symbols of {} failed: {e}", module.name));
        }
        Ok(matcher.finish())
    }
}

/// One `SymInitializeW` .. `SymCleanup` span.
struct Session;

impl Session {
    fn open(search_path: &str) -> Result<Self, String> {
        // Names stay decorated (no SYMOPT_UNDNAME) so the callback can
        // undecorate them with full signatures. Loads are not deferred,
        // so the symbol type is known right after SymLoadModuleExW.
        unsafe {
            SymSetOptions(SYMOPT_FAIL_CRITICAL_ERRORS | SYMOPT_NO_PROMPTS);
        }
        let path = HSTRING::from(search_path);
        // SAFETY: the pseudo handle is never dereferenced by DbgHelp when
        // process invasion is off.
        unsafe { SymInitializeW(Self::handle_value(), &path, false) }
            .map_err(|e| format!("SymInitializeW failed: {e}"))?;
        static_icon_core::log_debug!("dbghelp session opened, search path {search_path}");
        Ok(Self)
    }

    fn handle_value() -> HANDLE {
        HANDLE(SESSION_HANDLE as *mut c_void)
    }

    fn handle(&self) -> HANDLE {
        Self::handle_value()
    }

    fn load(&self, module: &ModuleImage) -> Result<u64, String> {
        let image = HSTRING::from(module.path.as_os_str());
        let name = HSTRING::from(module.name.as_str());
        let base = unsafe {
            SymLoadModuleExW(
                self.handle(),
                None,
                &image,
                &name,
                module.base as u64,
                0,
                None,
                SYM_LOAD_FLAGS(0),
            )
        };
        if base == 0 {
            return Err(format!(
                "no symbols for {} ({})",
                module.name,
                std::io::Error::last_os_error()
            ));
        }
        Ok(base)
    }

    /// Fails unless a PDB (or other debug info) was found for the module
    /// loaded at `base`.
    fn require_debug_info(
        &self,
        base: u64,
        module: &ModuleImage,
        search_path: &str,
    ) -> Result<(), String> {
        let mut info = IMAGEHLP_MODULEW64 {
            SizeOfStruct: size_of::<IMAGEHLP_MODULEW64>() as u32,
            ..Default::default()
        };
        // SAFETY: `info` is a writable IMAGEHLP_MODULEW64 with its size set.
        unsafe { SymGetModuleInfoW64(self.handle(), base, &mut info) }
            .map_err(|e| format!("SymGetModuleInfoW64 for {} failed: {e}", module.name))?;
        if has_debug_info(info.SymType) {
            return Ok(());
        }

        let mut reason = format!(
            "no PDB for {} (SymType {}), search path {search_path}",
            module.name, info.SymType.0
        );
        if uses_symbol_server(search_path) && symbol_server_dll().is_none() {
            reason.push_str("; symsrv.dll was not found next to dbghelp.dll");
        }
        Err(reason)
    }

    fn unload(&self, base: u64) {
        let _ = unsafe { SymUnloadModule64(self.handle(), base) };
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = unsafe { SymCleanup(self.handle()) };
    }
}

/// Callback invoked by `SymEnumSymbolsW` for each symbol.
///
/// Returns `FALSE` once every signature has matched, which stops the
/// enumeration early.
unsafe extern "system" fn enum_symbol(
    info: *const SYMBOL_INFOW,
    _size: u32,
    context: *const c_void,
) -> BOOL {
    // SAFETY: context is the `SignatureMatcher` passed by `resolve`, and
    // `info` is valid for the duration of the callback.
    let (matcher, info) = unsafe { (&mut *(context as *mut SignatureMatcher), &*info) };
    let name_ptr = info.Name.as_ptr();

    let mut undecorated = [0u16; UNDECORATED_CAPACITY];
    let len = unsafe { UnDecorateSymbolNameW(PCWSTR(name_ptr), &mut undecorated, UNDNAME_NO_PTR64) }
        as usize;
    let name = if len > 0 {
        String::from_utf16_lossy(&undecorated[..len])
    } else {
        // SAFETY: `NameLen` units follow `Name` in the same allocation.
        let raw = unsafe { std::slice::from_raw_parts(name_ptr, info.NameLen as usize) };
        String::from_utf16_lossy(raw)
    };

    matcher.offer(&name, info.Address as usize);
    BOOL::from(!matcher.is_complete())
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::Win32::System::Diagnostics::Debug::{SymDeferred, SymPdb};

    #[test]
    fn default_search_path_uses_symbol_server() {
        let path = default_search_path();
        assert!(path.starts_with("srv*"));
        assert!(path.ends_with(MICROSOFT_SYMBOL_SERVER));
        assert!(uses_symbol_server(&path));
    }

    #[test]
    fn local_paths_do_not_need_symsrv() {
        assert!(!uses_symbol_server(r"C:\symbols"));
        assert!(!uses_symbol_server(r"C:\symbols;D:\cache"));
        assert!(uses_symbol_server(r"C:\symbols;SRV*D:\cache*https://example.test"));
    }

    #[test]
    fn export_only_symbols_are_not_debug_info() {
        assert!(!has_debug_info(SymExport));
        assert!(!has_debug_info(SymNone));
        assert!(has_debug_info(SymPdb));
        assert!(has_debug_info(SymDeferred));
    }

    #[test]
    fn module_without_pdb_is_reported_as_missing_pdb() {
        // Arrange: a local search path with no PDBs in it.
        let empty = std::env::temp_dir().join("static-icon-no-symbols");
        std::fs::create_dir_all(&empty).expect("create empty symbol dir");
        let path = crate::icons::system_directory()
            .expect("system directory")
            .join("user32.dll");
        let module = ModuleImage {
            name: "user32.dll".into(),
            path,
            base: crate::runtime::OFFLINE_IMAGE_BASE,
        };
        let resolver = DbgHelpResolver::new(empty.display().to_string());

        // Act
        let result = resolver.resolve(&module, &["CTaskGroup::GetAppID"]);

        // Assert
        let error = result.expect_err("exports alone must not count as symbols");
        assert!(error.starts_with("no PDB for user32.dll"), "{error}");
    }
}
