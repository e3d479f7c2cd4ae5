//! The global controller behind the DLL entry points.
//!
//! The host calls [`init`], [`settings_changed`] and [`uninit`] from its
//! own threads; the config watcher calls [`settings_changed`] from its
//! thread. All of them go through one lock.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use static_icon_core::config::{self, SymbolConfig};
use static_icon_core::error::{HookError, HookResult};
use static_icon_core::hook::{self, HookSet, ModuleImage};
use static_icon_core::intercept::{EntryPointId, InterceptorRegistry};
use static_icon_core::lifecycle::{Controller, HookInstaller};
use static_icon_core::{log, log_error, log_info, log_warn};

use windows::Win32::System::LibraryLoader::{
    GetModuleFileNameW, LOAD_LIBRARY_SEARCH_SYSTEM32, LoadLibraryExW,
};
use windows::core::w;

use crate::exports::SystemExports;
use crate::hooks;
use crate::icons::ShellIcons;
use crate::patch::{RetourPatch, RetourPatcher};
use crate::symbols::DbgHelpResolver;
use crate::watcher::ConfigWatcher;

pub const TASKBAR_MODULE: &str = "taskbar.dll";

/// Longest module path read back from the loader.
const MODULE_PATH_CAPACITY: usize = 1024;

/// Installs the hooks with DbgHelp, `retour` and the process exports.
pub struct WindowsInstaller {
    resolver: DbgHelpResolver,
    patcher: RetourPatcher,
    exports: SystemExports,
}

impl WindowsInstaller {
    pub fn new(symbols: &SymbolConfig) -> Self {
        Self {
            resolver: DbgHelpResolver::from_config(symbols),
            patcher: RetourPatcher,
            exports: SystemExports,
        }
    }
}

impl HookInstaller for WindowsInstaller {
    type Patch = RetourPatch;

    fn install_taskbar_hooks(&self) -> HookResult<HookSet<RetourPatch>> {
        let module = load_taskbar()?;
        hook::install(
            &self.resolver,
            &self.patcher,
            &module,
            &hooks::taskbar_descriptors(),
        )
    }

    fn install_entry_point(
        &self,
        registry: &mut InterceptorRegistry<RetourPatch>,
        id: EntryPointId,
    ) -> HookResult<()> {
        registry.install(&self.exports, &self.patcher, &hooks::entry_point(id))
    }
}

/// Loads (or references the already loaded) `taskbar.dll` from System32.
///
/// The reference is never released: the module must outlive every
/// detour placed in it.
pub fn load_taskbar() -> HookResult<ModuleImage> {
    // SAFETY: loads a system DLL by name from System32 only.
    let module = unsafe { LoadLibraryExW(w!("taskbar.dll"), None, LOAD_LIBRARY_SEARCH_SYSTEM32) }
        .map_err(|e| HookError::ModuleNotFound(format!("{TASKBAR_MODULE}: {e}")))?;

    let mut buf = [0u16; MODULE_PATH_CAPACITY];
    let len = unsafe { GetModuleFileNameW(Some(module), &mut buf) } as usize;
    if len == 0 || len >= buf.len() {
        return Err(HookError::ModuleNotFound(format!(
            "{TASKBAR_MODULE}: path unavailable"
        )));
    }

    Ok(ModuleImage {
        name: TASKBAR_MODULE.into(),
        path: PathBuf::from(String::from_utf16_lossy(&buf[..len])),
        base: module.0 as usize,
    })
}

type WindowsController = Controller<ShellIcons, WindowsInstaller>;

struct Runtime {
    controller: WindowsController,
    watcher: Option<ConfigWatcher>,
}

static RUNTIME: Mutex<Option<Runtime>> = Mutex::new(None);

fn lock() -> MutexGuard<'static, Option<Runtime>> {
    RUNTIME.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Loads settings and the icon, installs every hook and starts the
/// config watcher. Returns `false` if the hooks could not be installed,
/// in which case nothing stays patched.
pub fn init() -> bool {
    let mut slot = lock();
    if slot.is_some() {
        log_warn!("init called twice");
        return false;
    }

    let settings = config::load();
    let installer = WindowsInstaller::new(&settings.symbols);
    let icons = Arc::clone(&hooks::context().icons);
    let mut controller = Controller::new(icons, installer, Box::new(config::load));

    if let Err(e) = controller.init() {
        log_error!("init failed: {e}");
        log::shutdown();
        return false;
    }

    let watcher = ConfigWatcher::spawn(settings_changed);
    if watcher.is_none() {
        log_info!("config watcher not started");
    }
    *slot = Some(Runtime {
        controller,
        watcher,
    });
    true
}

/// Re-reads settings and swaps the icon. A no-op before [`init`].
pub fn settings_changed() {
    if let Some(runtime) = lock().as_mut() {
        runtime.controller.settings_changed();
    }
}

/// Stops the watcher, releases the icon and removes every detour.
pub fn uninit() {
    // Taken out first so the watcher can finish a reload while we wait
    // for it.
    let Some(mut runtime) = lock().take() else {
        return;
    };
    if let Some(watcher) = runtime.watcher.take() {
        watcher.stop();
    }
    let installed = runtime.controller.unload();
    drop(installed);
    log_info!("hooks removed");
    log::shutdown();
}

/// Base address assigned to `taskbar.dll` when its symbols are read from
/// disk without loading it. Offsets are reported relative to it.
pub const OFFLINE_IMAGE_BASE: usize = 0x1000_0000;

/// Describes `System32\taskbar.dll` on disk, for symbol lookups from a
/// process that must not load it.
pub fn taskbar_on_disk() -> HookResult<ModuleImage> {
    let path = crate::icons::system_directory()
        .map(|dir| dir.join(TASKBAR_MODULE))
        .filter(|path| path.is_file())
        .ok_or_else(|| HookError::ModuleNotFound(TASKBAR_MODULE.into()))?;
    Ok(ModuleImage {
        name: TASKBAR_MODULE.into(),
        path,
        base: OFFLINE_IMAGE_BASE,
    })
}
