//! Lifecycle exports called by the mod host after injecting the DLL into
//! `explorer.exe`.
//!
//! Each export catches panics and turns them into a failed init or a
//! no-op, which needs the default `panic = "unwind"` strategy.
#![cfg(windows)]
#![allow(non_snake_case)]

use std::panic;

use static_icon_windows::runtime;
use windows::core::BOOL;

/// Installs the hooks. `FALSE` tells the host to unload the DLL.
#[unsafe(no_mangle)]
pub extern "system" fn ModInit() -> BOOL {
    BOOL::from(panic::catch_unwind(runtime::init).unwrap_or(false))
}

/// Removes the hooks and releases the icon before the DLL unloads.
#[unsafe(no_mangle)]
pub extern "system" fn ModUninit() {
    let _ = panic::catch_unwind(runtime::uninit);
}

/// Reloads the icon after the host changed the mod's settings.
#[unsafe(no_mangle)]
pub extern "system" fn ModSettingsChanged() {
    let _ = panic::catch_unwind(runtime::settings_changed);
}
