#![cfg(windows)]

/// Win32 exported function lookup.
pub mod exports;

/// Hook bodies and their call-through slots.
pub mod hooks;

/// Icon loading backed by the shell image APIs.
pub mod icons;

/// Detours via `retour`.
pub mod patch;

/// Owns the global controller behind the DLL entry points.
pub mod runtime;

/// DbgHelp-based symbol resolution.
pub mod symbols;

/// Watches `config.toml` and triggers settings reloads.
pub mod watcher;

/// Window classification for `HWND`s.
pub mod window;

pub use icons::{IconHandle, ShellIcons};
pub use symbols::DbgHelpResolver;
