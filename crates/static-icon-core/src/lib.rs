pub mod classify;
pub mod config;
pub mod error;
pub mod hook;
pub mod icon;
pub mod intercept;
pub mod lifecycle;
pub mod log;
pub mod policy;

#[cfg(test)]
mod testing;

pub use config::{Config, IconSettings, IconSource};
pub use error::{HookError, HookResult, IconError, InitError};
pub use hook::{HookDescriptor, HookSet, ModuleImage, OriginalSlot};
pub use icon::{IconBackend, IconStore};
pub use intercept::{EntryPointId, InterceptorRegistry};
pub use lifecycle::{Controller, HookInstaller, InstalledHooks, State};
