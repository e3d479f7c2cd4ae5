//! Init / settings reload / unload orchestration.
//!
//! ```text
//! Uninitialized -> Active -> (Reloading -> Active)* -> Unloaded
//! ```
//!
//! The controller owns the installed hooks and shares the icon store
//! with the hook bodies. Interceptor failures are handled strictly: if
//! either entry point cannot be intercepted, everything installed so
//! far is removed and init fails, so explorer windows never end up with
//! only half of the icon overrides.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{HookResult, InitError};
use crate::hook::{HookSet, Patch};
use crate::icon::{IconBackend, IconStore};
use crate::intercept::{EntryPointId, InterceptorRegistry};

/// Installs the platform hooks.
pub trait HookInstaller {
    type Patch: Patch;

    /// Resolves and installs the taskbar hook table.
    fn install_taskbar_hooks(&self) -> HookResult<HookSet<Self::Patch>>;

    /// Intercepts one exported entry point into `registry`.
    fn install_entry_point(
        &self,
        registry: &mut InterceptorRegistry<Self::Patch>,
        id: EntryPointId,
    ) -> HookResult<()>;
}

/// Everything that keeps the host process patched. Dropping it removes
/// every detour.
pub struct InstalledHooks<P: Patch> {
    pub taskbar: HookSet<P>,
    pub interceptors: InterceptorRegistry<P>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Active,
    Reloading,
    Unloaded,
}

/// Where settings come from. Re-read on every settings change.
pub type SettingsSource = Box<dyn Fn() -> Config + Send>;

pub struct Controller<B: IconBackend, I: HookInstaller> {
    state: State,
    icons: Arc<IconStore<B>>,
    installer: I,
    settings: SettingsSource,
    installed: Option<InstalledHooks<I::Patch>>,
}

impl<B: IconBackend, I: HookInstaller> Controller<B, I> {
    pub fn new(icons: Arc<IconStore<B>>, installer: I, settings: SettingsSource) -> Self {
        Self {
            state: State::Uninitialized,
            icons,
            installer,
            settings,
            installed: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Loads settings and the icon, then installs every hook.
    ///
    /// An icon that fails to load is only logged; the hooks then pass
    /// everything through until a settings change loads one. Hook
    /// failures leave nothing installed and no icon held.
    pub fn init(&mut self) -> Result<(), InitError> {
        if self.state != State::Uninitialized {
            return Err(InitError::AlreadyInitialized);
        }

        let config = self.read_settings();
        let icon = config.icon_settings();
        crate::log_info!(
            "init: icon source {} ({:?})",
            icon.source.code(),
            icon.source
        );

        if let Err(e) = self.icons.load(&icon) {
            crate::log_warn!("failed to load icon: {e}");
        }

        let taskbar = match self.installer.install_taskbar_hooks() {
            Ok(set) => set,
            Err(e) => {
                crate::log_error!("failed to hook taskbar: {e}");
                self.fail();
                return Err(InitError::TaskbarHooks(e));
            }
        };

        let mut interceptors = InterceptorRegistry::new();
        let mut failures = Vec::new();
        for id in EntryPointId::ALL {
            match self.installer.install_entry_point(&mut interceptors, id) {
                Ok(()) => crate::log_debug!(
                    "{id}: system {:#x?}, call-through {:#x?}",
                    interceptors.system_address(id),
                    interceptors.original(id)
                ),
                Err(e) => {
                    crate::log_error!("failed to intercept {id}: {e}");
                    failures.push((id.to_string(), e));
                }
            }
        }
        if !failures.is_empty() {
            drop(interceptors);
            drop(taskbar);
            self.fail();
            return Err(InitError::EntryPoints(failures));
        }

        self.installed = Some(InstalledHooks {
            taskbar,
            interceptors,
        });
        self.state = State::Active;
        crate::log_info!("active");
        Ok(())
    }

    /// Re-reads settings and swaps in the new icon.
    ///
    /// Hooks stay installed throughout. Ignored unless active.
    pub fn settings_changed(&mut self) {
        if self.state != State::Active {
            crate::log_debug!("settings change ignored in state {:?}", self.state);
            return;
        }
        self.state = State::Reloading;

        let config = self.read_settings();
        let icon = config.icon_settings();
        match self.icons.reload(&icon) {
            Ok(()) => crate::log_info!("settings changed: icon source {}", icon.source.code()),
            Err(e) => crate::log_warn!("settings changed but icon failed to load: {e}"),
        }

        self.state = State::Active;
    }

    /// Releases the icon and hands the installed hooks back to the
    /// caller, which decides when to remove them.
    pub fn unload(&mut self) -> Option<InstalledHooks<I::Patch>> {
        self.icons.release();
        self.state = State::Unloaded;
        crate::log_info!("unloaded");
        self.installed.take()
    }

    /// Reads settings and (re)configures logging, then reports whatever
    /// the config loader had to correct, which it could not log itself.
    fn read_settings(&self) -> Config {
        let config = (self.settings)();
        crate::log::init(&config.log);
        for notice in &config.notices {
            crate::log_warn!("config: {notice}");
        }
        config
    }

    fn fail(&mut self) {
        self.icons.release();
        self.state = State::Unloaded;
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
