//! Process-wide interception of exported entry points.
//!
//! Unlike the hook table these targets are found by export name. Each
//! installation is independent of the others; the registry maps an
//! entry point to its live detour so call-through addresses can be
//! looked up and everything removed together.

use std::fmt;

use crate::error::{HookError, HookResult};
use crate::hook::{OriginalSlot, Patch, Patcher};

/// The exported functions the mod intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPointId {
    /// `user32!GetClassLongPtrW`
    ClassLongPtr,
    /// `user32!DefWindowProcW`
    DefWindowProc,
}

impl EntryPointId {
    pub const ALL: [EntryPointId; 2] = [Self::ClassLongPtr, Self::DefWindowProc];

    pub fn module(self) -> &'static str {
        "user32.dll"
    }

    pub fn export(self) -> &'static str {
        match self {
            Self::ClassLongPtr => "GetClassLongPtrW",
            Self::DefWindowProc => "DefWindowProcW",
        }
    }
}

impl fmt::Display for EntryPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.module(), self.export())
    }
}

/// What to redirect and where the call-through address goes.
pub struct InterceptedEntryPoint {
    pub id: EntryPointId,
    pub replacement: usize,
    pub original: &'static OriginalSlot,
}

/// Finds exported functions of loaded modules.
pub trait ExportLookup {
    fn export_address(&self, module: &str, name: &str) -> Option<usize>;
}

struct Entry<P> {
    id: EntryPointId,
    system: usize,
    patch: P,
    original: &'static OriginalSlot,
}

/// Live interceptions keyed by entry point.
pub struct InterceptorRegistry<P: Patch> {
    entries: Vec<Entry<P>>,
}

impl<P: Patch> Default for InterceptorRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Patch> InterceptorRegistry<P> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Redirects `entry_point` to its replacement.
    ///
    /// The original slot is populated before the detour is enabled and
    /// cleared again if enabling fails.
    pub fn install<L, T>(
        &mut self,
        lookup: &L,
        patcher: &T,
        entry_point: &InterceptedEntryPoint,
    ) -> HookResult<()>
    where
        L: ExportLookup + ?Sized,
        T: Patcher<Patch = P> + ?Sized,
    {
        let id = entry_point.id;
        if self.is_installed(id) {
            return Err(HookError::AlreadyInstalled(id.to_string()));
        }
        let system = lookup
            .export_address(id.module(), id.export())
            .ok_or_else(|| HookError::ExportNotFound {
                module: id.module().into(),
                name: id.export().into(),
            })?;
        let patch = patcher
            .prepare(system, entry_point.replacement)
            .map_err(|reason| HookError::Patch {
                target: system,
                reason,
            })?;

        entry_point.original.set(patch.trampoline());
        if let Err(reason) = patch.enable() {
            entry_point.original.clear();
            return Err(HookError::Patch {
                target: system,
                reason,
            });
        }

        crate::log_info!("intercepted {id} at {system:#x}");
        self.entries.push(Entry {
            id,
            system,
            patch,
            original: entry_point.original,
        });
        Ok(())
    }

    /// Call-through address for `id`, if it is intercepted.
    pub fn original(&self, id: EntryPointId) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .and_then(|e| e.original.get())
    }

    /// Address of the intercepted system function.
    pub fn system_address(&self, id: EntryPointId) -> Option<usize> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.system)
    }

    pub fn is_installed(&self, id: EntryPointId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Patch> Drop for InterceptorRegistry<P> {
    fn drop(&mut self) {
        for entry in self.entries.iter().rev() {
            if let Err(e) = entry.patch.disable() {
                crate::log_error!("removing interception of {} failed: {e}", entry.id);
            }
            entry.original.clear();
        }
    }
}
