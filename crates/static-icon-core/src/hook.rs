//! Symbol-resolved hook table.
//!
//! A batch of [`HookDescriptor`]s is resolved against one loaded module
//! by symbol signature (the undecorated C++ name), never by vtable
//! offset, since offsets move between shell builds. Installation is
//! all-or-nothing: either every required descriptor is resolved and
//! every detour is enabled, or nothing stays patched.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{HookError, HookResult};

/// Cell holding the address a hook calls through to.
///
/// Zero means "not resolved"; hooks must treat that as "do nothing
/// harmful" rather than call it.
pub struct OriginalSlot(AtomicUsize);

impl OriginalSlot {
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// The call-through address, if populated.
    pub fn get(&self) -> Option<usize> {
        match self.0.load(Ordering::Acquire) {
            0 => None,
            addr => Some(addr),
        }
    }

    pub(crate) fn set(&self, addr: usize) {
        self.0.store(addr, Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }
}

impl Default for OriginalSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OriginalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(addr) => write!(f, "OriginalSlot({addr:#x})"),
            None => f.write_str("OriginalSlot(empty)"),
        }
    }
}

/// A module already mapped into the current process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImage {
    pub name: String,
    pub path: PathBuf,
    pub base: usize,
}

/// Finds functions in a module by their undecorated signature.
pub trait SymbolResolver {
    /// Returns one entry per signature, in order; `None` for signatures
    /// that were not found. `Err` means the module's symbols could not
    /// be read at all.
    fn resolve(&self, module: &ModuleImage, signatures: &[&str])
    -> Result<Vec<Option<usize>>, String>;
}

/// One prepared detour.
pub trait Patch {
    /// Address that runs the original code. Valid as soon as the patch
    /// is prepared, before it is enabled.
    fn trampoline(&self) -> usize;
    fn enable(&self) -> Result<(), String>;
    fn disable(&self) -> Result<(), String>;
}

/// Creates detours. The Windows implementation uses `retour`.
pub trait Patcher {
    type Patch: Patch;

    /// Prepares (but does not enable) a detour from `target` to `replacement`.
    fn prepare(&self, target: usize, replacement: usize) -> Result<Self::Patch, String>;
}

/// A method to resolve and, optionally, redirect.
pub struct HookDescriptor {
    /// Short name for logs.
    pub name: &'static str,
    /// Undecorated symbol, e.g.
    /// `public: virtual int __cdecl CTaskGroup::GetNumItems(void)`.
    pub signature: &'static str,
    /// Receives the call-through address.
    pub original: &'static OriginalSlot,
    /// Detour target. `None` resolves the method for read-only calls.
    pub replacement: Option<usize>,
    /// An unresolved optional descriptor leaves its slot empty instead
    /// of failing the batch.
    pub optional: bool,
}

struct InstalledPatch<P> {
    name: &'static str,
    target: usize,
    patch: P,
    enabled: bool,
}

/// The live result of [`install`]. Dropping it disables every detour
/// and empties every slot it filled.
pub struct HookSet<P: Patch> {
    patches: Vec<InstalledPatch<P>>,
    slots: Vec<&'static OriginalSlot>,
}

impl<P: Patch> HookSet<P> {
    fn new() -> Self {
        Self {
            patches: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// Number of enabled detours.
    pub fn len(&self) -> usize {
        self.patches.iter().filter(|p| p.enabled).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enable_all(&mut self) -> HookResult<()> {
        for installed in &mut self.patches {
            installed.patch.enable().map_err(|reason| HookError::Patch {
                target: installed.target,
                reason: format!("{}: {reason}", installed.name),
            })?;
            installed.enabled = true;
        }
        Ok(())
    }
}

impl<P: Patch> Drop for HookSet<P> {
    fn drop(&mut self) {
        for installed in self.patches.iter_mut().rev() {
            if installed.enabled
                && let Err(e) = installed.patch.disable()
            {
                crate::log_error!("disabling hook {} failed: {e}", installed.name);
            }
            installed.enabled = false;
        }
        for slot in &self.slots {
            slot.clear();
        }
    }
}

/// Collapses runs of whitespace so signatures compare independently of
/// the resolver's formatting.
pub fn normalize_signature(signature: &str) -> String {
    signature.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Matches enumerated symbols against a fixed list of signatures.
///
/// Resolvers that walk every symbol of a module feed each name through
/// [`offer`](Self::offer) and collect the result with
/// [`finish`](Self::finish). The first address offered for a signature wins.
pub struct SignatureMatcher {
    wanted: Vec<String>,
    found: Vec<Option<usize>>,
}

impl SignatureMatcher {
    pub fn new(signatures: &[&str]) -> Self {
        Self {
            wanted: signatures.iter().map(|s| normalize_signature(s)).collect(),
            found: vec![None; signatures.len()],
        }
    }

    /// Records `address` for every still-unmatched signature equal to `name`.
    pub fn offer(&mut self, name: &str, address: usize) {
        let name = normalize_signature(name);
        for (wanted, found) in self.wanted.iter().zip(self.found.iter_mut()) {
            if found.is_none() && *wanted == name {
                *found = Some(address);
            }
        }
    }

    /// Whether every signature has an address.
    pub fn is_complete(&self) -> bool {
        self.found.iter().all(Option::is_some)
    }

    pub fn finish(self) -> Vec<Option<usize>> {
        self.found
    }
}

/// Resolves `descriptors` in `module` and installs their detours.
///
/// Every slot is populated before any detour is enabled. On any
/// failure the partially built set is dropped, which disables what was
/// enabled and clears what was filled.
pub fn install<R, P>(
    resolver: &R,
    patcher: &P,
    module: &ModuleImage,
    descriptors: &[HookDescriptor],
) -> HookResult<HookSet<P::Patch>>
where
    R: SymbolResolver + ?Sized,
    P: Patcher + ?Sized,
{
    let signatures: Vec<&str> = descriptors.iter().map(|d| d.signature).collect();
    let addresses = resolver
        .resolve(module, &signatures)
        .map_err(HookError::Resolver)?;
    if addresses.len() != descriptors.len() {
        return Err(HookError::Resolver(format!(
            "expected {} results from {}, got {}",
            descriptors.len(),
            module.name,
            addresses.len()
        )));
    }

    for (descriptor, address) in descriptors.iter().zip(&addresses) {
        match address {
            Some(address) => {
                crate::log_debug!("resolved {} at {address:#x}", descriptor.name);
            }
            None if descriptor.optional => {
                crate::log_info!("optional symbol {} not found", descriptor.name);
            }
            None => {
                return Err(HookError::UnresolvedSymbol(descriptor.signature.to_string()));
            }
        }
    }

    let mut set = HookSet::new();
    for (descriptor, address) in descriptors.iter().zip(addresses) {
        let Some(address) = address else {
            continue;
        };
        set.slots.push(descriptor.original);
        match descriptor.replacement {
            Some(replacement) => {
                let patch = patcher
                    .prepare(address, replacement)
                    .map_err(|reason| HookError::Patch {
                        target: address,
                        reason: format!("{}: {reason}", descriptor.name),
                    })?;
                descriptor.original.set(patch.trampoline());
                set.patches.push(InstalledPatch {
                    name: descriptor.name,
                    target: address,
                    patch,
                    enabled: false,
                });
            }
            None => descriptor.original.set(address),
        }
    }

    set.enable_all()?;
    crate::log_info!(
        "installed {} hook(s) in {} ({} symbol(s) resolved)",
        set.len(),
        module.name,
        set.slots.len()
    );
    Ok(set)
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;
