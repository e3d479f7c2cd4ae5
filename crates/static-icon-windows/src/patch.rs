use std::mem::ManuallyDrop;

use retour::RawDetour;

use static_icon_core::hook::{Patch, Patcher};

/// A `retour` detour from a function to its replacement.
///
/// Dropping it restores the target but never frees the trampoline: a
/// shell thread may still be executing inside it when the hooks are
/// removed, so its memory is leaked for the life of the process.
pub struct RetourPatch(ManuallyDrop<RawDetour>);

// SAFETY: the detour only holds code addresses and the trampoline it
// allocated; enabling and disabling is serialized by the runtime lock.
unsafe impl Send for RetourPatch {}
unsafe impl Sync for RetourPatch {}

impl Patch for RetourPatch {
    fn trampoline(&self) -> usize {
        self.0.trampoline() as *const () as usize
    }

    fn enable(&self) -> Result<(), String> {
        // SAFETY: the trampoline address was published to the hook's
        // original slot before this is called.
        unsafe { self.0.enable() }.map_err(|e| e.to_string())
    }

    fn disable(&self) -> Result<(), String> {
        unsafe { self.0.disable() }.map_err(|e| e.to_string())
    }
}

impl Drop for RetourPatch {
    fn drop(&mut self) {
        if self.0.is_enabled() {
            let _ = self.disable();
        }
        // The inner `RawDetour` is never dropped; see the type docs.
    }
}

/// Creates [`RetourPatch`]es.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetourPatcher;

impl Patcher for RetourPatcher {
    type Patch = RetourPatch;

    fn prepare(&self, target: usize, replacement: usize) -> Result<RetourPatch, String> {
        // SAFETY: `target` is the entry of a function resolved from a
        // loaded module and `replacement` an `extern "system"` function
        // with the same signature.
        let detour = unsafe { RawDetour::new(target as *const (), replacement as *const ()) }
            .map_err(|e| e.to_string())?;
        Ok(RetourPatch(ManuallyDrop::new(detour)))
    }
}

#[cfg(test)]
mod tests {
    use std::hint::black_box;

    use super::*;

    type AddFn = extern "system" fn(i32, i32) -> i32;

    #[inline(never)]
    extern "system" fn add(x: i32, y: i32) -> i32 {
        unsafe { std::ptr::read_volatile(&x) + y }
    }

    #[inline(never)]
    extern "system" fn multiply(x: i32, y: i32) -> i32 {
        unsafe { std::ptr::read_volatile(&x) * y }
    }

    fn call(f: AddFn) -> i32 {
        black_box(f)(6, 7)
    }

    #[test]
    fn trampoline_outlives_the_patch() {
        // Arrange
        let patch = RetourPatcher
            .prepare(add as AddFn as usize, multiply as AddFn as usize)
            .expect("prepare detour");
        patch.enable().expect("enable detour");
        let trampoline: AddFn = unsafe { std::mem::transmute(patch.trampoline()) };
        assert_eq!(call(add), 42);

        // Act
        drop(patch);

        // Assert
        assert_eq!(call(add), 13);
        assert_eq!(call(trampoline), 13);
    }
}
