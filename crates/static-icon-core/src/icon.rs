//! The one icon pair forced onto explorer windows.
//!
//! The store owns a large and an optional small icon handle. Hooks
//! never see the stored handles: [`IconStore::copy`] duplicates one
//! under the lock and hands ownership of the duplicate to the caller,
//! so a concurrent reload can never destroy a handle a hook is about
//! to return.

use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{IconSettings, IconSource};
use crate::error::IconError;

/// Pixel size requested for one icon size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconSize {
    pub width: i32,
    pub height: i32,
}

/// System metric sizes (`SM_CXICON`/`SM_CYICON`, `SM_CXSMICON`/`SM_CYSMICON`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconMetrics {
    pub large: IconSize,
    pub small: IconSize,
}

impl IconMetrics {
    /// Packs the two widths the way `SHDefExtractIconW` expects:
    /// large in the low word, small in the high word.
    pub fn packed_sizes(&self) -> u32 {
        let large = (self.large.width as u32) & 0xFFFF;
        let small = (self.small.width as u32) & 0xFFFF;
        large | (small << 16)
    }
}

/// Result of one extraction attempt. Either side may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extracted<H> {
    pub large: Option<H>,
    pub small: Option<H>,
}

impl<H> Default for Extracted<H> {
    fn default() -> Self {
        Self {
            large: None,
            small: None,
        }
    }
}

/// The platform operations the store is built on.
///
/// On Windows this is `LoadImageW`, `SHDefExtractIconW`,
/// `ExtractIconExW`, `CopyIcon` and `DestroyIcon`.
pub trait IconBackend: Send + Sync {
    /// An owned icon handle.
    type Handle: Copy + Eq + fmt::Debug + Send;

    /// Current system icon sizes.
    fn metrics(&self) -> IconMetrics;

    /// Full path of the system file holding the icon for `source`.
    fn system_icon_file(&self, source: IconSource) -> Option<PathBuf>;

    /// Loads an `.ico` file at the given size.
    fn load_file(&self, path: &Path, size: IconSize) -> Option<Self::Handle>;

    /// Extracts both sizes of icon `index` in one call.
    fn extract_default(&self, file: &Path, index: i32, metrics: IconMetrics)
    -> Extracted<Self::Handle>;

    /// Extracts icon `index` at the default sizes with the legacy API.
    fn extract_legacy(&self, file: &Path, index: i32) -> Extracted<Self::Handle>;

    /// Returns an independent copy of `icon`.
    fn duplicate(&self, icon: Self::Handle) -> Option<Self::Handle>;

    /// Destroys an icon handle.
    fn destroy(&self, icon: Self::Handle);
}

/// A loaded large icon and, if the source had one, a small icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconPair<H> {
    pub large: H,
    pub small: Option<H>,
}

/// Owns the single icon pair and hands out disposable copies.
pub struct IconStore<B: IconBackend> {
    backend: B,
    pair: Mutex<Option<IconPair<B::Handle>>>,
}

impl<B: IconBackend> IconStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            pair: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Loads the icon described by `settings`, replacing any current pair.
    ///
    /// On failure the current pair (if any) is left untouched.
    pub fn load(&self, settings: &IconSettings) -> Result<(), IconError> {
        let pair = self.build(settings)?;
        self.replace(Some(pair));
        Ok(())
    }

    /// Loads a new pair and swaps it in, then destroys the old one.
    ///
    /// Concurrent [`copy`](Self::copy) calls observe either the old pair
    /// or the new one. If loading fails the store ends up empty.
    pub fn reload(&self, settings: &IconSettings) -> Result<(), IconError> {
        match self.build(settings) {
            Ok(pair) => {
                self.replace(Some(pair));
                Ok(())
            }
            Err(e) => {
                self.replace(None);
                Err(e)
            }
        }
    }

    /// Destroys both handles. Calling it on an empty store does nothing.
    pub fn release(&self) {
        self.replace(None);
    }

    /// Whether a large icon is currently held.
    pub fn is_loaded(&self) -> bool {
        self.pair.lock().is_ok_and(|pair| pair.is_some())
    }

    /// Returns a fresh copy of the small icon (falling back to large)
    /// or of the large icon. The caller owns the returned handle.
    ///
    /// Returns `None` when nothing is loaded, the duplicate fails, or
    /// the lock is poisoned.
    pub fn copy(&self, want_small: bool) -> Option<B::Handle> {
        let Ok(guard) = self.pair.lock() else {
            return None;
        };
        let pair = guard.as_ref()?;
        let source = match (want_small, pair.small) {
            (true, Some(small)) => small,
            _ => pair.large,
        };
        self.backend.duplicate(source)
    }

    fn lock_for_write(&self) -> MutexGuard<'_, Option<IconPair<B::Handle>>> {
        self.pair.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, new: Option<IconPair<B::Handle>>) {
        let old = mem::replace(&mut *self.lock_for_write(), new);
        if let Some(old) = old {
            self.destroy_pair(old);
        }
    }

    fn destroy_pair(&self, pair: IconPair<B::Handle>) {
        self.backend.destroy(pair.large);
        if let Some(small) = pair.small.filter(|&s| s != pair.large) {
            self.backend.destroy(small);
        }
    }

    /// Produces a pair from `settings` without touching the stored one.
    fn build(&self, settings: &IconSettings) -> Result<IconPair<B::Handle>, IconError> {
        let metrics = self.backend.metrics();
        match settings.source {
            IconSource::Custom => self.build_custom(&settings.custom_path, metrics),
            source => self.build_system(source, metrics),
        }
    }

    fn build_custom(
        &self,
        path: &str,
        metrics: IconMetrics,
    ) -> Result<IconPair<B::Handle>, IconError> {
        if path.is_empty() {
            return Err(IconError::EmptyPath);
        }
        let path = Path::new(path);
        let large = self.backend.load_file(path, metrics.large);
        let small = self.backend.load_file(path, metrics.small);
        self.complete(
            Extracted { large, small },
            || IconError::LoadFailed(path.display().to_string()),
        )
    }

    fn build_system(
        &self,
        source: IconSource,
        metrics: IconMetrics,
    ) -> Result<IconPair<B::Handle>, IconError> {
        let file = self
            .backend
            .system_icon_file(source)
            .ok_or(IconError::SystemPathUnavailable)?;
        let index = source.resource_index();

        let first = self.backend.extract_default(&file, index, metrics);
        if first.large.is_some() {
            return self.complete(first, || IconError::LoadFailed(file.display().to_string()));
        }
        if let Some(small) = first.small {
            self.backend.destroy(small);
        }

        let retry = self.backend.extract_legacy(&file, index);
        self.complete(retry, || IconError::LoadFailed(file.display().to_string()))
    }

    /// Turns an extraction into a pair, cleaning up a lone small icon.
    fn complete(
        &self,
        extracted: Extracted<B::Handle>,
        error: impl FnOnce() -> IconError,
    ) -> Result<IconPair<B::Handle>, IconError> {
        match extracted {
            Extracted {
                large: Some(large),
                small,
            } => Ok(IconPair { large, small }),
            Extracted { large: None, small } => {
                if let Some(small) = small {
                    self.backend.destroy(small);
                }
                Err(error())
            }
        }
    }
}

impl<B: IconBackend> Drop for IconStore<B> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "icon_tests.rs"]
mod tests;
