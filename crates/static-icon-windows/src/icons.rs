use std::ffi::c_void;
use std::path::{Path, PathBuf};

use static_icon_core::IconSource;
use static_icon_core::icon::{Extracted, IconBackend, IconMetrics, IconSize};

use windows::Win32::System::SystemInformation::{GetSystemDirectoryW, GetWindowsDirectoryW};
use windows::Win32::UI::Shell::{ExtractIconExW, SHDefExtractIconW};
use windows::Win32::UI::WindowsAndMessaging::{
    CopyIcon, DestroyIcon, GetSystemMetrics, HICON, IMAGE_ICON, LR_LOADFROMFILE, LoadImageW,
    SM_CXICON, SM_CXSMICON, SM_CYICON, SM_CYSMICON,
};
use windows::core::HSTRING;

const MAX_PATH: usize = 260;

/// An owned `HICON`, stored as its raw value so it can cross threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconHandle(isize);

impl IconHandle {
    pub fn from_hicon(icon: HICON) -> Option<Self> {
        (!icon.is_invalid()).then_some(Self(icon.0 as isize))
    }

    pub fn hicon(self) -> HICON {
        HICON(self.0 as *mut c_void)
    }

    /// The handle as a pointer-sized return value.
    pub fn as_raw(self) -> isize {
        self.0
    }
}

/// [`IconBackend`] over the shell's icon extraction APIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellIcons;

impl IconBackend for ShellIcons {
    type Handle = IconHandle;

    fn metrics(&self) -> IconMetrics {
        unsafe {
            IconMetrics {
                large: IconSize {
                    width: GetSystemMetrics(SM_CXICON),
                    height: GetSystemMetrics(SM_CYICON),
                },
                small: IconSize {
                    width: GetSystemMetrics(SM_CXSMICON),
                    height: GetSystemMetrics(SM_CYSMICON),
                },
            }
        }
    }

    fn system_icon_file(&self, source: IconSource) -> Option<PathBuf> {
        match source {
            IconSource::Shell32 => system_directory().map(|d| d.join("shell32.dll")),
            IconSource::Explorer | IconSource::Custom => {
                windows_directory().map(|d| d.join("explorer.exe"))
            }
        }
    }

    fn load_file(&self, path: &Path, size: IconSize) -> Option<IconHandle> {
        let path = HSTRING::from(path.as_os_str());
        let handle = unsafe {
            LoadImageW(
                None,
                &path,
                IMAGE_ICON,
                size.width,
                size.height,
                LR_LOADFROMFILE,
            )
        }
        .ok()?;
        IconHandle::from_hicon(HICON(handle.0))
    }

    fn extract_default(
        &self,
        file: &Path,
        index: i32,
        metrics: IconMetrics,
    ) -> Extracted<IconHandle> {
        let file = HSTRING::from(file.as_os_str());
        let mut large = HICON::default();
        let mut small = HICON::default();
        let _ = unsafe {
            SHDefExtractIconW(
                &file,
                index,
                0,
                Some(&mut large),
                Some(&mut small),
                metrics.packed_sizes(),
            )
        };
        Extracted {
            large: IconHandle::from_hicon(large),
            small: IconHandle::from_hicon(small),
        }
    }

    fn extract_legacy(&self, file: &Path, index: i32) -> Extracted<IconHandle> {
        let file = HSTRING::from(file.as_os_str());
        let mut large = HICON::default();
        let mut small = HICON::default();
        // SAFETY: both out pointers hold room for the one icon requested.
        let count =
            unsafe { ExtractIconExW(&file, index, Some(&mut large), Some(&mut small), 1) };
        if count == 0 || count == u32::MAX {
            return Extracted::default();
        }
        Extracted {
            large: IconHandle::from_hicon(large),
            small: IconHandle::from_hicon(small),
        }
    }

    fn duplicate(&self, icon: IconHandle) -> Option<IconHandle> {
        // SAFETY: `icon` is a live handle held by the store while its lock
        // is taken.
        let copy = unsafe { CopyIcon(icon.hicon()) }.ok()?;
        IconHandle::from_hicon(copy)
    }

    fn destroy(&self, icon: IconHandle) {
        // SAFETY: the store destroys each handle it owns exactly once.
        if let Err(e) = unsafe { DestroyIcon(icon.hicon()) } {
            static_icon_core::log_warn!("DestroyIcon({:#x}) failed: {e}", icon.0);
        }
    }
}

/// `%WINDIR%`.
pub fn windows_directory() -> Option<PathBuf> {
    let mut buf = [0u16; MAX_PATH];
    let len = unsafe { GetWindowsDirectoryW(Some(&mut buf)) } as usize;
    directory_from(&buf, len)
}

/// `%WINDIR%\System32`.
pub fn system_directory() -> Option<PathBuf> {
    let mut buf = [0u16; MAX_PATH];
    let len = unsafe { GetSystemDirectoryW(Some(&mut buf)) } as usize;
    directory_from(&buf, len)
}

/// A zero length is failure; a length past the buffer is the size the
/// call would have needed.
fn directory_from(buf: &[u16], len: usize) -> Option<PathBuf> {
    (len > 0 && len < buf.len()).then(|| PathBuf::from(String::from_utf16_lossy(&buf[..len])))
}

#[cfg(test)]
mod tests {
    use super::*;

    use static_icon_core::{IconSettings, IconStore};

    fn settings(source: IconSource) -> IconSettings {
        IconSettings {
            source,
            custom_path: String::new(),
        }
    }

    fn destroy(icon: IconHandle) -> bool {
        unsafe { DestroyIcon(icon.hicon()) }.is_ok()
    }

    #[test]
    fn shell32_copies_are_distinct_and_destroyable() {
        // Arrange
        let store = IconStore::new(ShellIcons);
        store.load(&settings(IconSource::Shell32)).expect("shell32 icon loads");

        // Act
        let first = store.copy(false).expect("first copy");
        let second = store.copy(false).expect("second copy");

        // Assert
        assert_ne!(first, second);
        assert!(destroy(first));
        assert!(destroy(second));
        assert!(store.is_loaded());
    }

    #[test]
    fn explorer_icon_loads_with_a_small_variant() {
        let store = IconStore::new(ShellIcons);
        store.load(&settings(IconSource::Explorer)).expect("explorer icon loads");

        let small = store.copy(true).expect("small copy");

        assert!(destroy(small));
    }

    #[test]
    fn legacy_extraction_finds_the_shell32_icon() {
        // Arrange
        let backend = ShellIcons;
        let file = backend
            .system_icon_file(IconSource::Shell32)
            .expect("shell32 path");

        // Act
        let extracted = backend.extract_legacy(&file, IconSource::Shell32.resource_index());

        // Assert
        let large = extracted.large.expect("large icon");
        assert!(destroy(large));
        if let Some(small) = extracted.small {
            assert!(destroy(small));
        }
    }

    #[test]
    fn missing_custom_file_fails_to_load() {
        let store = IconStore::new(ShellIcons);
        let missing = IconSettings {
            source: IconSource::Custom,
            custom_path: r"C:\does-not-exist\static-icon.ico".into(),
        };

        assert!(store.load(&missing).is_err());
        assert!(!store.is_loaded());
    }

    #[test]
    fn system_directories_are_absolute() {
        let windows = windows_directory().expect("windows directory");
        let system = system_directory().expect("system directory");

        assert!(windows.is_absolute());
        assert!(system.is_absolute());
        assert!(system.join("shell32.dll").is_file());
    }
}

