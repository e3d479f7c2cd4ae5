//! Watches `config.toml` and triggers settings reloads.
//!
//! Uses `FindFirstChangeNotificationW` on the config directory. When a
//! change is signalled the file's mtime is compared with the last one
//! seen and the callback only runs for a file that still parses, so a
//! half-written config never resets the icon.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use static_icon_core::config;

use windows::Win32::Foundation::WAIT_OBJECT_0;
use windows::Win32::Storage::FileSystem::{
    FILE_NOTIFY_CHANGE_FILE_NAME, FILE_NOTIFY_CHANGE_LAST_WRITE, FindCloseChangeNotification,
    FindFirstChangeNotificationW, FindNextChangeNotification,
};
use windows::Win32::System::Threading::WaitForSingleObject;
use windows::core::HSTRING;

/// Timeout between stop-flag checks when no changes occur (ms).
const WAIT_TIMEOUT_MS: u32 = 500;

/// A running watcher thread. Dropping it without [`stop`](Self::stop)
/// detaches the thread, which still exits at its next stop-flag check.
pub struct ConfigWatcher {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ConfigWatcher {
    /// Starts watching. Returns `None` when there is no config directory.
    pub fn spawn(on_change: impl Fn() + Send + 'static) -> Option<Self> {
        let dir = config::config_dir()?;
        let path = config::config_path()?;
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("static-icon-config".into())
            .spawn(move || watch(&dir, &path, &flag, &on_change))
            .ok()?;
        Some(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Signals the thread and waits for it to exit.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn watch(dir: &Path, path: &Path, stop: &AtomicBool, on_change: &dyn Fn()) {
    if !dir.exists() {
        static_icon_core::log_info!("config dir {} not found, watcher exiting", dir.display());
        return;
    }
    let mut last = mtime(path);

    let dir_str = HSTRING::from(dir.as_os_str());
    let flags = FILE_NOTIFY_CHANGE_LAST_WRITE | FILE_NOTIFY_CHANGE_FILE_NAME;

    let handle = unsafe { FindFirstChangeNotificationW(&dir_str, false, flags) };
    let Ok(handle) = handle else {
        static_icon_core::log_warn!("FindFirstChangeNotificationW failed, watcher exiting");
        return;
    };

    while !stop.load(Ordering::Relaxed) {
        let result = unsafe { WaitForSingleObject(handle, WAIT_TIMEOUT_MS) };
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if result != WAIT_OBJECT_0 {
            continue;
        }

        let now = mtime(path);
        if now != last {
            last = now;
            match config::try_load() {
                Ok(_) => {
                    static_icon_core::log_info!("config.toml changed, reloading");
                    on_change();
                }
                Err(e) => static_icon_core::log_warn!("config.toml invalid, skipping: {e}"),
            }
        }

        let _ = unsafe { FindNextChangeNotification(handle) };
    }

    // SAFETY: closes the handle opened above exactly once.
    let _ = unsafe { FindCloseChangeNotification(handle) };
}

/// Returns the modification time for a path, or `None` if unavailable.
fn mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().ok().and_then(|m| m.modified().ok())
}
