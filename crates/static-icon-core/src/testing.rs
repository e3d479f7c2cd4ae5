//! Test doubles shared by the policy and lifecycle tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{IconSettings, IconSource};
use crate::hook::{ModuleImage, OriginalSlot, Patch, Patcher, SymbolResolver};
use crate::icon::{Extracted, IconBackend, IconMetrics, IconSize, IconStore};
use crate::intercept::ExportLookup;

pub const LARGE: u32 = 1;
pub const SMALL: u32 = 2;

/// Always extracts `LARGE` (and `SMALL` if enabled); copies count up from 100.
pub struct FakeIcons {
    with_small: bool,
    next_copy: AtomicU32,
    pub duplicated: Mutex<Vec<u32>>,
}

impl FakeIcons {
    pub fn new(with_small: bool) -> Self {
        Self {
            with_small,
            next_copy: AtomicU32::new(100),
            duplicated: Mutex::new(Vec::new()),
        }
    }
}

impl IconBackend for FakeIcons {
    type Handle = u32;

    fn metrics(&self) -> IconMetrics {
        let size = IconSize {
            width: 32,
            height: 32,
        };
        IconMetrics {
            large: size,
            small: size,
        }
    }

    fn system_icon_file(&self, _source: IconSource) -> Option<PathBuf> {
        Some(PathBuf::from("explorer.exe"))
    }

    fn load_file(&self, _path: &Path, _size: IconSize) -> Option<u32> {
        None
    }

    fn extract_default(&self, _file: &Path, _index: i32, _metrics: IconMetrics) -> Extracted<u32> {
        Extracted {
            large: Some(LARGE),
            small: self.with_small.then_some(SMALL),
        }
    }

    fn extract_legacy(&self, _file: &Path, _index: i32) -> Extracted<u32> {
        Extracted::default()
    }

    fn duplicate(&self, icon: u32) -> Option<u32> {
        self.duplicated.lock().unwrap().push(icon);
        Some(self.next_copy.fetch_add(1, Ordering::SeqCst))
    }

    fn destroy(&self, _icon: u32) {}
}

/// A store holding the fake explorer icon pair.
pub fn loaded_store(with_small: bool) -> IconStore<FakeIcons> {
    let store = IconStore::new(FakeIcons::new(with_small));
    store
        .load(&IconSettings {
            source: IconSource::Explorer,
            custom_path: String::new(),
        })
        .unwrap();
    store
}

/// A store with nothing loaded.
pub fn empty_store() -> IconStore<FakeIcons> {
    IconStore::new(FakeIcons::new(true))
}

// -- hooking doubles --

/// A slot that outlives the test, as the real hook slots are statics.
pub fn leak_slot() -> &'static OriginalSlot {
    Box::leak(Box::new(OriginalSlot::new()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Prepared(usize),
    Enabled(usize),
    /// A detour was enabled while a watched slot was still empty.
    EnabledBeforeSlot(usize),
    Disabled(usize),
}

/// Records every patch operation; can fail at chosen targets.
#[derive(Default)]
pub struct FakePatcher {
    events: Arc<Mutex<Vec<Event>>>,
    fail_prepare_at: Option<usize>,
    fail_enable_at: Option<usize>,
    watched: Vec<&'static OriginalSlot>,
}

impl FakePatcher {
    pub fn failing_prepare_at(target: usize) -> Self {
        Self {
            fail_prepare_at: Some(target),
            ..Default::default()
        }
    }

    pub fn failing_enable_at(target: usize) -> Self {
        Self {
            fail_enable_at: Some(target),
            ..Default::default()
        }
    }

    /// Flags any enable that happens while one of `slots` is empty.
    pub fn watching(slots: Vec<&'static OriginalSlot>) -> Self {
        Self {
            watched: slots,
            ..Default::default()
        }
    }

    pub fn trampoline_for(target: usize) -> usize {
        target + 0x10_0000
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

pub struct FakePatch {
    target: usize,
    fail_enable: bool,
    events: Arc<Mutex<Vec<Event>>>,
    watched: Vec<&'static OriginalSlot>,
}

impl Patch for FakePatch {
    fn trampoline(&self) -> usize {
        FakePatcher::trampoline_for(self.target)
    }

    fn enable(&self) -> Result<(), String> {
        if self.fail_enable {
            return Err("enable refused".into());
        }
        let mut events = self.events.lock().unwrap();
        if self.watched.iter().any(|slot| slot.get().is_none()) {
            events.push(Event::EnabledBeforeSlot(self.target));
        }
        events.push(Event::Enabled(self.target));
        Ok(())
    }

    fn disable(&self) -> Result<(), String> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Disabled(self.target));
        Ok(())
    }
}

impl Patcher for FakePatcher {
    type Patch = FakePatch;

    fn prepare(&self, target: usize, _replacement: usize) -> Result<FakePatch, String> {
        if self.fail_prepare_at == Some(target) {
            return Err("prepare refused".into());
        }
        self.events.lock().unwrap().push(Event::Prepared(target));
        Ok(FakePatch {
            target,
            fail_enable: self.fail_enable_at == Some(target),
            events: Arc::clone(&self.events),
            watched: self.watched.clone(),
        })
    }
}

/// Resolves from a fixed signature table.
#[derive(Default)]
pub struct FakeResolver {
    pub symbols: HashMap<String, usize>,
    pub broken: bool,
}

impl FakeResolver {
    pub fn with(symbols: &[(&str, usize)]) -> Self {
        Self {
            symbols: symbols.iter().map(|(s, a)| (s.to_string(), *a)).collect(),
            broken: false,
        }
    }
}

impl SymbolResolver for FakeResolver {
    fn resolve(
        &self,
        _module: &ModuleImage,
        signatures: &[&str],
    ) -> Result<Vec<Option<usize>>, String> {
        if self.broken {
            return Err("no symbols for module".into());
        }
        Ok(signatures
            .iter()
            .map(|s| self.symbols.get(*s).copied())
            .collect())
    }
}

/// Exports of a pretend user32.dll.
pub struct FakeExports(HashMap<&'static str, usize>);

impl FakeExports {
    pub fn user32() -> Self {
        Self(HashMap::from([
            ("GetClassLongPtrW", 0x7000_1000),
            ("DefWindowProcW", 0x7000_2000),
        ]))
    }

    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn address(&self, name: &str) -> usize {
        self.0[name]
    }
}

impl ExportLookup for FakeExports {
    fn export_address(&self, module: &str, name: &str) -> Option<usize> {
        (module == "user32.dll")
            .then(|| self.0.get(name).copied())
            .flatten()
    }
}

pub fn taskbar_module() -> ModuleImage {
    ModuleImage {
        name: "taskbar.dll".into(),
        path: PathBuf::from("C:\\Windows\\System32\\taskbar.dll"),
        base: 0x1800_0000,
    }
}
