//! Per-call decisions made inside the hooks.
//!
//! Every function here answers one question: substitute the static
//! icon, or call through to the original unchanged. The platform hooks
//! only translate arguments and results; all branching lives here so
//! it can be tested without a shell process.

use crate::icon::{IconBackend, IconStore};

/// `GetClassLongPtrW` index of the class large icon.
pub const GCLP_HICON: i32 = -14;
/// `GetClassLongPtrW` index of the class small icon.
pub const GCLP_HICONSM: i32 = -34;

pub const WM_GETICON: u32 = 0x007F;
pub const WM_SETICON: u32 = 0x0080;

pub const ICON_SMALL: usize = 0;
pub const ICON_SMALL2: usize = 2;

/// Substring of the application id the shell gives explorer's taskbar group.
pub const EXPLORER_APP_ID_MARKER: &str = "Microsoft.Windows.Explorer";

/// Outcome of the shortcut ID list hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutDecision {
    /// Return no ID list so the taskbar asks the window for its icon.
    Suppress,
    CallThrough,
}

/// Outcome of the class-long-pointer hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassLongDecision<H> {
    /// Return this caller-owned copy instead of the class icon.
    Substitute(H),
    CallThrough,
}

/// Outcome of the default window procedure hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDecision<H> {
    /// `WM_SETICON`: forward with this copy as `lParam`.
    ReplaceIcon(H),
    /// `WM_GETICON`: return this copy without calling through.
    Return(H),
    CallThrough,
}

/// Decides the shortcut ID list hook for one task group.
///
/// `app_id` and `item_count` are only invoked when needed; either
/// returns `None` when its getter is unavailable. A missing item count
/// counts as one item.
pub fn shortcut_list<B: IconBackend>(
    store: &IconStore<B>,
    app_id: impl FnOnce() -> Option<String>,
    item_count: impl FnOnce() -> Option<i32>,
) -> ShortcutDecision {
    if !store.is_loaded() {
        return ShortcutDecision::CallThrough;
    }
    let Some(app_id) = app_id() else {
        return ShortcutDecision::CallThrough;
    };
    if !app_id.contains(EXPLORER_APP_ID_MARKER) {
        return ShortcutDecision::CallThrough;
    }
    if item_count().unwrap_or(1) > 0 {
        ShortcutDecision::Suppress
    } else {
        ShortcutDecision::CallThrough
    }
}

/// Decides the `GetClassLongPtrW` hook.
///
/// `is_target` is only invoked for icon indices while an icon is loaded.
pub fn class_long<B: IconBackend>(
    store: &IconStore<B>,
    index: i32,
    is_target: impl FnOnce() -> bool,
) -> ClassLongDecision<B::Handle> {
    let want_small = match index {
        GCLP_HICON => false,
        GCLP_HICONSM => true,
        _ => return ClassLongDecision::CallThrough,
    };
    if !store.is_loaded() || !is_target() {
        return ClassLongDecision::CallThrough;
    }
    match store.copy(want_small) {
        Some(icon) => ClassLongDecision::Substitute(icon),
        None => ClassLongDecision::CallThrough,
    }
}

/// Decides the `DefWindowProcW` hook.
///
/// `is_target` is only invoked for `WM_SETICON`/`WM_GETICON` while an
/// icon is loaded.
pub fn icon_message<B: IconBackend>(
    store: &IconStore<B>,
    msg: u32,
    wparam: usize,
    is_target: impl FnOnce() -> bool,
) -> MessageDecision<B::Handle> {
    if msg != WM_SETICON && msg != WM_GETICON {
        return MessageDecision::CallThrough;
    }
    if !store.is_loaded() || !is_target() {
        return MessageDecision::CallThrough;
    }
    let Some(icon) = store.copy(is_small_icon_request(wparam)) else {
        return MessageDecision::CallThrough;
    };
    if msg == WM_SETICON {
        MessageDecision::ReplaceIcon(icon)
    } else {
        MessageDecision::Return(icon)
    }
}

/// Whether a `WM_SETICON`/`WM_GETICON` size word asks for a small icon.
pub fn is_small_icon_request(wparam: usize) -> bool {
    wparam == ICON_SMALL || wparam == ICON_SMALL2
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
