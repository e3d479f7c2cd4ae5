//! Hook bodies installed into the shell.
//!
//! Each hook translates its raw arguments for a [`policy`] decision and
//! then either returns a copy of the static icon or forwards everything
//! unchanged to the call-through address in its [`OriginalSlot`]. A hook
//! whose slot is empty returns a neutral value instead of calling
//! through.

use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::sync::{Arc, OnceLock};

use static_icon_core::hook::{HookDescriptor, OriginalSlot};
use static_icon_core::icon::IconStore;
use static_icon_core::intercept::{EntryPointId, InterceptedEntryPoint};
use static_icon_core::policy::{self, ClassLongDecision, MessageDecision, ShortcutDecision};

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::core::PCWSTR;

use crate::icons::ShellIcons;
use crate::window::is_explorer_window;

pub const GET_APP_ID_SIGNATURE: &str =
    "public: virtual unsigned short const * __cdecl CTaskGroup::GetAppID(void)";
pub const GET_NUM_ITEMS_SIGNATURE: &str =
    "public: virtual int __cdecl CTaskGroup::GetNumItems(void)";
pub const GET_SHORTCUT_ID_LIST_SIGNATURE: &str =
    "public: virtual struct _ITEMIDLIST_ABSOLUTE const * __cdecl CTaskGroup::GetShortcutIDList(void)";

type GetAppIdFn = unsafe extern "system" fn(*mut c_void) -> *const u16;
type GetNumItemsFn = unsafe extern "system" fn(*mut c_void) -> i32;
type GetShortcutIdListFn = unsafe extern "system" fn(*mut c_void) -> *const c_void;
type GetClassLongPtrFn = unsafe extern "system" fn(HWND, i32) -> usize;
type DefWindowProcFn = unsafe extern "system" fn(HWND, u32, WPARAM, LPARAM) -> LRESULT;

static GET_APP_ID: OriginalSlot = OriginalSlot::new();
static GET_NUM_ITEMS: OriginalSlot = OriginalSlot::new();
static GET_SHORTCUT_ID_LIST: OriginalSlot = OriginalSlot::new();
static GET_CLASS_LONG_PTR: OriginalSlot = OriginalSlot::new();
static DEF_WINDOW_PROC: OriginalSlot = OriginalSlot::new();

/// State shared between the runtime and the hook bodies.
pub struct HookContext {
    pub icons: Arc<IconStore<ShellIcons>>,
}

static CONTEXT: OnceLock<HookContext> = OnceLock::new();

/// Returns the process-wide hook context, creating it on first use.
pub fn context() -> &'static HookContext {
    CONTEXT.get_or_init(|| HookContext {
        icons: Arc::new(IconStore::new(ShellIcons)),
    })
}

/// The `CTaskGroup` methods resolved in `taskbar.dll`.
///
/// The app-id and item-count getters are only resolved so the shortcut
/// hook can call them; the shortcut getter is detoured.
pub fn taskbar_descriptors() -> [HookDescriptor; 3] {
    [
        HookDescriptor {
            name: "CTaskGroup::GetAppID",
            signature: GET_APP_ID_SIGNATURE,
            original: &GET_APP_ID,
            replacement: None,
            optional: false,
        },
        HookDescriptor {
            name: "CTaskGroup::GetNumItems",
            signature: GET_NUM_ITEMS_SIGNATURE,
            original: &GET_NUM_ITEMS,
            replacement: None,
            optional: false,
        },
        HookDescriptor {
            name: "CTaskGroup::GetShortcutIDList",
            signature: GET_SHORTCUT_ID_LIST_SIGNATURE,
            original: &GET_SHORTCUT_ID_LIST,
            replacement: Some(shortcut_id_list_hook as GetShortcutIdListFn as usize),
            optional: false,
        },
    ]
}

/// The interception of one user32 entry point.
pub fn entry_point(id: EntryPointId) -> InterceptedEntryPoint {
    match id {
        EntryPointId::ClassLongPtr => InterceptedEntryPoint {
            id,
            replacement: class_long_ptr_hook as GetClassLongPtrFn as usize,
            original: &GET_CLASS_LONG_PTR,
        },
        EntryPointId::DefWindowProc => InterceptedEntryPoint {
            id,
            replacement: def_window_proc_hook as DefWindowProcFn as usize,
            original: &DEF_WINDOW_PROC,
        },
    }
}

/// Reads a slot as a function pointer of type `F`.
///
/// # Safety
///
/// `F` must be the pointer type of the function whose address was
/// stored in `slot`.
unsafe fn original<F: Copy>(slot: &OriginalSlot) -> Option<F> {
    debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<usize>());
    let addr = slot.get()?;
    Some(unsafe { mem::transmute_copy::<usize, F>(&addr) })
}

unsafe extern "system" fn shortcut_id_list_hook(this: *mut c_void) -> *const c_void {
    // SAFETY: the slot holds the trampoline of GetShortcutIDList.
    let Some(call_through) = (unsafe { original::<GetShortcutIdListFn>(&GET_SHORTCUT_ID_LIST) })
    else {
        return ptr::null();
    };
    let Some(ctx) = CONTEXT.get() else {
        // SAFETY: forwards the unchanged `this` to the original method.
        return unsafe { call_through(this) };
    };

    let app_id = || {
        // SAFETY: the slot holds the address of GetAppID on the same class.
        let get = unsafe { original::<GetAppIdFn>(&GET_APP_ID) }?;
        // SAFETY: `this` is the task group the taskbar called us with.
        let id = unsafe { get(this) };
        if id.is_null() {
            return None;
        }
        // SAFETY: GetAppID returns a NUL-terminated string owned by the group.
        unsafe { PCWSTR(id).to_string() }.ok()
    };
    let item_count = || {
        // SAFETY: the slot holds the address of GetNumItems on the same class.
        let get = unsafe { original::<GetNumItemsFn>(&GET_NUM_ITEMS) }?;
        Some(unsafe { get(this) })
    };

    match policy::shortcut_list(&ctx.icons, app_id, item_count) {
        ShortcutDecision::Suppress => ptr::null(),
        ShortcutDecision::CallThrough => unsafe { call_through(this) },
    }
}

unsafe extern "system" fn class_long_ptr_hook(hwnd: HWND, index: i32) -> usize {
    // SAFETY: the slot holds the trampoline of GetClassLongPtrW.
    let Some(call_through) = (unsafe { original::<GetClassLongPtrFn>(&GET_CLASS_LONG_PTR) }) else {
        return 0;
    };
    let decision = match CONTEXT.get() {
        Some(ctx) => policy::class_long(&ctx.icons, index, || is_explorer_window(hwnd)),
        None => ClassLongDecision::CallThrough,
    };
    match decision {
        ClassLongDecision::Substitute(icon) => icon.as_raw() as usize,
        ClassLongDecision::CallThrough => unsafe { call_through(hwnd, index) },
    }
}

unsafe extern "system" fn def_window_proc_hook(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    // SAFETY: the slot holds the trampoline of DefWindowProcW.
    let Some(call_through) = (unsafe { original::<DefWindowProcFn>(&DEF_WINDOW_PROC) }) else {
        return LRESULT(0);
    };
    let decision = match CONTEXT.get() {
        Some(ctx) => policy::icon_message(&ctx.icons, msg, wparam.0, || is_explorer_window(hwnd)),
        None => MessageDecision::CallThrough,
    };
    match decision {
        // SAFETY: only `lParam` differs, and it now carries an icon the
        // window takes ownership of.
        MessageDecision::ReplaceIcon(icon) => unsafe {
            call_through(hwnd, msg, wparam, LPARAM(icon.as_raw()))
        },
        MessageDecision::Return(icon) => LRESULT(icon.as_raw()),
        MessageDecision::CallThrough => unsafe { call_through(hwnd, msg, wparam, lparam) },
    }
}
