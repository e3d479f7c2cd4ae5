use static_icon_core::classify::{CLASS_NAME_CAPACITY, is_explorer_class};

use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::GetClassNameW;

/// Whether `hwnd` is a File Explorer window (`CabinetWClass`).
///
/// Any failure to read the class name counts as "no".
pub fn is_explorer_window(hwnd: HWND) -> bool {
    let mut buf = [0u16; CLASS_NAME_CAPACITY];
    let len = unsafe { GetClassNameW(hwnd, &mut buf) };
    len > 0 && is_explorer_class(&buf[..len as usize])
}
