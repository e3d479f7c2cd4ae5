/// Window class of File Explorer top-level windows.
pub const EXPLORER_WINDOW_CLASS: &str = "CabinetWClass";

/// Size of the buffer used to read a window's class name, in UTF-16
/// code units. Longer class names are truncated and therefore never
/// match [`EXPLORER_WINDOW_CLASS`].
pub const CLASS_NAME_CAPACITY: usize = 32;

/// Whether a class name read from a window (without the terminating
/// NUL) names an explorer window. Case-sensitive.
pub fn is_explorer_class(class_name: &[u16]) -> bool {
    class_name
        .iter()
        .copied()
        .eq(EXPLORER_WINDOW_CLASS.encode_utf16())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn matches_exact_class_name() {
        assert!(is_explorer_class(&wide("CabinetWClass")));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        assert!(!is_explorer_class(&wide("cabinetwclass")));
    }

    #[test]
    fn rejects_prefixes_and_other_classes() {
        assert!(!is_explorer_class(&wide("CabinetWClassX")));
        assert!(!is_explorer_class(&wide("Cabinet")));
        assert!(!is_explorer_class(&wide("Shell_TrayWnd")));
        assert!(!is_explorer_class(&[]));
    }

    #[test]
    fn class_name_fits_buffer() {
        assert!(EXPLORER_WINDOW_CLASS.len() < CLASS_NAME_CAPACITY);
    }
}
