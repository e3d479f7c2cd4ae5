use std::cell::Cell;

use super::*;
use crate::testing::{LARGE, SMALL, empty_store, loaded_store};

/// `WM_GETICON` / `WM_SETICON` wParam for the large icon.
const ICON_BIG: usize = 1;

// -- shortcut ID list --

#[test]
fn explorer_group_with_items_is_suppressed() {
    // Arrange
    let store = loaded_store(true);

    // Act
    let decision = shortcut_list(
        &store,
        || Some("Microsoft.Windows.Explorer".into()),
        || Some(3),
    );

    // Assert
    assert_eq!(decision, ShortcutDecision::Suppress);
}

#[test]
fn marker_may_appear_inside_longer_app_id() {
    let store = loaded_store(true);
    let decision = shortcut_list(
        &store,
        || Some("{F38BF404}\\Microsoft.Windows.Explorer!App".into()),
        || Some(1),
    );
    assert_eq!(decision, ShortcutDecision::Suppress);
}

#[test]
fn other_app_ids_call_through() {
    let store = loaded_store(true);
    let decision = shortcut_list(&store, || Some("Microsoft.WindowsTerminal".into()), || Some(1));
    assert_eq!(decision, ShortcutDecision::CallThrough);
}

#[test]
fn empty_explorer_group_calls_through() {
    let store = loaded_store(true);
    let decision = shortcut_list(
        &store,
        || Some("Microsoft.Windows.Explorer".into()),
        || Some(0),
    );
    assert_eq!(decision, ShortcutDecision::CallThrough);
}

#[test]
fn missing_item_count_counts_as_one() {
    let store = loaded_store(true);
    let decision = shortcut_list(
        &store,
        || Some("Microsoft.Windows.Explorer".into()),
        || None,
    );
    assert_eq!(decision, ShortcutDecision::Suppress);
}

#[test]
fn missing_app_id_calls_through() {
    let store = loaded_store(true);
    let decision = shortcut_list(&store, || None, || Some(1));
    assert_eq!(decision, ShortcutDecision::CallThrough);
}

#[test]
fn no_icon_calls_through_without_querying_the_group() {
    // Arrange
    let store = empty_store();
    let queried = Cell::new(false);

    // Act
    let decision = shortcut_list(
        &store,
        || {
            queried.set(true);
            Some("Microsoft.Windows.Explorer".into())
        },
        || Some(1),
    );

    // Assert
    assert_eq!(decision, ShortcutDecision::CallThrough);
    assert!(!queried.get());
}

// -- GetClassLongPtrW --

#[test]
fn class_icon_of_explorer_window_is_substituted() {
    // Arrange
    let store = loaded_store(true);

    // Act
    let large = class_long(&store, GCLP_HICON, || true);
    let small = class_long(&store, GCLP_HICONSM, || true);

    // Assert
    assert!(matches!(large, ClassLongDecision::Substitute(h) if h != LARGE));
    assert!(matches!(small, ClassLongDecision::Substitute(h) if h != SMALL));
    assert_eq!(*store.backend().duplicated.lock().unwrap(), vec![LARGE, SMALL]);
}

#[test]
fn class_small_icon_falls_back_to_large() {
    let store = loaded_store(false);

    let decision = class_long(&store, GCLP_HICONSM, || true);

    assert!(matches!(decision, ClassLongDecision::Substitute(h) if h != LARGE));
    assert_eq!(*store.backend().duplicated.lock().unwrap(), vec![LARGE]);
}

#[test]
fn class_icon_of_other_windows_calls_through() {
    let store = loaded_store(true);
    assert_eq!(
        class_long(&store, GCLP_HICON, || false),
        ClassLongDecision::CallThrough
    );
    assert_eq!(
        class_long(&store, GCLP_HICONSM, || false),
        ClassLongDecision::CallThrough
    );
    assert!(store.backend().duplicated.lock().unwrap().is_empty());
}

#[test]
fn other_class_indices_never_classify_the_window() {
    // Arrange
    let store = loaded_store(true);
    let classified = Cell::new(false);

    // Act
    // GCLP_WNDPROC, GCL_STYLE, GCLP_HCURSOR
    for index in [-24, -26, -12] {
        let decision = class_long(&store, index, || {
            classified.set(true);
            true
        });
        assert_eq!(decision, ClassLongDecision::CallThrough);
    }

    // Assert
    assert!(!classified.get());
}

#[test]
fn class_icon_without_loaded_icon_calls_through() {
    let store = empty_store();
    assert_eq!(
        class_long(&store, GCLP_HICON, || true),
        ClassLongDecision::CallThrough
    );
}

// -- DefWindowProcW --

#[test]
fn get_icon_returns_copy_for_explorer_window() {
    // Arrange
    let store = loaded_store(true);

    // Act
    let big = icon_message(&store, WM_GETICON, ICON_BIG, || true);
    let small = icon_message(&store, WM_GETICON, ICON_SMALL, || true);
    let small2 = icon_message(&store, WM_GETICON, ICON_SMALL2, || true);

    // Assert
    assert!(matches!(big, MessageDecision::Return(_)));
    assert!(matches!(small, MessageDecision::Return(_)));
    assert!(matches!(small2, MessageDecision::Return(_)));
    assert_eq!(
        *store.backend().duplicated.lock().unwrap(),
        vec![LARGE, SMALL, SMALL]
    );
}

#[test]
fn get_small_icon_with_only_large_loaded_returns_distinct_large_copy() {
    let store = loaded_store(false);

    let decision = icon_message(&store, WM_GETICON, ICON_SMALL2, || true);

    let MessageDecision::Return(copy) = decision else {
        panic!("expected a copy, got {decision:?}");
    };
    assert_ne!(copy, LARGE);
    assert_eq!(*store.backend().duplicated.lock().unwrap(), vec![LARGE]);
}

#[test]
fn set_icon_replaces_argument() {
    let store = loaded_store(true);

    let decision = icon_message(&store, WM_SETICON, ICON_BIG, || true);

    assert!(matches!(decision, MessageDecision::ReplaceIcon(h) if h != LARGE));
}

#[test]
fn icon_messages_for_other_windows_call_through() {
    let store = loaded_store(true);
    for msg in [WM_SETICON, WM_GETICON] {
        for wparam in [ICON_SMALL, ICON_BIG, ICON_SMALL2] {
            assert_eq!(
                icon_message(&store, msg, wparam, || false),
                MessageDecision::CallThrough
            );
        }
    }
    assert!(store.backend().duplicated.lock().unwrap().is_empty());
}

#[test]
fn unrelated_messages_never_classify_the_window() {
    // Arrange
    let store = loaded_store(true);
    let classified = Cell::new(false);

    // Act
    // WM_PAINT, WM_NCCALCSIZE, WM_SETTEXT
    for msg in [0x000F, 0x0083, 0x000C] {
        let decision = icon_message(&store, msg, ICON_BIG, || {
            classified.set(true);
            true
        });
        assert_eq!(decision, MessageDecision::CallThrough);
    }

    // Assert
    assert!(!classified.get());
}

#[test]
fn icon_messages_without_loaded_icon_call_through() {
    let store = empty_store();
    assert_eq!(
        icon_message(&store, WM_GETICON, ICON_BIG, || true),
        MessageDecision::CallThrough
    );
}

#[test]
fn small_request_codes() {
    assert!(is_small_icon_request(ICON_SMALL));
    assert!(is_small_icon_request(ICON_SMALL2));
    assert!(!is_small_icon_request(ICON_BIG));
    assert!(!is_small_icon_request(7));
}
