//! Space-bar panning: state transitions, cursor feedback, lock ownership and undo grouping.

mod common;

use common::*;
use infographic_editor::{
    Cursor, EditorConfig, EventTarget, InputEvent, KeyEvent, PointerEvent,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn options() -> serde_json::Value {
    json!({ "viewBox": "0 0 100 100" })
}

#[test]
fn test_drag_gesture_records_one_undo_step() {
    let host = MockHost::scaled(2.0);
    let mut editor = editor_with(&host, options(), EditorConfig::default());
    assert_eq!(host.view_box_attr().as_deref(), Some("0 0 100 100"));

    editor.dispatch(&InputEvent::PointerEnter);
    editor.dispatch(&space_down());
    assert_eq!(host.last_cursor(), Some(Cursor::Grab));
    assert_eq!(editor.interaction().exclusive_owner(), Some("drag-canvas"));

    editor.dispatch(&down(10.0, 10.0));
    assert_eq!(host.last_cursor(), Some(Cursor::Grabbing));

    // Client deltas are halved by the inverse of the 2x transform.
    editor.dispatch(&move_to(30.0, 50.0));
    assert_eq!(host.view_box_attr().as_deref(), Some("-10 -20 100 100"));
    editor.dispatch(&move_to(50.0, 10.0));
    assert_eq!(host.view_box_attr().as_deref(), Some("-20 0 100 100"));
    assert_eq!(editor.commander().undo_depth(), 0);

    editor.dispatch(&up(50.0, 10.0));
    assert_eq!(host.last_cursor(), Some(Cursor::Grab));
    editor.dispatch(&space_up());
    assert_eq!(host.last_cursor(), Some(Cursor::Default));
    assert_eq!(editor.interaction().exclusive_owner(), None);

    assert_eq!(editor.commander().undo_depth(), 1);
    assert_eq!(
        editor.commander().peek_undo(),
        Some(json!({
            "type": "update-options",
            "options": { "viewBox": "-20 0 100 100" },
            "previous": { "viewBox": "0 0 100 100" }
        }))
    );

    editor.undo().unwrap();
    assert_eq!(host.view_box_attr().as_deref(), Some("0 0 100 100"));
    editor.redo().unwrap();
    assert_eq!(host.view_box_attr().as_deref(), Some("-20 0 100 100"));
}

#[test]
fn test_gesture_that_returns_home_records_nothing() {
    let host = MockHost::new();
    let mut editor = editor_with(&host, options(), EditorConfig::default());

    editor.dispatch(&InputEvent::PointerEnter);
    editor.dispatch(&space_down());
    editor.dispatch(&down(0.0, 0.0));
    editor.dispatch(&move_to(25.0, 25.0));
    editor.dispatch(&move_to(0.0, 0.0));
    editor.dispatch(&up(0.0, 0.0));
    editor.dispatch(&space_up());

    assert_eq!(editor.commander().undo_depth(), 0);
    assert_eq!(host.view_box_attr().as_deref(), Some("0 0 100 100"));
}

#[test]
fn test_space_requires_hover_and_shortcut_target() {
    let host = MockHost::new();
    let mut editor = editor_with(&host, options(), EditorConfig::default());

    editor.dispatch(&space_down());
    assert_eq!(editor.interaction().exclusive_owner(), None);

    editor.dispatch(&InputEvent::PointerEnter);
    editor.dispatch(&InputEvent::KeyDown(
        KeyEvent::space().with_target(EventTarget::TextInput),
    ));
    assert_eq!(editor.interaction().exclusive_owner(), None);
    assert!(host.cursors.borrow().is_empty());

    editor.dispatch(&InputEvent::KeyDown(
        KeyEvent::space().with_target(EventTarget::Editor),
    ));
    assert_eq!(editor.interaction().exclusive_owner(), Some("drag-canvas"));
}

#[test]
fn test_other_pointers_and_buttons_are_ignored() {
    let host = MockHost::new();
    let mut editor = editor_with(&host, options(), EditorConfig::default());
    editor.dispatch(&InputEvent::PointerEnter);
    editor.dispatch(&space_down());

    let mut secondary = PointerEvent::primary(1, 0.0, 0.0);
    secondary.button = 2;
    editor.dispatch(&InputEvent::PointerDown(secondary));
    assert_eq!(host.last_cursor(), Some(Cursor::Grab));

    editor.dispatch(&down(0.0, 0.0));
    editor.dispatch(&InputEvent::PointerMove(PointerEvent::primary(7, 40.0, 40.0)));
    assert_eq!(host.view_box_attr().as_deref(), Some("0 0 100 100"));
}

#[test]
fn test_window_blur_ends_drag_and_commits() {
    let host = MockHost::new();
    let mut editor = editor_with(&host, options(), EditorConfig::default());
    editor.dispatch(&InputEvent::PointerEnter);
    editor.dispatch(&space_down());
    editor.dispatch(&down(0.0, 0.0));
    editor.dispatch(&move_to(5.0, 0.0));

    editor.dispatch(&InputEvent::WindowBlur);

    assert_eq!(host.last_cursor(), Some(Cursor::Default));
    assert_eq!(editor.interaction().exclusive_owner(), None);
    assert_eq!(editor.commander().undo_depth(), 1);
    assert_eq!(editor.state().value_at("viewBox"), Some(json!("-5 0 100 100")));

    // Moves after the gesture ended do nothing.
    editor.dispatch(&move_to(50.0, 50.0));
    assert_eq!(host.view_box_attr().as_deref(), Some("-5 0 100 100"));
}

#[test]
fn test_pan_blocks_wheel_zoom() {
    let host = MockHost::new();
    let mut editor = editor_with(&host, options(), EditorConfig::default());
    editor.dispatch(&InputEvent::PointerEnter);
    editor.dispatch(&space_down());

    editor.dispatch(&shift_wheel(-100.0));
    assert_eq!(host.view_box_attr().as_deref(), Some("0 0 100 100"));

    editor.dispatch(&space_up());
    editor.dispatch(&shift_wheel(100.0));
    assert_ne!(host.view_box_attr().as_deref(), Some("0 0 100 100"));
}

#[test]
fn test_pan_without_view_box_option_falls_back_to_host_size() {
    let host = MockHost::new();
    host.attributes
        .borrow_mut()
        .insert("width".into(), "200px".into());
    host.attributes
        .borrow_mut()
        .insert("height".into(), "100".into());
    let mut editor = editor_with(&host, json!({}), EditorConfig::default());

    editor.dispatch(&InputEvent::PointerEnter);
    editor.dispatch(&space_down());
    editor.dispatch(&down(0.0, 0.0));
    editor.dispatch(&move_to(-10.0, 0.0));
    editor.dispatch(&up(-10.0, 0.0));
    editor.dispatch(&space_up());

    assert_eq!(host.view_box_attr().as_deref(), Some("10 0 200 100"));
    editor.undo().unwrap();
    assert_eq!(editor.state().value_at("viewBox"), None);
    assert_eq!(host.view_box_attr(), None);
}
