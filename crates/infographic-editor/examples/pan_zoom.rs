//! Pan and zoom example
//!
//! Drives the built-in gestures against an in-memory host and walks the history.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use infographic_editor::{
    Cursor, Editor, EditorConfig, HostSurface, InputEvent, KeyEvent, NodeId, Padding,
    PointerEvent, WheelEvent,
};
use kurbo::{Affine, Point};
use serde_json::json;

#[derive(Default)]
struct PrintingHost {
    attributes: RefCell<HashMap<String, String>>,
}

impl HostSurface for PrintingHost {
    fn is_connected(&self) -> bool {
        true
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        println!("  set {name}=\"{value}\"");
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&self, name: &str) {
        println!("  remove {name}");
        self.attributes.borrow_mut().remove(name);
    }

    fn screen_ctm(&self) -> Option<Affine> {
        Some(Affine::scale(2.0))
    }

    fn set_cursor(&self, cursor: Cursor) {
        println!("  cursor: {}", cursor.as_css());
    }

    fn apply_padding(&self, padding: Padding) {
        println!("  padding: {padding:?}");
    }

    fn append_transient(&self, _node: NodeId) {}

    fn remove_transient(&self, _node: NodeId) {}
}

fn main() {
    let host: Rc<dyn HostSurface> = Rc::new(PrintingHost::default());

    println!("1. Build editor:");
    let mut editor = Editor::new(
        host,
        json!({ "viewBox": "0 0 400 300", "padding": 12 }),
        EditorConfig::default(),
    )
    .expect("host is connected");
    editor.events().subscribe(|event| println!("  event: {}", event.topic()));

    println!("\n2. Space + drag:");
    editor.dispatch(&InputEvent::PointerEnter);
    editor.dispatch(&InputEvent::KeyDown(KeyEvent::space()));
    editor.dispatch(&InputEvent::PointerDown(PointerEvent::primary(1, 100.0, 100.0)));
    editor.dispatch(&InputEvent::PointerMove(PointerEvent::primary(1, 160.0, 140.0)));
    editor.dispatch(&InputEvent::PointerUp(PointerEvent::primary(1, 160.0, 140.0)));
    editor.dispatch(&InputEvent::KeyUp(KeyEvent::space()));

    println!("\n3. Ctrl + wheel:");
    for _ in 0..2 {
        editor.dispatch(&InputEvent::Wheel(WheelEvent {
            delta_y: -120.0,
            ctrl: true,
            client: Point::new(400.0, 300.0),
            ..WheelEvent::default()
        }));
    }
    editor.dispatch(&InputEvent::KeyUp(KeyEvent::key("Control")));

    println!("\n4. History: {:?}", editor.commander().history_state());
    while editor.undo().is_ok() {}
    println!(
        "   after undo: viewBox = {:?}",
        editor.state().value_at("viewBox")
    );

    editor.destroy();
}
