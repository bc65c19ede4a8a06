//! In-memory host doubles shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use infographic_editor::{
    Cursor, Editor, EditorConfig, EditorEvent, ElementRef, HostSurface, InputEvent, KeyEvent,
    NodeId, Padding, PointerEvent, WheelEvent,
};
use kurbo::{Affine, Point};
use serde_json::Value;

/// A fake SVG root with recorded side effects.
#[derive(Debug, Default)]
pub struct MockHost {
    pub connected: Cell<bool>,
    pub attributes: RefCell<HashMap<String, String>>,
    pub cursors: RefCell<Vec<Cursor>>,
    pub paddings: RefCell<Vec<Padding>>,
    pub transients: RefCell<Vec<NodeId>>,
    pub ctm: Cell<Option<Affine>>,
}

impl MockHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            connected: Cell::new(true),
            ..Self::default()
        })
    }

    pub fn detached() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Host whose user space is scaled by `scale` into client space.
    pub fn scaled(scale: f64) -> Rc<Self> {
        let host = Self::new();
        host.ctm.set(Some(Affine::scale(scale)));
        host
    }

    pub fn view_box_attr(&self) -> Option<String> {
        self.attributes.borrow().get("viewBox").cloned()
    }

    pub fn last_cursor(&self) -> Option<Cursor> {
        self.cursors.borrow().last().copied()
    }
}

impl HostSurface for MockHost {
    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&self, name: &str) {
        self.attributes.borrow_mut().remove(name);
    }

    fn screen_ctm(&self) -> Option<Affine> {
        self.ctm.get()
    }

    fn set_cursor(&self, cursor: Cursor) {
        self.cursors.borrow_mut().push(cursor);
    }

    fn apply_padding(&self, padding: Padding) {
        self.paddings.borrow_mut().push(padding);
    }

    fn append_transient(&self, node: NodeId) {
        self.transients.borrow_mut().push(node);
    }

    fn remove_transient(&self, node: NodeId) {
        self.transients.borrow_mut().retain(|&n| n != node);
    }
}

/// A rendered element carrying role and index markers.
#[derive(Debug, Default, Clone)]
pub struct MockElement {
    attributes: HashMap<String, String>,
}

impl MockElement {
    pub fn new(role: &str) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("data-element-type".to_string(), role.to_string());
        Self { attributes }
    }

    pub fn with_indexes(mut self, indexes: &str) -> Self {
        self.attributes
            .insert("data-indexes".to_string(), indexes.to_string());
        self
    }
}

impl ElementRef for MockElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }
}

pub fn editor_with(host: &Rc<MockHost>, options: Value, config: EditorConfig) -> Editor {
    let host: Rc<dyn HostSurface> = host.clone();
    Editor::new(host, options, config).expect("editor builds")
}

/// Records every event topic seen on the editor's bus.
pub fn record_topics(editor: &Editor) -> Rc<RefCell<Vec<&'static str>>> {
    let topics = Rc::new(RefCell::new(Vec::new()));
    let sink = topics.clone();
    editor
        .events()
        .subscribe(move |event: &EditorEvent| sink.borrow_mut().push(event.topic()));
    topics
}

pub fn space_down() -> InputEvent {
    InputEvent::KeyDown(KeyEvent::space())
}

pub fn space_up() -> InputEvent {
    InputEvent::KeyUp(KeyEvent::space())
}

pub fn down(x: f64, y: f64) -> InputEvent {
    InputEvent::PointerDown(PointerEvent::primary(1, x, y))
}

pub fn move_to(x: f64, y: f64) -> InputEvent {
    InputEvent::PointerMove(PointerEvent::primary(1, x, y))
}

pub fn up(x: f64, y: f64) -> InputEvent {
    InputEvent::PointerUp(PointerEvent::primary(1, x, y))
}

pub fn shift_wheel(delta_y: f64) -> InputEvent {
    InputEvent::Wheel(WheelEvent {
        delta_y,
        shift: true,
        ..WheelEvent::default()
    })
}

pub fn ctrl_wheel(delta_y: f64, x: f64, y: f64) -> InputEvent {
    InputEvent::Wheel(WheelEvent {
        delta_y,
        ctrl: true,
        client: Point::new(x, y),
        ..WheelEvent::default()
    })
}

/// Releasing the last modifier key.
pub fn modifiers_released() -> InputEvent {
    InputEvent::KeyUp(KeyEvent::key("Shift"))
}
