//! Host input, the [`Interaction`] trait and the built-in gesture state machines.
//!
//! The editor forwards every host input event to every attached interaction, in
//! attachment order. Interactions arbitrate gesture ownership through the
//! [`InteractionManager`]: a gesture that moves the viewport takes the exclusive
//! lock for its whole duration, so two gestures never write the viewBox at once.

mod manager;
mod pan;
mod zoom;

pub use manager::{
    ConcurrentToken, ExclusiveLock, InteractionManager, SelectMode, SelectionChange,
};
pub use pan::{DragCanvas, PanPhase};
pub use zoom::ZoomWheel;

use kurbo::Point;
use serde_json::Value;

use crate::commands::UpdateOptionsCommand;
use crate::editor::EditorContext;
use crate::merge::{OptionUpdate, UpdateMap};
use crate::viewport::{ViewBox, read_view_box};

/// Where a keyboard event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventTarget {
    /// The document body (no focused control).
    #[default]
    Body,
    /// An element inside the editor surface.
    Editor,
    /// A text input, textarea or content-editable element.
    TextInput,
    /// Anything else on the page.
    Outside,
}

impl EventTarget {
    /// Whether canvas shortcuts may react to keys from this target.
    pub fn accepts_shortcuts(self) -> bool {
        matches!(self, EventTarget::Body | EventTarget::Editor)
    }
}

/// A keyboard event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyEvent {
    /// Logical key value (`" "`, `"a"`, `"Control"`, ...).
    pub key: String,
    /// Physical key code (`"Space"`, `"KeyA"`, ...).
    pub code: String,
    /// Control held.
    pub ctrl: bool,
    /// Meta (command) held.
    pub meta: bool,
    /// Shift held.
    pub shift: bool,
    /// Alt held.
    pub alt: bool,
    /// Origin of the event.
    pub target: EventTarget,
}

impl KeyEvent {
    /// A Space key event with no modifiers, from the document body.
    pub fn space() -> Self {
        Self {
            key: " ".into(),
            code: "Space".into(),
            ..Self::default()
        }
    }

    /// A modifier-less event for `key`.
    pub fn key(key: &str) -> Self {
        Self {
            key: key.into(),
            code: key.into(),
            ..Self::default()
        }
    }

    /// Whether this is the Space key.
    pub fn is_space(&self) -> bool {
        self.code == "Space" || self.key == " "
    }

    /// Set the origin.
    pub fn with_target(mut self, target: EventTarget) -> Self {
        self.target = target;
        self
    }
}

/// Primary (usually left) mouse button.
pub const PRIMARY_BUTTON: i16 = 0;

/// A pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Pointer identifier; moves are matched to the pointer that went down.
    pub pointer_id: i64,
    /// Button index ([`PRIMARY_BUTTON`] for the left button).
    pub button: i16,
    /// Position in client space.
    pub client: Point,
}

impl PointerEvent {
    /// A primary-button event for pointer `pointer_id` at `(x, y)`.
    pub fn primary(pointer_id: i64, x: f64, y: f64) -> Self {
        Self {
            pointer_id,
            button: PRIMARY_BUTTON,
            client: Point::new(x, y),
        }
    }
}

/// A wheel event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelEvent {
    /// Vertical scroll amount; positive scrolls down (zoom out).
    pub delta_y: f64,
    /// Control held.
    pub ctrl: bool,
    /// Meta (command) held.
    pub meta: bool,
    /// Shift held.
    pub shift: bool,
    /// Position in client space.
    pub client: Point,
}

/// Host input forwarded to the interactions.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer entered the surface.
    PointerEnter,
    /// Pointer left the surface.
    PointerLeave,
    /// Button pressed.
    PointerDown(PointerEvent),
    /// Pointer moved.
    PointerMove(PointerEvent),
    /// Button released.
    PointerUp(PointerEvent),
    /// Pointer capture lost.
    PointerCancel(PointerEvent),
    /// Key pressed.
    KeyDown(KeyEvent),
    /// Key released.
    KeyUp(KeyEvent),
    /// Wheel scrolled.
    Wheel(WheelEvent),
    /// The window lost focus.
    WindowBlur,
}

/// An independently implemented gesture state machine.
pub trait Interaction {
    /// Stable name, used as the lock owner.
    fn name(&self) -> &'static str;

    /// Called once when the editor is built.
    fn init(&mut self, _ctx: &EditorContext) {}

    /// React to one host input event.
    fn handle(&mut self, event: &InputEvent, ctx: &EditorContext);

    /// Called once when the editor is destroyed. Must end any running gesture.
    fn destroy(&mut self, _ctx: &EditorContext) {}
}

/// The viewBox currently in effect: the option, or the host's own geometry.
pub(crate) fn current_view_box(ctx: &EditorContext) -> ViewBox {
    ctx.state
        .view_box()
        .unwrap_or_else(|| read_view_box(ctx.host.as_ref()))
}

/// Write a live (not undo-tracked) viewBox update.
pub(crate) fn apply_view_box(ctx: &EditorContext, view_box: ViewBox) {
    ctx.state
        .update_options(&UpdateMap::new().set("viewBox", Value::String(view_box.to_string())));
}

fn view_box_update(value: Option<Value>) -> UpdateMap {
    let update = match value {
        Some(value) => OptionUpdate::Set(value),
        None => OptionUpdate::Unset,
    };
    UpdateMap::new().with("viewBox", update)
}

/// Record a finished gesture as one undo step, if it moved the viewBox at all.
pub(crate) fn commit_view_box(ctx: &EditorContext, owner: &'static str, initial: Option<Value>) {
    let current = ctx.state.value_at("viewBox");
    if current == initial {
        tracing::trace!(owner, "viewBox unchanged, nothing to record");
        return;
    }
    let command = UpdateOptionsCommand::new(view_box_update(current), view_box_update(initial));
    if let Err(err) = ctx.commander.execute(Box::new(command)) {
        tracing::warn!(%err, owner, "failed to record viewBox change");
    }
}
