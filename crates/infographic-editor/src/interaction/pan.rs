//! Space-bar canvas panning.
//!
//! ```text
//!  Idle ──Space down (hovering, shortcut target)──▶ Armed ──primary down──▶ Dragging
//!   ▲                                              │  ▲                      │
//!   └────────────── Space up / window blur ────────┘  └──── up / cancel ─────┘
//! ```
//!
//! While armed the gesture owns the exclusive lock. Dragging writes the viewBox live;
//! leaving the gesture records a single undo step if the viewBox ended up different.

use kurbo::{Affine, Point};
use serde_json::Value;

use super::{
    ExclusiveLock, InputEvent, Interaction, KeyEvent, PRIMARY_BUTTON, PointerEvent,
    apply_view_box, commit_view_box, current_view_box,
};
use crate::editor::EditorContext;
use crate::host::Cursor;
use crate::viewport::{ViewBox, client_to_viewport_transform};

/// Observable phase of a [`DragCanvas`] gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanPhase {
    /// No gesture.
    Idle {
        /// Whether the pointer is over the surface.
        hovering: bool,
    },
    /// Space held, waiting for a button.
    Armed,
    /// Space held and primary button down.
    Dragging,
}

struct Gesture {
    lock: ExclusiveLock,
    initial: Option<Value>,
}

struct Drag {
    pointer_id: i64,
    start: Point,
    start_view_box: ViewBox,
    to_viewport: Affine,
}

enum PanState {
    Idle,
    Armed(Gesture),
    Dragging(Gesture, Drag),
}

/// Pans the canvas while Space is held and the primary button drags.
pub struct DragCanvas {
    hovering: bool,
    state: PanState,
}

impl Default for DragCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DragCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragCanvas")
            .field("phase", &self.phase())
            .finish()
    }
}

impl DragCanvas {
    /// Lock owner name.
    pub const NAME: &'static str = "drag-canvas";

    /// Create an idle, not-hovering instance.
    pub fn new() -> Self {
        Self {
            hovering: false,
            state: PanState::Idle,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> PanPhase {
        match self.state {
            PanState::Idle => PanPhase::Idle {
                hovering: self.hovering,
            },
            PanState::Armed(_) => PanPhase::Armed,
            PanState::Dragging(..) => PanPhase::Dragging,
        }
    }

    fn arm(&mut self, key: &KeyEvent, ctx: &EditorContext) {
        if !matches!(self.state, PanState::Idle) {
            return;
        }
        if !self.hovering || !key.target.accepts_shortcuts() {
            return;
        }
        let Some(lock) = ctx.interaction.acquire_exclusive(Self::NAME) else {
            tracing::debug!("pan not started: another gesture owns the canvas");
            return;
        };
        self.state = PanState::Armed(Gesture {
            lock,
            initial: ctx.state.value_at("viewBox"),
        });
        ctx.host.set_cursor(Cursor::Grab);
    }

    fn press(&mut self, pointer: &PointerEvent, ctx: &EditorContext) {
        if pointer.button != PRIMARY_BUTTON || !matches!(self.state, PanState::Armed(_)) {
            return;
        }
        if let PanState::Armed(gesture) = std::mem::replace(&mut self.state, PanState::Idle) {
            let drag = Drag {
                pointer_id: pointer.pointer_id,
                start: pointer.client,
                start_view_box: current_view_box(ctx),
                to_viewport: client_to_viewport_transform(ctx.host.as_ref()),
            };
            self.state = PanState::Dragging(gesture, drag);
            ctx.host.set_cursor(Cursor::Grabbing);
        }
    }

    fn drag(&self, pointer: &PointerEvent, ctx: &EditorContext) {
        let PanState::Dragging(_, drag) = &self.state else {
            return;
        };
        if pointer.pointer_id != drag.pointer_id {
            return;
        }
        let delta = drag.to_viewport * pointer.client - drag.to_viewport * drag.start;
        apply_view_box(ctx, drag.start_view_box.translate(-delta));
    }

    fn release(&mut self, pointer: &PointerEvent, ctx: &EditorContext) {
        let matches = matches!(&self.state, PanState::Dragging(_, drag) if drag.pointer_id == pointer.pointer_id);
        if !matches {
            return;
        }
        if let PanState::Dragging(gesture, _) = std::mem::replace(&mut self.state, PanState::Idle) {
            self.state = PanState::Armed(gesture);
            ctx.host.set_cursor(Cursor::Grab);
        }
    }

    fn finish(&mut self, ctx: &EditorContext) {
        let gesture = match std::mem::replace(&mut self.state, PanState::Idle) {
            PanState::Idle => return,
            PanState::Armed(gesture) | PanState::Dragging(gesture, _) => gesture,
        };
        ctx.host.set_cursor(Cursor::Default);
        let Gesture { lock, initial } = gesture;
        lock.release();
        commit_view_box(ctx, Self::NAME, initial);
    }
}

impl Interaction for DragCanvas {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(&mut self, event: &InputEvent, ctx: &EditorContext) {
        match event {
            InputEvent::PointerEnter => self.hovering = true,
            InputEvent::PointerLeave => self.hovering = false,
            InputEvent::KeyDown(key) if key.is_space() => self.arm(key, ctx),
            InputEvent::KeyUp(key) if key.is_space() => self.finish(ctx),
            InputEvent::PointerDown(pointer) => self.press(pointer, ctx),
            InputEvent::PointerMove(pointer) => self.drag(pointer, ctx),
            InputEvent::PointerUp(pointer) | InputEvent::PointerCancel(pointer) => {
                self.release(pointer, ctx)
            }
            InputEvent::WindowBlur => self.finish(ctx),
            _ => {}
        }
    }

    fn destroy(&mut self, ctx: &EditorContext) {
        self.finish(ctx);
        self.hovering = false;
    }
}
