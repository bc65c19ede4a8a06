//! Modifier + wheel zooming.
//!
//! A burst of qualifying wheel events is applied live and recorded as one undo
//! step once every zoom modifier is released (or the window loses focus).

use serde_json::Value;

use super::{
    ExclusiveLock, InputEvent, Interaction, WheelEvent, apply_view_box, commit_view_box,
    current_view_box,
};
use crate::editor::EditorContext;
use crate::viewport::client_to_viewport;

struct Burst {
    lock: ExclusiveLock,
    initial: Option<Value>,
}

/// Zooms the viewBox with Ctrl/Meta + wheel (about the pointer) or Shift + wheel
/// (about the viewBox center).
#[derive(Default)]
pub struct ZoomWheel {
    burst: Option<Burst>,
}

impl std::fmt::Debug for ZoomWheel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoomWheel")
            .field("in_burst", &self.burst.is_some())
            .finish()
    }
}

impl ZoomWheel {
    /// Lock owner name.
    pub const NAME: &'static str = "zoom-wheel";

    /// Create an instance with no burst in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a zoom burst is waiting to be recorded.
    pub fn in_burst(&self) -> bool {
        self.burst.is_some()
    }

    fn zoom(&mut self, wheel: &WheelEvent, ctx: &EditorContext) {
        let pointer_modifier = wheel.ctrl || wheel.meta;
        if wheel.delta_y == 0.0 || pointer_modifier == wheel.shift {
            if pointer_modifier && wheel.shift {
                tracing::trace!("reset gesture is not handled by wheel zoom");
            }
            return;
        }

        let config = &ctx.config;
        let factor = if wheel.delta_y > 0.0 {
            config.zoom_ratio
        } else {
            config.zoom_ratio.recip()
        };
        let current = current_view_box(ctx);
        let pivot = if wheel.shift {
            current.center()
        } else {
            client_to_viewport(ctx.host.as_ref(), wheel.client)
        };
        let next = current.scale_about(pivot, factor);
        if !next.fits_within(config.min_view_box_size, config.max_view_box_size) {
            tracing::debug!(view_box = %next, "zoom rejected: viewBox out of bounds");
            return;
        }

        if self.burst.is_none() {
            let Some(lock) = ctx.interaction.acquire_exclusive(Self::NAME) else {
                tracing::debug!("zoom dropped: another gesture owns the canvas");
                return;
            };
            self.burst = Some(Burst {
                lock,
                initial: ctx.state.value_at("viewBox"),
            });
        }
        apply_view_box(ctx, next);
    }

    fn commit(&mut self, ctx: &EditorContext) {
        if let Some(Burst { lock, initial }) = self.burst.take() {
            lock.release();
            commit_view_box(ctx, Self::NAME, initial);
        }
    }
}

impl Interaction for ZoomWheel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(&mut self, event: &InputEvent, ctx: &EditorContext) {
        match event {
            InputEvent::Wheel(wheel) => self.zoom(wheel, ctx),
            InputEvent::KeyUp(key) if !(key.ctrl || key.meta || key.shift) => self.commit(ctx),
            InputEvent::WindowBlur => self.commit(ctx),
            _ => {}
        }
    }

    fn destroy(&mut self, ctx: &EditorContext) {
        self.commit(ctx);
    }
}
