//! Viewport geometry: viewBox, padding and client/viewport coordinate transforms.
//!
//! # Coordinate spaces
//!
//! - **Client space**: pointer coordinates reported by the host (CSS pixels).
//! - **Viewport space**: SVG user space, the space the `viewBox` is expressed in.
//!
//! The host reports the current user-to-client transform through
//! [`HostSurface::screen_ctm`]. Converting a client point into viewport space applies
//! its inverse.
//!
//! # Example
//!
//! ```rust
//! use infographic_editor::ViewBox;
//!
//! let view_box: ViewBox = "0 0 200 100".parse().unwrap();
//! assert_eq!(view_box.center().x, 100.0);
//! assert_eq!(view_box.to_string(), "0 0 200 100");
//! ```

use std::fmt;
use std::str::FromStr;

use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::HostSurface;

/// The SVG coordinate window mapping user space to the rendered viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewBox {
    /// Left edge in user space.
    pub x: f64,
    /// Top edge in user space.
    pub y: f64,
    /// Width in user units.
    pub width: f64,
    /// Height in user units.
    pub height: f64,
}

/// Error returned when a viewBox string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid viewBox `{0}`: expected four numbers")]
pub struct ParseViewBoxError(pub String);

impl ViewBox {
    /// Create a viewBox.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The window as a rectangle.
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Shift the window by `delta` user units.
    pub fn translate(&self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    /// Scale the window by `factor` keeping `pivot` fixed.
    ///
    /// `factor > 1` widens the window (zoom out), `factor < 1` narrows it (zoom in).
    pub fn scale_about(&self, pivot: Point, factor: f64) -> Self {
        Self::new(
            pivot.x - (pivot.x - self.x) * factor,
            pivot.y - (pivot.y - self.y) * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// Whether both dimensions lie inside `[min, max]`.
    pub fn fits_within(&self, min: f64, max: f64) -> bool {
        (min..=max).contains(&self.width) && (min..=max).contains(&self.height)
    }
}

impl fmt::Display for ViewBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for ViewBox {
    type Err = ParseViewBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let numbers: Vec<f64> = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .map(str::parse::<f64>)
            .collect::<Result<_, _>>()
            .map_err(|_| ParseViewBoxError(s.to_string()))?;

        match numbers.as_slice() {
            &[x, y, width, height] if numbers.iter().all(|n| n.is_finite()) => {
                Ok(Self::new(x, y, width, height))
            }
            _ => Err(ParseViewBoxError(s.to_string())),
        }
    }
}

/// Four-side inset applied around the rendered content.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Padding {
    /// Top inset.
    pub top: f64,
    /// Right inset.
    pub right: f64,
    /// Bottom inset.
    pub bottom: f64,
    /// Left inset.
    pub left: f64,
}

impl Padding {
    /// Same inset on all four sides.
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Normalize an options value.
    ///
    /// Accepts a number, or an array using the CSS shorthand forms
    /// `[all]`, `[vertical, horizontal]`, `[top, horizontal, bottom]` and
    /// `[top, right, bottom, left]`. Anything else yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::uniform),
            Value::Array(parts) => {
                let sides: Vec<f64> = parts.iter().map(Value::as_f64).collect::<Option<_>>()?;
                match sides.as_slice() {
                    &[all] => Some(Self::uniform(all)),
                    &[vertical, horizontal] => Some(Self {
                        top: vertical,
                        right: horizontal,
                        bottom: vertical,
                        left: horizontal,
                    }),
                    &[top, horizontal, bottom] => Some(Self {
                        top,
                        right: horizontal,
                        bottom,
                        left: horizontal,
                    }),
                    &[top, right, bottom, left] => Some(Self {
                        top,
                        right,
                        bottom,
                        left,
                    }),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

fn current_ctm(host: &dyn HostSurface) -> Affine {
    host.screen_ctm()
        .filter(|ctm| ctm.determinant().abs() > f64::EPSILON)
        .unwrap_or(Affine::IDENTITY)
}

/// Inverse of the host's current transform (client space to viewport space).
pub fn client_to_viewport_transform(host: &dyn HostSurface) -> Affine {
    current_ctm(host).inverse()
}

/// Convert a client-space point into viewport (SVG user) space.
pub fn client_to_viewport(host: &dyn HostSurface, point: Point) -> Point {
    client_to_viewport_transform(host) * point
}

/// Convert a viewport-space point into client space.
pub fn viewport_to_client(host: &dyn HostSurface, point: Point) -> Point {
    current_ctm(host) * point
}

/// Read the effective viewBox of the host.
///
/// Falls back to `0 0 width height` from the `width`/`height` attributes when the
/// `viewBox` attribute is absent or malformed.
pub fn read_view_box(host: &dyn HostSurface) -> ViewBox {
    if let Some(raw) = host.attribute("viewBox") {
        match raw.parse::<ViewBox>() {
            Ok(view_box) => return view_box,
            Err(err) => tracing::warn!(%err, "ignoring malformed viewBox attribute"),
        }
    }

    let dimension = |name: &str| {
        host.attribute(name)
            .and_then(|v| v.trim().trim_end_matches("px").parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    ViewBox::new(0.0, 0.0, dimension("width"), dimension("height"))
}
