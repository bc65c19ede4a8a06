//! Host surface abstraction.
//!
//! The editor never talks to a DOM directly. The rendered SVG root is reached through
//! [`HostSurface`], and the rendered sub-elements the user interacts with through
//! [`ElementRef`]. Browser bindings, test doubles and offscreen renderers all
//! implement these two traits.

use kurbo::Affine;

use crate::viewport::Padding;

/// Identifier of a host node owned by a caller (selection marquee, handles, ...).
pub type NodeId = u64;

/// Role marker attribute carried by every addressable element.
pub const ROLE_ATTRIBUTE: &str = "data-element-type";

/// Dotted index path attribute carried by item-scoped elements (e.g. `"0.2"`).
pub const INDEXES_ATTRIBUTE: &str = "data-indexes";

/// Pointer cursor shown over the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Host default cursor.
    #[default]
    Default,
    /// Open hand: ready to pan.
    Grab,
    /// Closed hand: panning.
    Grabbing,
}

impl Cursor {
    /// CSS keyword for the cursor.
    pub fn as_css(self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Grab => "grab",
            Cursor::Grabbing => "grabbing",
        }
    }
}

/// The live SVG root element the editor is attached to.
///
/// All methods take `&self`: hosts are shared between the editor, the view sync
/// handlers and the interactions, and are expected to use interior mutability the
/// way a DOM node does.
pub trait HostSurface {
    /// Whether the element is attached to a live document tree.
    fn is_connected(&self) -> bool;

    /// Read an attribute.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Write an attribute.
    fn set_attribute(&self, name: &str, value: &str);

    /// Remove an attribute.
    fn remove_attribute(&self, name: &str);

    /// Current transform from SVG user space to client (screen) space.
    ///
    /// `None` when the element is not rendered.
    fn screen_ctm(&self) -> Option<Affine>;

    /// Change the pointer cursor over the surface.
    fn set_cursor(&self, cursor: Cursor);

    /// Apply a geometric inset around the rendered content.
    fn apply_padding(&self, padding: Padding);

    /// Attach a caller-owned node to the transient (scratch) layer.
    fn append_transient(&self, node: NodeId);

    /// Detach a node from the transient layer.
    fn remove_transient(&self, node: NodeId);
}

/// A rendered element that can be routed back to the options model.
pub trait ElementRef {
    /// Read an attribute of the element.
    fn attribute(&self, name: &str) -> Option<String>;
}
