//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::commands::DEFAULT_MAX_HISTORY;
use crate::editor::EditorError;

/// Which built-in interactions the editor attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionFlags {
    /// Space-bar canvas panning ([`DragCanvas`](crate::DragCanvas)).
    pub drag_canvas: bool,
    /// Modifier + wheel zooming ([`ZoomWheel`](crate::ZoomWheel)).
    pub zoom_wheel: bool,
}

impl Default for InteractionFlags {
    fn default() -> Self {
        Self {
            drag_canvas: true,
            zoom_wheel: true,
        }
    }
}

/// Editor configuration.
///
/// Every field has a default, so partial JSON is accepted:
///
/// ```rust
/// use infographic_editor::EditorConfig;
///
/// let config = EditorConfig::from_json(r#"{ "max_view_box_size": 2000 }"#).unwrap();
/// assert_eq!(config.max_view_box_size, 2000.0);
/// assert_eq!(config.zoom_ratio, 1.1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Smallest viewBox width/height a zoom may produce.
    pub min_view_box_size: f64,
    /// Largest viewBox width/height a zoom may produce.
    pub max_view_box_size: f64,
    /// Multiplicative step of one wheel notch.
    pub zoom_ratio: f64,
    /// Undo stack bound.
    pub max_history: usize,
    /// Built-in interactions.
    pub interactions: InteractionFlags,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_view_box_size: 1.0,
            max_view_box_size: 100_000.0,
            zoom_ratio: 1.1,
            max_history: DEFAULT_MAX_HISTORY,
            interactions: InteractionFlags::default(),
        }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the numeric fields for consistency.
    pub fn validate(&self) -> Result<(), EditorError> {
        let invalid = |reason: &str| Err(EditorError::InvalidConfig(reason.to_string()));
        if !self.min_view_box_size.is_finite() || self.min_view_box_size <= 0.0 {
            return invalid("min_view_box_size must be a positive number");
        }
        if self.max_view_box_size.is_nan() || self.max_view_box_size < self.min_view_box_size {
            return invalid("max_view_box_size must not be below min_view_box_size");
        }
        if !self.zoom_ratio.is_finite() || self.zoom_ratio <= 1.0 {
            return invalid("zoom_ratio must be greater than 1");
        }
        if self.max_history == 0 {
            return invalid("max_history must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.min_view_box_size, 1.0);
        assert_eq!(config.max_view_box_size, 100_000.0);
        assert_eq!(config.max_history, 1000);
        assert!(config.interactions.drag_canvas && config.interactions.zoom_wheel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = EditorConfig::from_json(r#"{ "interactions": { "zoom_wheel": false } }"#).unwrap();
        assert!(config.interactions.drag_canvas);
        assert!(!config.interactions.zoom_wheel);
    }

    #[test]
    fn test_rejects_inconsistent_bounds() {
        let err = EditorConfig::from_json(r#"{ "min_view_box_size": 10, "max_view_box_size": 5 }"#).unwrap_err();
        assert!(matches!(err, EditorError::InvalidConfig(_)));
        assert!(matches!(
            EditorConfig::from_json("{ not json").unwrap_err(),
            EditorError::Config(_)
        ));
    }
}
