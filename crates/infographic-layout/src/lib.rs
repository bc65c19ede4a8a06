#![warn(missing_docs)]
//! `infographic-layout` - geometric layout helpers for infographic rendering.
//!
//! The crate is intentionally small and dependency-free. It currently provides the
//! one-dimensional label declutter used by radial and pie templates: labels are
//! positioned along one axis at their "ideal" coordinate and then relaxed so that
//! no two labels overlap while staying inside a bounded band.
//!
//! # Example
//!
//! ```rust
//! use infographic_layout::{LabelItem, distribute_labels};
//!
//! let labels = vec![
//!     LabelItem::new(10.0, 12.0, "a"),
//!     LabelItem::new(12.0, 12.0, "b"),
//! ];
//!
//! let placed = distribute_labels(&labels, 4.0, 0.0, 100.0);
//! assert_eq!(placed[0].y, 10.0);
//! assert_eq!(placed[1].y, 26.0);
//! ```

/// Comparison tolerance used by the sweeps.
///
/// A second run over an already-relaxed layout must not move anything, so values
/// that only differ by floating-point noise are treated as satisfying a constraint.
pub const LAYOUT_EPSILON: f64 = 1e-9;

/// A label positioned along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelItem<T> {
    /// Center coordinate along the layout axis.
    pub y: f64,
    /// Extent of the label along the layout axis.
    pub height: f64,
    /// Caller data carried through the layout untouched.
    pub payload: T,
}

impl<T> LabelItem<T> {
    /// Create a label centered at `y`.
    pub fn new(y: f64, height: f64, payload: T) -> Self {
        Self { y, height, payload }
    }

    /// Near edge (`y - height / 2`).
    pub fn top(&self) -> f64 {
        self.y - self.height / 2.0
    }

    /// Far edge (`y + height / 2`).
    pub fn bottom(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// Minimum center-to-center distance between two adjacent labels.
fn min_gap<T>(a: &LabelItem<T>, b: &LabelItem<T>, spacing: f64) -> f64 {
    a.height / 2.0 + b.height / 2.0 + spacing
}

/// Reposition labels so adjacent labels keep at least `spacing` between their edges
/// while staying inside `[min_y, max_y]`.
///
/// The input is never modified; the result is a new list of cloned items sorted by `y`.
///
/// The relaxation runs in bounded passes:
///
/// 1. a forward sweep pushes each overlapping label below its predecessor;
/// 2. if the last label overflows `max_y`, it is clamped and a backward sweep pulls
///    the chain up;
/// 3. if the first label now overflows `min_y`, the labels are either evenly
///    compressed into the band (when the band is too small for the required span)
///    or clamped to `min_y` and swept forward once more.
///
/// When the band is too small, spacing shrinks (never below zero) instead of failing.
/// Non-finite coordinates, negative spacing and inverted bounds are accepted; the
/// result keeps the input length but positions are unspecified in those cases.
///
/// Running the function again on its own output with the same arguments returns the
/// same positions.
pub fn distribute_labels<T: Clone>(
    items: &[LabelItem<T>],
    spacing: f64,
    min_y: f64,
    max_y: f64,
) -> Vec<LabelItem<T>> {
    let mut labels: Vec<LabelItem<T>> = items.to_vec();
    if labels.len() < 2 {
        return labels;
    }

    labels.sort_by(|a, b| a.y.total_cmp(&b.y));

    forward_sweep(&mut labels, spacing);

    if let Some(last) = labels.last_mut()
        && last.bottom() > max_y + LAYOUT_EPSILON
    {
        last.y = max_y - last.height / 2.0;
        backward_sweep(&mut labels, spacing);
    }

    if labels[0].top() < min_y - LAYOUT_EPSILON {
        let heights: f64 = labels.iter().map(|l| l.height).sum();
        let gaps = (labels.len() - 1) as f64;
        let required = heights + spacing * gaps;
        let available = max_y - min_y;

        if available < required {
            compress(&mut labels, min_y, ((available - heights) / gaps).max(0.0));
        } else {
            labels[0].y = min_y + labels[0].height / 2.0;
            forward_sweep(&mut labels, spacing);
        }
    }

    labels
}

fn forward_sweep<T>(labels: &mut [LabelItem<T>], spacing: f64) {
    for i in 1..labels.len() {
        let min = labels[i - 1].y + min_gap(&labels[i - 1], &labels[i], spacing);
        if labels[i].y < min - LAYOUT_EPSILON {
            labels[i].y = min;
        }
    }
}

fn backward_sweep<T>(labels: &mut [LabelItem<T>], spacing: f64) {
    for i in (0..labels.len() - 1).rev() {
        let max = labels[i + 1].y - min_gap(&labels[i], &labels[i + 1], spacing);
        if labels[i].y > max + LAYOUT_EPSILON {
            labels[i].y = max;
        }
    }
}

// Evenly stacks the labels from `min_y` with a fixed edge gap.
fn compress<T>(labels: &mut [LabelItem<T>], min_y: f64, gap: f64) {
    let mut cursor = min_y;
    for label in labels.iter_mut() {
        label.y = cursor + label.height / 2.0;
        cursor += label.height + gap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(ys: &[f64], height: f64) -> Vec<LabelItem<usize>> {
        ys.iter()
            .enumerate()
            .map(|(i, &y)| LabelItem::new(y, height, i))
            .collect()
    }

    #[test]
    fn test_empty_and_single() {
        let empty: Vec<LabelItem<usize>> = Vec::new();
        assert!(distribute_labels(&empty, 2.0, 0.0, 100.0).is_empty());

        let single = items(&[-50.0], 10.0);
        let out = distribute_labels(&single, 2.0, 0.0, 100.0);
        assert_eq!(out, single);
    }

    #[test]
    fn test_non_overlapping_unchanged() {
        let input = items(&[40.0, 10.0, 70.0], 10.0);
        let out = distribute_labels(&input, 2.0, 0.0, 100.0);
        let ys: Vec<f64> = out.iter().map(|l| l.y).collect();
        assert_eq!(ys, vec![10.0, 40.0, 70.0]);
        assert_eq!(out[0].payload, 1);
        // input untouched
        assert_eq!(input[0].y, 40.0);
    }

    #[test]
    fn test_forward_push() {
        let input = items(&[10.0, 11.0, 12.0], 10.0);
        let out = distribute_labels(&input, 2.0, 0.0, 100.0);
        let ys: Vec<f64> = out.iter().map(|l| l.y).collect();
        assert_eq!(ys, vec![10.0, 22.0, 34.0]);
    }

    #[test]
    fn test_backward_pull_at_max() {
        let input = items(&[90.0, 92.0], 10.0);
        let out = distribute_labels(&input, 2.0, 0.0, 100.0);
        assert_eq!(out[1].y, 95.0);
        assert_eq!(out[0].y, 83.0);
    }

    #[test]
    fn test_compression_when_band_too_small() {
        let input = items(&[50.0, 50.0, 50.0, 50.0], 10.0);
        let out = distribute_labels(&input, 10.0, 0.0, 40.0);
        let ys: Vec<f64> = out.iter().map(|l| l.y).collect();
        assert_eq!(ys, vec![5.0, 15.0, 25.0, 35.0]);
    }

    #[test]
    fn test_clamp_to_min_when_span_fits() {
        let input = items(&[-20.0, -18.0], 10.0);
        let out = distribute_labels(&input, 2.0, 0.0, 100.0);
        assert_eq!(out[0].y, 5.0);
        assert_eq!(out[1].y, 17.0);
    }

    #[test]
    fn test_nan_does_not_panic() {
        let input = items(&[f64::NAN, 10.0, f64::INFINITY, 12.0], 10.0);
        let out = distribute_labels(&input, 2.0, 0.0, 100.0);
        assert_eq!(out.len(), 4);
    }
}
