//! Pure box arithmetic for resizing and cropping.
//!
//! All functions here are pure and testable without any I/O or images.
//! Resizers call into this module to decide *what* box to ask the backend
//! for; the backend only ever receives final, already-computed dimensions.

use crate::format::InvalidFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width × height in pixels.
///
/// A value type: every transformation returns a new `Dimensions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Scale both sides by `ratio`, rounding to the nearest pixel.
    ///
    /// Sides never drop below 1px.
    pub fn scale(self, ratio: f64) -> Self {
        Self {
            width: scale_side(self.width, ratio),
            height: scale_side(self.height, ratio),
        }
    }

    /// Per-axis minimum of two boxes.
    pub fn min(self, other: Self) -> Self {
        Self {
            width: self.width.min(other.width),
            height: self.height.min(other.height),
        }
    }

    /// True when `self` is no larger than `other` on both axes.
    pub fn fits_within(self, other: Self) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Top-left corner of a crop rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// How a source box is mapped onto a requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fit entirely inside the requested box, preserving aspect ratio.
    #[default]
    Inset,
    /// Cover the requested box completely; the overflow is cropped.
    Outbound,
}

fn scale_side(side: u32, ratio: f64) -> u32 {
    ((side as f64 * ratio).round() as u32).max(1)
}

/// Fill in a missing side from the source aspect ratio.
///
/// `height = round(width * src_h / src_w)` and symmetrically for width,
/// never below 1px. Fails when both sides are missing or the source is empty.
pub fn complete_box(
    source: Dimensions,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<Dimensions, InvalidFormat> {
    if source.is_empty() {
        return Err(InvalidFormat::new(format!(
            "source box {source} has a zero side"
        )));
    }
    let (sw, sh) = (source.width as f64, source.height as f64);
    match (width, height) {
        (Some(w), Some(h)) => Ok(Dimensions::new(w, h)),
        (Some(w), None) => Ok(Dimensions::new(w, ((w as f64 * sh / sw).round() as u32).max(1))),
        (None, Some(h)) => Ok(Dimensions::new(((h as f64 * sw / sh).round() as u32).max(1), h)),
        (None, None) => Err(InvalidFormat::new(
            "width and height cannot both be empty",
        )),
    }
}

/// Compute the box a resize produces for `source` under the given settings.
///
/// # Examples
/// ```
/// # use media_pipeline::imaging::{Dimensions, Mode, compute_target_box};
/// let target = compute_target_box(Dimensions::new(567, 200), Some(100), Some(100), Mode::Inset);
/// assert_eq!(target.unwrap(), Dimensions::new(100, 35));
/// ```
pub fn compute_target_box(
    source: Dimensions,
    width: Option<u32>,
    height: Option<u32>,
    mode: Mode,
) -> Result<Dimensions, InvalidFormat> {
    let requested = complete_box(source, width, height)?;
    if requested.is_empty() {
        return Err(InvalidFormat::new(format!(
            "requested box {requested} has a zero side"
        )));
    }

    let ratios = (
        requested.width as f64 / source.width as f64,
        requested.height as f64 / source.height as f64,
    );
    let ratio = match mode {
        Mode::Inset => ratios.0.min(ratios.1),
        Mode::Outbound => ratios.0.max(ratios.1),
    };

    Ok(source.scale(ratio).min(requested))
}

/// Ratio that makes `source` cover `target` on both axes.
pub fn cover_ratio(source: Dimensions, target: Dimensions) -> f64 {
    let wr = target.width as f64 / source.width as f64;
    let hr = target.height as f64 / source.height as f64;
    wr.max(hr)
}

/// Center-crop offset of `target` inside `scaled`.
///
/// `floor((scaled - target) / 2)` on each axis that overflows, 0 otherwise.
pub fn center_crop_offset(scaled: Dimensions, target: Dimensions) -> Point {
    Point {
        x: scaled.width.saturating_sub(target.width) / 2,
        y: scaled.height.saturating_sub(target.height) / 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inset(src: (u32, u32), w: Option<u32>, h: Option<u32>) -> Dimensions {
        compute_target_box(Dimensions::new(src.0, src.1), w, h, Mode::Inset).unwrap()
    }

    // =========================================================================
    // complete_box
    // =========================================================================

    #[test]
    fn height_derived_from_width() {
        // 90 * 50 / 567 = 7.94 → 8
        let b = complete_box(Dimensions::new(567, 50), Some(90), None).unwrap();
        assert_eq!(b, Dimensions::new(90, 8));
    }

    #[test]
    fn width_derived_from_height() {
        // 40 * 300 / 200 = 60
        let b = complete_box(Dimensions::new(300, 200), None, Some(40)).unwrap();
        assert_eq!(b, Dimensions::new(60, 40));
    }

    #[test]
    fn derived_side_never_below_one_pixel() {
        let b = complete_box(Dimensions::new(5000, 10), Some(10), None).unwrap();
        assert_eq!(b, Dimensions::new(10, 1));
    }

    #[test]
    fn derived_side_matches_rounding_rule_for_many_boxes() {
        for (sw, sh) in [(100, 120), (567, 200), (1920, 1080), (3, 7), (1, 1000)] {
            for w in [1, 17, 90, 250] {
                let b = complete_box(Dimensions::new(sw, sh), Some(w), None).unwrap();
                let expected = ((w as f64 * sh as f64 / sw as f64).round() as u32).max(1);
                assert_eq!(b.height, expected, "source {sw}x{sh}, width {w}");
            }
        }
    }

    #[test]
    fn missing_both_sides_is_invalid() {
        let err = complete_box(Dimensions::new(100, 100), None, None).unwrap_err();
        assert!(err.to_string().contains("cannot both be empty"));
    }

    #[test]
    fn empty_source_is_invalid() {
        assert!(complete_box(Dimensions::new(0, 100), Some(10), None).is_err());
    }

    // =========================================================================
    // compute_target_box
    // =========================================================================

    #[test]
    fn inset_reference_table() {
        assert_eq!(inset((100, 120), Some(90), Some(90)), Dimensions::new(75, 90));
        assert_eq!(inset((50, 50), Some(90), Some(90)), Dimensions::new(90, 90));
        assert_eq!(inset((50, 50), Some(90), None), Dimensions::new(90, 90));
        assert_eq!(inset((567, 50), Some(90), None), Dimensions::new(90, 8));
        assert_eq!(inset((567, 200), Some(100), Some(100)), Dimensions::new(100, 35));
    }

    #[test]
    fn outbound_clamps_to_requested_box() {
        let b = compute_target_box(
            Dimensions::new(567, 200),
            Some(100),
            Some(100),
            Mode::Outbound,
        )
        .unwrap();
        assert_eq!(b, Dimensions::new(100, 100));
    }

    #[test]
    fn inset_portrait_source() {
        // ratio = min(100/200, 100/400) = 0.25 → 50x100
        assert_eq!(inset((200, 400), Some(100), Some(100)), Dimensions::new(50, 100));
    }

    // =========================================================================
    // crop helpers
    // =========================================================================

    #[test]
    fn cover_ratio_picks_larger_ratio() {
        let r = cover_ratio(Dimensions::new(400, 200), Dimensions::new(100, 100));
        assert_eq!(r, 0.5);
    }

    #[test]
    fn center_offset_floors_half_overflow() {
        let p = center_crop_offset(Dimensions::new(201, 100), Dimensions::new(100, 100));
        assert_eq!(p, Point::new(50, 0));
    }

    #[test]
    fn center_offset_zero_when_no_overflow() {
        let p = center_crop_offset(Dimensions::new(80, 60), Dimensions::new(100, 100));
        assert_eq!(p, Point::default());
    }

    #[test]
    fn scale_never_produces_zero() {
        assert_eq!(Dimensions::new(1000, 1).scale(0.01), Dimensions::new(10, 1));
    }

    #[test]
    fn fits_within_both_axes() {
        assert!(Dimensions::new(50, 50).fits_within(Dimensions::new(50, 60)));
        assert!(!Dimensions::new(51, 50).fits_within(Dimensions::new(50, 60)));
    }
}
