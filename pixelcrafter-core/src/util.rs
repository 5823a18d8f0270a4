//! Utility types, used throughout the crate.

use az::CheckedAs;

/// An axis-aligned, half-open rectangle in pixel coordinates. May extend off the canvas,
/// see [`Rect::clip`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    /// Exclusive.
    pub right: i32,
    /// Exclusive.
    pub bottom: i32,
}
impl Rect {
    /// Create from a corner and a size. Saturates instead of overflowing.
    #[must_use]
    pub fn from_xywh(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x.saturating_add(to_i32_saturating(width)),
            bottom: y.saturating_add(to_i32_saturating(height)),
        }
    }
    /// The rectangle covering a whole `width` x `height` canvas.
    #[must_use]
    pub fn canvas(width: u32, height: u32) -> Self {
        Self::from_xywh(0, 0, width, height)
    }
    /// Smallest rectangle containing both corners, regardless of their order.
    #[must_use]
    pub fn from_corners(a: [i32; 2], b: [i32; 2]) -> Self {
        Self {
            left: a[0].min(b[0]),
            top: a[1].min(b[1]),
            right: a[0].max(b[0]),
            bottom: a[1].max(b[1]),
        }
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left).max(0).unsigned_abs()
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top).max(0).unsigned_abs()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
    /// Overlapping area, or None if the rectangles don't overlap.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let out = Self {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        (!out.is_empty()).then_some(out)
    }
    /// Bounding box of both. Empty rectangles don't contribute.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => *other,
            (false, true) => *self,
            (false, false) => Self {
                left: self.left.min(other.left),
                top: self.top.min(other.top),
                right: self.right.max(other.right),
                bottom: self.bottom.max(other.bottom),
            },
        }
    }
    /// Grow outward by `amount` on every side.
    #[must_use]
    pub fn inflate(&self, amount: i32) -> Self {
        Self {
            left: self.left.saturating_sub(amount),
            top: self.top.saturating_sub(amount),
            right: self.right.saturating_add(amount),
            bottom: self.bottom.saturating_add(amount),
        }
    }
    /// Clip to a `width` x `height` canvas. None if nothing is left.
    #[must_use]
    pub fn clip(&self, width: u32, height: u32) -> Option<Self> {
        self.intersect(&Self::canvas(width, height))
    }
    /// Iterate every `(x, y)` inside, row by row.
    pub fn positions(&self) -> impl Iterator<Item = (i32, i32)> {
        let Self {
            left,
            top,
            right,
            bottom,
        } = *self;
        (top..bottom).flat_map(move |y| (left..right).map(move |x| (x, y)))
    }
}

pub(crate) fn to_i32_saturating(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Float to integer coordinate, flooring. NaN maps to `i32::MIN`, which is off every canvas.
pub(crate) fn floor_to_i32(value: f32) -> i32 {
    value.floor().checked_as::<i32>().unwrap_or(if value > 0.0 {
        i32::MAX
    } else {
        i32::MIN
    })
}

/// `[0, 1]` float to an 8-bit channel, rounding. NaN becomes zero.
pub(crate) fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0)
        .round()
        .checked_as::<u8>()
        .unwrap_or(0)
}

/// `[0, 255]` float to an 8-bit channel, rounding and saturating. NaN becomes zero.
pub(crate) fn to_channel(value: f32) -> u8 {
    if value.is_nan() {
        0
    } else {
        az::saturating_cast(value.round())
    }
}

/// An 8-bit channel as a `[0, 1]` float.
pub(crate) fn u8_to_unit(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// Clamp into `[0, 1]`, mapping NaN to zero.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
