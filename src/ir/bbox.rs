//! Bounding box type in canonical XYXY pixel format.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in XYXY format (xmin, ymin, xmax, ymax),
/// in pixel coordinates of the video frame.
///
/// Note: This type does NOT enforce that min < max in the constructor.
/// A malformed box simply has zero area and never overlaps anything, so it
/// can only ever produce a false positive or a false negative.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBoxXYXY {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BBoxXYXY {
    /// Creates a new bounding box from explicit coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Converts from XYWH format where (x, y) is the top-left corner.
    ///
    /// This is the layout used by UA-DETRAC `<box left top width height>`.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    /// Returns the width of the bounding box.
    ///
    /// May be negative if the box is malformed (xmax < xmin).
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Returns the height of the bounding box.
    ///
    /// May be negative if the box is malformed (ymax < ymin).
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Returns the area of the box, clamped at zero for malformed boxes.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite() && self.ymin.is_finite() && self.xmax.is_finite() && self.ymax.is_finite()
    }

    /// Returns true if the box is properly ordered (min <= max for both axes).
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }

    /// Area of the overlap between two boxes (0 when they are disjoint).
    pub fn intersection_area(&self, other: &Self) -> f64 {
        let w = self.xmax.min(other.xmax) - self.xmin.max(other.xmin);
        let h = self.ymax.min(other.ymax) - self.ymin.max(other.ymin);
        if w <= 0.0 || h <= 0.0 {
            return 0.0;
        }
        w * h
    }

    /// Intersection-over-union with another box, in `[0, 1]`.
    ///
    /// Returns 0.0 when the union is empty (two degenerate boxes).
    pub fn iou(&self, other: &Self) -> f64 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }
}

impl std::fmt::Debug for BBoxXYXY {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.xmin)
            .field("ymin", &self.ymin)
            .field("xmax", &self.xmax)
            .field("ymax", &self.ymax)
            .finish()
    }
}
