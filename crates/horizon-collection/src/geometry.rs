//! Basic geometry and colour types used by metrics and layout records.
//!
//! Coordinates are in points with the origin at the top of the content and
//! `y` growing downward.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned frame in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.origin.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.origin.y
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.left() + self.size.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.top() + self.size.height
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.height
    }

    /// Midpoint of the frame; drag targets are hit-tested with it.
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(
            self.left() + self.width() * 0.5,
            self.top() + self.height() * 0.5,
        )
    }

    /// Half-open containment: the right and bottom edges are outside.
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        (self.left()..self.right()).contains(&point.x) && (self.top()..self.bottom()).contains(&point.y)
    }

    /// Whether `y` lies within the vertical extent, both edges included.
    #[inline]
    pub fn spans_y(&self, y: f32) -> bool {
        y >= self.top() && y <= self.bottom()
    }

    /// Whether two rectangles overlap. Zero-height rectangles (separators)
    /// overlap when their edge lies inside the other rectangle.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.top() <= other.bottom()
            && other.top() <= self.bottom()
    }

    /// Smallest frame covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let (x, y) = (self.left().min(other.left()), self.top().min(other.top()));
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    #[inline]
    pub fn offset(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.left() + dx, self.top() + dy, self.width(), self.height())
    }

    /// Shrink horizontally by the left and right insets.
    #[inline]
    pub fn inset_horizontally(&self, insets: &EdgeInsets) -> Rect {
        Rect::new(
            self.origin.x + insets.left,
            self.origin.y,
            (self.size.width - insets.horizontal()).max(0.0),
            self.size.height,
        )
    }
}

/// Insets on each edge, used for padding, layout margins and separator insets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeInsets {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl EdgeInsets {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// `horizontal` on the left and right, `vertical` on the top and bottom.
    pub const fn symmetric(horizontal: f32, vertical: f32) -> Self {
        Self::new(horizontal, vertical, horizontal, vertical)
    }

    /// Left plus right.
    #[inline]
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }
}

/// An RGBA colour with straight (non-premultiplied) alpha.
///
/// The core never draws; colours are carried through metrics to the host.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::from_rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::from_rgb(1.0, 1.0, 1.0);
    pub const LIGHT_GRAY: Self = Self::from_rgb(0.75, 0.75, 0.75);

    /// Components in the 0.0-1.0 range.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour.
    #[inline]
    pub const fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }
}
