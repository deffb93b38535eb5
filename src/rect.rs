//! Integer rectangles. Unlike protocol geometry, width and height are kept
//! signed so clamping arithmetic never wraps.

use std::fmt::{Debug, Formatter};

#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct Rect {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl Debug for Rect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x,
            y,
            w: w.max(0),
            h: h.max(0),
        }
    }

    pub fn x(self) -> i32 {
        self.x
    }

    pub fn y(self) -> i32 {
        self.y
    }

    pub fn width(self) -> i32 {
        self.w
    }

    pub fn height(self) -> i32 {
        self.h
    }

    pub fn right(self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(self) -> i32 {
        self.y + self.h
    }

    pub fn center_x(self) -> i32 {
        self.x + self.w / 2
    }

    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Area of the overlap with `other`. Zero when disjoint.
    pub fn intersection_area(self, other: Rect) -> i64 {
        let w = (self.right().min(other.right()) - self.x.max(other.x)).max(0) as i64;
        let h = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0) as i64;
        w * h
    }

    pub fn at(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }

    pub fn with_size(self, w: i32, h: i32) -> Self {
        Self {
            w: w.max(0),
            h: h.max(0),
            ..self
        }
    }
}
