//! Screen geometry: points and rectangles in CSS pixels.

use serde::{Deserialize, Serialize};

/// A point in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding rectangle of an element or control.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `size` centered on `center`.
    pub fn square_at(center: Point, size: f64) -> Self {
        Self::new(center.x - size / 2.0, center.y - size / 2.0, size, size)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// True when nothing would be rendered.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Check if a point is inside this rectangle.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if this rectangle intersects with another.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_edges() {
        let r = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(r.contains(Point::new(110.0, 60.0)));
        assert!(!r.contains(Point::new(111.0, 30.0)));
        assert!(!r.contains(Point::new(50.0, 9.0)));
    }

    #[test]
    fn test_area_and_empty() {
        assert_eq!(Rect::new(0.0, 0.0, 200.0, 100.0).area(), 20_000.0);
        assert!(Rect::new(0.0, 0.0, 0.0, 100.0).is_empty());
        assert_eq!(Rect::new(0.0, 0.0, -5.0, 100.0).area(), 0.0);
    }

    #[test]
    fn test_square_at_and_center() {
        let sq = Rect::square_at(Point::new(50.0, 50.0), 40.0);
        assert_eq!(sq, Rect::new(30.0, 30.0, 40.0, 40.0));
        assert_eq!(sq.center(), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_intersects_and_union() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let c = Rect::new(20.0, 20.0, 1.0, 1.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.union(&c), Rect::new(0.0, 0.0, 21.0, 21.0));
    }
}
