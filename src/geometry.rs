//! Points, rectangles and the geometry query interface.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Top-left corner of a table box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
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

    /// A `width` x `height` rectangle whose center is `center`.
    pub fn centered_at(center: Point, width: f64, height: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn left_center(&self) -> Point {
        Point::new(self.x, self.center_y())
    }

    pub fn right_center(&self) -> Point {
        Point::new(self.right(), self.center_y())
    }
}

/// Answers "bounding rectangle of element X" for the rendered diagram.
///
/// Element ids are built with [`table_element_id`](crate::schema::table_element_id)
/// and [`attribute_element_id`](crate::schema::attribute_element_id). `None` means the
/// element is unknown or not rendered yet.
pub trait GeometrySource {
    fn rect_of(&self, element_id: &str) -> Option<Rect>;
}

impl<F> GeometrySource for F
where
    F: Fn(&str) -> Option<Rect>,
{
    fn rect_of(&self, element_id: &str) -> Option<Rect> {
        self(element_id)
    }
}

impl GeometrySource for HashMap<String, Rect> {
    fn rect_of(&self, element_id: &str) -> Option<Rect> {
        self.get(element_id).copied()
    }
}
