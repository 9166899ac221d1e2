use engine::{MapObject, Vec2};

/// Integer, axis-aligned rectangle in map pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub(crate) const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Map objects carry float geometry; fractions are truncated.
    pub(crate) fn from_object(object: &MapObject) -> Self {
        Self::new(
            object.x as i32,
            object.y as i32,
            object.width as i32,
            object.height as i32,
        )
    }

    pub(crate) fn with_top_left(position: Vec2, size: (i32, i32)) -> Self {
        Self::new(position.x as i32, position.y as i32, size.0, size.1)
    }

    pub(crate) fn right(&self) -> i32 {
        self.x + self.width
    }

    pub(crate) fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub(crate) fn mid_bottom(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.bottom())
    }

    pub(crate) fn center(&self) -> Vec2 {
        Vec2::new(
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Places a `width` x `height` rect so its bottom-centre sits on `anchor`.
    pub(crate) fn anchored_mid_bottom(anchor: (i32, i32), width: i32, height: i32) -> Self {
        Self::new(anchor.0 - width / 2, anchor.1 - height, width, height)
    }

    fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Strict overlap; touching edges and empty rects never collide.
    pub(crate) fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Index of the first rect in `rects` that overlaps this one.
    pub(crate) fn first_hit(&self, rects: &[Rect]) -> Option<usize> {
        rects.iter().position(|rect| self.intersects(rect))
    }
}
