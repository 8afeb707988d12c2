/// Points and rects use Cocoa global coordinates: origin at the bottom-left
/// of the primary display, y growing upwards.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x() && p.x <= self.max_x() && p.y >= self.min_y() && p.y <= self.max_y()
    }

    /// Clamp the origin of a `size`-sized box so it stays inside `self`.
    /// When the box is larger than `self` the lower bound wins.
    pub fn clamp_origin(&self, origin: Point, size: Size) -> Point {
        Point::new(
            origin.x.min(self.max_x() - size.width).max(self.min_x()),
            origin.y.min(self.max_y() - size.height).max(self.min_y()),
        )
    }

    /// Whether a `size`-sized box at `origin` lies fully inside `self`.
    pub fn fits(&self, origin: Point, size: Size) -> bool {
        origin.x >= self.min_x()
            && origin.y >= self.min_y()
            && origin.x + size.width <= self.max_x()
            && origin.y + size.height <= self.max_y()
    }
}
