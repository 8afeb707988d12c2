use super::{Point, Rect};

/// An attached display as seen by the overlay manager.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub fingerprint: String,
    pub frame: Rect,
    /// Frame minus menu bar and Dock.
    pub visible_frame: Rect,
}

impl Display {
    pub fn new(frame: Rect, visible_frame: Rect) -> Self {
        Self {
            fingerprint: fingerprint(&frame),
            frame,
            visible_frame,
        }
    }
}

/// Stable key for a display: `"<x>,<y>,<width>,<height>"` of its full frame.
/// Components keep a fractional part (`0.0`, `1440.0`) so keys written by
/// earlier releases stay valid.
pub fn fingerprint(frame: &Rect) -> String {
    format!(
        "{:?},{:?},{:?},{:?}",
        frame.origin.x, frame.origin.y, frame.size.width, frame.size.height
    )
}

pub type RibbonId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Began,
    Moved,
    Ended,
}

/// Mouse interaction on a ribbon. `pointer` is in global screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEvent {
    pub ribbon_id: RibbonId,
    pub phase: DragPhase,
    pub pointer: Point,
}
