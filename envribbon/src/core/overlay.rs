use std::rc::Rc;

use envribbon_ipc::RibbonColor;

use super::{Display, DragEvent, DragPhase, Point, Rect, RibbonId, Size};
use crate::platform::OverlaySystem;
use crate::preferences::Preferences;

fn position_keys(fingerprint: &str) -> (String, String) {
    let key = format!("ribbonPosition_{}", fingerprint);
    (format!("{}_x", key), format!("{}_y", key))
}

#[derive(Debug, Clone)]
pub struct RibbonWindowState {
    pub id: RibbonId,
    pub display: Display,
    pub origin: Point,
    pub size: Size,
    /// Pointer location of the last processed drag event.
    drag_anchor: Option<Point>,
}

impl RibbonWindowState {
    pub fn frame(&self) -> Rect {
        Rect {
            origin: self.origin,
            size: self.size,
        }
    }

    #[cfg(test)]
    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }
}

/// One ribbon window per attached display, with per-display remembered
/// positions.
pub struct RibbonManager<S: OverlaySystem> {
    system: S,
    prefs: Rc<dyn Preferences>,
    size: Size,
    margin: f64,
    ribbons: Vec<RibbonWindowState>,
    next_id: RibbonId,
}

impl<S: OverlaySystem> RibbonManager<S> {
    pub fn new(system: S, prefs: Rc<dyn Preferences>, size: Size, margin: f64) -> Self {
        Self {
            system,
            prefs,
            size,
            margin,
            ribbons: Vec::new(),
            next_id: 1,
        }
    }

    #[cfg(test)]
    pub fn system(&self) -> &S {
        &self.system
    }

    #[cfg(test)]
    pub fn ribbons(&self) -> &[RibbonWindowState] {
        &self.ribbons
    }

    pub fn ribbon_count(&self) -> usize {
        self.ribbons.len()
    }

    /// Recreate ribbons on every attached display.
    pub fn show_ribbons(&mut self, label: &str, color: RibbonColor) {
        self.hide_ribbons();

        for screen in self.system.displays() {
            let origin = self.placement(&screen);
            let id = self.next_id;
            self.next_id += 1;

            let frame = Rect {
                origin,
                size: self.size,
            };
            self.system.create_ribbon(id, &screen, frame, label, color);
            tracing::debug!(
                "Ribbon {} on display {} at ({}, {})",
                id,
                screen.fingerprint,
                origin.x,
                origin.y
            );

            self.ribbons.push(RibbonWindowState {
                id,
                display: screen,
                origin,
                size: self.size,
                drag_anchor: None,
            });
        }

        tracing::info!("Showing {:?} on {} displays", label, self.ribbons.len());
    }

    /// Persist every ribbon's position and close all windows.
    pub fn hide_ribbons(&mut self) {
        if self.ribbons.is_empty() {
            return;
        }
        for ribbon in &self.ribbons {
            self.save_position(&ribbon.display.fingerprint, ribbon.origin);
        }
        for ribbon in self.ribbons.drain(..) {
            self.system.destroy_ribbon(ribbon.id);
        }
        tracing::info!("Ribbons hidden");
    }

    pub fn handle_drag(&mut self, event: DragEvent) {
        let Some(index) = self.ribbons.iter().position(|r| r.id == event.ribbon_id) else {
            tracing::debug!("Drag event for unknown ribbon {}", event.ribbon_id);
            return;
        };

        match event.phase {
            DragPhase::Began => {
                let ribbon = &mut self.ribbons[index];
                if ribbon.frame().contains(event.pointer) {
                    ribbon.drag_anchor = Some(event.pointer);
                }
            }
            DragPhase::Moved => {
                let ribbon = &mut self.ribbons[index];
                let Some(anchor) = ribbon.drag_anchor else {
                    return;
                };
                let moved = ribbon
                    .origin
                    .offset(event.pointer.x - anchor.x, event.pointer.y - anchor.y);
                let origin = ribbon.display.visible_frame.clamp_origin(moved, ribbon.size);
                ribbon.origin = origin;
                ribbon.drag_anchor = Some(event.pointer);
                self.system.move_ribbon(ribbon.id, origin);
            }
            DragPhase::Ended => {
                let ribbon = &mut self.ribbons[index];
                if ribbon.drag_anchor.take().is_none() {
                    return;
                }
                let (fingerprint, origin) = (ribbon.display.fingerprint.clone(), ribbon.origin);
                self.save_position(&fingerprint, origin);
                tracing::debug!(
                    "Saved ribbon position for {}: ({}, {})",
                    fingerprint,
                    origin.x,
                    origin.y
                );
            }
        }
    }

    /// Remembered origin clamped into the visible frame, falling back to
    /// the top-right corner when nothing is remembered or it cannot fit.
    fn placement(&self, display: &Display) -> Point {
        let visible = &display.visible_frame;
        let default = Point::new(
            visible.max_x() - self.size.width - self.margin,
            visible.max_y() - self.size.height - self.margin,
        );

        match self.saved_position(&display.fingerprint) {
            Some(saved) => {
                let clamped = visible.clamp_origin(saved, self.size);
                if visible.fits(clamped, self.size) {
                    clamped
                } else {
                    default
                }
            }
            None => default,
        }
    }

    fn saved_position(&self, fingerprint: &str) -> Option<Point> {
        let (key_x, key_y) = position_keys(fingerprint);
        let x = self.prefs.get_f64(&key_x)?;
        let y = self.prefs.get_f64(&key_y)?;
        Some(Point::new(x, y))
    }

    fn save_position(&self, fingerprint: &str, origin: Point) {
        let (key_x, key_y) = position_keys(fingerprint);
        self.prefs.set_f64(&key_x, origin.x);
        self.prefs.set_f64(&key_y, origin.y);
    }
}
