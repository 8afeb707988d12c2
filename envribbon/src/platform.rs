use envribbon_ipc::RibbonColor;

use crate::core::{Display, Point, Rect, RibbonId};

/// Trait for enumerating displays and managing ribbon windows.
/// This abstraction allows mocking in tests.
pub trait OverlaySystem {
    fn displays(&self) -> Vec<Display>;
    fn create_ribbon(
        &self,
        id: RibbonId,
        display: &Display,
        frame: Rect,
        label: &str,
        color: RibbonColor,
    );
    fn move_ribbon(&self, id: RibbonId, origin: Point);
    fn destroy_ribbon(&self, id: RibbonId);
}

/// Trait for playing named system sounds.
pub trait SoundPlayer {
    /// Returns false when the sound is unknown to the system.
    fn play(&self, name: &str) -> bool;
}

#[cfg(target_os = "macos")]
pub use macos_impl::{MacOSOverlaySystem, MacOSSoundPlayer};

#[cfg(target_os = "macos")]
mod macos_impl {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::mpsc as std_mpsc;

    use objc2::rc::Retained;
    use objc2::MainThreadMarker;

    use super::*;
    use crate::core::DragEvent;
    use crate::macos::{self, RibbonWindow, WakeHandle};

    /// macOS implementation of OverlaySystem. Main thread only.
    pub struct MacOSOverlaySystem {
        mtm: MainThreadMarker,
        windows: RefCell<HashMap<RibbonId, Retained<RibbonWindow>>>,
        drag_tx: std_mpsc::Sender<DragEvent>,
        wake: WakeHandle,
    }

    impl MacOSOverlaySystem {
        pub fn new(
            mtm: MainThreadMarker,
            drag_tx: std_mpsc::Sender<DragEvent>,
            wake: WakeHandle,
        ) -> Self {
            Self {
                mtm,
                windows: RefCell::new(HashMap::new()),
                drag_tx,
                wake,
            }
        }
    }

    impl OverlaySystem for MacOSOverlaySystem {
        fn displays(&self) -> Vec<Display> {
            macos::get_all_displays(self.mtm)
        }

        fn create_ribbon(
            &self,
            id: RibbonId,
            _display: &Display,
            frame: Rect,
            label: &str,
            color: RibbonColor,
        ) {
            let window = RibbonWindow::create(
                self.mtm,
                id,
                frame,
                label,
                color,
                self.drag_tx.clone(),
                self.wake.clone(),
            );
            window.show();
            if let Some(old) = self.windows.borrow_mut().insert(id, window) {
                old.close_ribbon();
            }
        }

        fn move_ribbon(&self, id: RibbonId, origin: Point) {
            match self.windows.borrow().get(&id) {
                Some(window) => window.set_origin(origin),
                None => tracing::warn!("Cannot move unknown ribbon {}", id),
            }
        }

        fn destroy_ribbon(&self, id: RibbonId) {
            if let Some(window) = self.windows.borrow_mut().remove(&id) {
                window.close_ribbon();
            }
        }
    }

    /// macOS implementation of SoundPlayer
    #[derive(Default)]
    pub struct MacOSSoundPlayer;

    impl SoundPlayer for MacOSSoundPlayer {
        fn play(&self, name: &str) -> bool {
            macos::play_sound(name)
        }
    }
}
