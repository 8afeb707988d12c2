use std::ffi::c_void;
use std::sync::mpsc::Sender;
use std::sync::OnceLock;

use core_graphics::display::CGDirectDisplayID;
use objc2::MainThreadMarker;
use objc2_app_kit::NSScreen;
use objc2_foundation::NSRect;

use crate::core::{Display, Rect};

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGDisplayRegisterReconfigurationCallback(
        callback: unsafe extern "C" fn(CGDirectDisplayID, u32, *mut c_void),
        user_info: *mut c_void,
    ) -> i32;
}

/// kCGDisplayBeginConfigurationFlag
const BEGIN_CONFIGURATION_FLAG: u32 = 1 << 0;

#[derive(Debug, Clone)]
pub struct DisplayReconfigEvent {
    pub display_id: CGDirectDisplayID,
    pub flags: u32,
}

impl DisplayReconfigEvent {
    /// The callback fires twice per change; only the second call has final geometry.
    pub fn is_final(&self) -> bool {
        self.flags & BEGIN_CONFIGURATION_FLAG == 0
    }
}

static DISPLAY_RECONFIG_TX: OnceLock<Sender<DisplayReconfigEvent>> = OnceLock::new();
static DISPLAY_RECONFIG_WAKE: OnceLock<super::WakeHandle> = OnceLock::new();

extern "C" fn display_reconfig_callback(
    display_id: CGDirectDisplayID,
    flags: u32,
    _user_info: *mut c_void,
) {
    if let Some(tx) = DISPLAY_RECONFIG_TX.get() {
        let _ = tx.send(DisplayReconfigEvent { display_id, flags });
        if let Some(wake) = DISPLAY_RECONFIG_WAKE.get() {
            wake.wake();
        }
    }
}

pub fn register_display_callback(
    tx: Sender<DisplayReconfigEvent>,
    wake: super::WakeHandle,
) -> anyhow::Result<()> {
    DISPLAY_RECONFIG_TX
        .set(tx)
        .map_err(|_| anyhow::anyhow!("Display callback already registered"))?;
    let _ = DISPLAY_RECONFIG_WAKE.set(wake);

    let result = unsafe {
        CGDisplayRegisterReconfigurationCallback(display_reconfig_callback, std::ptr::null_mut())
    };

    if result != 0 {
        anyhow::bail!("Failed to register display callback: {}", result);
    }

    tracing::info!("Display reconfiguration callback registered");
    Ok(())
}

fn to_rect(rect: NSRect) -> Rect {
    Rect::new(
        rect.origin.x,
        rect.origin.y,
        rect.size.width,
        rect.size.height,
    )
}

/// Every attached screen in Cocoa coordinates.
pub fn get_all_displays(mtm: MainThreadMarker) -> Vec<Display> {
    let screens = unsafe { NSScreen::screens(mtm) };
    screens
        .iter()
        .map(|screen| {
            let (frame, visible) = unsafe { (screen.frame(), screen.visibleFrame()) };
            let info = Display::new(to_rect(frame), to_rect(visible));
            tracing::trace!(
                "Screen {} ({})",
                unsafe { screen.localizedName() },
                info.fingerprint
            );
            info
        })
        .collect()
}
