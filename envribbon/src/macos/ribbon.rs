use std::sync::mpsc as std_mpsc;

use envribbon_ipc::RibbonColor;
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2::{define_class, msg_send, DefinedClass, MainThreadMarker};
use objc2_app_kit::{
    NSBackingStoreType, NSBezierPath, NSColor, NSEvent, NSFont, NSFontAttributeName,
    NSForegroundColorAttributeName, NSResponder, NSView, NSWindow, NSWindowCollectionBehavior,
    NSWindowStyleMask,
};
use objc2_foundation::{NSDictionary, NSObject, NSPoint, NSRect, NSSize, NSString};

use super::WakeHandle;
use crate::core::{DragEvent, DragPhase, Point, Rect, RibbonId};

const FONT_SIZE: f64 = 14.0;
const PADDING_X: f64 = 16.0;
const PADDING_Y: f64 = 8.0;
const CORNER_RADIUS: f64 = 8.0;
/// kCGFloatingWindowLevel
const FLOATING_WINDOW_LEVEL: isize = 3;

// Borderless, transparent window hosting one ribbon. Never takes focus.
define_class!(
    #[unsafe(super(NSWindow, NSResponder, NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "EnvRibbonWindow"]
    pub struct RibbonWindow;

    impl RibbonWindow {
        #[unsafe(method(canBecomeKeyWindow))]
        fn can_become_key_window(&self) -> bool {
            false
        }

        #[unsafe(method(canBecomeMainWindow))]
        fn can_become_main_window(&self) -> bool {
            false
        }
    }
);

struct ViewIvars {
    ribbon_id: RibbonId,
    label: Retained<NSString>,
    color: RibbonColor,
    drag_tx: std_mpsc::Sender<DragEvent>,
    wake: WakeHandle,
}

define_class!(
    #[unsafe(super(NSView, NSResponder, NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "EnvRibbonView"]
    #[ivars = ViewIvars]
    struct RibbonView;

    impl RibbonView {
        #[unsafe(method(drawRect:))]
        fn draw_rect(&self, _dirty: NSRect) {
            self.draw_pill();
        }

        #[unsafe(method(hitTest:))]
        fn hit_test(&self, point: NSPoint) -> *mut NSView {
            let (local, bounds) = unsafe {
                let superview = self.superview();
                (
                    self.convertPoint_fromView(point, superview.as_deref()),
                    self.bounds(),
                )
            };
            let inside = local.x >= bounds.origin.x
                && local.y >= bounds.origin.y
                && local.x <= bounds.origin.x + bounds.size.width
                && local.y <= bounds.origin.y + bounds.size.height;
            if inside {
                self as *const Self as *mut NSView
            } else {
                std::ptr::null_mut()
            }
        }

        #[unsafe(method(acceptsFirstMouse:))]
        fn accepts_first_mouse(&self, _event: Option<&NSEvent>) -> bool {
            true
        }

        #[unsafe(method(mouseDown:))]
        fn mouse_down(&self, _event: &NSEvent) {
            self.send_drag(DragPhase::Began);
        }

        #[unsafe(method(mouseDragged:))]
        fn mouse_dragged(&self, _event: &NSEvent) {
            self.send_drag(DragPhase::Moved);
        }

        #[unsafe(method(mouseUp:))]
        fn mouse_up(&self, _event: &NSEvent) {
            self.send_drag(DragPhase::Ended);
        }
    }
);

impl RibbonView {
    fn new(
        mtm: MainThreadMarker,
        frame: NSRect,
        ribbon_id: RibbonId,
        label: &str,
        color: RibbonColor,
        drag_tx: std_mpsc::Sender<DragEvent>,
        wake: WakeHandle,
    ) -> Retained<Self> {
        let this = mtm.alloc::<Self>().set_ivars(ViewIvars {
            ribbon_id,
            label: NSString::from_str(label),
            color,
            drag_tx,
            wake,
        });
        unsafe { msg_send![super(this), initWithFrame: frame] }
    }

    fn send_drag(&self, phase: DragPhase) {
        let location = unsafe { NSEvent::mouseLocation() };
        let ivars = self.ivars();
        let event = DragEvent {
            ribbon_id: ivars.ribbon_id,
            phase,
            pointer: Point::new(location.x, location.y),
        };
        if ivars.drag_tx.send(event).is_ok() {
            ivars.wake.wake();
        }
    }

    /// Bold white label on a rounded pill, right-aligned and vertically centered.
    fn draw_pill(&self) {
        let ivars = self.ivars();
        let bounds = unsafe { self.bounds() };

        let font = unsafe { NSFont::boldSystemFontOfSize(FONT_SIZE) };
        let white = unsafe { NSColor::whiteColor() };
        let keys = unsafe { [NSFontAttributeName, NSForegroundColorAttributeName] };
        let objects: [&AnyObject; 2] = [&font, &white];
        let attrs = NSDictionary::from_slices(&keys, &objects);

        let text: NSSize = unsafe { msg_send![&*ivars.label, sizeWithAttributes: &*attrs] };
        let pill_width = text.width + PADDING_X * 2.0;
        let pill_height = text.height + PADDING_Y * 2.0;
        let pill = NSRect::new(
            NSPoint::new(
                bounds.size.width - pill_width,
                (bounds.size.height - pill_height) / 2.0,
            ),
            NSSize::new(pill_width, pill_height),
        );

        let (r, g, b, a) = ivars.color.components();
        unsafe {
            NSColor::colorWithSRGBRed_green_blue_alpha(r, g, b, a).set();
            NSBezierPath::bezierPathWithRoundedRect_xRadius_yRadius(
                pill,
                CORNER_RADIUS,
                CORNER_RADIUS,
            )
            .fill();
        }

        let text_origin = NSPoint::new(pill.origin.x + PADDING_X, pill.origin.y + PADDING_Y);
        let _: () = unsafe {
            msg_send![&*ivars.label, drawAtPoint: text_origin, withAttributes: &*attrs]
        };
    }
}

fn to_ns_rect(rect: Rect) -> NSRect {
    NSRect::new(
        NSPoint::new(rect.origin.x, rect.origin.y),
        NSSize::new(rect.size.width, rect.size.height),
    )
}

impl RibbonWindow {
    pub fn create(
        mtm: MainThreadMarker,
        ribbon_id: RibbonId,
        frame: Rect,
        label: &str,
        color: RibbonColor,
        drag_tx: std_mpsc::Sender<DragEvent>,
        wake: WakeHandle,
    ) -> Retained<Self> {
        let content_rect = to_ns_rect(frame);
        let this = mtm.alloc::<Self>().set_ivars(());
        let window: Retained<Self> = unsafe {
            msg_send![
                super(this),
                initWithContentRect: content_rect,
                styleMask: NSWindowStyleMask::Borderless,
                backing: NSBackingStoreType::Buffered,
                defer: false,
            ]
        };

        let view_frame = NSRect::new(NSPoint::new(0.0, 0.0), content_rect.size);
        let view = RibbonView::new(mtm, view_frame, ribbon_id, label, color, drag_tx, wake);

        unsafe {
            window.setReleasedWhenClosed(false);
            window.setOpaque(false);
            window.setBackgroundColor(Some(&NSColor::clearColor()));
            window.setHasShadow(false);
            window.setLevel(FLOATING_WINDOW_LEVEL);
            window.setCollectionBehavior(
                NSWindowCollectionBehavior::CanJoinAllSpaces
                    | NSWindowCollectionBehavior::Stationary,
            );
            window.setIgnoresMouseEvents(false);
            window.setContentView(Some(&view));
        }

        window
    }

    pub fn show(&self) {
        unsafe { self.orderFrontRegardless() };
    }

    pub fn set_origin(&self, origin: Point) {
        unsafe { self.setFrameOrigin(NSPoint::new(origin.x, origin.y)) };
    }

    pub fn close_ribbon(&self) {
        unsafe {
            self.orderOut(None);
            self.close();
        }
    }
}
