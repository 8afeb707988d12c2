use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use core_foundation_sys::runloop::{
    CFRunLoopGetMain, CFRunLoopSourceRef, CFRunLoopSourceSignal, CFRunLoopWakeUp,
};

/// Signals the main run loop source from any thread.
///
/// The source pointer is installed by the main thread once the source exists;
/// until then `wake` is a no-op and the polling timer picks up the work.
#[derive(Clone, Default)]
pub struct WakeHandle {
    source: Arc<AtomicPtr<c_void>>,
}

impl WakeHandle {
    pub fn new() -> Self {
        Self {
            source: Arc::new(AtomicPtr::new(ptr::null_mut())),
        }
    }

    pub fn set_source(&self, source: CFRunLoopSourceRef) {
        self.source.store(source as *mut c_void, Ordering::Release);
    }

    pub fn wake(&self) {
        let source = self.source.load(Ordering::Acquire);
        if !source.is_null() {
            unsafe {
                CFRunLoopSourceSignal(source as CFRunLoopSourceRef);
                CFRunLoopWakeUp(CFRunLoopGetMain());
            }
        }
    }
}
