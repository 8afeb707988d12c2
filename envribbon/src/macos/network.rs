//! Network path monitoring via the SystemConfiguration dynamic store.
//!
//! Watches the global and per-interface IP state keys on a dedicated thread
//! with its own CFRunLoop. Every store notification (interface up/down, Wi-Fi
//! switch, VPN tunnel, primary service change) is reported to the IP resolver.

use std::ffi::c_void;

use core_foundation::array::CFArray;
use core_foundation::base::TCFType;
use core_foundation::string::CFString;
use core_foundation_sys::array::CFArrayRef;
use core_foundation_sys::base::{
    kCFAllocatorDefault, Boolean, CFAllocatorRef, CFIndex, CFRelease, CFTypeRef,
};
use core_foundation_sys::runloop::{
    kCFRunLoopDefaultMode, CFRunLoopAddSource, CFRunLoopGetCurrent, CFRunLoopRun,
    CFRunLoopSourceRef,
};
use core_foundation_sys::string::CFStringRef;
use tokio::sync::mpsc;

use crate::resolver::ResolverTrigger;

type SCDynamicStoreRef = *const c_void;
type StoreCallback = extern "C" fn(SCDynamicStoreRef, CFArrayRef, *mut c_void);

/// Present while some service provides the default IPv4 route.
const GLOBAL_IPV4_KEY: &str = "State:/Network/Global/IPv4";
const GLOBAL_IPV6_KEY: &str = "State:/Network/Global/IPv6";
const INTERFACE_PATTERNS: [&str; 2] = [
    "State:/Network/Interface/.*/IPv4",
    "State:/Network/Interface/.*/IPv6",
];

#[repr(C)]
struct SCDynamicStoreContext {
    version: CFIndex,
    info: *mut c_void,
    retain: Option<extern "C" fn(*const c_void) -> *const c_void>,
    release: Option<extern "C" fn(*const c_void)>,
    copy_description: Option<extern "C" fn(*const c_void) -> CFStringRef>,
}

#[link(name = "SystemConfiguration", kind = "framework")]
extern "C" {
    fn SCDynamicStoreCreate(
        allocator: CFAllocatorRef,
        name: CFStringRef,
        callout: Option<StoreCallback>,
        context: *mut SCDynamicStoreContext,
    ) -> SCDynamicStoreRef;
    fn SCDynamicStoreSetNotificationKeys(
        store: SCDynamicStoreRef,
        keys: CFArrayRef,
        patterns: CFArrayRef,
    ) -> Boolean;
    fn SCDynamicStoreCreateRunLoopSource(
        allocator: CFAllocatorRef,
        store: SCDynamicStoreRef,
        order: CFIndex,
    ) -> CFRunLoopSourceRef;
    fn SCDynamicStoreCopyValue(store: SCDynamicStoreRef, key: CFStringRef) -> CFTypeRef;
}

/// Any primary service means the path is usable.
fn trigger_for(has_ipv4_route: bool, has_ipv6_route: bool) -> ResolverTrigger {
    if has_ipv4_route || has_ipv6_route {
        ResolverTrigger::PathSatisfied
    } else {
        ResolverTrigger::PathUnsatisfied
    }
}

fn has_key(store: SCDynamicStoreRef, key: &str) -> bool {
    let key = CFString::new(key);
    let value = unsafe { SCDynamicStoreCopyValue(store, key.as_concrete_TypeRef()) };
    if value.is_null() {
        return false;
    }
    unsafe { CFRelease(value) };
    true
}

fn current_trigger(store: SCDynamicStoreRef) -> ResolverTrigger {
    trigger_for(
        has_key(store, GLOBAL_IPV4_KEY),
        has_key(store, GLOBAL_IPV6_KEY),
    )
}

fn send_trigger(tx: &mpsc::Sender<ResolverTrigger>, trigger: ResolverTrigger) {
    tracing::info!("Network path changed: {:?}", trigger);
    if let Err(e) = tx.try_send(trigger) {
        tracing::warn!("Failed to deliver network path change: {}", e);
    }
}

extern "C" fn store_callback(store: SCDynamicStoreRef, _changed: CFArrayRef, info: *mut c_void) {
    if info.is_null() {
        return;
    }
    let tx = unsafe { &*(info as *const mpsc::Sender<ResolverTrigger>) };
    send_trigger(tx, current_trigger(store));
}

/// Start monitoring. The current path state is reported immediately.
pub fn start_network_monitor(tx: mpsc::Sender<ResolverTrigger>) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("network-monitor".to_string())
        .spawn(move || {
            if let Err(e) = run_monitor(tx) {
                tracing::error!("Network monitor stopped: {}", e);
            }
        })?;
    Ok(())
}

fn run_monitor(tx: mpsc::Sender<ResolverTrigger>) -> anyhow::Result<()> {
    // Lives as long as the thread's run loop
    let info = Box::into_raw(Box::new(tx));
    let mut context = SCDynamicStoreContext {
        version: 0,
        info: info as *mut c_void,
        retain: None,
        release: None,
        copy_description: None,
    };

    let name = CFString::new("envribbon");
    let store = unsafe {
        SCDynamicStoreCreate(
            kCFAllocatorDefault,
            name.as_concrete_TypeRef(),
            Some(store_callback),
            &mut context,
        )
    };
    if store.is_null() {
        drop(unsafe { Box::from_raw(info) });
        anyhow::bail!("Failed to create dynamic store session");
    }

    let keys = CFArray::from_CFTypes(&[
        CFString::new(GLOBAL_IPV4_KEY),
        CFString::new(GLOBAL_IPV6_KEY),
    ]);
    let patterns = CFArray::from_CFTypes(&INTERFACE_PATTERNS.map(CFString::new));

    unsafe {
        if SCDynamicStoreSetNotificationKeys(
            store,
            keys.as_concrete_TypeRef(),
            patterns.as_concrete_TypeRef(),
        ) == 0
        {
            anyhow::bail!("Failed to set network notification keys");
        }

        let source = SCDynamicStoreCreateRunLoopSource(kCFAllocatorDefault, store, 0);
        if source.is_null() {
            anyhow::bail!("Failed to create network monitor run loop source");
        }
        CFRunLoopAddSource(CFRunLoopGetCurrent(), source, kCFRunLoopDefaultMode);
    }

    send_trigger(unsafe { &*info }, current_trigger(store));

    tracing::info!("Network monitor started");
    unsafe { CFRunLoopRun() };
    Ok(())
}
