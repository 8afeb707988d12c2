mod daemon;
mod dispatch;
mod effects;

#[cfg(target_os = "macos")]
mod channels;

pub use daemon::Daemon;

#[cfg(target_os = "macos")]
pub use macos_app::App;

#[cfg(target_os = "macos")]
mod macos_app {
    use std::cell::{Cell, RefCell};
    use std::ffi::c_void;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};

    use anyhow::{Context, Result};
    use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
    use core_foundation_sys::base::kCFAllocatorDefault;
    use core_foundation_sys::runloop::{
        CFRunLoopAddSource, CFRunLoopGetMain, CFRunLoopSourceContext, CFRunLoopSourceCreate,
    };
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
    use objc2::MainThreadMarker;
    use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy};

    use super::channels::{create_channels, run_async, MainChannels};
    use super::daemon::Daemon;
    use crate::core::{Config, DragEvent};
    use crate::ipc::{self, IpcCommandWithResponse};
    use crate::macos::{self, DisplayReconfigEvent};
    use crate::platform::{MacOSOverlaySystem, MacOSSoundPlayer};
    use crate::preferences::JsonFilePreferences;

    /// Delay before exiting so the tokio thread can deliver the quit response.
    const QUIT_GRACE: Duration = Duration::from_millis(100);

    static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

    extern "C" fn handle_signal(_signal: libc::c_int) {
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
    }

    fn install_signal_handlers() -> Result<()> {
        let action = SigAction::new(
            SigHandler::Handler(handle_signal),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        for signal in [Signal::SIGINT, Signal::SIGTERM] {
            unsafe { sigaction(signal, &action) }
                .with_context(|| format!("Failed to install {} handler", signal))?;
        }
        Ok(())
    }

    struct RunLoopContext {
        mtm: MainThreadMarker,
        ipc_cmd_rx: std_mpsc::Receiver<IpcCommandWithResponse>,
        drag_rx: std_mpsc::Receiver<DragEvent>,
        display_reconfig_rx: std_mpsc::Receiver<DisplayReconfigEvent>,
        daemon: RefCell<Daemon<MacOSOverlaySystem, MacOSSoundPlayer>>,
        finished: Cell<bool>,
    }

    pub struct App {}

    impl App {
        pub fn run(config: Config) -> Result<()> {
            let mtm = MainThreadMarker::new().context("Must be called from main thread")?;

            install_signal_handlers()?;

            let (tokio_channels, main_channels) = create_channels();

            // Spawn tokio runtime in separate thread
            let tokio_config = config.clone();
            std::thread::Builder::new()
                .name("tokio".to_string())
                .spawn(move || match tokio::runtime::Runtime::new() {
                    Ok(rt) => rt.block_on(run_async(tokio_channels, tokio_config)),
                    Err(e) => tracing::error!("Failed to start tokio runtime: {}", e),
                })
                .context("Failed to spawn tokio thread")?;

            let app = App {};
            app.run_main_loop(mtm, main_channels, &config);

            Ok(())
        }

        fn run_main_loop(self, mtm: MainThreadMarker, channels: MainChannels, config: &Config) {
            tracing::info!("Starting main loop");

            let MainChannels {
                ipc_cmd_rx,
                ip_rx,
                trigger_tx,
                drag_tx,
                drag_rx,
                display_reconfig_tx,
                display_reconfig_rx,
                wake,
            } = channels;

            let ns_app = NSApplication::sharedApplication(mtm);
            unsafe { ns_app.setActivationPolicy(NSApplicationActivationPolicy::Accessory) };

            if let Err(e) = macos::register_display_callback(display_reconfig_tx, wake.clone()) {
                tracing::warn!("Failed to register display callback: {}", e);
            }

            if let Err(e) = macos::start_network_monitor(trigger_tx.clone()) {
                tracing::warn!("Failed to start network monitor: {}", e);
            }

            let prefs = Rc::new(JsonFilePreferences::open(&config.preferences_path));
            let system = MacOSOverlaySystem::new(mtm, drag_tx, wake.clone());
            let daemon = Daemon::new(
                config,
                prefs,
                system,
                MacOSSoundPlayer,
                ip_rx,
                trigger_tx,
            );

            let context = Box::new(RunLoopContext {
                mtm,
                ipc_cmd_rx,
                drag_rx,
                display_reconfig_rx,
                daemon: RefCell::new(daemon),
                finished: Cell::new(false),
            });
            // Lives until process exit
            let context_ptr = Box::into_raw(context) as *mut c_void;

            // Source signalled by other threads for immediate processing
            let mut source_context = CFRunLoopSourceContext {
                version: 0,
                info: context_ptr,
                retain: None,
                release: None,
                copyDescription: None,
                equal: None,
                hash: None,
                schedule: None,
                cancel: None,
                perform: source_callback,
            };
            unsafe {
                let source = CFRunLoopSourceCreate(kCFAllocatorDefault, 0, &mut source_context);
                CFRunLoopAddSource(CFRunLoopGetMain(), source, kCFRunLoopCommonModes);
                wake.set_source(source);
            }

            // Timer for the alert schedule and anything not signalled
            let mut timer_context = core_foundation::runloop::CFRunLoopTimerContext {
                version: 0,
                info: context_ptr,
                retain: None,
                release: None,
                copyDescription: None,
            };

            extern "C" fn timer_callback(
                _timer: core_foundation::runloop::CFRunLoopTimerRef,
                info: *mut c_void,
            ) {
                let ctx = unsafe { &*(info as *const RunLoopContext) };
                process_pending(ctx);
            }

            extern "C" fn source_callback(info: *const c_void) {
                let ctx = unsafe { &*(info as *const RunLoopContext) };
                process_pending(ctx);
            }

            let timer = unsafe {
                core_foundation::runloop::CFRunLoopTimer::new(
                    core_foundation::date::CFAbsoluteTimeGetCurrent(),
                    0.05, // 50ms interval
                    0,
                    0,
                    timer_callback,
                    &mut timer_context,
                )
            };

            let run_loop = CFRunLoop::get_current();
            run_loop.add_timer(&timer, unsafe { kCFRunLoopCommonModes });

            tracing::info!("Entering application run loop");
            unsafe { ns_app.run() };
            tracing::info!("Application run loop exited");
        }
    }

    fn process_pending(ctx: &RunLoopContext) {
        if ctx.finished.get() {
            return;
        }
        // Re-entered from an AppKit call made while flushing
        let Ok(mut daemon) = ctx.daemon.try_borrow_mut() else {
            return;
        };
        let now = Instant::now();

        while let Ok((cmd, resp_tx)) = ctx.ipc_cmd_rx.try_recv() {
            let response = daemon.dispatch_command(&cmd, now);
            if resp_tx.blocking_send(response).is_err() {
                tracing::warn!("IPC client went away before the response");
            }
        }

        while let Ok(event) = ctx.drag_rx.try_recv() {
            daemon.handle_drag(event);
        }

        let mut displays_changed = false;
        while let Ok(event) = ctx.display_reconfig_rx.try_recv() {
            tracing::debug!(
                "Display reconfigured: id={} flags={:#x}",
                event.display_id,
                event.flags
            );
            displays_changed |= event.is_final();
        }
        if displays_changed {
            tracing::info!("Display configuration changed, re-rendering ribbons");
            daemon.mark_dirty();
        }

        daemon.poll_ip();
        daemon.flush(now);

        if daemon.quit_requested() || SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            ctx.finished.set(true);
            tracing::info!("Shutting down");
            daemon.shutdown();
            ipc::remove_socket();
            std::thread::sleep(QUIT_GRACE);
            let ns_app = NSApplication::sharedApplication(ctx.mtm);
            unsafe { ns_app.terminate(None) };
        }
    }
}
