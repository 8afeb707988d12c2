use std::sync::mpsc as std_mpsc;

use tokio::sync::{mpsc, watch};

use crate::core::{Config, DragEvent, IpStatus};
use crate::ipc::{IpcCommandWithResponse, IpcServer};
use crate::macos::{DisplayReconfigEvent, WakeHandle};
use crate::resolver::{HttpFetcher, IpResolver, ResolverTrigger};

pub struct IpcRelay {
    pub cmd_tx: std_mpsc::Sender<IpcCommandWithResponse>,
    pub server_tx: mpsc::Sender<IpcCommandWithResponse>,
    pub server_rx: mpsc::Receiver<IpcCommandWithResponse>,
}

pub struct ResolverChannels {
    pub status_tx: watch::Sender<IpStatus>,
    pub trigger_rx: mpsc::Receiver<ResolverTrigger>,
}

pub struct TokioChannels {
    pub ipc: IpcRelay,
    pub resolver: ResolverChannels,
    pub wake: WakeHandle,
}

pub struct MainChannels {
    pub ipc_cmd_rx: std_mpsc::Receiver<IpcCommandWithResponse>,
    pub ip_rx: watch::Receiver<IpStatus>,
    pub trigger_tx: mpsc::Sender<ResolverTrigger>,
    pub drag_tx: std_mpsc::Sender<DragEvent>,
    pub drag_rx: std_mpsc::Receiver<DragEvent>,
    pub display_reconfig_tx: std_mpsc::Sender<DisplayReconfigEvent>,
    pub display_reconfig_rx: std_mpsc::Receiver<DisplayReconfigEvent>,
    pub wake: WakeHandle,
}

pub fn create_channels() -> (TokioChannels, MainChannels) {
    // Channel: IPC commands (tokio -> main thread)
    let (ipc_cmd_tx, ipc_cmd_rx) = std_mpsc::channel::<IpcCommandWithResponse>();

    // Channel for IPC server (tokio internal)
    let (ipc_server_tx, ipc_server_rx) = mpsc::channel::<IpcCommandWithResponse>(256);

    // Current public IP (resolver -> main thread)
    let (status_tx, ip_rx) = watch::channel(IpStatus::Checking);

    // Path changes and refresh requests (network monitor thread / main thread -> resolver)
    let (trigger_tx, trigger_rx) = mpsc::channel::<ResolverTrigger>(64);

    // Channel: ribbon mouse events (views -> main thread)
    let (drag_tx, drag_rx) = std_mpsc::channel::<DragEvent>();

    // Channel: display reconfiguration events (callback -> main thread)
    let (display_reconfig_tx, display_reconfig_rx) = std_mpsc::channel::<DisplayReconfigEvent>();

    // Source pointer is installed by the main thread after source creation
    let wake = WakeHandle::new();

    let tokio_channels = TokioChannels {
        ipc: IpcRelay {
            cmd_tx: ipc_cmd_tx,
            server_tx: ipc_server_tx,
            server_rx: ipc_server_rx,
        },
        resolver: ResolverChannels {
            status_tx,
            trigger_rx,
        },
        wake: wake.clone(),
    };

    let main_channels = MainChannels {
        ipc_cmd_rx,
        ip_rx,
        trigger_tx,
        drag_tx,
        drag_rx,
        display_reconfig_tx,
        display_reconfig_rx,
        wake,
    };

    (tokio_channels, main_channels)
}

pub async fn run_async(channels: TokioChannels, config: Config) {
    // Destructure for partial moves
    let TokioChannels {
        ipc,
        resolver,
        wake,
    } = channels;
    let IpcRelay {
        cmd_tx: ipc_cmd_tx,
        server_tx: ipc_server_tx,
        server_rx: mut ipc_rx,
    } = ipc;
    let ResolverChannels {
        status_tx,
        trigger_rx,
    } = resolver;

    tracing::info!("Tokio runtime started");

    // Start IPC server
    let ipc_server = IpcServer::new(ipc_server_tx);
    tokio::spawn(async move {
        if let Err(e) = ipc_server.run().await {
            tracing::error!("IPC server error: {:#}", e);
        }
    });

    // Wake the main thread whenever a new IP is published
    let mut ip_watch = status_tx.subscribe();
    let ip_wake = wake.clone();
    tokio::spawn(async move {
        while ip_watch.changed().await.is_ok() {
            ip_wake.wake();
        }
    });

    // Start IP resolver
    match HttpFetcher::new(config.request_timeout) {
        Ok(fetcher) => {
            let resolver = IpResolver::new(fetcher, &config, status_tx);
            tokio::spawn(resolver.run(trigger_rx));
        }
        Err(e) => {
            tracing::error!("Failed to create HTTP client: {:#}", e);
        }
    }

    while let Some((cmd, resp_tx)) = ipc_rx.recv().await {
        // Forward IPC commands to main thread
        if ipc_cmd_tx.send((cmd, resp_tx)).is_err() {
            tracing::error!("Failed to forward IPC command to main thread");
            break;
        }
        // Wake up the main thread's RunLoop immediately
        wake.wake();
    }

    tracing::info!("Tokio runtime exiting");
}
