mod client;
mod server;

use std::path::PathBuf;

pub use client::IpcClient;
pub use server::{IpcCommandWithResponse, IpcServer};

/// Per-user control socket, so several logged-in users can each run a daemon.
pub fn socket_path() -> PathBuf {
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/envribbon-{}.sock", uid))
}

pub fn remove_socket() {
    let path = socket_path();
    if path.exists() {
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!("Failed to remove socket {:?}: {}", path, e);
        }
    }
}
