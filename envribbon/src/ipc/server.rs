use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use envribbon_ipc::{Command, Response};

pub type IpcCommandWithResponse = (Command, mpsc::Sender<Response>);

pub struct IpcServer {
    socket_path: PathBuf,
    cmd_tx: mpsc::Sender<IpcCommandWithResponse>,
}

impl IpcServer {
    pub fn new(cmd_tx: mpsc::Sender<IpcCommandWithResponse>) -> Self {
        Self::with_socket_path(super::socket_path(), cmd_tx)
    }

    pub fn with_socket_path(
        socket_path: impl Into<PathBuf>,
        cmd_tx: mpsc::Sender<IpcCommandWithResponse>,
    ) -> Self {
        Self {
            socket_path: socket_path.into(),
            cmd_tx,
        }
    }

    pub async fn run(&self) -> Result<()> {
        // Stale socket from a crashed daemon
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .with_context(|| format!("Failed to remove stale socket {:?}", self.socket_path))?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind {:?}", self.socket_path))?;
        tracing::info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let cmd_tx = self.cmd_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(stream, cmd_tx).await {
                            tracing::error!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                }
            }
        }
    }

    async fn handle_connection(
        stream: UnixStream,
        cmd_tx: mpsc::Sender<IpcCommandWithResponse>,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                break; // EOF
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Command>(line) {
                Ok(cmd) => {
                    let (resp_tx, mut resp_rx) = mpsc::channel(1);

                    if cmd_tx.send((cmd, resp_tx)).await.is_err() {
                        Response::Error {
                            message: "Internal error: command channel closed".to_string(),
                        }
                    } else {
                        resp_rx.recv().await.unwrap_or(Response::Error {
                            message: "Internal error: no response".to_string(),
                        })
                    }
                }
                Err(e) => Response::Error {
                    message: format!("Invalid command: {}", e),
                },
            };

            let response_json = serde_json::to_string(&response)?;
            writer.write_all(response_json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        Ok(())
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn temp_socket(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("envribbon-test-{}-{}.sock", std::process::id(), name))
    }

    async fn connect(path: &PathBuf) -> UnixStream {
        for _ in 0..50 {
            if let Ok(stream) = UnixStream::connect(path).await {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("server did not start");
    }

    async fn roundtrip(stream: UnixStream, request: &str) -> Response {
        let (reader, mut writer) = stream.into_split();
        writer.write_all(request.as_bytes()).await.unwrap();
        writer.write_all(b"\n").await.unwrap();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_command_is_forwarded_and_answered() {
        let path = temp_socket("forward");
        let (cmd_tx, mut cmd_rx) = mpsc::channel(4);
        let server = IpcServer::with_socket_path(&path, cmd_tx);
        tokio::spawn(async move { server.run().await });

        tokio::spawn(async move {
            while let Some((cmd, resp_tx)) = cmd_rx.recv().await {
                assert!(matches!(cmd, Command::Refresh));
                let _ = resp_tx.send(Response::Ok).await;
            }
        });

        let stream = connect(&path).await;
        let response = roundtrip(stream, r#"{"type":"refresh"}"#).await;
        assert!(matches!(response, Response::Ok));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_invalid_command_returns_error() {
        let path = temp_socket("invalid");
        let (cmd_tx, _cmd_rx) = mpsc::channel(4);
        let server = IpcServer::with_socket_path(&path, cmd_tx);
        tokio::spawn(async move { server.run().await });

        let stream = connect(&path).await;
        match roundtrip(stream, r#"{"type":"launch_rockets"}"#).await {
            Response::Error { message } => assert!(message.starts_with("Invalid command")),
            other => panic!("Unexpected response: {:?}", other),
        }
        let _ = std::fs::remove_file(&path);
    }
}
