//! Live MJPEG preview served over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::media::camera::PreviewFeed;
use crate::media::{WorkerCommand, WorkerHandle};

const BOUNDARY: &str = "FRAME";
const MAX_REQUEST_BYTES: usize = 8192;

/// Response head for a `multipart/x-mixed-replace` stream.
pub fn stream_header() -> String {
    format!(
        "HTTP/1.1 200 OK\r\nAge: 0\r\nCache-Control: no-cache, private\r\nPragma: no-cache\r\n\
         Content-Type: multipart/x-mixed-replace; boundary={BOUNDARY}\r\n\r\n"
    )
}

/// Header preceding one JPEG part.
pub fn part_header(len: usize) -> String {
    format!("--{BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {len}\r\n\r\n")
}

/// Tells the worker a client left, however the connection ended.
struct ClientGuard {
    worker: WorkerHandle,
}

impl ClientGuard {
    async fn connect(worker: WorkerHandle) -> Result<Self> {
        if let Some(command) = worker.try_send(WorkerCommand::ClientConnect)? {
            let blocking = worker.clone();
            tokio::task::spawn_blocking(move || blocking.send(command))
                .await
                .map_err(std::io::Error::other)??;
        }
        Ok(Self { worker })
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        match self.worker.try_send(WorkerCommand::ClientDisconnect) {
            Ok(None) => {}
            Ok(Some(command)) => {
                debug!("Worker queue full, deferring preview disconnect");
                let worker = self.worker.clone();
                tokio::task::spawn_blocking(move || {
                    if let Err(e) = worker.send(command) {
                        debug!("Preview disconnect not delivered: {e}");
                    }
                });
            }
            Err(e) => debug!("Preview disconnect not delivered: {e}"),
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut request = Vec::with_capacity(512);
    let mut chunk = [0u8; 512];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") && request.len() < MAX_REQUEST_BYTES {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..n]);
    }
    Ok(())
}

async fn serve_client(
    mut stream: TcpStream,
    mut feed: PreviewFeed,
    worker: WorkerHandle,
) -> std::io::Result<()> {
    read_request(&mut stream).await?;
    let _guard = ClientGuard::connect(worker)
        .await
        .map_err(std::io::Error::other)?;

    stream.write_all(stream_header().as_bytes()).await?;
    loop {
        if feed.changed().await.is_err() {
            return Ok(());
        }
        let frame: Option<Arc<Vec<u8>>> = feed.borrow_and_update().clone();
        let Some(jpeg) = frame else {
            continue;
        };
        stream.write_all(part_header(jpeg.len()).as_bytes()).await?;
        stream.write_all(&jpeg).await?;
        stream.write_all(b"\r\n").await?;
    }
}

/// Accept preview clients until `stop` flips to `true`.
pub async fn serve_preview(
    listener: TcpListener,
    feed: PreviewFeed,
    worker: WorkerHandle,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Preview client {peer} connected");
                    let feed = feed.clone();
                    let worker = worker.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_client(stream, feed, worker).await {
                            debug!("Preview client {peer} dropped: {e}");
                        }
                    });
                }
                Err(e) => warn!("Preview accept failed: {e}"),
            },
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    debug!("Preview server stopping");
                    return;
                }
            }
        }
    }
}

/// Bind the preview port and serve it in the background.
pub async fn spawn_preview_server(
    port: u16,
    feed: PreviewFeed,
    worker: WorkerHandle,
    stop: watch::Receiver<bool>,
) -> Result<JoinHandle<()>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Preview available at http://{addr}/");
    Ok(tokio::spawn(serve_preview(listener, feed, worker, stop)))
}
