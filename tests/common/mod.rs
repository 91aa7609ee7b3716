//! In-process Electrum-style servers for integration tests
#![allow(dead_code)]

use lana_core::types::NodeEndpoint;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// How the mock answers one request
pub enum Reply {
    Line(String),
    /// Raw reply bytes, newline appended
    Bytes(Vec<u8>),
    Close,
    Hang,
}

/// Per-server connection counters
#[derive(Default)]
pub struct ServerStats {
    hits: AtomicUsize,
    closed_by_client: AtomicUsize,
}

impl ServerStats {
    /// Connections that delivered a request line
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Connections the client shut down after its request
    pub fn closed_by_client(&self) -> usize {
        self.closed_by_client.load(Ordering::SeqCst)
    }

    /// Wait until every connection that sent a request has been closed by
    /// the client
    pub async fn assert_all_closed(&self) {
        for _ in 0..100 {
            if self.hits() > 0 && self.closed_by_client() == self.hits() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "{} of {} connections left open by the client",
            self.hits() - self.closed_by_client(),
            self.hits()
        );
    }
}

/// Spawn a server on an ephemeral port; returns its endpoint and counters
pub async fn spawn_server<F>(handler: F) -> (NodeEndpoint, Arc<ServerStats>)
where
    F: Fn(&Value) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let stats = Arc::new(ServerStats::default());
    let handler = Arc::new(handler);

    let server_stats = stats.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let handler = handler.clone();
            let stats = server_stats.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stream);
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                    return;
                }
                stats.hits.fetch_add(1, Ordering::SeqCst);
                let request: Value = serde_json::from_str(line.trim()).unwrap();
                let mut stream = reader.into_inner();
                let reply = match handler(&request) {
                    Reply::Line(reply) => reply.into_bytes(),
                    Reply::Bytes(bytes) => bytes,
                    Reply::Close => return,
                    Reply::Hang => Vec::new(),
                };
                if !reply.is_empty() {
                    let _ = stream.write_all(&reply).await;
                    let _ = stream.write_all(b"\n").await;
                }
                if wait_for_eof(&mut stream).await {
                    stats.closed_by_client.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    (NodeEndpoint::new("127.0.0.1", port), stats)
}

/// True once the peer closes; false if it sends more data or stays open
async fn wait_for_eof(stream: &mut TcpStream) -> bool {
    let mut byte = [0u8; 1];
    matches!(
        tokio::time::timeout(Duration::from_secs(30), stream.read(&mut byte)).await,
        Ok(Ok(0)) | Ok(Err(_))
    )
}

/// A port nothing listens on
pub async fn dead_endpoint() -> NodeEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    NodeEndpoint::new("127.0.0.1", port)
}
