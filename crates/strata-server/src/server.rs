//! TCP server: accepts connections and feeds framed messages through the
//! batch processor.
//!
//! The protocol has no acknowledgement frame, so connections are read-only
//! from the server's perspective: each frame is decoded, applied, and its
//! outcome logged. A malformed message is logged and dropped without
//! disturbing the connection or later messages.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, watch};

use crate::framing::{FrameConfig, FrameError, read_message};
use crate::processor::BatchProcessor;

// ---------------------------------------------------------------------------
// Connection bookkeeping
// ---------------------------------------------------------------------------

/// Unique identifier for a TCP connection within a server session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Atomic generator for monotonically increasing [`ConnectionId`]s.
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator starting at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Return the next unique [`ConnectionId`].
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe set of active connection ids with a capacity limit.
///
/// The protocol sends no replies, so nothing beyond the id needs tracking.
pub struct ConnectionSet {
    inner: RwLock<HashSet<ConnectionId>>,
    max_connections: usize,
}

impl ConnectionSet {
    /// Create a new set with the given capacity limit.
    pub fn new(max_connections: usize) -> Self {
        Self {
            inner: RwLock::new(HashSet::new()),
            max_connections,
        }
    }

    /// Register a connection. Returns `false` if the set is at capacity.
    pub async fn insert(&self, id: ConnectionId) -> bool {
        let mut set = self.inner.write().await;
        if set.len() >= self.max_connections {
            return false;
        }
        set.insert(id);
        true
    }

    /// Remove a connection by id.
    pub async fn remove(&self, id: &ConnectionId) {
        self.inner.write().await.remove(id);
    }

    /// Number of active connections.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether no connections are active.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Configuration for [`VoxelServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to. Default: `0.0.0.0:8887`.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections. Default: 256.
    pub max_connections: usize,
    /// Framing limits.
    pub frame: FrameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8887)),
            max_connections: 256,
            frame: FrameConfig::default(),
        }
    }
}

/// TCP server that accepts connections and pipes their frames into a
/// [`BatchProcessor`].
pub struct VoxelServer {
    config: ServerConfig,
    processor: Arc<BatchProcessor>,
    /// Active connection set (public for test inspection).
    pub connections: Arc<ConnectionSet>,
    id_gen: Arc<IdGenerator>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl VoxelServer {
    /// Create a new server with the given configuration and processor.
    pub fn new(config: ServerConfig, processor: Arc<BatchProcessor>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            connections: Arc::new(ConnectionSet::new(config.max_connections)),
            id_gen: Arc::new(IdGenerator::new()),
            config,
            processor,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Bind to the configured address and run the accept loop.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("Listening on {}", self.config.bind_addr);
        self.run_with_listener(listener).await
    }

    /// Run the accept loop with a pre-bound listener (useful for tests).
    pub async fn run_with_listener(&self, listener: TcpListener) -> std::io::Result<()> {
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, peer_addr) = result?;
                    stream.set_nodelay(true)?;

                    let id = self.id_gen.next_id();
                    if !self.connections.insert(id).await {
                        tracing::warn!("Connection limit reached, rejecting {peer_addr}");
                        continue;
                    }

                    tracing::info!("Accepted connection {id:?} from {peer_addr}");

                    let connections = Arc::clone(&self.connections);
                    let processor = Arc::clone(&self.processor);
                    let frame = self.config.frame.clone();
                    let mut task_shutdown = self.shutdown_rx.clone();

                    tokio::spawn(async move {
                        Self::handle_connection(id, stream, processor, frame, &mut task_shutdown)
                            .await;
                        connections.remove(&id).await;
                        tracing::info!("Connection {id:?} closed");
                    });
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Server shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Signal the server to shut down gracefully.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Per-connection loop: read frames, run each through the processor,
    /// log the outcome. No replies are sent.
    async fn handle_connection(
        id: ConnectionId,
        mut stream: TcpStream,
        processor: Arc<BatchProcessor>,
        frame: FrameConfig,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                result = read_message(&mut stream, &frame) => {
                    match result {
                        Ok(text) => match processor.handle_message(&text) {
                            Ok(outcome) => {
                                tracing::info!(
                                    connection = id.0,
                                    applied = outcome.applied,
                                    skipped = outcome.skipped,
                                    regions = outcome.affected_regions.len(),
                                    "applied voxel batch"
                                );
                            }
                            Err(err) => {
                                tracing::warn!(connection = id.0, %err, "dropped message");
                            }
                        },
                        // UTF-8 failures consume a whole frame; keep reading.
                        Err(FrameError::InvalidUtf8) => {
                            tracing::warn!(connection = id.0, "dropped non-UTF-8 frame");
                        }
                        Err(FrameError::ConnectionClosed) => break,
                        Err(err) => {
                            tracing::warn!(connection = id.0, %err, "connection error");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
