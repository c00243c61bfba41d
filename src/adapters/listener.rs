//! TCP and MLLP socket listeners
//!
//! One accept loop per configured listener, one task per connection. MLLP
//! connections may carry any number of framed messages, each acknowledged
//! as soon as it has been processed. Raw TCP connections carry a single
//! message that ends at EOF or after the read timeout.

use crate::config::{GatewayConfig, ListenerConfig, ListenerKind};
use crate::core::ingest::{mllp, ConnectionMeta, IngestPipeline};
use crate::core::proxy;
use crate::domain::{GatewayError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

const READ_CHUNK: usize = 8 * 1024;

/// Default time allowed for in-flight connections after shutdown
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

enum ReadStatus {
    Data,
    Eof,
    TimedOut,
}

/// Accept loop for a single configured listener
pub struct ListenerServer {
    config: Arc<ListenerConfig>,
    pipeline: Arc<IngestPipeline>,
    drain_timeout: Duration,
}

impl ListenerServer {
    pub fn new(config: ListenerConfig, pipeline: Arc<IngestPipeline>) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Binds the configured address
    ///
    /// # Errors
    ///
    /// Returns a listener error if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener> {
        let address = self.config.address();
        TcpListener::bind(&address).await.map_err(|e| {
            GatewayError::Listener(format!(
                "Failed to bind listener '{}' on {}: {}",
                self.config.name, address, e
            ))
        })
    }

    /// Binds and serves until `shutdown` flips to `true`
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serves an already-bound socket until `shutdown` flips to `true`
    ///
    /// In-flight connections get the drain timeout to finish; whatever is
    /// still running afterwards is aborted.
    pub async fn serve(self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let local = listener.local_addr().ok();
        tracing::info!(
            listener = %self.config.name,
            kind = ?self.config.kind,
            address = ?local,
            proxy_protocol = self.config.proxy_protocol,
            "Listener started"
        );

        let mut connections = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        tracing::debug!(listener = %self.config.name, remote = %remote, "Connection accepted");
                        let meta = ConnectionMeta::new(Arc::clone(&self.config))
                            .with_addresses(Some(remote), stream.local_addr().ok());
                        let pipeline = Arc::clone(&self.pipeline);
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, meta, pipeline).await {
                                tracing::warn!(remote = %remote, error = %e, "Connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(listener = %self.config.name, error = %e, "Failed to accept connection");
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        tracing::info!(
            listener = %self.config.name,
            in_flight = connections.len(),
            "Listener stopping"
        );

        let drained = tokio::time::timeout(self.drain_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                listener = %self.config.name,
                remaining = connections.len(),
                "Drain timeout elapsed; aborting remaining connections"
            );
            connections.shutdown().await;
        }

        Ok(())
    }
}

/// Starts every configured listener and waits for all of them to stop
///
/// # Errors
///
/// Returns the first bind error; listeners that did bind are shut down.
pub async fn serve_all(
    config: &GatewayConfig,
    pipeline: Arc<IngestPipeline>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    if config.listeners.is_empty() {
        return Err(GatewayError::Configuration(
            "No listeners configured".to_string(),
        ));
    }

    let drain_timeout = Duration::from_secs(config.application.shutdown_timeout_secs);

    let mut bound = Vec::with_capacity(config.listeners.len());
    for listener_config in &config.listeners {
        let server = ListenerServer::new(listener_config.clone(), Arc::clone(&pipeline))
            .with_drain_timeout(drain_timeout);
        let socket = server.bind().await?;
        bound.push((server, socket));
    }

    let mut servers = JoinSet::new();
    for (server, socket) in bound {
        servers.spawn(server.serve(socket, shutdown.clone()));
    }

    while let Some(joined) = servers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Listener failed"),
            Err(e) => tracing::error!(error = %e, "Listener task panicked"),
        }
    }

    Ok(())
}

async fn handle_connection(
    mut stream: TcpStream,
    mut meta: ConnectionMeta,
    pipeline: Arc<IngestPipeline>,
) -> Result<()> {
    let listener = Arc::clone(&meta.listener);
    let read_timeout = Duration::from_secs(listener.read_timeout_seconds);
    let mut buffer = Vec::with_capacity(READ_CHUNK);

    match listener.kind {
        ListenerKind::Tcp => {
            loop {
                match read_some(&mut stream, &mut buffer, read_timeout).await? {
                    ReadStatus::Data if buffer.len() > listener.max_message_bytes => {
                        return reject_oversized(&mut stream, &listener).await;
                    }
                    ReadStatus::Data => {}
                    ReadStatus::Eof | ReadStatus::TimedOut => break,
                }
            }
            if buffer.is_empty() {
                return Ok(());
            }

            let outcome = pipeline.handle(&buffer, &meta).await;
            stream.write_all(&outcome.response).await?;
            stream.shutdown().await?;
        }
        ListenerKind::Mllp => {
            let mut first = true;
            loop {
                // the proxy header may contain framing bytes, so skip it
                let scan_from = if first && listener.proxy_protocol {
                    proxy::header_len(&buffer).unwrap_or(0).min(buffer.len())
                } else {
                    0
                };

                if let Some(end) = mllp::find_frame_end(&buffer[scan_from..]) {
                    let end = scan_from + end;
                    let consumed = match buffer.get(end + 1) {
                        Some(&mllp::CARRIAGE_RETURN) => end + 2,
                        _ => end + 1,
                    };
                    let message: Vec<u8> = buffer.drain(..consumed).collect();

                    let outcome = pipeline.handle(&message, &meta).await;
                    if meta.proxied.is_none() {
                        meta.proxied = outcome.connection.clone();
                    }
                    stream.write_all(&outcome.response).await?;
                    first = false;
                    continue;
                }

                if buffer.len() > listener.max_message_bytes {
                    return reject_oversized(&mut stream, &listener).await;
                }

                match read_some(&mut stream, &mut buffer, read_timeout).await? {
                    ReadStatus::Data => {}
                    ReadStatus::Eof | ReadStatus::TimedOut => {
                        if buffer.iter().any(|b| !b.is_ascii_whitespace()) {
                            tracing::warn!(
                                listener = %listener.name,
                                bytes = buffer.len(),
                                "Connection closed with an incomplete MLLP frame"
                            );
                            let outcome = pipeline.handle(&buffer, &meta).await;
                            // best effort; the peer may already be gone
                            let _ = stream.write_all(&outcome.response).await;
                        }
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

async fn read_some(
    stream: &mut TcpStream,
    buffer: &mut Vec<u8>,
    timeout: Duration,
) -> Result<ReadStatus> {
    let mut chunk = [0u8; READ_CHUNK];
    match tokio::time::timeout(timeout, stream.read(&mut chunk)).await {
        Err(_) => Ok(ReadStatus::TimedOut),
        Ok(Ok(0)) => Ok(ReadStatus::Eof),
        Ok(Ok(read)) => {
            buffer.extend_from_slice(&chunk[..read]);
            Ok(ReadStatus::Data)
        }
        Ok(Err(e)) => Err(e.into()),
    }
}

async fn reject_oversized(stream: &mut TcpStream, listener: &ListenerConfig) -> Result<()> {
    tracing::warn!(
        listener = %listener.name,
        limit = listener.max_message_bytes,
        "Message exceeds max_message_bytes; closing connection"
    );
    let response = match listener.kind {
        ListenerKind::Mllp => mllp::wrap_frame(mllp::build_nack().as_bytes()),
        ListenerKind::Tcp => format!(
            "Message exceeds {} bytes on port {}\n",
            listener.max_message_bytes, listener.port
        )
        .into_bytes(),
    };
    stream.write_all(&response).await?;
    stream.shutdown().await?;
    Ok(())
}
