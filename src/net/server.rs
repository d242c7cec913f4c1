//! WebSocket server
//!
//! Accepts TCP connections, upgrades them to WebSocket and runs one task per
//! connection. Each task owns a [`ConnectionHandler`] for dispatch and a writer
//! task draining the connection's bounded outbound queue.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::config::ServerConfig;
use crate::game::world::SharedWorld;
use crate::metrics::Metrics;
use crate::net::broadcast::start_broadcast_loop;
use crate::net::connection::{ConnectionManager, SharedConnections};
use crate::net::handler::ConnectionHandler;
use crate::net::protocol::encode;

#[cfg(feature = "dos_ratelimit")]
use crate::net::admission::{MessageLimitError, MessageRateLimiter};

/// WebSocket server
pub struct WebSocketServer {
    config: ServerConfig,
    listener: TcpListener,
    world: SharedWorld,
    connections: SharedConnections,
    metrics: Arc<Metrics>,
}

impl WebSocketServer {
    /// Bind the listening socket; port 0 picks a free port
    pub async fn bind(
        config: ServerConfig,
        world: SharedWorld,
        metrics: Arc<Metrics>,
    ) -> anyhow::Result<Self> {
        let addr = SocketAddr::new(config.bind_address, config.port);
        let listener = TcpListener::bind(addr).await?;
        let connections = ConnectionManager::new(config.admission.max_connections).into_shared();

        Ok(Self {
            config,
            listener,
            world,
            connections,
            metrics,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn connections(&self) -> SharedConnections {
        self.connections.clone()
    }

    /// Accept connections and broadcast state until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        tracing::info!("WebSocket server listening on {}", self.local_addr()?);

        let broadcaster = start_broadcast_loop(
            self.world.clone(),
            self.connections.clone(),
            self.metrics.clone(),
            self.config.tick_interval,
            shutdown.clone(),
        );

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            tracing::debug!("TCP connection from {}", peer);
                            let task = ConnectionTask {
                                world: self.world.clone(),
                                connections: self.connections.clone(),
                                metrics: self.metrics.clone(),
                                config: self.config.clone(),
                                shutdown: shutdown.clone(),
                            };
                            tokio::spawn(async move {
                                if let Err(e) = task.run(stream, peer).await {
                                    tracing::debug!("Connection {} ended with error: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::warn!("Accept error: {}", e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Shutdown requested, no longer accepting connections");
                        break;
                    }
                }
            }
        }

        if let Err(e) = broadcaster.await {
            tracing::warn!("Broadcast task ended abnormally: {}", e);
        }
        Ok(())
    }
}

/// Everything one connection task needs from the server
struct ConnectionTask {
    world: SharedWorld,
    connections: SharedConnections,
    metrics: Arc<Metrics>,
    config: ServerConfig,
    shutdown: watch::Receiver<bool>,
}

impl ConnectionTask {
    async fn run(mut self, stream: TcpStream, peer: SocketAddr) -> anyhow::Result<()> {
        let ws_stream = accept_async(stream).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (tx, mut rx) = mpsc::channel::<Message>(self.config.outbound_queue);

        let Some(id) = self.connections.lock().create(peer, tx.clone()) else {
            tracing::warn!(
                "Connection limit {} reached, closing {}",
                self.config.admission.max_connections,
                peer
            );
            Metrics::incr(&self.metrics.connections_rejected);
            ws_sender.send(Message::Close(None)).await?;
            return Ok(());
        };
        Metrics::incr(&self.metrics.connections_active);
        tracing::info!("Connection {} opened from {}", id, peer);

        let mut handler = ConnectionHandler::new(
            id,
            peer.ip(),
            self.world.clone(),
            self.connections.clone(),
            self.metrics.clone(),
        );

        // Writer: a failed socket write ends the task, which tears the connection down
        let mut writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(e) = ws_sender.send(message).await {
                    tracing::debug!("Write to conn {} failed: {}", id, e);
                    break;
                }
            }
            if let Err(e) = ws_sender.close().await {
                tracing::debug!("Close of conn {} failed: {}", id, e);
            }
        });

        #[cfg(feature = "dos_ratelimit")]
        let mut limiter = MessageRateLimiter::new(&self.config.admission);

        loop {
            tokio::select! {
                frame = ws_receiver.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Binary(data))) => {
                            tracing::debug!("Dropping {} byte binary frame on conn {}", data.len(), id);
                            Metrics::incr(&self.metrics.messages_dropped);
                            continue;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::debug!("Conn {} closed by peer", id);
                            break;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            tracing::debug!("Read from conn {} failed: {}", id, e);
                            break;
                        }
                    };

                    #[cfg(feature = "dos_ratelimit")]
                    match limiter.check_message(text.len()) {
                        Ok(()) => {}
                        Err(MessageLimitError::ViolationLimitExceeded) => {
                            tracing::warn!("Too many violations, disconnecting conn {}", id);
                            break;
                        }
                        Err(e) => {
                            tracing::debug!("Dropping frame on conn {}: {}", id, e);
                            Metrics::incr(&self.metrics.messages_dropped);
                            continue;
                        }
                    }

                    if let Some(reply) = handler.handle_text(&text) {
                        match encode(&reply) {
                            Ok(payload) => {
                                if tx.send(Message::Text(payload)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::warn!("Failed to encode reply: {}", e),
                        }
                    }
                }
                _ = &mut writer => {
                    tracing::debug!("Writer for conn {} stopped", id);
                    break;
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        let _ = tx.try_send(Message::Close(None));
                        break;
                    }
                }
            }
        }

        handler.close();
        drop(tx);
        if !writer.is_finished() {
            // Let a pending close frame go out, but never wait on a stalled peer
            if tokio::time::timeout(std::time::Duration::from_millis(100), &mut writer)
                .await
                .is_err()
            {
                writer.abort();
            }
        }
        Ok(())
    }
}
