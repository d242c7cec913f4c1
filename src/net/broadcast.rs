//! Fixed-rate state broadcast
//!
//! Each tick takes one snapshot of the world, serializes it once and queues the
//! same frame to every open connection. Queues are bounded and never awaited,
//! so a stalled client only loses its own frames.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::constants::broadcast::STATS_INTERVAL_SECS;
use crate::game::world::SharedWorld;
use crate::metrics::Metrics;
use crate::net::connection::{BroadcastReport, SharedConnections};
use crate::net::protocol::{encode, EncodeError, ServerMessage};

/// Snapshot and encode the world as one `state` frame.
///
/// The world lock is held for the snapshot and encoding only.
pub fn encode_state(world: &SharedWorld) -> Result<(String, usize), EncodeError> {
    let world = world.lock();
    let snapshot = world.snapshot();
    let users = snapshot.len();
    let payload = encode(&ServerMessage::state(snapshot))?;
    Ok((payload, users))
}

/// Run one broadcast tick
pub fn broadcast_tick(
    world: &SharedWorld,
    connections: &SharedConnections,
    metrics: &Metrics,
) -> Result<BroadcastReport, EncodeError> {
    let (payload, users) = encode_state(world)?;
    Metrics::set(&metrics.sessions_active, users as u64);

    let report = connections.lock().broadcast_text(&payload);

    Metrics::add(&metrics.messages_sent, report.queued as u64);
    Metrics::add(&metrics.bytes_sent, (payload.len() * report.queued) as u64);
    Metrics::add(&metrics.sends_skipped, report.skipped as u64);
    for id in &report.closed {
        debug!("Dropped conn {} from broadcast: writer closed", id);
        Metrics::decr(&metrics.connections_active);
    }
    Ok(report)
}

/// Spawn the broadcast task; it stops when `shutdown` flips to true
pub fn start_broadcast_loop(
    world: SharedWorld,
    connections: SharedConnections,
    metrics: Arc<Metrics>,
    tick_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Broadcast loop started every {:?}", tick_interval);
        let start = Instant::now();
        let stats_every = (Duration::from_secs(STATS_INTERVAL_SECS).as_millis()
            / tick_interval.as_millis().max(1))
        .max(1) as u64;
        let mut tick_count: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            tick_count += 1;

            let tick_start = Instant::now();
            if let Err(e) = broadcast_tick(&world, &connections, &metrics) {
                warn!("Broadcast tick failed: {}", e);
                continue;
            }
            metrics.record_tick_time(tick_start.elapsed());

            if tick_count % stats_every == 0 {
                let sessions = world.lock().session_count();
                let conns = connections.lock().count();
                info!(
                    "Broadcast: {}s, tick {}, {} sessions on {} connections | p95 {}us",
                    start.elapsed().as_secs(),
                    tick_count,
                    sessions,
                    conns,
                    metrics.tick_time_p95_us.load(std::sync::atomic::Ordering::Relaxed)
                );
            }
        }

        info!("Broadcast loop stopped after {} ticks", tick_count);
    })
}
