//! Prometheus-compatible metrics endpoint
//!
//! Exposes server counters in Prometheus text format and as JSON.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

const TICK_HISTORY_LEN: usize = 1000;

/// Metrics registry for the server
#[derive(Debug)]
pub struct Metrics {
    // Connections and sessions
    pub connections_active: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub sessions_active: AtomicU64,
    pub joins_accepted: AtomicU64,
    pub joins_rejected: AtomicU64,

    // Movement
    pub moves_applied: AtomicU64,
    pub moves_blocked: AtomicU64,

    // Inbound traffic
    pub messages_received: AtomicU64,
    pub messages_dropped: AtomicU64,
    pub bytes_received: AtomicU64,

    // Broadcast
    pub tick_count: AtomicU64,
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub messages_sent: AtomicU64,
    pub sends_skipped: AtomicU64,
    pub bytes_sent: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentiles
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
            sessions_active: AtomicU64::new(0),
            joins_accepted: AtomicU64::new(0),
            joins_rejected: AtomicU64::new(0),
            moves_applied: AtomicU64::new(0),
            moves_blocked: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            sends_skipped: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY_LEN)),
        }
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn set(gauge: &AtomicU64, value: u64) {
        gauge.store(value, Ordering::Relaxed);
    }

    /// Saturating decrement for gauges
    pub fn decr(gauge: &AtomicU64) {
        let _ = gauge.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    /// Record how long one broadcast tick took and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let last = sorted.len() - 1;
            let p95_idx = ((sorted.len() as f32 * 0.95) as usize).min(last);
            let p99_idx = ((sorted.len() as f32 * 0.99) as usize).min(last);

            self.tick_time_p95_us.store(sorted[p95_idx], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted[last], Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Prometheus text exposition
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("roam_connections_active", "Open WebSocket connections", "gauge",
            self.connections_active.load(Ordering::Relaxed));
        metric!("roam_connections_rejected_total", "Connections closed at capacity", "counter",
            self.connections_rejected.load(Ordering::Relaxed));
        metric!("roam_sessions_active", "Joined sessions", "gauge",
            self.sessions_active.load(Ordering::Relaxed));
        metric!("roam_joins_accepted_total", "Successful joins", "counter",
            self.joins_accepted.load(Ordering::Relaxed));
        metric!("roam_joins_rejected_total", "Joins refused for duplicate name or address cap", "counter",
            self.joins_rejected.load(Ordering::Relaxed));

        metric!("roam_moves_applied_total", "Moves that changed a position", "counter",
            self.moves_applied.load(Ordering::Relaxed));
        metric!("roam_moves_blocked_total", "Moves reverted by collision", "counter",
            self.moves_blocked.load(Ordering::Relaxed));

        metric!("roam_messages_received_total", "Inbound text frames", "counter",
            self.messages_received.load(Ordering::Relaxed));
        metric!("roam_messages_dropped_total", "Inbound frames dropped as malformed or rate limited", "counter",
            self.messages_dropped.load(Ordering::Relaxed));
        metric!("roam_bytes_received_total", "Inbound payload bytes", "counter",
            self.bytes_received.load(Ordering::Relaxed));

        metric!("roam_tick_count", "Broadcast ticks run", "counter",
            self.tick_count.load(Ordering::Relaxed));
        metric!("roam_tick_time_microseconds", "Last tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("roam_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("roam_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("roam_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("roam_messages_sent_total", "State frames queued to clients", "counter",
            self.messages_sent.load(Ordering::Relaxed));
        metric!("roam_sends_skipped_total", "State frames skipped for a full client queue", "counter",
            self.sends_skipped.load(Ordering::Relaxed));
        metric!("roam_bytes_sent_total", "Outbound payload bytes", "counter",
            self.bytes_sent.load(Ordering::Relaxed));

        metric!("roam_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// JSON view of the same counters
    pub fn to_json(&self) -> String {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        serde_json::json!({
            "connections": {
                "active": load(&self.connections_active),
                "rejected": load(&self.connections_rejected),
            },
            "sessions": {
                "active": load(&self.sessions_active),
                "joins_accepted": load(&self.joins_accepted),
                "joins_rejected": load(&self.joins_rejected),
            },
            "movement": {
                "applied": load(&self.moves_applied),
                "blocked": load(&self.moves_blocked),
            },
            "network": {
                "messages_received": load(&self.messages_received),
                "messages_dropped": load(&self.messages_dropped),
                "bytes_received": load(&self.bytes_received),
                "messages_sent": load(&self.messages_sent),
                "sends_skipped": load(&self.sends_skipped),
                "bytes_sent": load(&self.bytes_sent),
            },
            "broadcast": {
                "tick_count": load(&self.tick_count),
                "tick_time_us": load(&self.tick_time_us),
                "tick_time_p95_us": load(&self.tick_time_p95_us),
                "tick_time_p99_us": load(&self.tick_time_p99_us),
                "tick_time_max_us": load(&self.tick_time_max_us),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
        .to_string()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}

/// Route one request line to a full HTTP response
fn route(metrics: &Metrics, request: &str) -> String {
    let path = request
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("GET "))
        .and_then(|rest| rest.split_whitespace().next());

    match path {
        Some("/metrics") => http_response(
            "200 OK",
            "text/plain; version=0.0.4",
            &metrics.to_prometheus(),
        ),
        Some("/metrics/json") | Some("/json") => {
            http_response("200 OK", "application/json", &metrics.to_json())
        }
        Some("/health") | Some("/") => http_response("200 OK", "text/plain", "OK"),
        _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
    }
}

/// Serve metrics over plain HTTP until the listener fails
pub async fn start_metrics_server(
    metrics: Arc<Metrics>,
    bind_address: IpAddr,
    port: u16,
) -> anyhow::Result<()> {
    let addr = SocketAddr::new(bind_address, port);
    let listener = TcpListener::bind(addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = route(&metrics, &request);

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
