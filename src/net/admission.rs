//! Per-address admission control and per-connection message limits

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::config::AdmissionConfig;

/// Counts live sessions per originating IP and enforces the per-address cap.
///
/// Entries never sit at zero: the last release for an address removes it.
#[derive(Debug)]
pub struct AdmissionControl {
    max_sessions_per_ip: usize,
    ip_sessions: HashMap<IpAddr, usize>,
}

impl AdmissionControl {
    pub fn new(max_sessions_per_ip: usize) -> Self {
        Self {
            max_sessions_per_ip,
            ip_sessions: HashMap::new(),
        }
    }

    /// Configured per-address cap
    pub fn limit(&self) -> usize {
        self.max_sessions_per_ip
    }

    /// Admit one more session from `ip`, returning false when the cap is already held
    pub fn try_admit(&mut self, ip: IpAddr) -> bool {
        if self.sessions_from_ip(ip) >= self.max_sessions_per_ip {
            return false;
        }
        *self.ip_sessions.entry(ip).or_insert(0) += 1;
        true
    }

    /// Give back one admission for `ip`
    pub fn release(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_sessions.get_mut(&ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.ip_sessions.remove(&ip);
            }
        }
    }

    /// Live sessions admitted from an IP
    pub fn sessions_from_ip(&self, ip: IpAddr) -> usize {
        self.ip_sessions.get(&ip).copied().unwrap_or(0)
    }

    /// Number of addresses with at least one live session
    pub fn tracked_addresses(&self) -> usize {
        self.ip_sessions.len()
    }
}

impl Default for AdmissionControl {
    fn default() -> Self {
        Self::new(AdmissionConfig::default().max_sessions_per_ip)
    }
}

/// Errors from per-connection message checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageLimitError {
    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Too many violations, connection terminated")]
    ViolationLimitExceeded,
}

/// Sliding one-window message counter owned by a single connection task
#[derive(Debug)]
pub struct MessageRateLimiter {
    max_message_size: usize,
    max_per_window: u32,
    window: Duration,
    violations_before_disconnect: u32,
    message_count: u32,
    window_start: Instant,
    window_violated: bool,
    violations: u32,
}

impl MessageRateLimiter {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            max_message_size: config.max_message_size,
            max_per_window: config.max_messages_per_second,
            window: config.rate_limit_window,
            violations_before_disconnect: config.violations_before_disconnect,
            message_count: 0,
            window_start: Instant::now(),
            window_violated: false,
            violations: 0,
        }
    }

    /// Check one inbound frame of `size` bytes.
    ///
    /// `MessageTooLarge` and `RateLimitExceeded` mean drop the frame;
    /// `ViolationLimitExceeded` means drop the connection.
    pub fn check_message(&mut self, size: usize) -> Result<(), MessageLimitError> {
        if self.violations >= self.violations_before_disconnect {
            return Err(MessageLimitError::ViolationLimitExceeded);
        }

        if size > self.max_message_size {
            return Err(MessageLimitError::MessageTooLarge(size));
        }

        let now = Instant::now();
        if now.duration_since(self.window_start) >= self.window {
            self.window_start = now;
            self.message_count = 0;
            self.window_violated = false;
        }

        self.message_count += 1;
        if self.message_count > self.max_per_window {
            // One violation per offending window
            if !self.window_violated {
                self.window_violated = true;
                self.violations += 1;
            }
            return Err(MessageLimitError::RateLimitExceeded);
        }

        Ok(())
    }

    pub fn violation_count(&self) -> u32 {
        self.violations
    }
}
