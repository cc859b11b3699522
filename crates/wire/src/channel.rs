//! UDP command channel with single-exchange arbitration.
//!
//! The vehicle supports exactly one outstanding request/response exchange.
//! [`CommandChannel::send`] serializes callers behind an async mutex and
//! blocks until the response arrives or the fixed deadline elapses.
//! Background loops must use [`CommandChannel::try_send`], which fails fast
//! with [`WireError::ChannelBusy`] instead of queueing behind a command.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::debug;

use crate::command::{Command, Response};
use crate::error::{WireError, WireResult};

/// Default per-exchange deadline. The slowest SDK command (`land`) can take
/// several seconds to acknowledge.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(7);

const RESPONSE_BUF_SIZE: usize = 1024;

/// Command channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Address the vehicle listens on for commands
    pub vehicle_addr: SocketAddr,
    /// Local address to bind the command socket to
    pub bind_addr: SocketAddr,
    /// Fixed deadline applied to every exchange
    pub deadline: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            vehicle_addr: "192.168.10.1:8889".parse().expect("static address"),
            bind_addr: "0.0.0.0:8889".parse().expect("static address"),
            deadline: DEFAULT_DEADLINE,
        }
    }
}

/// Request/response transport enforcing one in-flight exchange.
#[derive(Debug)]
pub struct CommandChannel {
    socket: UdpSocket,
    vehicle_addr: SocketAddr,
    deadline: Duration,
    exchange: Mutex<()>,
    busy: AtomicBool,
    last_activity: StdMutex<Instant>,
}

impl CommandChannel {
    /// Bind the command socket.
    pub async fn bind(config: ChannelConfig) -> WireResult<Self> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        debug!(
            local = %socket.local_addr()?,
            vehicle = %config.vehicle_addr,
            "command channel bound"
        );
        Ok(Self {
            socket,
            vehicle_addr: config.vehicle_addr,
            deadline: config.deadline,
            exchange: Mutex::new(()),
            busy: AtomicBool::new(false),
            last_activity: StdMutex::new(Instant::now()),
        })
    }

    /// Send a command and wait for its response, queueing behind any exchange
    /// already in flight.
    pub async fn send(&self, command: &Command) -> WireResult<Response> {
        let _guard = self.exchange.lock().await;
        self.exchange_locked(command).await
    }

    /// Send a command only if the channel is idle.
    ///
    /// Background loops call this instead of [`send`](Self::send) so a stray
    /// liveness or telemetry query can never queue behind (or interleave
    /// with) a real command exchange.
    pub async fn try_send(&self, command: &Command) -> WireResult<Response> {
        let _guard = self
            .exchange
            .try_lock()
            .map_err(|_| WireError::ChannelBusy)?;
        self.exchange_locked(command).await
    }

    /// Whether an exchange currently holds the channel.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Time since the last completed exchange.
    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .map(|at| at.elapsed())
            .unwrap_or_default()
    }

    async fn exchange_locked(&self, command: &Command) -> WireResult<Response> {
        self.busy.store(true, Ordering::Release);
        let result = self.exchange_inner(command).await;
        self.busy.store(false, Ordering::Release);
        result
    }

    async fn exchange_inner(&self, command: &Command) -> WireResult<Response> {
        // A reply that arrived after its exchange timed out must not be
        // mistaken for the next command's response.
        self.drain_stale();

        let text = command.wire();
        self.socket
            .send_to(text.as_bytes(), self.vehicle_addr)
            .await?;

        let mut buf = [0u8; RESPONSE_BUF_SIZE];
        let received = tokio::time::timeout(self.deadline, self.socket.recv_from(&mut buf)).await;
        let (len, _peer) = match received {
            Ok(io_result) => io_result?,
            Err(_elapsed) => {
                return Err(WireError::Timeout {
                    command: text,
                    deadline_ms: self.deadline.as_millis() as u64,
                })
            }
        };

        if let Ok(mut at) = self.last_activity.lock() {
            *at = Instant::now();
        }

        let raw = std::str::from_utf8(&buf[..len])
            .map_err(|_| WireError::MalformedResponse("response is not UTF-8".to_string()))?;
        debug!(command = %text, response = %raw.trim(), "exchange complete");
        Response::parse(raw)
    }

    fn drain_stale(&self) {
        let mut scratch = [0u8; RESPONSE_BUF_SIZE];
        while self.socket.try_recv_from(&mut scratch).is_ok() {}
    }
}
