//! Shared harness utilities: a scripted UDP vehicle simulator and session
//! builders pointed at it.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tokio::net::UdpSocket;

use tetherlink_flight::{Session, SessionConfig};
use tetherlink_wire::ChannelConfig;

static INIT_TRACING: Once = Once::new();

/// Install a fmt subscriber once per test binary, honoring `RUST_LOG`.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Simulator behavior knobs.
#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    /// Battery percentage reported by queries
    pub battery_pct: u8,
    /// Height reached right after `takeoff`
    pub hover_height_cm: u32,
    /// Artificial delay before every response
    pub response_delay: Duration,
    /// Command verbs answered with `error`
    pub reject: Vec<&'static str>,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            battery_pct: 87,
            hover_height_cm: 60,
            response_delay: Duration::ZERO,
            reject: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct SimState {
    battery_pct: u8,
    hover_height_cm: u32,
    height_cm: u32,
    flight_time_s: u32,
    reject: Vec<&'static str>,
    log: Vec<String>,
}

impl SimState {
    fn respond(&mut self, text: &str) -> String {
        self.log.push(text.to_string());

        let mut parts = text.split_whitespace();
        let verb = parts.next().unwrap_or("");
        let arg: u32 = parts.next().and_then(|a| a.parse().ok()).unwrap_or(0);

        if self.reject.contains(&verb) {
            return "error".to_string();
        }

        match verb {
            "command" => "ok".to_string(),
            "takeoff" => {
                self.height_cm = self.hover_height_cm;
                "ok".to_string()
            }
            "land" => {
                self.height_cm = 0;
                "ok".to_string()
            }
            "up" => {
                self.height_cm += arg;
                "ok".to_string()
            }
            "down" => {
                self.height_cm = self.height_cm.saturating_sub(arg);
                "ok".to_string()
            }
            "forward" | "back" | "left" | "right" | "cw" | "ccw" | "speed" => "ok".to_string(),
            "battery?" => self.battery_pct.to_string(),
            "state?" => format!(
                "bat:{};h:{};temp:62;wifi:90;time:{}",
                self.battery_pct, self.height_cm, self.flight_time_s
            ),
            _ => "error".to_string(),
        }
    }
}

/// A scripted vehicle on a loopback UDP socket, recording every command it
/// receives.
pub struct VehicleSimulator {
    addr: SocketAddr,
    state: Arc<Mutex<SimState>>,
}

impl VehicleSimulator {
    /// Spawn a simulator with default options.
    pub async fn spawn() -> Self {
        Self::spawn_with(SimulatorOptions::default()).await
    }

    /// Spawn a simulator with explicit options.
    pub async fn spawn_with(options: SimulatorOptions) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("bind simulator socket");
        let addr = socket.local_addr().expect("simulator local addr");

        let state = Arc::new(Mutex::new(SimState {
            battery_pct: options.battery_pct,
            hover_height_cm: options.hover_height_cm,
            height_cm: 0,
            flight_time_s: 0,
            reject: options.reject.clone(),
            log: Vec::new(),
        }));

        let loop_state = Arc::clone(&state);
        let delay = options.response_delay;
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                let text = String::from_utf8_lossy(&buf[..len]).trim().to_string();
                let reply = {
                    let mut sim = loop_state.lock().expect("simulator state lock");
                    sim.respond(&text)
                };
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let _ = socket.send_to(reply.as_bytes(), peer).await;
            }
        });

        Self { addr, state }
    }

    /// Address the simulator listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Every command received so far, in order.
    pub fn command_log(&self) -> Vec<String> {
        self.state.lock().expect("simulator state lock").log.clone()
    }

    /// How many received commands start with `verb`.
    pub fn count(&self, verb: &str) -> usize {
        self.command_log()
            .iter()
            .filter(|line| line.split_whitespace().next() == Some(verb))
            .count()
    }

    /// Change the reported battery level.
    pub fn set_battery(&self, battery_pct: u8) {
        self.state
            .lock()
            .expect("simulator state lock")
            .battery_pct = battery_pct;
    }
}

/// Session configuration pointed at the simulator, with short intervals so
/// tests settle quickly. Telemetry polls slower than the keepalive so the
/// keepalive's last-activity suppression window can actually open.
pub fn test_config(vehicle_addr: SocketAddr) -> SessionConfig {
    SessionConfig {
        channel: ChannelConfig {
            vehicle_addr,
            bind_addr: "127.0.0.1:0".parse().expect("static address"),
            deadline: Duration::from_secs(2),
        },
        telemetry_poll_interval: Duration::from_millis(300),
        keepalive_interval: Duration::from_millis(100),
        takeoff_timeout: Duration::from_secs(2),
        takeoff_confirm_height_cm: 30,
        hover_height_cm: 80,
        battery_floor_pct: 20,
        ground_height_cm: 20,
    }
}

/// Connect a session to the simulator.
pub async fn connect_session(sim: &VehicleSimulator) -> Session {
    init_tracing();
    Session::connect(test_config(sim.addr()))
        .await
        .expect("session connect")
}

/// Wait until the session has published at least one telemetry sample.
pub async fn wait_for_telemetry(session: &Session) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while session.telemetry().await.is_none() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "no telemetry sample arrived within the deadline"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
