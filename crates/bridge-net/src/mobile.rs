//! Mobile Client (spec §4.C): pulls face frames from the mobile source
//! over UDP and raises them as events. Owns its socket; transport errors
//! are logged and counted, never propagated — the orchestrator's recovery
//! loop decides whether to reinitialize based on `stats().is_healthy`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use bridge_config::MobileClientConfig;
use bridge_core::{Frame, ServiceStats};

use crate::mobile_wire::{decode_frame, HeartbeatRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobileStatus {
    Initializing,
    Connected,
    ReceivingData,
    SendingRequests,
    InitializationFailed,
    SendError,
    ReceiveError,
    ProcessingError,
    Disconnected,
}

impl MobileStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Connected => "Connected",
            Self::ReceivingData => "ReceivingData",
            Self::SendingRequests => "SendingRequests",
            Self::InitializationFailed => "InitializationFailed",
            Self::SendError => "SendError",
            Self::ReceiveError => "ReceiveError",
            Self::ProcessingError => "ProcessingError",
            Self::Disconnected => "Disconnected",
        }
    }
}

#[derive(Default)]
struct Counters {
    frames_received: AtomicI64,
    send_errors: AtomicI64,
    receive_errors: AtomicI64,
    decode_errors: AtomicI64,
}

/// Pulls face frames from the mobile source and raises `FrameReceived`
/// events on `frame_tx`. The channel is bounded to 1 and uses `try_send`
/// so a frame still being processed downstream causes the next one to be
/// dropped rather than queued (spec §5: "drop latest").
pub struct MobileClient {
    config: MobileClientConfig,
    socket: Mutex<Option<Arc<UdpSocket>>>,
    status: Mutex<MobileStatus>,
    counters: Counters,
    started_at: Mutex<Option<Instant>>,
    last_frame_at: Mutex<Option<Instant>>,
    last_error: Mutex<Option<String>>,
    frame_tx: mpsc::Sender<Frame>,
}

impl MobileClient {
    pub fn new(config: MobileClientConfig, frame_tx: mpsc::Sender<Frame>) -> Self {
        Self {
            config,
            socket: Mutex::new(None),
            status: Mutex::new(MobileStatus::Initializing),
            counters: Counters::default(),
            started_at: Mutex::new(None),
            last_frame_at: Mutex::new(None),
            last_error: Mutex::new(None),
            frame_tx,
        }
    }

    /// Bind the local datagram socket. Idempotent: if already bound, this
    /// is a no-op success (spec §4.C).
    pub async fn try_initialize(&self) -> bool {
        if self.socket.lock().unwrap().is_some() {
            return true;
        }
        match UdpSocket::bind(("0.0.0.0", self.config.listen_port)).await {
            Ok(socket) => {
                *self.socket.lock().unwrap() = Some(Arc::new(socket));
                *self.status.lock().unwrap() = MobileStatus::Connected;
                self.started_at.lock().unwrap().get_or_insert_with(Instant::now);
                tracing::info!(domain = "net", port = self.config.listen_port, "mobile client bound");
                true
            }
            Err(e) => {
                *self.status.lock().unwrap() = MobileStatus::InitializationFailed;
                *self.last_error.lock().unwrap() = Some(e.to_string());
                tracing::warn!(domain = "net", error = %e, "mobile client bind failed");
                false
            }
        }
    }

    /// Runs the heartbeat request loop and the receive loop concurrently
    /// until `cancel` fires. Requires a prior successful `try_initialize`.
    pub async fn run(&self, cancel: CancellationToken) {
        let Some(socket) = self.socket.lock().unwrap().clone() else {
            tracing::warn!(domain = "net", "mobile client run() called before try_initialize");
            return;
        };

        let remote: Option<SocketAddr> =
            format!("{}:{}", self.config.iphone_ip, self.config.iphone_port)
                .parse()
                .ok();

        tokio::join!(
            self.request_loop(Arc::clone(&socket), remote, cancel.clone()),
            self.receive_loop(socket, cancel),
        );
    }

    async fn request_loop(
        &self,
        socket: Arc<UdpSocket>,
        remote: Option<SocketAddr>,
        cancel: CancellationToken,
    ) {
        let Some(remote) = remote else {
            tracing::warn!(domain = "net", ip = %self.config.iphone_ip, port = self.config.iphone_port, "invalid mobile source address, heartbeat loop disabled");
            return;
        };
        let local_port = self.config.listen_port;
        let interval = Duration::from_secs_f64(self.config.request_interval_seconds.max(0.01));
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs_f64())
                        .unwrap_or(0.0);
                    let payload = HeartbeatRequest::new("bridge-daemon", local_port, now);
                    let json = payload.to_json();
                    *self.status.lock().unwrap() = MobileStatus::SendingRequests;
                    if let Err(e) = socket.send_to(json.as_bytes(), remote).await {
                        self.counters.send_errors.fetch_add(1, Ordering::Relaxed);
                        *self.status.lock().unwrap() = MobileStatus::SendError;
                        *self.last_error.lock().unwrap() = Some(e.to_string());
                        tracing::warn!(domain = "net", error = %e, "heartbeat send failed");
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    }

    async fn receive_loop(&self, socket: Arc<UdpSocket>, cancel: CancellationToken) {
        let timeout_dur = Duration::from_millis(self.config.receive_timeout_ms.max(1));
        let mut buf = vec![0u8; 8192];

        loop {
            let recv = tokio::time::timeout(timeout_dur, socket.recv_from(&mut buf));
            tokio::select! {
                result = recv => self.handle_receive_result(result, &buf),
                _ = cancel.cancelled() => break,
            }
        }
    }

    fn handle_receive_result(
        &self,
        result: Result<std::io::Result<(usize, SocketAddr)>, tokio::time::error::Elapsed>,
        buf: &[u8],
    ) {
        match result {
            Ok(Ok((n, _src))) => match decode_frame(&buf[..n]) {
                Ok(frame) => {
                    self.counters.frames_received.fetch_add(1, Ordering::Relaxed);
                    *self.last_frame_at.lock().unwrap() = Some(Instant::now());
                    *self.status.lock().unwrap() = MobileStatus::ReceivingData;
                    if self.frame_tx.try_send(frame).is_err() {
                        tracing::debug!(domain = "net", "frame dropped, previous frame still in flight");
                    }
                }
                Err(e) => {
                    self.counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                    *self.status.lock().unwrap() = MobileStatus::ProcessingError;
                    tracing::warn!(domain = "net", error = %e, "failed to decode mobile frame");
                }
            },
            Ok(Err(e)) => {
                self.counters.receive_errors.fetch_add(1, Ordering::Relaxed);
                *self.status.lock().unwrap() = MobileStatus::ReceiveError;
                *self.last_error.lock().unwrap() = Some(e.to_string());
            }
            Err(_elapsed) => {
                // Receive timeout: normal when the mobile source is idle, no-op.
            }
        }
    }

    pub fn stats(&self) -> ServiceStats {
        let status = *self.status.lock().unwrap();
        let uptime = self
            .started_at
            .lock()
            .unwrap()
            .map(|t| t.elapsed())
            .unwrap_or_default();
        let healthy_window =
            Duration::from_secs_f64(self.config.request_interval_seconds.max(0.01) * 3.0);
        let is_healthy = self
            .last_frame_at
            .lock()
            .unwrap()
            .map(|t| t.elapsed() <= healthy_window)
            .unwrap_or(false);

        let mut counters = HashMap::new();
        counters.insert(
            "frames_received".to_string(),
            self.counters.frames_received.load(Ordering::Relaxed),
        );
        counters.insert(
            "send_errors".to_string(),
            self.counters.send_errors.load(Ordering::Relaxed),
        );
        counters.insert(
            "receive_errors".to_string(),
            self.counters.receive_errors.load(Ordering::Relaxed),
        );
        counters.insert(
            "decode_errors".to_string(),
            self.counters.decode_errors.load(Ordering::Relaxed),
        );

        ServiceStats {
            name: "MobileClient".to_string(),
            status: status.as_str().to_string(),
            is_healthy,
            uptime,
            counters,
            current_entity: None,
            last_error: self.last_error.lock().unwrap().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn try_initialize_binds_and_is_idempotent() {
        let (tx, _rx) = mpsc::channel(1);
        let mut config = MobileClientConfig::default();
        config.listen_port = 0;
        let client = MobileClient::new(config, tx);

        assert!(client.try_initialize().await);
        assert!(client.try_initialize().await);
        assert_eq!(client.stats().status, "Connected");
    }

    #[tokio::test]
    async fn stats_unhealthy_before_any_frame_received() {
        let (tx, _rx) = mpsc::channel(1);
        let config = MobileClientConfig::default();
        let client = MobileClient::new(config, tx);
        assert!(!client.stats().is_healthy);
    }

    #[test]
    fn status_as_str_round_trips_all_variants() {
        let variants = [
            MobileStatus::Initializing,
            MobileStatus::Connected,
            MobileStatus::ReceivingData,
            MobileStatus::SendingRequests,
            MobileStatus::InitializationFailed,
            MobileStatus::SendError,
            MobileStatus::ReceiveError,
            MobileStatus::ProcessingError,
            MobileStatus::Disconnected,
        ];
        for v in variants {
            assert!(!v.as_str().is_empty());
        }
    }
}
