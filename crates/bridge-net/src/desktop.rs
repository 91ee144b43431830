//! Desktop Client (spec §4.D): maintains an authenticated full-duplex
//! connection to the avatar application and injects parameter values. The
//! state machine below implements the nine named states and the
//! transition table verbatim.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use bridge_config::DesktopClientConfig;
use bridge_core::engine::ParameterDefinition;
use bridge_core::{DesktopFrame, ServiceStats};

use crate::desktop_wire::{
    ApiRequest, ApiResponse, AuthRequestData, AuthResponseData, DiscoveryBeacon,
    InjectParameterDataRequest, ParameterCreationData, ParameterListResponseData, ParameterValue,
    TokenRequestData, TokenResponseData,
};
use crate::token;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopStatus {
    Initializing,
    DiscoveringPort,
    Connecting,
    Authenticating,
    Connected,
    PortDiscoveryFailed,
    ConnectionFailed,
    AuthenticationFailed,
    InitializationFailed,
    SendError,
    Disconnected,
}

impl DesktopStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::DiscoveringPort => "DiscoveringPort",
            Self::Connecting => "Connecting",
            Self::Authenticating => "Authenticating",
            Self::Connected => "Connected",
            Self::PortDiscoveryFailed => "PortDiscoveryFailed",
            Self::ConnectionFailed => "ConnectionFailed",
            Self::AuthenticationFailed => "AuthenticationFailed",
            Self::InitializationFailed => "InitializationFailed",
            Self::SendError => "SendError",
            Self::Disconnected => "Disconnected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailPhase {
    Connection,
    Authentication,
}

#[derive(Debug, Clone, PartialEq)]
enum DesktopState {
    Disconnected,
    Discovering,
    Connecting,
    AcquiringToken,
    Authenticating,
    Connected,
    SendFailing,
    Closing,
    Failed(FailPhase),
}

#[derive(Default)]
struct Counters {
    messages_sent: AtomicI64,
    connection_attempts: AtomicI64,
    failed_connections: AtomicI64,
}

/// `send_frame` preconditions are programming errors (spec §7): surfaced
/// as an immediate typed failure, never recovered locally.
#[derive(Debug, thiserror::Error)]
pub enum SendFrameError {
    #[error("send_frame called while not Connected")]
    NotConnected,
    #[error("transport error: {0}")]
    Transport(String),
}

pub struct DesktopClient {
    config: DesktopClientConfig,
    transport: Option<WsStream>,
    state: DesktopState,
    token: Option<String>,
    counters: Counters,
    request_counter: AtomicU64,
    started_at: Option<Instant>,
    last_error: Option<String>,
    config_changed: bool,
}

impl DesktopClient {
    pub fn new(config: DesktopClientConfig) -> Self {
        let token = token::load(&config.token_file_path);
        Self {
            config,
            transport: None,
            state: DesktopState::Disconnected,
            token,
            counters: Counters::default(),
            request_counter: AtomicU64::new(0),
            started_at: None,
            last_error: None,
            config_changed: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == DesktopState::Connected
    }

    pub fn mark_config_changed(&mut self) {
        self.config_changed = true;
    }

    /// A config mutation affecting `host`/`port`/`plugin_*` drops the
    /// current connection: `Connected → Closing → Disconnected`, ready for
    /// the recovery loop to reinitialize (spec §4.D).
    pub fn apply_config(&mut self, config: DesktopClientConfig) {
        self.config = config;
        self.config_changed = true;
        if self.state == DesktopState::Connected {
            self.state = DesktopState::Closing;
        }
        self.transport = None;
        self.state = DesktopState::Disconnected;
    }

    /// Drives the state machine from `Disconnected` through discovery,
    /// connect, and auth to `Connected`, or to `Failed` on the first hard
    /// error. Transport recreation: any call that finds `self.transport`
    /// cleared (set on close/error) opens a fresh connection.
    pub async fn try_initialize(&mut self) -> bool {
        self.started_at.get_or_insert_with(Instant::now);
        self.config_changed = false;

        let port = if self.config.discovery_enabled {
            self.state = DesktopState::Discovering;
            self.discover_port().await.unwrap_or(self.config.port)
        } else {
            self.config.port
        };

        self.state = DesktopState::Connecting;
        self.counters.connection_attempts.fetch_add(1, Ordering::Relaxed);
        match self.connect(port).await {
            Ok(ws) => self.transport = Some(ws),
            Err(e) => {
                self.counters.failed_connections.fetch_add(1, Ordering::Relaxed);
                self.last_error = Some(e.to_string());
                self.state = DesktopState::Failed(FailPhase::Connection);
                tracing::warn!(domain = "net", error = %e, "desktop connect failed");
                return false;
            }
        }

        if self.token.is_some() {
            self.state = DesktopState::Authenticating;
            match self.authenticate().await {
                Ok(true) => {
                    self.state = DesktopState::Connected;
                    return true;
                }
                Ok(false) => {
                    tracing::info!(domain = "net", "cached auth token rejected, re-acquiring");
                    self.token = None;
                    let _ = token::clear(&self.config.token_file_path);
                }
                Err(e) => {
                    self.last_error = Some(e.to_string());
                    self.state = DesktopState::Failed(FailPhase::Authentication);
                    return false;
                }
            }
        }

        self.state = DesktopState::AcquiringToken;
        match self.acquire_token().await {
            Ok(tok) => {
                if let Err(e) = token::save(&self.config.token_file_path, &tok) {
                    tracing::warn!(domain = "net", error = %e, "failed to persist auth token");
                }
                self.token = Some(tok);
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                self.state = DesktopState::Failed(FailPhase::Authentication);
                return false;
            }
        }

        self.state = DesktopState::Authenticating;
        match self.authenticate().await {
            Ok(true) => {
                self.state = DesktopState::Connected;
                true
            }
            Ok(false) => {
                self.token = None;
                let _ = token::clear(&self.config.token_file_path);
                self.state = DesktopState::Failed(FailPhase::Authentication);
                false
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                self.state = DesktopState::Failed(FailPhase::Authentication);
                false
            }
        }
    }

    async fn discover_port(&mut self) -> Option<u16> {
        let socket = match UdpSocket::bind(("0.0.0.0", self.config.discovery_port)).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(domain = "net", error = %e, "discovery bind failed");
                return None;
            }
        };
        let _ = socket.set_broadcast(true);

        let deadline = Duration::from_millis(self.config.connection_timeout_ms);
        let started = Instant::now();
        let mut buf = vec![0u8; 4096];

        while started.elapsed() < deadline {
            let remaining = deadline.saturating_sub(started.elapsed());
            match timeout(remaining, socket.recv_from(&mut buf)).await {
                Ok(Ok((n, _src))) => {
                    if let Ok(beacon) = serde_json::from_slice::<DiscoveryBeacon>(&buf[..n]) {
                        if beacon.active
                            && !beacon.instance_id.is_empty()
                            && beacon.window_title.contains(&self.config.window_title_marker)
                        {
                            return Some(beacon.port);
                        }
                    }
                }
                _ => break,
            }
        }
        None
    }

    async fn connect(&mut self, port: u16) -> anyhow::Result<WsStream> {
        let url = format!("ws://{}:{}/", self.config.host, port);
        let budget = Duration::from_millis(self.config.connection_timeout_ms);
        let (ws, _response) = timeout(budget, connect_async(&url)).await??;
        Ok(ws)
    }

    async fn roundtrip<T: serde::Serialize>(
        &mut self,
        message_type: &'static str,
        data: T,
    ) -> anyhow::Result<ApiResponse> {
        let budget = Duration::from_millis(self.config.connection_timeout_ms);
        let request_id = format!("bridge-net-{}", self.request_counter.fetch_add(1, Ordering::Relaxed));
        let request = ApiRequest::new(request_id.clone(), message_type, data);

        let ws = self
            .transport
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no transport open"))?;
        timeout(budget, ws.send(Message::Text(request.to_text().into())))
            .await
            .map_err(|_| anyhow::anyhow!("send timed out"))??;

        loop {
            let next = timeout(budget, ws.next())
                .await
                .map_err(|_| anyhow::anyhow!("response timed out"))?
                .ok_or_else(|| anyhow::anyhow!("connection closed by remote"))??;

            match next {
                Message::Text(text) => {
                    let response: ApiResponse = serde_json::from_str(&text)?;
                    if response.request_id == request_id {
                        return Ok(response);
                    }
                }
                Message::Close(_) => {
                    self.transport = None;
                    anyhow::bail!("transport closed by remote");
                }
                _ => continue,
            }
        }
    }

    async fn acquire_token(&mut self) -> anyhow::Result<String> {
        let plugin_name = self.config.plugin_name.clone();
        let plugin_developer = self.config.plugin_developer.clone();
        let response = self
            .roundtrip(
                "AuthenticationTokenRequest",
                TokenRequestData {
                    plugin_name: &plugin_name,
                    plugin_developer: &plugin_developer,
                },
            )
            .await?;
        let data: TokenResponseData = serde_json::from_value(response.data)?;
        Ok(data.authentication_token)
    }

    async fn authenticate(&mut self) -> anyhow::Result<bool> {
        let plugin_name = self.config.plugin_name.clone();
        let plugin_developer = self.config.plugin_developer.clone();
        let token = self
            .token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("authenticate called without a token"))?;
        let response = self
            .roundtrip(
                "AuthenticationRequest",
                AuthRequestData {
                    plugin_name: &plugin_name,
                    plugin_developer: &plugin_developer,
                    authentication_token: &token,
                },
            )
            .await?;
        let data: AuthResponseData = serde_json::from_value(response.data)?;
        Ok(data.authenticated)
    }

    /// Must only be called in `Connected` (spec §4.D). Blocks until a
    /// single request/response round-trip completes.
    pub async fn send_frame(&mut self, frame: &DesktopFrame) -> Result<(), SendFrameError> {
        if self.state != DesktopState::Connected {
            return Err(SendFrameError::NotConnected);
        }

        let values: Vec<ParameterValue> = frame
            .parameters
            .iter()
            .map(|(name, value, weight)| ParameterValue {
                id: name,
                value: *value,
                weight: *weight,
            })
            .collect();
        let data = InjectParameterDataRequest {
            face_found: frame.face_present,
            mode: "set",
            parameter_values: values,
        };

        match self.roundtrip("InjectParameterDataRequest", data).await {
            Ok(_response) => {
                self.counters.messages_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.state = DesktopState::SendFailing;
                self.last_error = Some(e.to_string());
                Err(SendFrameError::Transport(e.to_string()))
            }
        }
    }

    /// Queries the remote's registered parameter list and treats that
    /// queried set as built-in (spec §9 open question); creates or
    /// updates every rule-derived parameter not already present.
    pub async fn reconcile_parameters(&mut self, defs: &[ParameterDefinition]) -> anyhow::Result<()> {
        if self.state != DesktopState::Connected {
            anyhow::bail!("reconcile_parameters requires Connected state");
        }

        let response = self
            .roundtrip("InputParameterListRequest", serde_json::json!({}))
            .await?;
        let list: ParameterListResponseData = serde_json::from_value(response.data)?;
        let builtins: HashSet<String> = list
            .default_parameters
            .into_iter()
            .chain(list.custom_parameters)
            .map(|p| p.parameter_name)
            .collect();

        for def in defs {
            if builtins.contains(&def.name) {
                continue;
            }
            let data = ParameterCreationData {
                parameter_name: &def.name,
                explanation: "bridge-core transformation rule output",
                min: def.min,
                max: def.max,
                default_value: def.default,
            };
            self.roundtrip("ParameterCreationRequest", data).await?;
        }
        Ok(())
    }

    fn status(&self) -> DesktopStatus {
        match &self.state {
            DesktopState::Disconnected | DesktopState::Closing => DesktopStatus::Disconnected,
            DesktopState::Discovering => DesktopStatus::DiscoveringPort,
            DesktopState::Connecting => DesktopStatus::Connecting,
            DesktopState::AcquiringToken | DesktopState::Authenticating => {
                DesktopStatus::Authenticating
            }
            DesktopState::Connected => DesktopStatus::Connected,
            DesktopState::SendFailing => DesktopStatus::SendError,
            DesktopState::Failed(FailPhase::Connection) => DesktopStatus::ConnectionFailed,
            DesktopState::Failed(FailPhase::Authentication) => DesktopStatus::AuthenticationFailed,
        }
    }

    pub fn stats(&self) -> ServiceStats {
        let uptime = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        let mut counters = HashMap::new();
        counters.insert(
            "messages_sent".to_string(),
            self.counters.messages_sent.load(Ordering::Relaxed),
        );
        counters.insert(
            "connection_attempts".to_string(),
            self.counters.connection_attempts.load(Ordering::Relaxed),
        );
        counters.insert(
            "failed_connections".to_string(),
            self.counters.failed_connections.load(Ordering::Relaxed),
        );

        ServiceStats {
            name: "DesktopClient".to_string(),
            status: self.status().as_str().to_string(),
            is_healthy: self.is_connected() && !self.config_changed,
            uptime,
            counters,
            current_entity: None,
            last_error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DesktopClientConfig {
        let mut c = DesktopClientConfig::default();
        c.discovery_enabled = false;
        c
    }

    #[test]
    fn new_client_starts_disconnected_and_unhealthy() {
        let client = DesktopClient::new(config());
        assert_eq!(client.status(), DesktopStatus::Disconnected);
        assert!(!client.stats().is_healthy);
    }

    #[test]
    fn send_frame_precondition_is_a_programming_error() {
        let mut client = DesktopClient::new(config());
        let frame = DesktopFrame::face_lost();
        let result = tokio_test_block_on(client.send_frame(&frame));
        assert!(matches!(result, Err(SendFrameError::NotConnected)));
    }

    #[test]
    fn config_changed_marks_stats_unhealthy_even_when_connected() {
        let mut client = DesktopClient::new(config());
        client.state = DesktopState::Connected;
        client.started_at = Some(Instant::now());
        assert!(client.stats().is_healthy);
        client.mark_config_changed();
        assert!(!client.stats().is_healthy);
    }

    #[test]
    fn apply_config_closes_an_active_connection() {
        let mut client = DesktopClient::new(config());
        client.state = DesktopState::Connected;
        client.apply_config(config());
        assert_eq!(client.status(), DesktopStatus::Disconnected);
        assert!(!client.is_connected());
    }

    // Minimal single-threaded block_on so state-machine preconditions can
    // be unit tested without a full tokio runtime harness.
    fn tokio_test_block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }
}
