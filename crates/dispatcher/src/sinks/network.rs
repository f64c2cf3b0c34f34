//! NetworkSink - UDP fire-and-forget streaming

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

use contracts::{ContractError, DataSink, OutgoingSnapshot};
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Largest datagram the companion reliably reassembles
pub const DEFAULT_MAX_PACKET_SIZE: usize = 65_000;

/// Wire encoding of a datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// `[snapshot]`, the list layout the companion posts upstream
    #[default]
    Json,
    Bincode,
}

impl NetworkFormat {
    fn encode(self, snapshot: &OutgoingSnapshot) -> Result<Vec<u8>, String> {
        match self {
            Self::Json => serde_json::to_vec(std::slice::from_ref(snapshot))
                .map_err(|e| format!("json encode failed: {e}")),
            Self::Bincode => {
                bincode::serialize(snapshot).map_err(|e| format!("bincode encode failed: {e}"))
            }
        }
    }
}

impl FromStr for NetworkFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "bincode" => Ok(Self::Bincode),
            other => Err(format!("unknown format '{other}', expected json or bincode")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    pub addr: SocketAddr,
    pub format: NetworkFormat,
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            format: NetworkFormat::default(),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }

    /// Read `addr`, `format` and `max_packet_size` from sink params
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let raw_addr = params
            .get("addr")
            .ok_or("missing 'addr' parameter")?;
        let addr = raw_addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid address '{raw_addr}': {e}"))?;

        let mut config = Self::new(addr);
        if let Some(format) = params.get("format") {
            config.format = format.parse()?;
        }
        if let Some(size) = params.get("max_packet_size") {
            config.max_packet_size = size
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| format!("invalid max_packet_size '{size}'"))?;
        }
        Ok(config)
    }
}

/// Sink that sends snapshots over UDP
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    /// Create a new NetworkSink
    #[instrument(name = "network_sink_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind_addr = if config.addr.is_ipv6() {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::sink_write(&name, e))?;

        let sink_name = name.clone();
        Self::new(name, config)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name,
                message: e.to_string(),
            })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))
    }

    fn prepare_payload(&self, snapshot: &OutgoingSnapshot) -> Result<Vec<u8>, ContractError> {
        let data = self
            .config
            .format
            .encode(snapshot)
            .map_err(|e| ContractError::sink_write(&self.name, e))?;

        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Packet too large, dropped"
            );
            return Err(ContractError::sink_write(
                &self.name,
                format!(
                    "payload of {} bytes exceeds max_packet_size {}",
                    data.len(),
                    self.config.max_packet_size
                ),
            ));
        }

        Ok(data)
    }

    async fn transmit(&self, socket: &UdpSocket, data: &[u8], timestamp: i64) {
        // A missing receiver is not a write failure
        if let Err(e) = socket.send(data).await {
            error!(sink = %self.name, timestamp, error = %e, "UDP send failed");
            return;
        }
        debug!(sink = %self.name, timestamp, bytes = data.len(), "Datagram sent");
    }
}

impl DataSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, snapshot),
        fields(sink = %self.name, timestamp = snapshot.timestamp)
    )]
    async fn write(&mut self, snapshot: &OutgoingSnapshot) -> Result<(), ContractError> {
        let socket = self.socket()?;
        let data = self.prepare_payload(snapshot)?;
        self.transmit(socket, &data, snapshot.timestamp).await;
        Ok(())
    }

    #[instrument(name = "network_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}
