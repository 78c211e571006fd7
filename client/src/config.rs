//! Runtime configuration shared by the binary and the session driver

use clap::ValueEnum;
use shared::PlayerIdentity;
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "127.0.0.1:3000";
pub const DEFAULT_COMMAND_BUFFER: usize = 64;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How moves reach the server and snapshots come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// One long-lived websocket; the server pushes snapshots.
    Streaming,
    /// A write request per move followed by a read of the full board.
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererKind {
    /// Coloured markers on a background.
    Spatial,
    /// Rows of colour labels.
    Text,
}

/// Where the local player's identity comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdentitySource {
    /// The `--color` parameter, or the default colour.
    Color,
    /// The session token issued by the auth step.
    Session,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: String,
    pub transport: TransportKind,
    pub renderer: RendererKind,
    pub color: Option<String>,
    pub identity: IdentitySource,
    pub skip_auth: bool,
    pub session_token: Option<String>,
    pub command_buffer: usize,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn http_base(&self) -> String {
        format!("http://{}", self.server)
    }

    /// Identity selected by the colour parameter at startup.
    pub fn initial_identity(&self) -> PlayerIdentity {
        PlayerIdentity::from_param(self.color.as_deref())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            transport: TransportKind::Streaming,
            renderer: RendererKind::Spatial,
            color: None,
            identity: IdentitySource::Color,
            skip_auth: false,
            session_token: None,
            command_buffer: DEFAULT_COMMAND_BUFFER,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
