//! Connection to the game server over either transport
//!
//! Both transports decode inbound frames the same way and hand the resulting
//! [`Event`]s to the caller's sink, so nothing past this module can tell which
//! one is in use.

use crate::auth::Session;
use crate::config::TransportKind;
use crate::game::Event;
use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{MoveCommand, ProtocolError, SnapshotFrame};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{InvalidHeaderValue, COOKIE};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Callback receiving every decoded inbound event.
pub type EventSink = Arc<dyn Fn(Event) + Send + Sync>;

/// Lifecycle of a [`SyncClient`] connection.
///
/// `Unopened → Opening → Open → (Closed | Errored)`. Nothing reconnects, so
/// `Closed` and `Errored` are final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unopened,
    Opening,
    Open,
    Closed,
    Errored(String),
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Unopened => f.write_str("not connected"),
            ConnectionState::Opening => f.write_str("connecting"),
            ConnectionState::Open => f.write_str("connected"),
            ConnectionState::Closed => f.write_str("connection closed"),
            ConnectionState::Errored(reason) => write!(f, "connection error: {}", reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot send while {0}")]
    NotOpen(ConnectionState),
    #[error("connection was already opened")]
    AlreadyOpened,
    #[error("outbound command queue is full")]
    QueueFull,
    #[error("websocket error: {0}")]
    WebSocket(#[from] WsError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid session cookie: {0}")]
    InvalidCookie(#[from] InvalidHeaderValue),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Owns the one connection of a session.
pub struct SyncClient {
    transport: TransportKind,
    server: String,
    queue_capacity: usize,
    request_timeout: Duration,
    state: Arc<watch::Sender<ConnectionState>>,
    outbound: Option<mpsc::Sender<MoveCommand>>,
}

impl SyncClient {
    pub fn new(
        transport: TransportKind,
        server: impl Into<String>,
        queue_capacity: usize,
        request_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Unopened);
        Self {
            transport,
            server: server.into(),
            queue_capacity: queue_capacity.max(1),
            request_timeout,
            state: Arc::new(state),
            outbound: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Marks a connection that never got to open as failed.
    pub fn abandon(&self, reason: impl Into<String>) {
        if !matches!(self.state(), ConnectionState::Open) {
            self.state
                .send_replace(ConnectionState::Errored(reason.into()));
        }
    }

    /// Opens the connection and starts delivering inbound snapshots to `on_event`.
    ///
    /// May only be called once per client.
    pub async fn open<F>(&mut self, session: &Session, on_event: F) -> Result<(), SyncError>
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        if self.state() != ConnectionState::Unopened {
            return Err(SyncError::AlreadyOpened);
        }
        self.state.send_replace(ConnectionState::Opening);

        let sink: EventSink = Arc::new(on_event);
        let result = match self.transport {
            TransportKind::Streaming => self.open_streaming(session, sink).await,
            TransportKind::Refresh => self.open_refresh(session, sink).await,
        };

        match result {
            Ok(outbound) => {
                self.outbound = Some(outbound);
                self.state.send_replace(ConnectionState::Open);
                Ok(())
            }
            Err(e) => {
                self.state
                    .send_replace(ConnectionState::Errored(e.to_string()));
                Err(e)
            }
        }
    }

    /// Queues `command` for transmission. Fire-and-forget: no acknowledgement
    /// is awaited.
    pub fn send(&self, command: MoveCommand) -> Result<(), SyncError> {
        let state = self.state();
        let outbound = match (&state, &self.outbound) {
            (ConnectionState::Open, Some(outbound)) => outbound,
            _ => return Err(SyncError::NotOpen(state)),
        };

        outbound.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => SyncError::QueueFull,
            TrySendError::Closed(_) => SyncError::NotOpen(self.state()),
        })
    }

    async fn open_streaming(
        &self,
        session: &Session,
        sink: EventSink,
    ) -> Result<mpsc::Sender<MoveCommand>, SyncError> {
        let url = format!("ws://{}/connect", self.server);
        let mut request = url.as_str().into_client_request()?;
        if let Some(cookie) = session.cookie_header() {
            request
                .headers_mut()
                .insert(COOKIE, HeaderValue::from_str(&cookie)?);
        }

        info!("Connecting to {}", url);
        let (ws_stream, _) = connect_async(request).await?;
        let (write, mut read) = ws_stream.split();

        let (tx, rx) = mpsc::channel::<MoveCommand>(self.queue_capacity);
        tokio::spawn(write_commands(write, rx, Arc::clone(&self.state)));

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => deliver(SnapshotFrame::decode(&text), &sink),
                    Ok(Message::Binary(bytes)) => {
                        deliver(SnapshotFrame::decode_bytes(&bytes), &sink)
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        error!("Connection lost: {}", e);
                        state.send_replace(ConnectionState::Errored(e.to_string()));
                        return;
                    }
                }
            }
            info!("Server closed the connection");
            state.send_replace(ConnectionState::Closed);
        });

        info!("Connected to {}", url);
        Ok(tx)
    }

    async fn open_refresh(
        &self,
        session: &Session,
        sink: EventSink,
    ) -> Result<mpsc::Sender<MoveCommand>, SyncError> {
        let endpoint = RefreshEndpoint::new(&self.server, session, self.request_timeout)?;

        info!("Fetching board from {}", endpoint.game_url);
        let body = endpoint.read().await?;
        deliver(SnapshotFrame::decode(&body), &sink);

        let (tx, mut rx) = mpsc::channel::<MoveCommand>(self.queue_capacity);
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                if let Err(e) = endpoint.write(&command).await {
                    error!("Move request failed: {}", e);
                    continue;
                }
                match endpoint.read().await {
                    Ok(body) => deliver(SnapshotFrame::decode(&body), &sink),
                    Err(e) => error!("Refresh request failed: {}", e),
                }
            }
        });

        Ok(tx)
    }
}

/// Write/read request pair used by the refresh transport.
struct RefreshEndpoint {
    http: reqwest::Client,
    game_url: String,
    cookie: Option<String>,
}

impl RefreshEndpoint {
    fn new(server: &str, session: &Session, timeout: Duration) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            game_url: format!("http://{}/game", server),
            cookie: session.cookie_header(),
        })
    }

    fn with_cookie(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.cookie {
            Some(cookie) => request.header(reqwest::header::COOKIE, cookie),
            None => request,
        }
    }

    async fn write(&self, command: &MoveCommand) -> Result<(), SyncError> {
        debug!("PUT {} {:?}", self.game_url, command);
        self.with_cookie(self.http.put(&self.game_url))
            .json(command)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn read(&self) -> Result<String, SyncError> {
        let body = self
            .with_cookie(self.http.get(&self.game_url))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Pushes queued commands onto the socket until the queue closes or a send
/// fails. A failed send ends the connection as `Errored`.
async fn write_commands<W>(
    mut write: W,
    mut commands: mpsc::Receiver<MoveCommand>,
    state: Arc<watch::Sender<ConnectionState>>,
) where
    W: Sink<Message, Error = WsError> + Unpin,
{
    while let Some(command) = commands.recv().await {
        let json = match command.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };
        debug!("Sending {}", json);
        if let Err(e) = write.send(Message::Text(json)).await {
            error!("Failed to send command: {}", e);
            state.send_if_modified(|current| {
                if current.is_terminal() {
                    return false;
                }
                *current = ConnectionState::Errored(e.to_string());
                true
            });
            break;
        }
    }
}

/// Hands a decoded frame to the sink; undecodable frames are logged and dropped.
fn deliver(frame: Result<SnapshotFrame, ProtocolError>, sink: &EventSink) {
    match frame {
        Ok(frame) => sink(Event::GameSnapshotReceived {
            world_map: frame.world_map,
        }),
        Err(e) => warn!("Dropping inbound frame: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Direction, PlayerIdentity};
    use std::sync::Mutex;

    fn client(transport: TransportKind) -> SyncClient {
        SyncClient::new(transport, "127.0.0.1:9", 4, Duration::from_millis(200))
    }

    fn command() -> MoveCommand {
        MoveCommand::new(PlayerIdentity::new("White"), Direction::Up)
    }

    #[test]
    fn test_new_client_is_unopened() {
        let client = client(TransportKind::Streaming);
        assert_eq!(client.state(), ConnectionState::Unopened);
        assert!(!client.state().is_terminal());
    }

    #[test]
    fn test_send_before_open_is_rejected() {
        let client = client(TransportKind::Streaming);

        match client.send(command()) {
            Err(SyncError::NotOpen(ConnectionState::Unopened)) => {}
            other => panic!("expected NotOpen, got {:?}", other),
        }
    }

    #[test]
    fn test_abandon_marks_errored() {
        let client = client(TransportKind::Refresh);
        let status = client.subscribe();

        client.abandon("auth rejected");

        assert_eq!(
            *status.borrow(),
            ConnectionState::Errored("auth rejected".to_string())
        );
        assert!(client.state().is_terminal());
    }

    #[tokio::test]
    async fn test_failed_open_ends_in_errored() {
        // Nothing listens on the discard port.
        let mut client = client(TransportKind::Streaming);

        let result = client.open(&Session::anonymous(), |_| {}).await;

        assert!(result.is_err());
        assert!(matches!(client.state(), ConnectionState::Errored(_)));
        assert!(matches!(
            client.send(command()),
            Err(SyncError::NotOpen(ConnectionState::Errored(_)))
        ));
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let mut client = client(TransportKind::Refresh);
        let _ = client.open(&Session::anonymous(), |_| {}).await;

        let second = client.open(&Session::anonymous(), |_| {}).await;

        assert!(matches!(second, Err(SyncError::AlreadyOpened)));
    }

    #[test]
    fn test_deliver_drops_malformed_frames() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink: EventSink = {
            let received = Arc::clone(&received);
            Arc::new(move |event| received.lock().unwrap().push(event))
        };

        deliver(SnapshotFrame::decode("{\"world_map\":"), &sink);
        deliver(SnapshotFrame::decode(r#"{"state":1}"#), &sink);
        deliver(SnapshotFrame::decode(r#"{"world_map":[[null]]}"#), &sink);

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        match &received[0] {
            Event::GameSnapshotReceived { world_map } => assert_eq!(world_map.height(), 1),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_write_marks_errored() {
        let (state, _) = watch::channel(ConnectionState::Open);
        let state = Arc::new(state);
        let status = state.subscribe();
        let (tx, rx) = mpsc::channel(4);
        let broken = Box::pin(futures_util::sink::unfold((), |(), _message: Message| async {
            Err::<(), WsError>(WsError::ConnectionClosed)
        }));

        tx.send(command()).await.unwrap();
        write_commands(broken, rx, Arc::clone(&state)).await;

        assert!(matches!(*status.borrow(), ConnectionState::Errored(_)));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_earlier_terminal_state() {
        let (state, _) = watch::channel(ConnectionState::Closed);
        let state = Arc::new(state);
        let (tx, rx) = mpsc::channel(4);
        let broken = Box::pin(futures_util::sink::unfold((), |(), _message: Message| async {
            Err::<(), WsError>(WsError::ConnectionClosed)
        }));

        tx.send(command()).await.unwrap();
        write_commands(broken, rx, Arc::clone(&state)).await;

        assert_eq!(*state.borrow(), ConnectionState::Closed);
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Open.to_string(), "connected");
        assert_eq!(
            ConnectionState::Errored("refused".to_string()).to_string(),
            "connection error: refused"
        );
    }
}
