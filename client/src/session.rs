//! Network-side driver for one play session
//!
//! Runs on its own tokio runtime thread. It never touches [`GameState`]
//! directly: snapshots and identity changes travel to the UI thread as
//! [`Event`]s, and move commands come back over a bounded channel that holds
//! them until the connection is open.
//!
//! [`GameState`]: crate::game::GameState

use crate::auth::{resolve_identity, Authenticator};
use crate::config::{ClientConfig, IdentitySource};
use crate::game::Event;
use crate::network::{ConnectionState, SyncClient};
use log::{error, info, warn};
use shared::MoveCommand;
use tokio::sync::{mpsc, watch};

/// UI-side ends of the channels to a running session.
pub struct SessionHandle {
    pub events: mpsc::UnboundedReceiver<Event>,
    pub commands: CommandQueue,
    pub status: watch::Receiver<ConnectionState>,
}

/// Sending half of the outbound move queue.
#[derive(Clone)]
pub struct CommandQueue {
    tx: mpsc::Sender<MoveCommand>,
}

impl CommandQueue {
    pub fn new(tx: mpsc::Sender<MoveCommand>) -> Self {
        Self { tx }
    }

    /// Queues a command without blocking; a full queue drops it with a warning.
    pub fn forward(&self, command: MoveCommand) -> bool {
        match self.tx.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping move command: {}", e);
                false
            }
        }
    }
}

/// What the UI should do with its input handler for a connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputGate {
    Attach,
    Detach,
    Keep,
}

impl InputGate {
    /// Input is only live while the connection is `Open`. A connection that
    /// never opened never gets a handler.
    pub fn decide(status: &ConnectionState, attached: bool) -> Self {
        match (status, attached) {
            (ConnectionState::Open, false) => InputGate::Attach,
            (status, true) if status.is_terminal() => InputGate::Detach,
            _ => InputGate::Keep,
        }
    }
}

/// Starts the session on a dedicated network thread.
pub fn spawn_session(config: ClientConfig) -> std::io::Result<SessionHandle> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
    let client = SyncClient::new(
        config.transport,
        config.server.clone(),
        config.command_buffer,
        config.request_timeout,
    );
    let status = client.subscribe();

    std::thread::Builder::new()
        .name("network".to_string())
        .spawn(move || runtime.block_on(run_session(config, client, event_tx, command_rx)))?;

    Ok(SessionHandle {
        events: event_rx,
        commands: CommandQueue::new(command_tx),
        status,
    })
}

/// Authenticates, opens `client`, then forwards commands until either side
/// goes away.
pub async fn run_session(
    config: ClientConfig,
    mut client: SyncClient,
    events: mpsc::UnboundedSender<Event>,
    mut commands: mpsc::Receiver<MoveCommand>,
) {
    let authenticator = match Authenticator::from_config(&config) {
        Ok(authenticator) => authenticator,
        Err(e) => {
            error!("Failed to set up auth: {}", e);
            client.abandon(e.to_string());
            return;
        }
    };

    let session = match authenticator.authenticate().await {
        Ok(session) => session,
        Err(e) => {
            error!("Authentication failed: {}", e);
            client.abandon(e.to_string());
            return;
        }
    };

    if config.identity == IdentitySource::Session {
        let identity = resolve_identity(config.identity, config.color.as_deref(), &session);
        info!("Playing as {}", identity);
        if events
            .send(Event::PlayerIdentitySelected { color: identity })
            .is_err()
        {
            return;
        }
    }

    let sink = events.clone();
    if let Err(e) = client
        .open(&session, move |event| {
            let _ = sink.send(event);
        })
        .await
    {
        error!("Failed to connect: {}", e);
        return;
    }

    while let Some(command) = commands.recv().await {
        if let Err(e) = client.send(command) {
            warn!("Dropping move command: {}", e);
        }
    }

    info!("Input closed, ending session");
}
