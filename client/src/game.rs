//! Local copy of the shared game state and the reducer that advances it

use shared::{PlayerIdentity, WorldMap};
use std::sync::Arc;

/// Client-side view of the game: the last board the server sent and who we are.
///
/// The world map sits behind an `Arc` so that states produced by the reducer
/// share unchanged boards instead of copying them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameState {
    pub world_map: Arc<WorldMap>,
    pub player: PlayerIdentity,
}

impl GameState {
    pub fn new(player: PlayerIdentity) -> Self {
        Self {
            world_map: Arc::new(WorldMap::default()),
            player,
        }
    }
}

/// Everything that may change [`GameState`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A full board from the server, replacing the previous one wholesale.
    GameSnapshotReceived { world_map: WorldMap },
    /// The local player's identity was chosen or reassigned.
    PlayerIdentitySelected { color: PlayerIdentity },
}

/// Applies `event` to `state`, returning the next state.
///
/// Never mutates `state` and never fails. Server boards are taken as-is,
/// without shape validation.
pub fn reduce(state: &GameState, event: Event) -> GameState {
    match event {
        Event::GameSnapshotReceived { world_map } => GameState {
            world_map: Arc::new(world_map),
            player: state.player.clone(),
        },
        Event::PlayerIdentitySelected { color } => GameState {
            world_map: Arc::clone(&state.world_map),
            player: color,
        },
    }
}
