//! Arrow-key input turned into move commands

use macroquad::prelude::{is_key_pressed, KeyCode};
use shared::{Direction, MoveCommand, PlayerIdentity};

const ARROW_KEYS: [KeyCode; 4] = [KeyCode::Left, KeyCode::Up, KeyCode::Right, KeyCode::Down];

/// Direction bound to `key`, if any. Only the four arrow keys are mapped.
pub fn direction_for(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::Left => Some(Direction::Left),
        KeyCode::Up => Some(Direction::Up),
        KeyCode::Right => Some(Direction::Right),
        KeyCode::Down => Some(Direction::Down),
        _ => None,
    }
}

/// Forwards one [`MoveCommand`] per mapped key press to `emit`.
///
/// The actor is fixed when the handler is attached; a new identity needs a
/// new handler. Presses are not debounced.
pub struct InputHandler<E: FnMut(MoveCommand)> {
    actor: PlayerIdentity,
    emit: E,
}

impl<E: FnMut(MoveCommand)> InputHandler<E> {
    pub fn attach(emit: E, actor: PlayerIdentity) -> Self {
        Self { actor, emit }
    }

    pub fn actor(&self) -> &PlayerIdentity {
        &self.actor
    }

    /// Handles a single key press; returns whether a command was emitted.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        match direction_for(key) {
            Some(direction) => {
                (self.emit)(MoveCommand::new(self.actor.clone(), direction));
                true
            }
            None => false,
        }
    }

    /// Samples this frame's arrow-key presses from the window.
    pub fn poll(&mut self) -> usize {
        let mut emitted = 0;
        for key in ARROW_KEYS {
            if is_key_pressed(key) && self.handle_key(key) {
                emitted += 1;
            }
        }
        emitted
    }
}
