//! The single place where [`GameState`] changes

use crate::game::{reduce, Event, GameState};
use crate::rendering::Renderer;
use log::debug;
use tokio::sync::mpsc;

/// Owns the current state and redraws every subscribed renderer after each
/// event. Taking `&mut self` keeps dispatch non-reentrant.
pub struct Dispatcher {
    state: GameState,
    observers: Vec<Box<dyn Renderer>>,
}

impl Dispatcher {
    pub fn new(initial: GameState) -> Self {
        Self {
            state: initial,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, renderer: Box<dyn Renderer>) {
        self.observers.push(renderer);
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn dispatch(&mut self, event: Event) {
        debug!("Dispatching {:?}", event);
        self.state = reduce(&self.state, event);
        self.redraw();
    }

    /// Renders the current state without changing it.
    pub fn redraw(&mut self) {
        for observer in self.observers.iter_mut() {
            observer.render(&self.state);
        }
    }

    /// Dispatches every event already waiting on `events`, in arrival order.
    pub fn drain(&mut self, events: &mut mpsc::UnboundedReceiver<Event>) -> usize {
        let mut applied = 0;
        while let Ok(event) = events.try_recv() {
            self.dispatch(event);
            applied += 1;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Piece, PlayerIdentity, Rgb, WorldMap};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SnapshotLog(Rc<RefCell<Vec<GameState>>>);

    impl Renderer for SnapshotLog {
        fn render(&mut self, state: &GameState) {
            self.0.borrow_mut().push(state.clone());
        }
    }

    fn one_piece_map() -> WorldMap {
        WorldMap::new(vec![vec![Some(Piece::new(Rgb::WHITE, 0)), None]])
    }

    #[test]
    fn test_dispatch_reduces_then_renders() {
        let rendered = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = Dispatcher::new(GameState::default());
        dispatcher.subscribe(Box::new(SnapshotLog(Rc::clone(&rendered))));

        dispatcher.dispatch(Event::GameSnapshotReceived {
            world_map: one_piece_map(),
        });

        let rendered = rendered.borrow();
        assert_eq!(rendered.len(), 1);
        assert_eq!(*rendered[0].world_map, one_piece_map());
        assert_eq!(&rendered[0], dispatcher.state());
    }

    #[test]
    fn test_every_observer_sees_each_dispatch() {
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = Dispatcher::new(GameState::default());
        dispatcher.subscribe(Box::new(SnapshotLog(Rc::clone(&first))));
        dispatcher.subscribe(Box::new(SnapshotLog(Rc::clone(&second))));

        dispatcher.dispatch(Event::PlayerIdentitySelected {
            color: PlayerIdentity::new("Black"),
        });
        dispatcher.redraw();

        assert_eq!(first.borrow().len(), 2);
        assert_eq!(second.borrow().len(), 2);
        assert_eq!(second.borrow()[1].player.as_str(), "Black");
    }

    #[test]
    fn test_drain_applies_events_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dispatcher = Dispatcher::new(GameState::default());

        tx.send(Event::GameSnapshotReceived {
            world_map: one_piece_map(),
        })
        .unwrap();
        tx.send(Event::GameSnapshotReceived {
            world_map: WorldMap::empty(3, 3),
        })
        .unwrap();

        assert_eq!(dispatcher.drain(&mut rx), 2);
        assert_eq!(*dispatcher.state().world_map, WorldMap::empty(3, 3));
        assert_eq!(dispatcher.drain(&mut rx), 0);
    }
}
