//! # Grid-World Client Library
//!
//! Client-side implementation of the multiplayer grid game: a local copy of
//! the board, the connection that keeps it in sync with the server, keyboard
//! input, and rendering.
//!
//! ## Architecture Overview
//!
//! The server is the only source of truth. The client never predicts moves;
//! it sends a command and waits for the next full snapshot, which replaces
//! the local board wholesale.
//!
//! ### Single Writer
//! All state changes go through [`dispatch::Dispatcher`], which applies an
//! [`game::Event`] with the pure [`game::reduce`] function and then asks every
//! subscribed renderer to redraw. The network runtime lives on its own thread
//! and only talks to the dispatcher through a channel of events.
//!
//! ### Interchangeable Transports
//! [`network::SyncClient`] speaks either a streaming websocket protocol or a
//! request/refresh HTTP protocol. Both produce the same events.
//!
//! ### Interchangeable Renderers
//! [`rendering::SpatialRenderer`] draws coloured markers on a grid,
//! [`rendering::TextGridRenderer`] draws colour labels. Both paint onto a
//! [`rendering::Surface`].
//!
//! ## Module Organization
//!
//! - `game`: state, events, reducer
//! - `dispatch`: the mutation point and its observers
//! - `input`: arrow keys to move commands
//! - `network`: connection state machine and transports
//! - `auth`: auth gate, session cookie, identity providers
//! - `session`: network-thread driver tying auth, connection and commands together
//! - `rendering`: surfaces and renderers
//! - `config`: runtime options
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::config::ClientConfig;
//! use client::dispatch::Dispatcher;
//! use client::game::GameState;
//! use client::session::spawn_session;
//!
//! # fn main() -> std::io::Result<()> {
//! let mut session = spawn_session(ClientConfig::default())?;
//! let mut dispatcher = Dispatcher::new(GameState::default());
//!
//! // Once per frame on the UI thread:
//! dispatcher.drain(&mut session.events);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
pub mod session;
