//! Tit-for-tat with proportional bandwidth shaping for a simulated swarm peer.
//!
//! Every round the engine asks a [`Strategy`] which pieces to request from
//! which neighbours, then how to split the agent's upload capacity among the
//! neighbours that requested from it.

pub mod choker;
pub mod config;
pub mod history;
pub mod message;
pub mod peer;
pub mod peer_stats;
pub mod piece;
pub mod piece_picker;
pub mod rng;
pub mod strategy;
pub mod types;

pub use choker::{Candidate, Choker};
pub use config::{Config, ConfigError, TyrantParams};
pub use history::{Download, History, HistoryError};
pub use message::{Request, Upload};
pub use peer::Peer;
pub use peer_stats::{Estimates, PeerStats};
pub use piece::{PieceError, Pieces};
pub use piece_picker::{PiecePicker, RarestFirst, Rarity};
pub use rng::SimRng;
pub use strategy::{Strategy, Tyrant};
pub use types::{BitField, PeerId, PieceIndex};
