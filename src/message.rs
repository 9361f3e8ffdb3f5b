use crate::types::{PeerId, PieceIndex};

/// Ask `peer_id` for blocks of `piece_index`, resuming at `start_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub requester_id: PeerId,
    pub peer_id: PeerId,
    pub piece_index: PieceIndex,
    pub start_block: u32,
}

impl Request {
    pub fn new(
        requester_id: PeerId,
        peer_id: PeerId,
        piece_index: PieceIndex,
        start_block: u32,
    ) -> Self {
        Self {
            requester_id,
            peer_id,
            piece_index,
            start_block,
        }
    }
}

/// Bandwidth granted by `from_id` to `to_id` for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upload {
    pub from_id: PeerId,
    pub to_id: PeerId,
    pub bandwidth: u32,
}

impl Upload {
    pub fn new(from_id: PeerId, to_id: PeerId, bandwidth: u32) -> Self {
        Self {
            from_id,
            to_id,
            bandwidth,
        }
    }
}
