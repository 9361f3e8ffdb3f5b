use crate::types::{BitField, PeerId, PieceIndex};

/// A neighbour as the engine reports it for the current round.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: PeerId,
    pub available_pieces: BitField,
}

impl Peer {
    pub fn new(id: PeerId, available_pieces: BitField) -> Self {
        Self {
            id,
            available_pieces,
        }
    }

    /// Builds a peer owning exactly `pieces` out of `num_pieces`.
    pub fn with_pieces(id: PeerId, num_pieces: usize, pieces: &[PieceIndex]) -> Self {
        let mut available_pieces = BitField::repeat(false, num_pieces);
        for &piece in pieces {
            if piece < num_pieces {
                available_pieces.set(piece, true);
            }
        }
        Self::new(id, available_pieces)
    }

    pub fn has_piece(&self, index: PieceIndex) -> bool {
        self.available_pieces
            .get(index)
            .map(|bit| *bit)
            .unwrap_or(false)
    }
}
