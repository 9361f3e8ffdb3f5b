use bitvec::{order::Msb0, vec::BitVec};

pub type PeerId = u32;

pub type PieceIndex = usize;

// Represents which pieces exists for a peer.
// Each bit represents a piece, where 1 means the piece is fully available and 0 means it is not.
// Msb0 keeps the same bit order as the protocol bitfield message.
pub type BitField = BitVec<u8, Msb0>;
