use thiserror::Error;

use crate::types::PieceIndex;

pub(crate) type Result<T> = std::result::Result<T, PieceError>;

#[derive(Debug, Error, PartialEq)]
pub enum PieceError {
    #[error("invalid piece index {0}")]
    InvalidPieceIndex(PieceIndex),
    #[error("progress table has {got} pieces, expected {expected}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("piece {index} would hold {blocks} blocks, only {blocks_per_piece} fit")]
    TooManyBlocks {
        index: PieceIndex,
        blocks: u32,
        blocks_per_piece: u32,
    },
}

/// Download progress of the agent, one block counter per piece.
///
/// The engine owns the progress and pushes it in as blocks arrive; the
/// strategy only reads it.
#[derive(Debug, Clone)]
pub struct Pieces {
    blocks: Vec<u32>,
    blocks_per_piece: u32,
}

impl Pieces {
    pub fn new(num_pieces: usize, blocks_per_piece: u32) -> Self {
        Self {
            blocks: vec![0; num_pieces],
            blocks_per_piece,
        }
    }

    pub fn from_progress(blocks: Vec<u32>, blocks_per_piece: u32) -> Result<Self> {
        let mut pieces = Self::new(blocks.len(), blocks_per_piece);
        pieces.update(blocks)?;
        Ok(pieces)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks_per_piece(&self) -> u32 {
        self.blocks_per_piece
    }

    /// Blocks of `index` already downloaded, which is also where the next request resumes.
    pub fn blocks_downloaded(&self, index: PieceIndex) -> u32 {
        self.blocks.get(index).copied().unwrap_or(0)
    }

    pub fn is_needed(&self, index: PieceIndex) -> bool {
        self.blocks
            .get(index)
            .is_some_and(|&blocks| blocks < self.blocks_per_piece)
    }

    pub fn needed(&self) -> impl Iterator<Item = PieceIndex> + '_ {
        (0..self.blocks.len()).filter(|&index| self.is_needed(index))
    }

    pub fn is_complete(&self) -> bool {
        self.needed().next().is_none()
    }

    /// Replaces the whole progress table. The number of pieces never changes.
    pub fn update(&mut self, blocks: Vec<u32>) -> Result<()> {
        if blocks.len() != self.blocks.len() {
            return Err(PieceError::LengthMismatch {
                expected: self.blocks.len(),
                got: blocks.len(),
            });
        }
        if let Some((index, &count)) = blocks
            .iter()
            .enumerate()
            .find(|&(_, &count)| count > self.blocks_per_piece)
        {
            return Err(PieceError::TooManyBlocks {
                index,
                blocks: count,
                blocks_per_piece: self.blocks_per_piece,
            });
        }
        self.blocks = blocks;
        Ok(())
    }

    pub fn record_blocks(&mut self, index: PieceIndex, received: u32) -> Result<()> {
        let blocks_per_piece = self.blocks_per_piece;
        let count = self
            .blocks
            .get_mut(index)
            .ok_or(PieceError::InvalidPieceIndex(index))?;
        let blocks = count.saturating_add(received);
        if blocks > blocks_per_piece {
            return Err(PieceError::TooManyBlocks {
                index,
                blocks,
                blocks_per_piece,
            });
        }
        *count = blocks;
        Ok(())
    }
}
