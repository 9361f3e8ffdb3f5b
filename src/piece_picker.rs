use std::collections::BTreeMap;

use log::debug;

use crate::{
    message::Request,
    peer::Peer,
    piece::Pieces,
    rng::SimRng,
    types::{PeerId, PieceIndex},
};

/// Decides which pieces to ask each neighbour for in a round.
pub trait PiecePicker {
    fn pick_requests(
        &self,
        self_id: PeerId,
        pieces: &Pieces,
        peers: &[Peer],
        max_requests_per_peer: usize,
        rng: &mut SimRng,
    ) -> Vec<Request>;
}

/// Needed pieces that `peer` can serve, in ascending order.
pub fn interest(needed: &[PieceIndex], peer: &Peer) -> Vec<PieceIndex> {
    needed
        .iter()
        .copied()
        .filter(|&index| peer.has_piece(index))
        .collect()
}

/// How many neighbours offer each needed piece this round.
#[derive(Debug, Default)]
pub struct Rarity {
    counts: BTreeMap<PieceIndex, usize>,
}

impl Rarity {
    pub fn from_interests<'a>(interests: impl IntoIterator<Item = &'a Vec<PieceIndex>>) -> Self {
        let mut counts = BTreeMap::new();
        for interest in interests {
            for &index in interest {
                *counts.entry(index).or_default() += 1;
            }
        }
        Self { counts }
    }

    pub fn count(&self, index: PieceIndex) -> usize {
        self.counts.get(&index).copied().unwrap_or(0)
    }

    /// Rarest piece of `interest`, lowest index first on equal counts.
    pub fn rarest(&self, interest: &[PieceIndex]) -> Option<PieceIndex> {
        interest
            .iter()
            .copied()
            .min_by_key(|&index| (self.count(index), index))
    }
}

/// Rarest-first with a shuffled tail.
///
/// Every neighbour is asked for the rarest piece it can serve; the other
/// slots go to random pieces from its interest so agents don't all pile on
/// the same rare piece. A piece may be requested from several neighbours at
/// once.
#[derive(Debug, Clone, Copy, Default)]
pub struct RarestFirst;

impl PiecePicker for RarestFirst {
    fn pick_requests(
        &self,
        self_id: PeerId,
        pieces: &Pieces,
        peers: &[Peer],
        max_requests_per_peer: usize,
        rng: &mut SimRng,
    ) -> Vec<Request> {
        let needed: Vec<PieceIndex> = pieces.needed().collect();
        if needed.is_empty() || peers.is_empty() || max_requests_per_peer == 0 {
            return Vec::new();
        }

        let interests: Vec<Vec<PieceIndex>> =
            peers.iter().map(|peer| interest(&needed, peer)).collect();
        let rarity = Rarity::from_interests(&interests);

        let mut requests = Vec::new();
        for (peer, interest) in peers.iter().zip(&interests) {
            let Some(rarest) = rarity.rarest(interest) else {
                continue;
            };
            let mut rest: Vec<PieceIndex> = interest
                .iter()
                .copied()
                .filter(|&index| index != rarest)
                .collect();
            rng.shuffle(&mut rest);
            rest.truncate(max_requests_per_peer - 1);

            for index in std::iter::once(rarest).chain(rest) {
                requests.push(Request::new(
                    self_id,
                    peer.id,
                    index,
                    pieces.blocks_downloaded(index),
                ));
            }
        }

        debug!(
            "peer {self_id} requests {} blocks from {} neighbours, {} pieces needed",
            requests.len(),
            peers.len(),
            needed.len()
        );
        requests
    }
}
