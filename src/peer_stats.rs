//! Per-peer reciprocation estimates and the feedback rule that refreshes them
//! from the download history.

use std::collections::{BTreeMap, BTreeSet};

use log::{trace, warn};

use crate::{
    config::{Config, TyrantParams},
    history::History,
    peer::Peer,
    rng::SimRng,
    types::PeerId,
};

/// What we believe a peer gives us and what it costs to keep it giving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerStats {
    /// Blocks per round we expect to receive from the peer.
    pub download_rate: f64,
    /// Bandwidth we must offer the peer to stay unchoked by it.
    pub required_upload: f64,
}

impl PeerStats {
    pub fn ratio(&self) -> f64 {
        self.download_rate / self.required_upload
    }
}

/// Estimate store owned by one strategy instance.
#[derive(Debug, Clone)]
pub struct Estimates {
    stats: BTreeMap<PeerId, PeerStats>,
    min_upload_bandwidth: u32,
    max_upload_bandwidth: u32,
    initial_upload: f64,
    ceiling: f64,
    floor: f64,
    alpha: f64,
    gamma: f64,
    window: usize,
}

impl Estimates {
    pub fn new(config: &Config, params: &TyrantParams) -> Self {
        let floor = params.upload_floor(config);
        let ceiling = config.upload_ceiling();
        if ceiling < floor {
            warn!(
                "upload ceiling {ceiling} is below the floor {floor}, required upload will stay at the floor"
            );
        }
        let bandwidth_sum =
            f64::from(config.min_upload_bandwidth) + f64::from(config.max_upload_bandwidth);
        // Neighbours are assumed to split their upload over 3 slots besides ours.
        let initial_upload = (bandwidth_sum / 6.0)
            .max(ceiling)
            .min(ceiling)
            .max(floor);

        Self {
            stats: BTreeMap::new(),
            min_upload_bandwidth: config.min_upload_bandwidth,
            max_upload_bandwidth: config.max_upload_bandwidth,
            initial_upload,
            ceiling,
            floor,
            alpha: params.alpha,
            gamma: params.gamma,
            window: params.window,
        }
    }

    pub fn get(&self, id: PeerId) -> Option<&PeerStats> {
        self.stats.get(&id)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Returns the estimate of `id`, creating it on first reference.
    pub fn get_or_insert(&mut self, id: PeerId, rng: &mut SimRng) -> &mut PeerStats {
        let (min, max, initial_upload) = (
            self.min_upload_bandwidth,
            self.max_upload_bandwidth,
            self.initial_upload,
        );
        self.stats.entry(id).or_insert_with(|| {
            // True capacity is hidden; guess a quarter of a drawn bandwidth,
            // the share one of four reference upload slots would get.
            let download_rate = rng.range_inclusive(min, max) as f64 / 4.0;
            trace!("new estimate for peer {id}: d={download_rate} u={initial_upload}");
            PeerStats {
                download_rate,
                required_upload: initial_upload,
            }
        })
    }

    /// Refreshes the estimates with what happened last round.
    ///
    /// Peers that choked us get a pricier offer, peers that served us get
    /// their observed rate, and peers that kept serving us over the whole
    /// window get a cheaper offer. Does nothing before the first round closes.
    pub fn update(&mut self, peers: &[Peer], history: &History, rng: &mut SimRng) {
        for peer in peers {
            self.get_or_insert(peer.id, rng);
        }

        if history.current_round() == 0 {
            return;
        }
        let Some(last_round) = history.last_round() else {
            return;
        };

        let mut received: BTreeMap<PeerId, u32> = BTreeMap::new();
        for download in last_round {
            *received.entry(download.from_id).or_default() += download.blocks;
        }
        for &id in received.keys() {
            self.get_or_insert(id, rng);
        }

        for (id, stats) in self.stats.iter_mut() {
            if received.contains_key(id) {
                continue;
            }
            let raised = (stats.required_upload * (1.0 + self.alpha))
                .min(self.ceiling)
                .max(self.floor);
            trace!(
                "peer {id} choked us, required upload {} -> {raised}",
                stats.required_upload
            );
            stats.required_upload = raised;
        }

        for (id, &blocks) in &received {
            if let Some(stats) = self.stats.get_mut(id) {
                trace!("peer {id} sent {blocks} blocks");
                stats.download_rate = blocks as f64;
            }
        }

        for id in sustained_unchokers(history, self.window) {
            if let Some(stats) = self.stats.get_mut(&id) {
                let lowered = (stats.required_upload * (1.0 - self.gamma))
                    .min(self.ceiling)
                    .max(self.floor);
                trace!(
                    "peer {id} kept reciprocating, required upload {} -> {lowered}",
                    stats.required_upload
                );
                stats.required_upload = lowered;
            }
        }
    }
}

/// Peers that sent us blocks in every one of the last `window` rounds.
fn sustained_unchokers(history: &History, window: usize) -> BTreeSet<PeerId> {
    let mut rounds = history.last_rounds(window).iter().map(|downloads| {
        downloads
            .iter()
            .map(|download| download.from_id)
            .collect::<BTreeSet<_>>()
    });
    let Some(first) = rounds.next() else {
        return BTreeSet::new();
    };
    rounds.fold(first, |acc, round| acc.intersection(&round).copied().collect())
}
