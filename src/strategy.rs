//! The agent-facing side: one [`Strategy`] instance per simulated peer, called
//! by the round controller twice per round.

use std::collections::BTreeSet;

use log::debug;

use crate::{
    choker::{Candidate, Choker},
    config::{Config, ConfigError, TyrantParams},
    history::History,
    message::{Request, Upload},
    peer::Peer,
    peer_stats::{Estimates, PeerStats},
    piece::Pieces,
    piece_picker::{PiecePicker, RarestFirst},
    rng::SimRng,
    types::PeerId,
};

pub(crate) type Result<T> = std::result::Result<T, ConfigError>;

/// What the round controller needs from a peer strategy.
///
/// Each round it calls [`Strategy::select_requests`] first, then
/// [`Strategy::allocate_uploads`] with the requests addressed to this agent.
pub trait Strategy {
    fn id(&self) -> PeerId;

    fn select_requests(&mut self, peers: &[Peer], history: &History) -> Vec<Request>;

    fn allocate_uploads(
        &mut self,
        requests: &[Request],
        peers: &[Peer],
        history: &History,
    ) -> Vec<Upload>;
}

/// Tit-for-tat with bandwidth shaping.
///
/// Requests come from the pluggable [`PiecePicker`]; uploads go to the
/// requesters with the best estimated download per unit of upload.
pub struct Tyrant<P = RarestFirst> {
    id: PeerId,
    config: Config,
    pieces: Pieces,
    estimates: Estimates,
    choker: Choker,
    picker: P,
    rng: SimRng,
}

impl Tyrant<RarestFirst> {
    pub fn new(
        id: PeerId,
        config: Config,
        params: TyrantParams,
        num_pieces: usize,
        rng: SimRng,
    ) -> Result<Self> {
        Tyrant::with_picker(id, config, params, num_pieces, RarestFirst, rng)
    }
}

impl<P: PiecePicker> Tyrant<P> {
    pub fn with_picker(
        id: PeerId,
        config: Config,
        params: TyrantParams,
        num_pieces: usize,
        picker: P,
        rng: SimRng,
    ) -> Result<Self> {
        config.validate()?;
        params.validate()?;

        Ok(Self {
            id,
            pieces: Pieces::new(num_pieces, config.blocks_per_piece),
            estimates: Estimates::new(&config, &params),
            choker: Choker::new(config.upload_capacity),
            config,
            picker,
            rng,
        })
    }

    pub fn pieces(&self) -> &Pieces {
        &self.pieces
    }

    /// Progress table, updated by the engine as blocks arrive.
    pub fn pieces_mut(&mut self) -> &mut Pieces {
        &mut self.pieces
    }

    pub fn estimate(&self, id: PeerId) -> Option<&PeerStats> {
        self.estimates.get(id)
    }

    pub fn ratio(&self, id: PeerId) -> Option<f64> {
        self.estimates.get(id).map(PeerStats::ratio)
    }
}

impl<P: PiecePicker> Strategy for Tyrant<P> {
    fn id(&self) -> PeerId {
        self.id
    }

    fn select_requests(&mut self, peers: &[Peer], _history: &History) -> Vec<Request> {
        self.picker.pick_requests(
            self.id,
            &self.pieces,
            peers,
            self.config.max_requests_per_peer,
            &mut self.rng,
        )
    }

    fn allocate_uploads(
        &mut self,
        requests: &[Request],
        peers: &[Peer],
        history: &History,
    ) -> Vec<Upload> {
        self.estimates.update(peers, history, &mut self.rng);

        let requesters: BTreeSet<PeerId> = requests
            .iter()
            .filter(|request| request.peer_id == self.id)
            .map(|request| request.requester_id)
            .collect();
        if requesters.is_empty() {
            return Vec::new();
        }

        let candidates: Vec<Candidate> = requesters
            .into_iter()
            .map(|id| {
                let stats = *self.estimates.get_or_insert(id, &mut self.rng);
                Candidate {
                    id,
                    ratio: stats.ratio(),
                    required_upload: stats.required_upload,
                }
            })
            .collect();

        let uploads = self.choker.unchoke(self.id, candidates);
        debug!(
            "round {}: peer {} uploads to {:?}",
            history.current_round(),
            self.id,
            uploads.iter().map(|it| it.to_id).collect::<Vec<_>>()
        );
        uploads
    }
}
