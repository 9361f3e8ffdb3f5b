use std::cmp::Ordering;

use log::debug;

use crate::{message::Upload, types::PeerId};

/// A requester as the choker sees it this round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: PeerId,
    pub ratio: f64,
    pub required_upload: f64,
}

pub struct Choker {
    /// Bandwidth units we can upload per round.
    upload_capacity: u32,
}

impl Choker {
    pub fn new(upload_capacity: u32) -> Self {
        Self { upload_capacity }
    }

    /// Puts the best deals first.
    pub fn sort_by_unchoke(candidates: &mut [Candidate]) {
        candidates.sort_by(Choker::unchoke_compare_ratio);
    }

    /// Use to prioritizes peer to determine which peer should unchoke
    ///
    /// - unchoke the peer with the higher download per upload ratio
    /// - if both ratios are equal, unchoke the peer with the lower id
    fn unchoke_compare_ratio(a: &Candidate, b: &Candidate) -> Ordering {
        b.ratio.total_cmp(&a.ratio).then(a.id.cmp(&b.id))
    }

    /// Splits the whole upload capacity among the best requesters.
    ///
    /// Requesters are taken in ratio order, each at the floor of its required
    /// upload, until the next one does not fit. Whatever is left is handed out
    /// one unit at a time to the chosen peers in the order they were chosen.
    pub fn unchoke(&self, self_id: PeerId, mut candidates: Vec<Candidate>) -> Vec<Upload> {
        if candidates.is_empty() {
            return Vec::new();
        }
        Choker::sort_by_unchoke(&mut candidates);

        let capacity = u64::from(self.upload_capacity);
        let mut used: u64 = 0;
        let mut chosen: Vec<(PeerId, u64)> = Vec::new();
        for candidate in &candidates {
            // required upload is positive and finite, the cast only drops the fraction
            let need = candidate.required_upload.floor() as u64;
            if used + need > capacity {
                break;
            }
            chosen.push((candidate.id, need));
            used += need;
        }

        if chosen.is_empty() {
            debug!(
                "peer {self_id} cannot afford any of {} requesters with capacity {capacity}",
                candidates.len()
            );
            return Vec::new();
        }

        let leftover = capacity - used;
        let slots = chosen.len() as u64;
        for (position, (_, bandwidth)) in chosen.iter_mut().enumerate() {
            let position = position as u64;
            *bandwidth += leftover / slots + u64::from(position < leftover % slots);
        }

        debug!(
            "peer {self_id} unchokes {} of {} requesters, leftover {leftover} spread",
            chosen.len(),
            candidates.len()
        );
        chosen
            .into_iter()
            .map(|(id, bandwidth)| Upload::new(self_id, id, bandwidth as u32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn make_candidate(id: PeerId, ratio: f64, required_upload: f64) -> Candidate {
        Candidate {
            id,
            ratio,
            required_upload,
        }
    }

    fn allocations(uploads: &[Upload]) -> Vec<(PeerId, u32)> {
        uploads.iter().map(|it| (it.to_id, it.bandwidth)).collect()
    }

    #[test]
    fn test_unchoke_all_fit_exactly() {
        let choker = Choker::new(12);
        let uploads = choker.unchoke(
            0,
            vec![
                make_candidate(1, 1.0, 4.0),
                make_candidate(2, 1.0, 4.0),
                make_candidate(3, 1.0, 4.0),
            ],
        );
        assert_eq!(allocations(&uploads), vec![(1, 4), (2, 4), (3, 4)]);
        assert!(uploads.iter().all(|it| it.from_id == 0));
    }

    #[test]
    fn test_unchoke_spreads_leftover_round_robin() {
        let choker = Choker::new(10);
        let uploads = choker.unchoke(
            0,
            vec![
                make_candidate(3, 1.0, 4.0),
                make_candidate(1, 3.0, 4.0),
                make_candidate(2, 2.0, 4.0),
            ],
        );
        assert_eq!(allocations(&uploads), vec![(1, 5), (2, 5)]);
    }

    #[test]
    fn test_unchoke_leftover_wraps() {
        let choker = Choker::new(11);
        let uploads = choker.unchoke(
            0,
            vec![make_candidate(1, 2.0, 2.5), make_candidate(2, 1.0, 3.9)],
        );
        // needs 2 and 3, leftover 6 handed out 1,2,1,2,1,2
        assert_eq!(allocations(&uploads), vec![(1, 5), (2, 6)]);
    }

    #[test]
    fn test_unchoke_stops_at_first_rejection() {
        let choker = Choker::new(10);
        let uploads = choker.unchoke(
            0,
            vec![
                make_candidate(1, 3.0, 6.0),
                make_candidate(2, 2.0, 6.0),
                make_candidate(3, 1.0, 1.0),
            ],
        );
        // peer 3 would fit but comes after the first rejection
        assert_eq!(allocations(&uploads), vec![(1, 10)]);
    }

    #[test]
    fn test_unchoke_nothing_affordable() {
        let choker = Choker::new(3);
        let uploads = choker.unchoke(0, vec![make_candidate(1, 1.0, 4.0)]);
        assert!(uploads.is_empty());
        assert!(choker.unchoke(0, Vec::new()).is_empty());
    }

    #[test]
    fn test_unchoke_compare_ratio_ordering() {
        let a = make_candidate(1, 2.0, 1.0);
        let b = make_candidate(2, 1.0, 1.0);
        assert_eq!(Choker::unchoke_compare_ratio(&a, &b), Ordering::Less);
        assert_eq!(Choker::unchoke_compare_ratio(&b, &a), Ordering::Greater);

        let c = make_candidate(3, 2.0, 5.0);
        assert_eq!(Choker::unchoke_compare_ratio(&a, &c), Ordering::Less);
        assert_eq!(Choker::unchoke_compare_ratio(&c, &a), Ordering::Greater);
        assert_eq!(Choker::unchoke_compare_ratio(&a, &a), Ordering::Equal);
    }

    proptest! {
        #[test]
        fn prop_unchoke_uses_capacity_on_sorted_prefix(
            capacity in 0u32..200,
            raw in prop::collection::vec((0u32..4, 0.01f64..60.0), 0..10),
        ) {
            let candidates: Vec<Candidate> = raw
                .iter()
                .enumerate()
                .map(|(id, &(ratio_bucket, required_upload))| {
                    make_candidate(id as PeerId, ratio_bucket as f64 * 0.5, required_upload)
                })
                .collect();
            let mut sorted = candidates.clone();
            Choker::sort_by_unchoke(&mut sorted);

            let uploads = Choker::new(capacity).unchoke(0, candidates);
            let total: u64 = uploads.iter().map(|it| u64::from(it.bandwidth)).sum();

            if uploads.is_empty() {
                prop_assert!(sorted.is_empty() || sorted[0].required_upload.floor() as u64 > u64::from(capacity));
            } else {
                prop_assert_eq!(total, u64::from(capacity));
            }
            for (upload, candidate) in uploads.iter().zip(&sorted) {
                prop_assert_eq!(upload.to_id, candidate.id);
                prop_assert!(u64::from(upload.bandwidth) >= candidate.required_upload.floor() as u64);
            }
            if let Some(next) = sorted.get(uploads.len()) {
                let used: u64 = sorted[..uploads.len()]
                    .iter()
                    .map(|it| it.required_upload.floor() as u64)
                    .sum();
                prop_assert!(used + next.required_upload.floor() as u64 > u64::from(capacity));
            }
        }
    }
}
