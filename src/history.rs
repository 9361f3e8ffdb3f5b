use thiserror::Error;

use crate::types::PeerId;

pub(crate) type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    #[error("expected round {expected}, got round {got}")]
    OutOfOrder { expected: usize, got: usize },
}

/// Blocks received from one sender during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Download {
    pub from_id: PeerId,
    pub blocks: u32,
}

impl Download {
    pub fn new(from_id: PeerId, blocks: u32) -> Self {
        Self { from_id, blocks }
    }
}

/// Append-only log of what this agent received, one entry per completed round.
#[derive(Debug, Clone, Default)]
pub struct History {
    downloads: Vec<Vec<Download>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the round being played. Equals the number of completed rounds.
    pub fn current_round(&self) -> usize {
        self.downloads.len()
    }

    /// Closes the current round with what was received during it.
    pub fn push_round(&mut self, downloads: Vec<Download>) {
        self.downloads.push(downloads);
    }

    /// Like [`History::push_round`], but checks that `round` is the one being closed.
    pub fn record_round(&mut self, round: usize, downloads: Vec<Download>) -> Result<()> {
        let expected = self.current_round();
        if round != expected {
            return Err(HistoryError::OutOfOrder {
                expected,
                got: round,
            });
        }
        self.push_round(downloads);
        Ok(())
    }

    pub fn round(&self, round: usize) -> Option<&[Download]> {
        self.downloads.get(round).map(Vec::as_slice)
    }

    pub fn last_round(&self) -> Option<&[Download]> {
        self.downloads.last().map(Vec::as_slice)
    }

    /// The most recent `count` rounds, oldest first. Shorter when less history exists.
    pub fn last_rounds(&self, count: usize) -> &[Vec<Download>] {
        let start = self.downloads.len().saturating_sub(count);
        &self.downloads[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history() {
        let history = History::new();
        assert_eq!(history.current_round(), 0);
        assert!(history.last_round().is_none());
        assert!(history.last_rounds(3).is_empty());
    }

    #[test]
    fn test_last_rounds_window() {
        let mut history = History::new();
        history.push_round(vec![Download::new(1, 2)]);
        history.push_round(vec![]);
        assert_eq!(history.current_round(), 2);
        assert_eq!(history.last_rounds(3).len(), 2);

        history.push_round(vec![Download::new(2, 1)]);
        history.push_round(vec![Download::new(3, 5)]);
        let window = history.last_rounds(3);
        assert_eq!(window.len(), 3);
        assert!(window[0].is_empty());
        assert_eq!(window[2], vec![Download::new(3, 5)]);
        assert_eq!(history.last_round(), Some(&[Download::new(3, 5)][..]));
        assert_eq!(history.round(0), Some(&[Download::new(1, 2)][..]));
    }

    #[test]
    fn test_record_round_out_of_order() {
        let mut history = History::new();
        history.record_round(0, vec![]).unwrap();
        assert_eq!(
            history.record_round(2, vec![]),
            Err(HistoryError::OutOfOrder {
                expected: 1,
                got: 2
            })
        );
        assert_eq!(history.current_round(), 1);
    }
}
