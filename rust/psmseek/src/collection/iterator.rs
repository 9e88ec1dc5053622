use crate::models::MatchHandle;
use crate::score_type::ScoreType;
use std::cell::Cell;
use std::rc::Rc;

/// Read-only traversal over a snapshot of a collection's matches.
///
/// While one of these is alive the collection refuses to be mutated or to
/// hand out a second iterator. Dropping it releases the lock.
#[derive(Debug)]
pub struct MatchIterator {
    matches: std::vec::IntoIter<MatchHandle>,
    lock: Rc<Cell<bool>>,
    score_type: ScoreType,
}

impl MatchIterator {
    pub(super) fn new(
        matches: Vec<MatchHandle>,
        lock: Rc<Cell<bool>>,
        score_type: ScoreType,
    ) -> Self {
        lock.set(true);
        Self {
            matches: matches.into_iter(),
            lock,
            score_type,
        }
    }

    /// The score type the traversal was opened for.
    pub fn score_type(&self) -> ScoreType {
        self.score_type
    }
}

impl Iterator for MatchIterator {
    type Item = MatchHandle;

    fn next(&mut self) -> Option<Self::Item> {
        self.matches.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.matches.size_hint()
    }
}

impl ExactSizeIterator for MatchIterator {}

impl Drop for MatchIterator {
    fn drop(&mut self) {
        self.lock.set(false);
    }
}
