//! Reference-identity bookkeeping for one traversal.
//!
//! The tracker records every (expected, actual) object pair a comparison
//! has descended into. It is keyed purely by allocation identity, never by
//! structural equality, and must be fresh for every root comparison.

use std::collections::HashSet;

use deepassert_types::ObjectRef;

/// Result of looking up an (expected, actual) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairStatus {
    /// Never seen; record it before descending.
    NewPair,
    /// Already compared in this traversal.
    ExactPairSeen,
    /// One side was previously seen only in the opposite role.
    CrossedRole,
}

/// Visited pairs and per-role visited sets for one root comparison.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    pairs: HashSet<(usize, usize)>,
    expected: HashSet<usize>,
    actual: HashSet<usize>,
    // Keeps every recorded object alive so addresses stay unique for the traversal.
    retained: Vec<ObjectRef>,
}

impl IdentityTracker {
    /// An empty tracker for one root comparison.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify the pair without recording it.
    pub fn check(&self, expected: &ObjectRef, actual: &ObjectRef) -> PairStatus {
        let (e, a) = (expected.identity(), actual.identity());
        if self.pairs.contains(&(e, a)) {
            return PairStatus::ExactPairSeen;
        }
        let expected_only_as_actual = self.actual.contains(&e) && !self.expected.contains(&e);
        let actual_only_as_expected = self.expected.contains(&a) && !self.actual.contains(&a);
        if expected_only_as_actual || actual_only_as_expected {
            PairStatus::CrossedRole
        } else {
            PairStatus::NewPair
        }
    }

    /// Remember the pair and both objects' roles for the rest of the pass.
    pub fn record(&mut self, expected: &ObjectRef, actual: &ObjectRef) {
        let (e, a) = (expected.identity(), actual.identity());
        if self.pairs.insert((e, a)) {
            self.expected.insert(e);
            self.actual.insert(a);
            self.retained.push(expected.clone());
            self.retained.push(actual.clone());
        }
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
