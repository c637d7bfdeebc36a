mod distance;
mod policies;
mod sequence;
mod tree;

pub use distance::{distance, token_distance};
pub use policies::distance_threshold;
pub use sequence::{match_sequences, subtree_equal};
pub use tree::{match_subtrees, match_trees};

use crate::cancel::Canceled;
use crate::syntax::NodeId;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Classification of a node-level change derived from a correspondence.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EditKind {
    Insert,
    Delete,
    Update,
    Move,
}

impl EditKind {
    pub const ALL: &'static [EditKind] = &[
        EditKind::Insert,
        EditKind::Delete,
        EditKind::Update,
        EditKind::Move,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EditKind::Insert => "insert",
            EditKind::Delete => "delete",
            EditKind::Update => "update",
            EditKind::Move => "move",
        }
    }
}

/// One operation of an edit script over two item sequences.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Edit {
    Match { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

/// Ordered list of edit operations; every index of both sequences appears
/// exactly once and indices are monotonic within each operation kind.
#[derive(Clone, Debug, Default)]
pub struct EditScript {
    pub edits: Vec<Edit>,
}

impl EditScript {
    pub fn matches(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edits.iter().filter_map(|edit| match edit {
            Edit::Match { old, new } => Some((*old, *new)),
            _ => None,
        })
    }
}

/// Caller-pinned pair the tree matcher must reproduce verbatim.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct KnownMatch {
    pub old: NodeId,
    pub new: NodeId,
}

/// Node correspondence between two trees: a partial bijection consistent
/// with ancestor matching.
///
/// Pairs are kept in insertion order so iteration is deterministic; the
/// hash maps only serve point lookups.
#[derive(Debug, Default)]
pub struct NodeMatch {
    old_to_new: FxHashMap<NodeId, NodeId>,
    new_to_old: FxHashMap<NodeId, NodeId>,
    pairs: Vec<(NodeId, NodeId)>,
}

impl NodeMatch {
    pub(crate) fn new() -> Self {
        NodeMatch::default()
    }

    /// Records a pair unless either side is already taken.
    pub(crate) fn insert(&mut self, old: NodeId, new: NodeId) -> bool {
        if self.old_to_new.contains_key(&old) || self.new_to_old.contains_key(&new) {
            return false;
        }
        self.old_to_new.insert(old, new);
        self.new_to_old.insert(new, old);
        self.pairs.push((old, new));
        true
    }

    /// Partner of an old-tree node, when it has one. Absence is a valid
    /// outcome (the node was deleted), not an error.
    pub fn partner_in_new(&self, old: NodeId) -> Option<NodeId> {
        self.old_to_new.get(&old).copied()
    }

    /// Partner of a new-tree node, when it has one.
    pub fn partner_in_old(&self, new: NodeId) -> Option<NodeId> {
        self.new_to_old.get(&new).copied()
    }

    pub fn contains_pair(&self, old: NodeId, new: NodeId) -> bool {
        self.old_to_new.get(&old) == Some(&new)
    }

    /// Matched pairs in the order they were discovered.
    pub fn pairs(&self) -> &[(NodeId, NodeId)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MatchError {
    #[error("match canceled")]
    Canceled,
    #[error("known match {0:?} -> {1:?} conflicts with another known match")]
    KnownMatchConflict(NodeId, NodeId),
    #[error("known match {0:?} -> {1:?} pairs items with different labels")]
    KnownMatchLabelMismatch(NodeId, NodeId),
}

impl From<Canceled> for MatchError {
    fn from(_: Canceled) -> Self {
        MatchError::Canceled
    }
}
