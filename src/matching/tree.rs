use crate::cancel::CancellationToken;
use crate::label::{classify, Label};
use crate::matching::{match_sequences, Edit, KnownMatch, MatchError, NodeMatch};
use crate::options::MatchOptions;
use crate::syntax::{NodeId, SyntaxTree};
use tracing::trace;

/// Computes the node correspondence between two trees.
///
/// Roots always match. The traversal is an explicit work-list over matched
/// pairs, so arbitrarily deep trees cannot overflow the call stack; the
/// result is byte-for-byte deterministic because every collection is walked
/// in insertion or source order.
pub fn match_trees(
    old_tree: &SyntaxTree,
    new_tree: &SyntaxTree,
    known_matches: &[KnownMatch],
    options: &MatchOptions,
    cancel: &CancellationToken,
) -> Result<NodeMatch, MatchError> {
    match_subtrees(
        old_tree,
        old_tree.root(),
        new_tree,
        new_tree.root(),
        known_matches,
        options,
        cancel,
    )
}

/// Same as [`match_trees`] with explicit comparison roots, used for
/// body-level matching of an already-paired member declaration. The given
/// roots play the designated-root role and match unconditionally.
pub fn match_subtrees(
    old_tree: &SyntaxTree,
    old_root: NodeId,
    new_tree: &SyntaxTree,
    new_root: NodeId,
    known_matches: &[KnownMatch],
    options: &MatchOptions,
    cancel: &CancellationToken,
) -> Result<NodeMatch, MatchError> {
    let mut matches = NodeMatch::new();
    matches.insert(old_root, new_root);

    // Seed the pinned pairs up front; the generic pass below never
    // overrides an existing entry, which is exactly the verbatim guarantee.
    let mut work: Vec<(NodeId, NodeId)> = vec![(old_root, new_root)];
    for km in known_matches {
        if matches.contains_pair(km.old, km.new) {
            continue;
        }
        let old_label = classify(old_tree.kind(km.old));
        let new_label = classify(new_tree.kind(km.new));
        if old_label.is_none() || old_label != new_label {
            return Err(MatchError::KnownMatchLabelMismatch(km.old, km.new));
        }
        if !matches.insert(km.old, km.new) {
            return Err(MatchError::KnownMatchConflict(km.old, km.new));
        }
        work.push((km.old, km.new));
    }

    let mut cursor = 0;
    while cursor < work.len() {
        let (old, new) = work[cursor];
        cursor += 1;
        cancel.check()?;
        match_children(
            old_tree, old, new_tree, new, &mut matches, &mut work, options, cancel,
        )?;
    }
    trace!(pairs = matches.len(), "subtree match complete");
    Ok(matches)
}

struct Run {
    label: Label,
    items: Vec<NodeId>,
}

/// Significant children partitioned into label-homogeneous contiguous runs,
/// so statements only ever face statements, declarations face declarations,
/// and so on.
fn child_runs(tree: &SyntaxTree, id: NodeId) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &child in tree.children(id) {
        let Some(label) = classify(tree.kind(child)) else {
            continue;
        };
        match runs.last_mut() {
            Some(run) if run.label == label => run.items.push(child),
            _ => runs.push(Run {
                label,
                items: vec![child],
            }),
        }
    }
    runs
}

/// Aligns two run lists by label with a small weighted LCS; the weight
/// favors pairing runs that can actually contribute matches.
fn align_runs(old_runs: &[Run], new_runs: &[Run]) -> Vec<(usize, usize)> {
    let (n, m) = (old_runs.len(), new_runs.len());
    let width = m + 1;
    let mut dp = vec![0u32; (n + 1) * width];
    for i in 1..=n {
        for j in 1..=m {
            let mut best = dp[(i - 1) * width + j].max(dp[i * width + j - 1]);
            if old_runs[i - 1].label == new_runs[j - 1].label {
                let weight = 1 + old_runs[i - 1].items.len().min(new_runs[j - 1].items.len()) as u32;
                best = best.max(dp[(i - 1) * width + j - 1] + weight);
            }
            dp[i * width + j] = best;
        }
    }

    let mut rev = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        let here = dp[i * width + j];
        if old_runs[i - 1].label == new_runs[j - 1].label {
            let weight = 1 + old_runs[i - 1].items.len().min(new_runs[j - 1].items.len()) as u32;
            if dp[(i - 1) * width + j - 1] + weight == here {
                rev.push((i - 1, j - 1));
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if dp[(i - 1) * width + j] == here {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    rev.reverse();
    rev
}

#[allow(clippy::too_many_arguments)]
fn match_children(
    old_tree: &SyntaxTree,
    old: NodeId,
    new_tree: &SyntaxTree,
    new: NodeId,
    matches: &mut NodeMatch,
    work: &mut Vec<(NodeId, NodeId)>,
    options: &MatchOptions,
    cancel: &CancellationToken,
) -> Result<(), MatchError> {
    let old_runs = child_runs(old_tree, old);
    let new_runs = child_runs(new_tree, new);
    if old_runs.is_empty() || new_runs.is_empty() {
        return Ok(());
    }

    for (oi, ni) in align_runs(&old_runs, &new_runs) {
        let old_run = &old_runs[oi];
        let new_run = &new_runs[ni];

        // Items already pinned to a partner outside this run cannot be
        // rematched; drop them from the sequences. Pins that land inside
        // both runs become index pairs the sequence matcher must keep.
        let old_items: Vec<NodeId> = old_run
            .items
            .iter()
            .copied()
            .filter(|&item| match matches.partner_in_new(item) {
                None => true,
                Some(partner) => new_run.items.contains(&partner),
            })
            .collect();
        let new_items: Vec<NodeId> = new_run
            .items
            .iter()
            .copied()
            .filter(|&item| match matches.partner_in_old(item) {
                None => true,
                Some(partner) => old_items.contains(&partner),
            })
            .collect();

        let mut known = Vec::new();
        let mut min_new = 0;
        for (i, &item) in old_items.iter().enumerate() {
            if let Some(partner) = matches.partner_in_new(item) {
                if let Some(j) = new_items.iter().position(|&cand| cand == partner) {
                    if j >= min_new {
                        known.push((i, j));
                        min_new = j + 1;
                    }
                }
            }
        }

        let script = match_sequences(
            old_tree, &old_items, new_tree, &new_items, &known, options, cancel,
        )?;
        for edit in &script.edits {
            if let Edit::Match { old: i, new: j } = edit {
                let (old_child, new_child) = (old_items[*i], new_items[*j]);
                if matches.insert(old_child, new_child) {
                    work.push((old_child, new_child));
                }
            }
        }
    }
    Ok(())
}
