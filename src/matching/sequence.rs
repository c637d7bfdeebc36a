use crate::cancel::{Canceled, CancellationToken};
use crate::label::classify;
use crate::matching::distance::{shape_of, SubtreeShape};
use crate::matching::policies::pair_distance;
use crate::matching::{Edit, EditScript};
use crate::options::MatchOptions;
use crate::syntax::{NodeId, SyntaxTree};

/// Cancellation is polled between DP rows, never mid-cell.
const CANCEL_CHECK_ROWS: usize = 64;

/// Computes a minimum-cost edit script between two item sequences.
///
/// "Common" items are same-labeled pairs within the per-label distance
/// threshold; ties between equally long common subsequences are broken by
/// minimum cumulative distance and then by proximity, so unchanged items
/// keep their original relative order.
///
/// Known matches are honored by splitting both sequences at each pinned
/// pair and aligning every segment independently.
pub fn match_sequences(
    old_tree: &SyntaxTree,
    old: &[NodeId],
    new_tree: &SyntaxTree,
    new: &[NodeId],
    known: &[(usize, usize)],
    options: &MatchOptions,
    cancel: &CancellationToken,
) -> Result<EditScript, Canceled> {
    let mut edits = Vec::new();
    let (mut old_pos, mut new_pos) = (0, 0);
    for &(ko, kn) in known {
        // Pins are supplied in increasing order by the tree matcher; a pair
        // that crosses a previous one cannot be honored inside a valid
        // alignment and is skipped.
        if ko < old_pos || kn < new_pos {
            continue;
        }
        align_segment(
            old_tree,
            old,
            old_pos..ko,
            new_tree,
            new,
            new_pos..kn,
            options,
            cancel,
            &mut edits,
        )?;
        edits.push(Edit::Match { old: ko, new: kn });
        old_pos = ko + 1;
        new_pos = kn + 1;
    }
    align_segment(
        old_tree,
        old,
        old_pos..old.len(),
        new_tree,
        new,
        new_pos..new.len(),
        options,
        cancel,
        &mut edits,
    )?;
    Ok(EditScript { edits })
}

#[allow(clippy::too_many_arguments)]
fn align_segment(
    old_tree: &SyntaxTree,
    old: &[NodeId],
    old_range: std::ops::Range<usize>,
    new_tree: &SyntaxTree,
    new: &[NodeId],
    new_range: std::ops::Range<usize>,
    options: &MatchOptions,
    cancel: &CancellationToken,
    edits: &mut Vec<Edit>,
) -> Result<(), Canceled> {
    let (mut old_lo, old_hi) = (old_range.start, old_range.end);
    let (mut new_lo, new_hi) = (new_range.start, new_range.end);

    // Degeneration guard for huge, mostly-unchanged sequences: when both
    // sides are long and open with a long exact-equal run, the shared
    // prefix and suffix are matched trivially and only the differing middle
    // region pays for the quadratic DP.
    let mut tail_matches = 0;
    if old_hi - old_lo > options.long_sequence_len && new_hi - new_lo > options.long_sequence_len {
        let mut prefix = 0;
        while old_lo + prefix < old_hi
            && new_lo + prefix < new_hi
            && subtree_equal(old_tree, old[old_lo + prefix], new_tree, new[new_lo + prefix])
        {
            prefix += 1;
        }
        if prefix >= options.long_common_prefix {
            for k in 0..prefix {
                edits.push(Edit::Match {
                    old: old_lo + k,
                    new: new_lo + k,
                });
            }
            old_lo += prefix;
            new_lo += prefix;
            while tail_matches < (old_hi - old_lo).min(new_hi - new_lo)
                && subtree_equal(
                    old_tree,
                    old[old_hi - 1 - tail_matches],
                    new_tree,
                    new[new_hi - 1 - tail_matches],
                )
            {
                tail_matches += 1;
            }
        }
    }

    align_dp(
        old_tree,
        old,
        old_lo..old_hi - tail_matches,
        new_tree,
        new,
        new_lo..new_hi - tail_matches,
        options,
        cancel,
        edits,
    )?;

    for k in (0..tail_matches).rev() {
        edits.push(Edit::Match {
            old: old_hi - 1 - k,
            new: new_hi - 1 - k,
        });
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
struct Score {
    matches: u32,
    /// Cumulative distance of matched pairs, in thousandths.
    cost: u64,
}

impl Score {
    fn better_than(self, other: Score) -> bool {
        self.matches > other.matches || (self.matches == other.matches && self.cost < other.cost)
    }
}

#[allow(clippy::too_many_arguments)]
fn align_dp(
    old_tree: &SyntaxTree,
    old: &[NodeId],
    old_range: std::ops::Range<usize>,
    new_tree: &SyntaxTree,
    new: &[NodeId],
    new_range: std::ops::Range<usize>,
    options: &MatchOptions,
    cancel: &CancellationToken,
    edits: &mut Vec<Edit>,
) -> Result<(), Canceled> {
    let old = &old[old_range.clone()];
    let new = &new[new_range.clone()];
    let (n, m) = (old.len(), new.len());

    if n == 0 || m == 0 {
        edits.extend((0..n).map(|i| Edit::Delete {
            old: old_range.start + i,
        }));
        edits.extend((0..m).map(|j| Edit::Insert {
            new: new_range.start + j,
        }));
        return Ok(());
    }

    let old_shapes: Vec<SubtreeShape> = old.iter().map(|&id| shape_of(old_tree, id)).collect();
    let new_shapes: Vec<SubtreeShape> = new.iter().map(|&id| shape_of(new_tree, id)).collect();

    // Policy-adjusted distance, or None when the pair may not match.
    let candidate = |i: usize, j: usize| -> Option<f64> {
        let old_label = classify(old_tree.kind(old[i]))?;
        let new_label = classify(new_tree.kind(new[j]))?;
        if old_label != new_label {
            return None;
        }
        pair_distance(
            old_label,
            old_tree,
            old[i],
            &old_shapes[i],
            new_tree,
            new[j],
            &new_shapes[j],
            options,
        )
    };

    let width = m + 1;
    let mut dp = vec![Score::default(); (n + 1) * width];
    for i in 1..=n {
        if i % CANCEL_CHECK_ROWS == 0 {
            cancel.check()?;
        }
        for j in 1..=m {
            let mut best = dp[(i - 1) * width + j];
            let left = dp[i * width + j - 1];
            if left.better_than(best) {
                best = left;
            }
            if let Some(dist) = candidate(i - 1, j - 1) {
                let diag = dp[(i - 1) * width + j - 1];
                let scored = Score {
                    matches: diag.matches + 1,
                    cost: diag.cost + (dist * 1000.0).round() as u64,
                };
                if scored.better_than(best) || scored == best {
                    best = scored;
                }
            }
            dp[i * width + j] = best;
        }
    }

    // Trace back; trimming the longer side while it costs nothing comes
    // first, so surviving matches pair the closest indices and untouched
    // items keep their original relative order.
    let mut rev = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        let here = dp[i * width + j];
        if i > j && dp[(i - 1) * width + j] == here {
            rev.push(Edit::Delete {
                old: old_range.start + i - 1,
            });
            i -= 1;
            continue;
        }
        if j > i && dp[i * width + j - 1] == here {
            rev.push(Edit::Insert {
                new: new_range.start + j - 1,
            });
            j -= 1;
            continue;
        }
        if i > 0 && j > 0 {
            if let Some(dist) = candidate(i - 1, j - 1) {
                let diag = dp[(i - 1) * width + j - 1];
                let scored = Score {
                    matches: diag.matches + 1,
                    cost: diag.cost + (dist * 1000.0).round() as u64,
                };
                if scored == here {
                    rev.push(Edit::Match {
                        old: old_range.start + i - 1,
                        new: new_range.start + j - 1,
                    });
                    i -= 1;
                    j -= 1;
                    continue;
                }
            }
        }
        let can_delete = i > 0 && dp[(i - 1) * width + j] == here;
        let can_insert = j > 0 && dp[i * width + j - 1] == here;
        let delete = match (can_delete, can_insert) {
            (true, false) => true,
            (false, true) => false,
            // Closest-index preference.
            _ => i >= j,
        };
        if delete {
            rev.push(Edit::Delete {
                old: old_range.start + i - 1,
            });
            i -= 1;
        } else {
            rev.push(Edit::Insert {
                new: new_range.start + j - 1,
            });
            j -= 1;
        }
    }
    edits.extend(rev.into_iter().rev());
    Ok(())
}

/// Exact equality of two subtrees over significant structure: same node
/// kinds, same token texts, trivia ignored.
pub fn subtree_equal(
    old_tree: &SyntaxTree,
    old: NodeId,
    new_tree: &SyntaxTree,
    new: NodeId,
) -> bool {
    let mut old_iter = old_tree
        .descendants(old)
        .filter(|&id| !old_tree.kind(id).is_trivia());
    let mut new_iter = new_tree
        .descendants(new)
        .filter(|&id| !new_tree.kind(id).is_trivia());
    loop {
        match (old_iter.next(), new_iter.next()) {
            (None, None) => return true,
            (Some(a), Some(b)) => {
                if old_tree.kind(a) != new_tree.kind(b) || old_tree.text(a) != new_tree.text(b) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}
