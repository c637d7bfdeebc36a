use crate::label::{classify, Label};
use crate::syntax::{NodeId, SyntaxTree};

/// Relative weight of the textual term against the structural term when
/// combining them into a node distance.
const TEXT_WEIGHT: f64 = 0.6;

/// Token sequences longer than this are truncated before the quadratic LCS
/// pass; the guard keeps per-pair distance computation bounded even for
/// huge subtrees.
const MAX_COMPARED_TOKENS: usize = 256;

/// Normalized dissimilarity between two token texts: Levenshtein distance
/// divided by the longer length. Two empty texts are identical.
pub fn token_distance(a: &str, b: &str) -> f64 {
    if a == b {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(&a, &b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let subst = prev[j] + usize::from(ca != cb);
            cur[j + 1] = subst.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Flattened view of a subtree, precomputed once per sequence item so that
/// the DP loop does not re-walk subtrees for every compared pair.
pub struct SubtreeShape<'a> {
    pub tokens: Vec<&'a str>,
    pub child_labels: Vec<Label>,
    pub is_leaf_token: bool,
}

pub fn shape_of<'a>(tree: &'a SyntaxTree, id: NodeId) -> SubtreeShape<'a> {
    let mut tokens = Vec::new();
    for token in tree.significant_tokens(id) {
        if let Some(text) = tree.text(token) {
            tokens.push(text);
        }
    }
    let mut child_labels: Vec<Label> = tree
        .children(id)
        .iter()
        .filter_map(|&c| classify(tree.kind(c)))
        .collect();
    child_labels.sort_unstable_by_key(|l| *l as u32);
    SubtreeShape {
        tokens,
        child_labels,
        is_leaf_token: tree.kind(id).is_token(),
    }
}

/// Dissimilarity of two same-labeled subtrees in [0, 1].
///
/// Textually identical subtrees short-circuit to 0, as do two subtrees that
/// both flatten to nothing (absent and empty carry no information and are
/// deliberately not treated as maximally different).
pub fn node_distance(a: &SubtreeShape, b: &SubtreeShape) -> f64 {
    if a.tokens == b.tokens {
        return 0.0;
    }
    if a.tokens.is_empty() && b.tokens.is_empty() {
        return 0.0;
    }
    if a.is_leaf_token && b.is_leaf_token {
        let ta = a.tokens.first().copied().unwrap_or("");
        let tb = b.tokens.first().copied().unwrap_or("");
        return token_distance(ta, tb);
    }

    let text = token_sequence_distance(&a.tokens, &b.tokens);
    let structure = label_multiset_distance(&a.child_labels, &b.child_labels);
    TEXT_WEIGHT * text + (1.0 - TEXT_WEIGHT) * structure
}

/// Convenience wrapper for one-off comparisons outside the DP loop.
pub fn distance(old_tree: &SyntaxTree, old: NodeId, new_tree: &SyntaxTree, new: NodeId) -> f64 {
    node_distance(&shape_of(old_tree, old), &shape_of(new_tree, new))
}

/// 1 - 2*LCS/(n+m) over token texts.
fn token_sequence_distance(a: &[&str], b: &[&str]) -> f64 {
    let a = &a[..a.len().min(MAX_COMPARED_TOKENS)];
    let b = &b[..b.len().min(MAX_COMPARED_TOKENS)];
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let mut prev = vec![0u32; b.len() + 1];
    let mut cur = vec![0u32; b.len() + 1];
    for &ta in a {
        for (j, &tb) in b.iter().enumerate() {
            cur[j + 1] = if ta == tb {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    let lcs = prev[b.len()] as f64;
    1.0 - 2.0 * lcs / (a.len() + b.len()) as f64
}

/// Symmetric difference of the child label multisets, normalized by the
/// total number of labeled children. Equal multisets give 0; disjoint
/// ones give 1.
fn label_multiset_distance(a: &[Label], b: &[Label]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    // Both sides are sorted; count the overlap with a merge walk.
    let mut common = 0usize;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match (a[i] as u32).cmp(&(b[j] as u32)) {
            std::cmp::Ordering::Equal => {
                common += 1;
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    1.0 - 2.0 * common as f64 / (a.len() + b.len()) as f64
}
