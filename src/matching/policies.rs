use crate::label::Label;
use crate::matching::distance::{node_distance, SubtreeShape};
use crate::options::MatchOptions;
use crate::syntax::{NodeId, SyntaxKind, SyntaxTree};

/// Distance a pattern-declared variable gets when names disagree but the
/// slot position does not; stays under the designation threshold so that
/// swapped names still match by position.
const DESIGNATION_POSITIONAL_DISTANCE: f64 = 0.4;

/// Maximum distance at which two same-labeled items still count as
/// "common" for the sequence matcher. Exact matches always qualify.
pub fn distance_threshold(label: Label) -> f64 {
    match label {
        Label::Token => 0.25,

        // Declarations identify long-lived entities; allow heavier body
        // churn before giving up on the correspondence.
        Label::TypeDeclaration
        | Label::EnumDeclaration
        | Label::MethodDeclaration
        | Label::ConstructorDeclaration
        | Label::PropertyDeclaration
        | Label::IndexerDeclaration
        | Label::FieldDeclaration => 0.7,

        // Closures match by nesting position; the distance is overridden by
        // the policy below, so any value qualifies.
        Label::Closure => 1.0,

        // A block carries no identity of its own; it is still the same block
        // when every statement inside it was rewritten.
        Label::Block => 1.0,

        Label::Pattern | Label::VariableDesignation => 0.5,

        _ => 0.6,
    }
}

/// Policy-adjusted distance for a candidate pair inside a run, or `None`
/// when the pair is not allowed to match at all.
///
/// Both items are guaranteed to carry `label`; run partitioning already
/// rejected cross-label pairs (and with them `await` vs `await foreach`/
/// `await using`, which deliberately never unify).
pub fn pair_distance(
    label: Label,
    old_tree: &SyntaxTree,
    old: NodeId,
    old_shape: &SubtreeShape,
    new_tree: &SyntaxTree,
    new: NodeId,
    new_shape: &SubtreeShape,
    options: &MatchOptions,
) -> Option<f64> {
    match label {
        Label::Closure => {
            // Identity of a closure is its nesting position, not its body:
            // bodies usually change together with a lambda-to-local-function
            // conversion. Zero distance makes the LCS pair closures up
            // strictly by ordinal.
            if options.match_across_closure_forms
                || old_tree.kind(old) == new_tree.kind(new)
            {
                Some(0.0)
            } else {
                None
            }
        }
        Label::VariableDesignation => {
            match (designation_name(old_tree, old), designation_name(new_tree, new)) {
                (Some(a), Some(b)) if a == b => Some(0.0),
                // Positional fallback: same slot, different name.
                _ => Some(DESIGNATION_POSITIONAL_DISTANCE),
            }
        }
        _ => {
            let base = node_distance(old_shape, new_shape);
            if base <= distance_threshold(label) {
                Some(base)
            } else {
                None
            }
        }
    }
}

/// Declared name of a designation node, when it has one.
pub fn designation_name<'a>(tree: &'a SyntaxTree, id: NodeId) -> Option<&'a str> {
    if tree.kind(id) == SyntaxKind::DiscardDesignation {
        return None;
    }
    tree.children(id)
        .iter()
        .find(|&&c| tree.kind(c) == SyntaxKind::IdentifierToken)
        .and_then(|&c| tree.text(c))
}
