mod active_statement;
mod classify;
mod rude_edit;
mod span_resolver;

pub use active_statement::{ActiveStatement, ActiveStatementFlags};
pub use classify::TreeEdit;
pub use rude_edit::{RudeEdit, RudeEditKind, RuntimeCapabilities};
pub use span_resolver::diagnostic_span;

use crate::cancel::{Canceled, CancellationToken};
use crate::label::classify as classify_label;
use crate::matching::{
    match_subtrees, match_trees, subtree_equal, EditKind, KnownMatch, MatchError, NodeMatch,
};
use crate::options::{AnalyzerOptions, InjectedFailure};
use crate::syntax::{NodeId, Span, SyntaxKind, SyntaxTree};
use classify::{classify_body_edit, classify_declaration_edit, is_declaration};
use rustc_hash::{FxHashMap, FxHashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::debug;

/// Detail messages attached to internal-error rude edits are cut at this
/// many bytes.
const MAX_FAILURE_DETAIL: usize = 160;

/// Everything a single document analysis needs. Calls share no state, so
/// the caller is free to analyze many documents in parallel.
pub struct AnalysisRequest<'a> {
    /// Tree of the document before the edit; `None` when the file did not
    /// exist in the baseline.
    pub old_tree: Option<&'a SyntaxTree>,
    pub new_tree: &'a SyntaxTree,
    /// Active statements located in the old tree.
    pub active_statements: &'a [ActiveStatement],
    /// Caller-pinned node pairs (e.g. from span tracking) the matcher must
    /// keep.
    pub known_matches: &'a [KnownMatch],
    pub capabilities: RuntimeCapabilities,
    pub options: AnalyzerOptions,
    pub cancel: CancellationToken,
}

/// A changed member with a body-level correspondence; consumed opaquely by
/// the semantic collaborator together with the syntax map.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MemberUpdate {
    pub old_member: NodeId,
    pub new_member: NodeId,
}

/// Aggregate outcome of one document analysis. Immutable once returned.
#[derive(Debug)]
pub struct AnalysisResult {
    pub has_changes: bool,
    pub has_syntax_errors: bool,
    /// Ordered, deduplicated by (kind, node, span).
    pub rude_edits: Vec<RudeEdit>,
    /// The caller's active statements with relocated spans, same order.
    pub active_statements: Vec<ActiveStatement>,
    /// New-tree node to old-tree node, for every matched pair discovered.
    pub syntax_map: FxHashMap<NodeId, NodeId>,
    pub updated_members: Vec<MemberUpdate>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("analysis canceled")]
    Canceled,
}

impl From<Canceled> for AnalysisError {
    fn from(_: Canceled) -> Self {
        AnalysisError::Canceled
    }
}

/// Analyzes one edited document.
///
/// This is the per-document failure boundary: any panic escaping the
/// matching or classification code is converted into a single
/// internal-error rude edit and the surrounding batch continues
/// unaffected. Cancellation is the only error that propagates.
pub fn analyze_document(request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
    match catch_unwind(AssertUnwindSafe(|| analyze_inner(request))) {
        Ok(result) => result,
        Err(payload) => {
            let detail = failure_detail(payload.as_ref());
            let kind = if detail.to_ascii_lowercase().contains("out of memory") {
                RudeEditKind::OutOfMemory
            } else {
                RudeEditKind::InternalError
            };
            debug!(kind = kind.name(), detail = %detail, "analysis failed");
            Ok(failure_result(request, kind, Some(detail)))
        }
    }
}

fn failure_detail(payload: &(dyn std::any::Any + Send)) -> String {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    };
    let first_line = message.lines().next().unwrap_or("");
    let mut cut = first_line.len().min(MAX_FAILURE_DETAIL);
    while !first_line.is_char_boundary(cut) {
        cut -= 1;
    }
    first_line[..cut].to_owned()
}

/// Result for an analysis that reduced to a single rude edit before (or
/// instead of) matching.
fn failure_result(
    request: &AnalysisRequest,
    kind: RudeEditKind,
    detail: Option<String>,
) -> AnalysisResult {
    AnalysisResult {
        has_changes: true,
        has_syntax_errors: request.new_tree.has_errors(),
        rude_edits: vec![RudeEdit {
            kind,
            node: None,
            span: Span::default(),
            detail,
        }],
        active_statements: request.active_statements.to_vec(),
        syntax_map: FxHashMap::default(),
        updated_members: Vec::new(),
    }
}

fn analyze_inner(request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
    request.cancel.check()?;

    if let Some(failure) = request.options.injected_failure {
        match failure {
            InjectedFailure::Panic => panic!("injected analysis failure"),
            InjectedFailure::OutOfMemory => panic!("out of memory while analyzing document"),
        }
    }

    let new_tree = request.new_tree;
    let Some(old_tree) = request.old_tree else {
        debug!("new file added during session");
        return Ok(failure_result(request, RudeEditKind::InsertFile, None));
    };

    if request.options.experimental_features_enabled {
        debug!("experimental features enabled");
        return Ok(failure_result(
            request,
            RudeEditKind::ExperimentalFeaturesEnabled,
            None,
        ));
    }
    if new_tree.token_count() > request.options.max_tokens
        || new_tree.depth() > request.options.max_depth
        || old_tree.depth() > request.options.max_depth
    {
        debug!(
            tokens = new_tree.token_count(),
            depth = new_tree.depth(),
            "document exceeds analysis limits"
        );
        return Ok(failure_result(request, RudeEditKind::SourceFileTooBig, None));
    }

    let has_syntax_errors = old_tree.has_errors() || new_tree.has_errors();

    if token_streams_equal(old_tree, new_tree) {
        debug!("document unchanged");
        return Ok(AnalysisResult {
            has_changes: false,
            has_syntax_errors,
            rude_edits: Vec::new(),
            active_statements: request.active_statements.to_vec(),
            syntax_map: FxHashMap::default(),
            updated_members: Vec::new(),
        });
    }

    // Syntax errors are reported by the parsing collaborator; we still
    // match best-effort so active statements can be relocated, but we do
    // not classify rude edits on a broken tree.
    if has_syntax_errors {
        debug!("tree has syntax errors, classification suppressed");
    }

    let top = match match_trees(
        old_tree,
        new_tree,
        &[],
        &request.options.match_options,
        &request.cancel,
    ) {
        Ok(top) => top,
        Err(MatchError::Canceled) => return Err(AnalysisError::Canceled),
        Err(err) => return Ok(failure_result(request, RudeEditKind::InternalError, Some(err.to_string()))),
    };
    debug!(pairs = top.len(), "top-level match computed");

    let edits = declaration_edits(old_tree, new_tree, &top);
    debug!(edits = edits.len(), "top-level declaration edits");

    let mut syntax_map: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut old_to_new: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    for &(old, new) in top.pairs() {
        syntax_map.insert(new, old);
        old_to_new.insert(old, new);
    }

    // Body-level matches for every changed member, seeded with the pinned
    // pairs that fall inside it.
    let mut updated_members = Vec::new();
    let mut body_rude_edits = Vec::new();
    for edit in &edits {
        let TreeEdit {
            kind: EditKind::Update,
            old: Some(old_member),
            new: Some(new_member),
        } = *edit
        else {
            continue;
        };
        if !member_label(old_tree.kind(old_member)) {
            continue;
        }
        request.cancel.check()?;

        // A pin is only honored when both of its ends live in this member;
        // seeding a half-outside pair would let the body correspondence
        // escape into a sibling.
        let member_known: Vec<KnownMatch> = request
            .known_matches
            .iter()
            .copied()
            .filter(|km| {
                is_inside(old_tree, old_member, km.old)
                    && is_inside(new_tree, new_member, km.new)
            })
            .collect();

        let body = match match_subtrees(
            old_tree,
            old_member,
            new_tree,
            new_member,
            &member_known,
            &request.options.match_options,
            &request.cancel,
        ) {
            Ok(body) => body,
            Err(MatchError::Canceled) => return Err(AnalysisError::Canceled),
            Err(err) => {
                return Ok(failure_result(
                    request,
                    RudeEditKind::InternalError,
                    Some(err.to_string()),
                ))
            }
        };

        let member_has_active = request
            .active_statements
            .iter()
            .any(|stmt| old_tree.span(old_member).contains(stmt.span));

        if !has_syntax_errors {
            classify_member_body(
                old_tree,
                new_tree,
                old_member,
                new_member,
                &body,
                member_has_active,
                request.options.match_options.match_across_closure_forms,
                &mut body_rude_edits,
            );
        }

        for &(old, new) in body.pairs() {
            syntax_map.insert(new, old);
            old_to_new.insert(old, new);
        }
        updated_members.push(MemberUpdate {
            old_member,
            new_member,
        });
    }

    // Relocate active statements through the merged correspondence.
    let mut active_statements = request.active_statements.to_vec();
    for stmt in &mut active_statements {
        let anchor = statement_anchor(old_tree, stmt.span);
        match old_to_new.get(&anchor) {
            Some(&partner) => {
                if !has_syntax_errors
                    && !stmt.is_leaf()
                    && !subtree_equal(old_tree, anchor, new_tree, partner)
                {
                    body_rude_edits.push(RudeEdit::new(
                        RudeEditKind::ActiveStatementUpdate,
                        Some(partner),
                        new_tree.span(partner),
                    ));
                }
                stmt.span = new_tree.span(partner);
            }
            None => {
                stmt.flags |= ActiveStatementFlags::STALE;
                if !has_syntax_errors {
                    let span = old_tree
                        .ancestors(anchor)
                        .find_map(|a| old_to_new.get(&a))
                        .map(|&p| diagnostic_span(new_tree, p, EditKind::Delete))
                        .unwrap_or_default();
                    body_rude_edits.push(RudeEdit {
                        kind: RudeEditKind::DeleteActiveStatement,
                        node: None,
                        span,
                        detail: None,
                    });
                }
            }
        }
    }

    let mut rude_edits = Vec::new();
    if !has_syntax_errors {
        for edit in &edits {
            if let Some(rude) =
                classify_declaration_edit(old_tree, new_tree, &top, *edit, request.capabilities)
            {
                rude_edits.push(rude);
            }
        }
    }
    rude_edits.extend(body_rude_edits);
    let rude_edits = dedup_rude_edits(rude_edits);
    debug!(rude_edits = rude_edits.len(), "analysis complete");

    Ok(AnalysisResult {
        has_changes: true,
        has_syntax_errors,
        rude_edits,
        active_statements,
        syntax_map,
        updated_members,
    })
}

/// Significant token streams compared by kind and text; trivia never
/// participates, so a comment or whitespace-only edit is "no change".
fn token_streams_equal(old_tree: &SyntaxTree, new_tree: &SyntaxTree) -> bool {
    subtree_equal(old_tree, old_tree.root(), new_tree, new_tree.root())
}

fn member_label(kind: SyntaxKind) -> bool {
    classify_label(kind).is_some_and(|l| l.is_member())
}

fn is_inside(tree: &SyntaxTree, ancestor: NodeId, node: NodeId) -> bool {
    node == ancestor || tree.ancestors(node).any(|a| a == ancestor)
}

/// Declaration-level nodes in pre-order: the walk never descends into a
/// statement-labeled subtree, so method bodies (and the closures inside
/// them) are left to body-level analysis. Method signatures stay visible
/// because a parameter list is not a statement.
fn top_level_nodes(tree: &SyntaxTree) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        nodes.push(id);
        for &child in tree.children(id).iter().rev() {
            if classify_label(tree.kind(child)).is_some_and(|l| l.is_statement()) {
                continue;
            }
            stack.push(child);
        }
    }
    nodes
}

/// Derives insert/delete/update/move edits over declarations from the
/// top-level correspondence. A deleted or inserted subtree is reported once,
/// at its outermost unmatched declaration.
fn declaration_edits(
    old_tree: &SyntaxTree,
    new_tree: &SyntaxTree,
    matches: &NodeMatch,
) -> Vec<TreeEdit> {
    let mut edits = Vec::new();
    for old in top_level_nodes(old_tree) {
        if !is_declaration(old_tree.kind(old)) {
            continue;
        }
        match matches.partner_in_new(old) {
            None => {
                let parent_matched = old_tree
                    .parent(old)
                    .is_some_and(|p| matches.partner_in_new(p).is_some());
                if parent_matched {
                    edits.push(TreeEdit {
                        kind: EditKind::Delete,
                        old: Some(old),
                        new: None,
                    });
                }
            }
            Some(new) => {
                let old_parent_partner = old_tree
                    .parent(old)
                    .and_then(|p| matches.partner_in_new(p));
                if old_parent_partner != new_tree.parent(new) {
                    edits.push(TreeEdit {
                        kind: EditKind::Move,
                        old: Some(old),
                        new: Some(new),
                    });
                }
                if !subtree_equal(old_tree, old, new_tree, new) {
                    edits.push(TreeEdit {
                        kind: EditKind::Update,
                        old: Some(old),
                        new: Some(new),
                    });
                }
            }
        }
    }
    for new in top_level_nodes(new_tree) {
        if !is_declaration(new_tree.kind(new)) {
            continue;
        }
        if matches.partner_in_old(new).is_none() {
            let parent_matched = new_tree
                .parent(new)
                .is_some_and(|p| matches.partner_in_old(p).is_some());
            if parent_matched {
                edits.push(TreeEdit {
                    kind: EditKind::Insert,
                    old: None,
                    new: Some(new),
                });
            }
        }
    }
    edits
}

/// Body-level rude edits of one changed member: suspension-point changes
/// around active statements and, when cross-form matching is suppressed,
/// closure form conversions.
#[allow(clippy::too_many_arguments)]
fn classify_member_body(
    old_tree: &SyntaxTree,
    new_tree: &SyntaxTree,
    old_member: NodeId,
    new_member: NodeId,
    body: &NodeMatch,
    member_has_active: bool,
    match_across_closure_forms: bool,
    out: &mut Vec<RudeEdit>,
) {
    let mut deleted_closure_kinds = Vec::new();
    let mut deleted_suspension_kinds = Vec::new();
    for old in old_tree.descendants(old_member) {
        if classify_label(old_tree.kind(old)).is_none() {
            continue;
        }
        match body.partner_in_new(old) {
            None => {
                if classify::is_suspension_point(old_tree.kind(old)) {
                    deleted_suspension_kinds.push(old_tree.kind(old));
                }
                let parent_matched = old_tree
                    .parent(old)
                    .is_some_and(|p| body.partner_in_new(p).is_some());
                if !parent_matched {
                    continue;
                }
                if classify_label(old_tree.kind(old)).is_some_and(|l| l.is_closure()) {
                    deleted_closure_kinds.push(old_tree.kind(old));
                }
                if member_has_active {
                    if let Some(kind) = classify_body_edit(old_tree.kind(old), EditKind::Delete) {
                        let span = old_tree
                            .ancestors(old)
                            .find_map(|a| body.partner_in_new(a))
                            .map(|p| new_tree.span(p))
                            .unwrap_or_default();
                        out.push(RudeEdit::new(kind, None, span));
                    }
                }
            }
            Some(new) => {
                if member_has_active
                    && !subtree_equal(old_tree, old, new_tree, new)
                {
                    if let Some(kind) = classify_body_edit(new_tree.kind(new), EditKind::Update) {
                        out.push(RudeEdit::new(kind, Some(new), new_tree.span(new)));
                    }
                }
            }
        }
    }

    let mut await_shape_reported = false;
    for new in new_tree.descendants(new_member) {
        if classify_label(new_tree.kind(new)).is_none() {
            continue;
        }
        if body.partner_in_old(new).is_some() {
            continue;
        }
        let kind = new_tree.kind(new);
        // A suspension point replaced by one of a different shape changes
        // the state machine layout even when no frame is suspended in it.
        if !await_shape_reported
            && classify::is_suspension_point(kind)
            && deleted_suspension_kinds.iter().any(|&k| k != kind)
        {
            out.push(RudeEdit::new(
                RudeEditKind::ChangingAwaitShape,
                Some(new),
                diagnostic_span(new_tree, new, EditKind::Update),
            ));
            await_shape_reported = true;
        }
        let parent_matched = new_tree
            .parent(new)
            .is_some_and(|p| body.partner_in_old(p).is_some());
        if !parent_matched {
            continue;
        }
        if !match_across_closure_forms
            && classify_label(kind).is_some_and(|l| l.is_closure())
            && deleted_closure_kinds.iter().any(|&k| k != kind)
        {
            out.push(RudeEdit::new(
                RudeEditKind::SwitchBetweenLambdaAndLocalFunction,
                Some(new),
                diagnostic_span(new_tree, new, EditKind::Update),
            ));
        }
        if member_has_active {
            if let Some(rude_kind) = classify_body_edit(kind, EditKind::Insert) {
                out.push(RudeEdit::new(rude_kind, Some(new), new_tree.span(new)));
            }
        }
    }
}

/// Innermost statement-level node whose span covers the active statement.
fn statement_anchor(tree: &SyntaxTree, span: Span) -> NodeId {
    let covering = tree.covering_node(span);
    if classify_label(tree.kind(covering)).is_some_and(|l| l.is_statement()) {
        return covering;
    }
    tree.ancestors(covering)
        .find(|&a| classify_label(tree.kind(a)).is_some_and(|l| l.is_statement()))
        .unwrap_or(covering)
}

fn dedup_rude_edits(edits: Vec<RudeEdit>) -> Vec<RudeEdit> {
    let mut seen: FxHashSet<(RudeEditKind, Option<NodeId>, Span)> = FxHashSet::default();
    let mut result = Vec::with_capacity(edits.len());
    for edit in edits {
        if seen.insert((edit.kind, edit.node, edit.span)) {
            result.push(edit);
        }
    }
    result
}
