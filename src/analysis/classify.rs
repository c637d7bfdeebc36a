use crate::analysis::rude_edit::{RudeEdit, RudeEditKind, RuntimeCapabilities};
use crate::analysis::span_resolver::diagnostic_span;
use crate::label::classify as classify_label;
use crate::matching::{EditKind, NodeMatch};
use crate::syntax::{NodeId, Span, SyntaxKind, SyntaxTree};

/// A node-level change derived from the tree correspondence.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TreeEdit {
    pub kind: EditKind,
    pub old: Option<NodeId>,
    pub new: Option<NodeId>,
}

/// Applies the fixed decision table to one top-level declaration edit.
///
/// The table is keyed by node kind and edit kind; the capability set can
/// turn a normally rude insertion into an allowed one, which is the only
/// way runtimes differ here.
pub fn classify_declaration_edit(
    old_tree: &SyntaxTree,
    new_tree: &SyntaxTree,
    matches: &NodeMatch,
    edit: TreeEdit,
    capabilities: RuntimeCapabilities,
) -> Option<RudeEdit> {
    use SyntaxKind::*;
    match edit.kind {
        EditKind::Insert => {
            let node = edit.new?;
            let required = match new_tree.kind(node) {
                MethodDeclaration | ConstructorDeclaration | PropertyDeclaration
                | IndexerDeclaration => Some(RuntimeCapabilities::ADD_METHOD_TO_EXISTING_TYPE),
                FieldDeclaration | VariableDeclarator | EnumMemberDeclaration => {
                    Some(field_capability(new_tree, node))
                }
                ClassDeclaration | StructDeclaration | InterfaceDeclaration | EnumDeclaration => {
                    Some(RuntimeCapabilities::NEW_TYPE_DEFINITION)
                }
                // Signature and attribute surface changes have no enabling
                // capability in this set.
                Parameter | ParameterList | AttributeList => None,
                _ => return None,
            };
            match required {
                Some(capability) if capabilities.contains(capability) => None,
                _ => Some(RudeEdit::new(
                    RudeEditKind::Insert,
                    Some(node),
                    diagnostic_span(new_tree, node, EditKind::Insert),
                )),
            }
        }
        EditKind::Delete => {
            let node = edit.old?;
            if !is_declaration(old_tree.kind(node)) {
                return None;
            }
            // The old node no longer exists; report on its parent's partner
            // in the new document.
            let span = deleted_node_span(old_tree, new_tree, matches, node);
            Some(RudeEdit {
                kind: RudeEditKind::Delete,
                node: None,
                span,
                detail: None,
            })
        }
        EditKind::Update => {
            let old = edit.old?;
            let new = edit.new?;
            match (declared_name(old_tree, old), declared_name(new_tree, new)) {
                (Some(a), Some(b)) if a != b => {
                    return Some(RudeEdit::new(
                        RudeEditKind::Renamed,
                        Some(new),
                        diagnostic_span(new_tree, new, EditKind::Update),
                    ))
                }
                _ => {}
            }
            match new_tree.kind(new) {
                Parameter | ParameterList | AttributeList => Some(RudeEdit::new(
                    RudeEditKind::Update,
                    Some(new),
                    diagnostic_span(new_tree, new, EditKind::Update),
                )),
                MethodDeclaration | ConstructorDeclaration | PropertyDeclaration
                | IndexerDeclaration
                    if contains_closure(new_tree, new)
                        && !capabilities
                            .contains(RuntimeCapabilities::UPDATE_METHOD_CONTAINING_CLOSURE) =>
                {
                    Some(RudeEdit::new(
                        RudeEditKind::Update,
                        Some(new),
                        diagnostic_span(new_tree, new, EditKind::Update),
                    ))
                }
                _ => None,
            }
        }
        EditKind::Move => {
            let node = edit.new?;
            if !is_declaration(new_tree.kind(node)) {
                return None;
            }
            Some(RudeEdit::new(
                RudeEditKind::Move,
                Some(node),
                diagnostic_span(new_tree, node, EditKind::Move),
            ))
        }
    }
}

/// Body-level classification of a change to `kind` inside a member that
/// holds active statements. Suspension-point shapes cannot change around a
/// suspended frame.
pub fn classify_body_edit(kind: SyntaxKind, edit: EditKind) -> Option<RudeEditKind> {
    if !is_suspension_point(kind) {
        return None;
    }
    Some(match edit {
        EditKind::Insert => RudeEditKind::InsertAroundActiveStatement,
        EditKind::Delete => RudeEditKind::DeleteAroundActiveStatement,
        EditKind::Update | EditKind::Move => RudeEditKind::UpdateAroundActiveStatement,
    })
}

/// Constructs that introduce a suspension point in a state machine. An
/// `await` expression deliberately never unifies with `await foreach` or
/// `await using`; the suspension counts differ.
pub fn is_suspension_point(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::AwaitExpression
            | SyntaxKind::AwaitForEachStatement
            | SyntaxKind::AwaitUsingStatement
            | SyntaxKind::YieldReturnStatement
            | SyntaxKind::YieldBreakStatement
    )
}

pub fn is_declaration(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::ClassDeclaration
            | SyntaxKind::StructDeclaration
            | SyntaxKind::InterfaceDeclaration
            | SyntaxKind::EnumDeclaration
            | SyntaxKind::EnumMemberDeclaration
            | SyntaxKind::MethodDeclaration
            | SyntaxKind::ConstructorDeclaration
            | SyntaxKind::PropertyDeclaration
            | SyntaxKind::IndexerDeclaration
            | SyntaxKind::FieldDeclaration
            | SyntaxKind::VariableDeclarator
            | SyntaxKind::Parameter
            | SyntaxKind::ParameterList
            | SyntaxKind::AttributeList
    )
}

/// Name token text of a named declaration.
pub fn declared_name<'a>(tree: &'a SyntaxTree, node: NodeId) -> Option<&'a str> {
    tree.children(node)
        .iter()
        .find(|&&c| tree.kind(c) == SyntaxKind::IdentifierToken)
        .and_then(|&c| tree.text(c))
}

/// Capability that permits inserting a field. A `static` modifier on the
/// declaration selects the static-field capability; a declarator looks the
/// modifier up on its enclosing field declaration. Enum members carry no
/// modifier list and stay instance-gated.
fn field_capability(tree: &SyntaxTree, node: NodeId) -> RuntimeCapabilities {
    let declaration = if tree.kind(node) == SyntaxKind::FieldDeclaration {
        Some(node)
    } else {
        tree.ancestors(node)
            .find(|&a| tree.kind(a) == SyntaxKind::FieldDeclaration)
    };
    let is_static = declaration.is_some_and(|d| {
        tree.children(d)
            .iter()
            .any(|&c| tree.kind(c) == SyntaxKind::KeywordToken && tree.text(c) == Some("static"))
    });
    if is_static {
        RuntimeCapabilities::ADD_STATIC_FIELD_TO_EXISTING_TYPE
    } else {
        RuntimeCapabilities::ADD_INSTANCE_FIELD_TO_EXISTING_TYPE
    }
}

pub fn contains_closure(tree: &SyntaxTree, root: NodeId) -> bool {
    tree.descendants(root)
        .any(|id| classify_label(tree.kind(id)).is_some_and(|l| l.is_closure()))
}

fn deleted_node_span(
    old_tree: &SyntaxTree,
    new_tree: &SyntaxTree,
    matches: &NodeMatch,
    old_node: NodeId,
) -> Span {
    for ancestor in old_tree.ancestors(old_node) {
        if let Some(partner) = matches.partner_in_new(ancestor) {
            return diagnostic_span(new_tree, partner, EditKind::Delete);
        }
    }
    Span::default()
}
