use crate::matching::EditKind;
use crate::syntax::{NodeId, Span, SyntaxKind, SyntaxTree};

/// Resolves the span reported to the user for a rude edit on `node`.
///
/// Total over every kind that can appear in a tree: the match below is
/// exhaustive and every arm produces a span, so adding a kind without a
/// span rule is a compile error. The returned span is the smallest stable
/// sub-range that identifies the construct — for declarations the header
/// up to the name or parameter list, never the body.
pub fn diagnostic_span(tree: &SyntaxTree, node: NodeId, edit: EditKind) -> Span {
    use SyntaxKind::*;
    match tree.kind(node) {
        CompilationUnit => tree
            .children(node)
            .first()
            .map(|&c| diagnostic_span(tree, c, edit))
            .unwrap_or_else(|| tree.span(node)),

        ClassDeclaration | StructDeclaration | InterfaceDeclaration | EnumDeclaration => {
            header_through(tree, node, |k| k == IdentifierToken)
                .unwrap_or_else(|| tree.span(node))
        }

        MethodDeclaration | ConstructorDeclaration | LocalFunctionStatement => {
            header_through(tree, node, |k| k == ParameterList)
                .or_else(|| header_through(tree, node, |k| k == IdentifierToken))
                .unwrap_or_else(|| tree.span(node))
        }

        // Indexers have no name; the parameter list is the identity.
        IndexerDeclaration => header_through(tree, node, |k| k == ParameterList)
            .unwrap_or_else(|| tree.span(node)),

        PropertyDeclaration | EnumMemberDeclaration => {
            header_through(tree, node, |k| k == IdentifierToken)
                .unwrap_or_else(|| tree.span(node))
        }

        FieldDeclaration => tree
            .children(node)
            .iter()
            .find(|&&c| tree.kind(c) == VariableDeclarator)
            .map(|&c| diagnostic_span(tree, c, edit))
            .unwrap_or_else(|| tree.span(node)),

        VariableDeclarator | Parameter | LabeledStatement | SingleVariableDesignation => {
            name_token_span(tree, node)
        }

        // Statements that embed a body report their header only, so the
        // span stays stable while the body churns.
        IfStatement | WhileStatement | DoStatement | ForStatement | ForEachStatement
        | AwaitForEachStatement | UsingStatement | AwaitUsingStatement | LockStatement
        | SwitchStatement | LambdaExpression | AnonymousMethodExpression => {
            header_before_body(tree, node)
        }

        TryStatement | CatchClause | FinallyClause | ElseClause => first_token_span(tree, node),

        // The last label identifies a section even when its statements change.
        SwitchSection => tree
            .children(node)
            .iter()
            .rev()
            .find(|&&c| matches!(tree.kind(c), CaseSwitchLabel | DefaultSwitchLabel))
            .map(|&c| tree.span(c))
            .unwrap_or_else(|| tree.span(node)),

        Block => first_token_span(tree, node),

        ParameterList | AttributeList | ExpressionStatement | LocalDeclarationStatement
        | CaseSwitchLabel | DefaultSwitchLabel | ReturnStatement | ThrowStatement
        | YieldReturnStatement | YieldBreakStatement | BreakStatement | ContinueStatement
        | GotoStatement | AwaitExpression | QueryExpression | FromClause | LetClause
        | WhereClause | JoinClause | OrderByClause | SelectClause | GroupClause
        | QueryContinuation | IdentifierName | LiteralExpression | InvocationExpression
        | AssignmentExpression | BinaryExpression | ObjectCreationExpression | ArgumentList
        | Argument | EqualsValueClause | DeclarationPattern | PositionalPattern
        | DiscardDesignation | IdentifierToken | KeywordToken | LiteralToken
        | PunctuationToken | WhitespaceTrivia | CommentTrivia | Error => tree.span(node),
    }
}

/// Span from the node's start through its first child matching `pred`, or
/// `None` when no such child exists.
fn header_through(
    tree: &SyntaxTree,
    node: NodeId,
    pred: impl Fn(SyntaxKind) -> bool,
) -> Option<Span> {
    let node_span = tree.span(node);
    for &child in tree.children(node) {
        if pred(tree.kind(child)) {
            let child_span = tree.span(child);
            return Some(Span::new(node_span.start.min(child_span.start), child_span.end));
        }
    }
    None
}

/// Span of the children preceding the first block or embedded statement
/// child; the whole node span when the node has no body.
fn header_before_body(tree: &SyntaxTree, node: NodeId) -> Span {
    let node_span = tree.span(node);
    let mut end = None;
    for &child in tree.children(node) {
        if crate::label::classify(tree.kind(child)).is_some_and(|l| l.is_statement()) {
            break;
        }
        end = Some(tree.span(child).end);
    }
    match end {
        Some(end) if end > node_span.start => Span::new(node_span.start, end),
        _ => node_span,
    }
}

fn first_token_span(tree: &SyntaxTree, node: NodeId) -> Span {
    tree.significant_tokens(node)
        .first()
        .map(|&t| tree.span(t))
        .unwrap_or_else(|| tree.span(node))
}

fn name_token_span(tree: &SyntaxTree, node: NodeId) -> Span {
    tree.children(node)
        .iter()
        .find(|&&c| tree.kind(c) == SyntaxKind::IdentifierToken)
        .map(|&c| tree.span(c))
        .unwrap_or_else(|| tree.span(node))
}
