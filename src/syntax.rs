use std::fmt;

/// Half-open byte range into the document the tree was built from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Span { start, end }
    }

    pub fn empty_at(offset: u32) -> Self {
        Span {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn join(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

macro_rules! syntax_kinds {
    { $($variant:ident => $name:literal,)* } => {
        /// Closed set of node and token kinds understood by the analyzer.
        ///
        /// The enumeration is deliberately exhaustive: every dispatch over it
        /// is a compiler-checked `match`, so an unhandled kind is a build
        /// error rather than a runtime assertion.
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
        pub enum SyntaxKind {
            $($variant,)*
        }

        impl SyntaxKind {
            pub const ALL: &'static [SyntaxKind] = &[$(SyntaxKind::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(SyntaxKind::$variant => $name,)*
                }
            }

            pub fn from_name(name: &str) -> Option<SyntaxKind> {
                SyntaxKind::ALL.iter().copied().find(|k| k.name() == name)
            }
        }
    }
}

syntax_kinds! {
    CompilationUnit => "compilation_unit",

    ClassDeclaration => "class_declaration",
    StructDeclaration => "struct_declaration",
    InterfaceDeclaration => "interface_declaration",
    EnumDeclaration => "enum_declaration",
    EnumMemberDeclaration => "enum_member_declaration",
    MethodDeclaration => "method_declaration",
    ConstructorDeclaration => "constructor_declaration",
    PropertyDeclaration => "property_declaration",
    IndexerDeclaration => "indexer_declaration",
    FieldDeclaration => "field_declaration",
    VariableDeclarator => "variable_declarator",
    ParameterList => "parameter_list",
    Parameter => "parameter",
    AttributeList => "attribute_list",

    Block => "block",
    ExpressionStatement => "expression_statement",
    LocalDeclarationStatement => "local_declaration_statement",
    LocalFunctionStatement => "local_function_statement",
    IfStatement => "if_statement",
    ElseClause => "else_clause",
    WhileStatement => "while_statement",
    DoStatement => "do_statement",
    ForStatement => "for_statement",
    ForEachStatement => "foreach_statement",
    AwaitForEachStatement => "await_foreach_statement",
    UsingStatement => "using_statement",
    AwaitUsingStatement => "await_using_statement",
    LockStatement => "lock_statement",
    TryStatement => "try_statement",
    CatchClause => "catch_clause",
    FinallyClause => "finally_clause",
    SwitchStatement => "switch_statement",
    SwitchSection => "switch_section",
    CaseSwitchLabel => "case_switch_label",
    DefaultSwitchLabel => "default_switch_label",
    ReturnStatement => "return_statement",
    ThrowStatement => "throw_statement",
    YieldReturnStatement => "yield_return_statement",
    YieldBreakStatement => "yield_break_statement",
    BreakStatement => "break_statement",
    ContinueStatement => "continue_statement",
    GotoStatement => "goto_statement",
    LabeledStatement => "labeled_statement",

    LambdaExpression => "lambda_expression",
    AnonymousMethodExpression => "anonymous_method_expression",
    AwaitExpression => "await_expression",

    QueryExpression => "query_expression",
    FromClause => "from_clause",
    LetClause => "let_clause",
    WhereClause => "where_clause",
    JoinClause => "join_clause",
    OrderByClause => "orderby_clause",
    SelectClause => "select_clause",
    GroupClause => "group_clause",
    QueryContinuation => "query_continuation",

    IdentifierName => "identifier_name",
    LiteralExpression => "literal_expression",
    InvocationExpression => "invocation_expression",
    AssignmentExpression => "assignment_expression",
    BinaryExpression => "binary_expression",
    ObjectCreationExpression => "object_creation_expression",
    ArgumentList => "argument_list",
    Argument => "argument",
    EqualsValueClause => "equals_value_clause",

    DeclarationPattern => "declaration_pattern",
    PositionalPattern => "positional_pattern",
    SingleVariableDesignation => "single_variable_designation",
    DiscardDesignation => "discard_designation",

    IdentifierToken => "identifier_token",
    KeywordToken => "keyword_token",
    LiteralToken => "literal_token",
    PunctuationToken => "punctuation_token",

    WhitespaceTrivia => "whitespace_trivia",
    CommentTrivia => "comment_trivia",

    Error => "error",
}

impl SyntaxKind {
    pub fn is_token(self) -> bool {
        matches!(
            self,
            SyntaxKind::IdentifierToken
                | SyntaxKind::KeywordToken
                | SyntaxKind::LiteralToken
                | SyntaxKind::PunctuationToken
                | SyntaxKind::WhitespaceTrivia
                | SyntaxKind::CommentTrivia
        )
    }

    pub fn is_trivia(self) -> bool {
        matches!(self, SyntaxKind::WhitespaceTrivia | SyntaxKind::CommentTrivia)
    }
}

/// Index of a node within its [`SyntaxTree`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

struct NodeData {
    kind: SyntaxKind,
    span: Span,
    text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// Immutable syntax tree stored as an arena of nodes.
///
/// The analyzer never mutates a tree; it only reads it and records node ids
/// in side tables. Parent links are ordinary ids, so the structure stays a
/// plain value type.
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    depth: u32,
    error_count: usize,
    token_count: usize,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> SyntaxKind {
        self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.index()].text.as_deref()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Maximum nesting depth of the tree, computed at build time.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Pre-order traversal of the subtree rooted at `id`, including `id`.
    /// Driven by an explicit stack so that pathological nesting cannot
    /// overflow the call stack.
    pub fn descendants(&self, id: NodeId) -> Descendants {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// All non-trivia tokens of the subtree rooted at `id`, in source order.
    pub fn significant_tokens(&self, id: NodeId) -> Vec<NodeId> {
        let mut tokens = Vec::new();
        for node in self.descendants(id) {
            let kind = self.kind(node);
            if kind.is_token() && !kind.is_trivia() {
                tokens.push(node);
            }
        }
        tokens
    }

    /// Smallest node whose span contains `span`. Falls back to the root when
    /// nothing narrower covers it.
    pub fn covering_node(&self, span: Span) -> NodeId {
        let mut current = self.root;
        'descend: loop {
            for &child in self.children(current) {
                if self.span(child).contains(span) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }
}

pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let children = self.tree.children(id);
        self.stack.extend(children.iter().rev());
        Some(id)
    }
}

pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.parent(id);
        Some(id)
    }
}

/// Builds a [`SyntaxTree`] one node at a time.
///
/// Token spans are assigned from a running cursor when not given explicitly;
/// node spans are the join of their children. Balancing of `open`/`close` is
/// a programming error and asserted.
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    stack: Vec<NodeId>,
    cursor: u32,
    token_count: usize,
    error_count: usize,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            nodes: Vec::new(),
            stack: Vec::new(),
            cursor: 0,
            token_count: 0,
            error_count: 0,
        }
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        if let Some(&parent) = self.stack.last() {
            self.nodes[parent.index()].children.push(id);
        }
        self.nodes.push(data);
        id
    }

    pub fn open(&mut self, kind: SyntaxKind) -> &mut Self {
        debug_assert!(!kind.is_token());
        let parent = self.stack.last().copied();
        let id = self.push_node(NodeData {
            kind,
            span: Span::empty_at(self.cursor),
            text: None,
            children: Vec::new(),
            parent,
        });
        if kind == SyntaxKind::Error {
            self.error_count += 1;
        }
        self.stack.push(id);
        self
    }

    pub fn token(&mut self, kind: SyntaxKind, text: &str) -> &mut Self {
        let span = Span::new(self.cursor, self.cursor + text.len() as u32);
        self.token_at(kind, text, span)
    }

    pub fn token_at(&mut self, kind: SyntaxKind, text: &str, span: Span) -> &mut Self {
        debug_assert!(kind.is_token());
        let parent = self.stack.last().copied();
        self.push_node(NodeData {
            kind,
            span,
            text: Some(text.to_owned()),
            children: Vec::new(),
            parent,
        });
        self.cursor = self.cursor.max(span.end);
        if !kind.is_trivia() {
            self.token_count += 1;
        }
        self
    }

    pub fn close(&mut self) -> &mut Self {
        let id = self.stack.pop().expect("close without matching open");
        let span = self.nodes[id.index()]
            .children
            .iter()
            .map(|&c| self.nodes[c.index()].span)
            .reduce(Span::join)
            .unwrap_or_else(|| Span::empty_at(self.cursor));
        self.nodes[id.index()].span = span;
        self
    }

    pub fn finish(self) -> SyntaxTree {
        assert!(self.stack.is_empty(), "finish with unclosed nodes");
        assert!(!self.nodes.is_empty(), "finish on an empty builder");

        // The first opened node is the root; compute depth iteratively.
        let root = NodeId(0);
        let mut depth = 0;
        let mut stack = vec![(root, 1u32)];
        while let Some((id, level)) = stack.pop() {
            depth = depth.max(level);
            for &child in &self.nodes[id.index()].children {
                stack.push((child, level + 1));
            }
        }

        SyntaxTree {
            nodes: self.nodes,
            root,
            depth,
            error_count: self.error_count,
            token_count: self.token_count,
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        TreeBuilder::new()
    }
}
