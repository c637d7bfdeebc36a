use crate::syntax::SyntaxKind;

/// Coarse match-compatibility category.
///
/// Two items may only be matched when their labels are equal; the designated
/// roots of a comparison are the single exception and always match. Trivia
/// carries no label and never participates in differencing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Label {
    Root,

    TypeDeclaration,
    EnumDeclaration,
    EnumMemberDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    PropertyDeclaration,
    IndexerDeclaration,
    FieldDeclaration,
    FieldVariable,
    ParameterList,
    Parameter,
    AttributeList,

    Block,
    ExpressionStatement,
    LocalDeclaration,
    IfStatement,
    ElseClause,
    WhileStatement,
    DoStatement,
    ForStatement,
    ForEachStatement,
    AwaitForEachStatement,
    UsingStatement,
    AwaitUsingStatement,
    LockStatement,
    TryStatement,
    CatchClause,
    FinallyClause,
    SwitchStatement,
    SwitchSection,
    SwitchLabel,
    ReturnStatement,
    ThrowStatement,
    YieldStatement,
    JumpStatement,
    LabeledStatement,

    /// Lambdas, anonymous methods and local functions all share this label
    /// so that a closure can survive conversion between the three forms.
    Closure,
    AwaitExpression,

    Query,
    FromClause,
    LetClause,
    WhereClause,
    JoinClause,
    OrderByClause,
    SelectClause,
    GroupClause,
    QueryContinuation,

    Expression,
    ArgumentList,
    Argument,
    EqualsValueClause,

    Pattern,
    VariableDesignation,

    Token,
    Error,
}

/// Label derived from kind alone. `None` marks formatting-only items that
/// must never appear in a sequence fed to the sequence matcher.
pub fn classify(kind: SyntaxKind) -> Option<Label> {
    use SyntaxKind::*;
    let label = match kind {
        CompilationUnit => Label::Root,

        ClassDeclaration | StructDeclaration | InterfaceDeclaration => Label::TypeDeclaration,
        EnumDeclaration => Label::EnumDeclaration,
        EnumMemberDeclaration => Label::EnumMemberDeclaration,
        MethodDeclaration => Label::MethodDeclaration,
        ConstructorDeclaration => Label::ConstructorDeclaration,
        PropertyDeclaration => Label::PropertyDeclaration,
        IndexerDeclaration => Label::IndexerDeclaration,
        FieldDeclaration => Label::FieldDeclaration,
        VariableDeclarator => Label::FieldVariable,
        ParameterList => Label::ParameterList,
        Parameter => Label::Parameter,
        AttributeList => Label::AttributeList,

        Block => Label::Block,
        ExpressionStatement => Label::ExpressionStatement,
        LocalDeclarationStatement => Label::LocalDeclaration,
        IfStatement => Label::IfStatement,
        ElseClause => Label::ElseClause,
        WhileStatement => Label::WhileStatement,
        DoStatement => Label::DoStatement,
        ForStatement => Label::ForStatement,
        ForEachStatement => Label::ForEachStatement,
        AwaitForEachStatement => Label::AwaitForEachStatement,
        UsingStatement => Label::UsingStatement,
        AwaitUsingStatement => Label::AwaitUsingStatement,
        LockStatement => Label::LockStatement,
        TryStatement => Label::TryStatement,
        CatchClause => Label::CatchClause,
        FinallyClause => Label::FinallyClause,
        SwitchStatement => Label::SwitchStatement,
        SwitchSection => Label::SwitchSection,
        CaseSwitchLabel | DefaultSwitchLabel => Label::SwitchLabel,
        ReturnStatement => Label::ReturnStatement,
        ThrowStatement => Label::ThrowStatement,
        YieldReturnStatement | YieldBreakStatement => Label::YieldStatement,
        BreakStatement | ContinueStatement | GotoStatement => Label::JumpStatement,
        LabeledStatement => Label::LabeledStatement,

        LambdaExpression | AnonymousMethodExpression | LocalFunctionStatement => Label::Closure,
        AwaitExpression => Label::AwaitExpression,

        QueryExpression => Label::Query,
        FromClause => Label::FromClause,
        LetClause => Label::LetClause,
        WhereClause => Label::WhereClause,
        JoinClause => Label::JoinClause,
        OrderByClause => Label::OrderByClause,
        SelectClause => Label::SelectClause,
        GroupClause => Label::GroupClause,
        QueryContinuation => Label::QueryContinuation,

        IdentifierName | LiteralExpression | InvocationExpression | AssignmentExpression
        | BinaryExpression | ObjectCreationExpression => Label::Expression,
        ArgumentList => Label::ArgumentList,
        Argument => Label::Argument,
        EqualsValueClause => Label::EqualsValueClause,

        DeclarationPattern | PositionalPattern => Label::Pattern,
        SingleVariableDesignation | DiscardDesignation => Label::VariableDesignation,

        IdentifierToken | KeywordToken | LiteralToken | PunctuationToken => Label::Token,

        WhitespaceTrivia | CommentTrivia => return None,

        Error => Label::Error,
    };
    Some(label)
}

impl Label {
    /// Labels whose nodes introduce a closure (runtime identity that must
    /// survive syntactic reshaping).
    pub fn is_closure(self) -> bool {
        self == Label::Closure
    }

    /// Labels that identify a statement-level anchor for active statements.
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            Label::Block
                | Label::ExpressionStatement
                | Label::LocalDeclaration
                | Label::IfStatement
                | Label::WhileStatement
                | Label::DoStatement
                | Label::ForStatement
                | Label::ForEachStatement
                | Label::AwaitForEachStatement
                | Label::UsingStatement
                | Label::AwaitUsingStatement
                | Label::LockStatement
                | Label::TryStatement
                | Label::SwitchStatement
                | Label::ReturnStatement
                | Label::ThrowStatement
                | Label::YieldStatement
                | Label::JumpStatement
                | Label::LabeledStatement
                | Label::Closure
        )
    }

    /// Labels of member declarations whose bodies get their own body-level
    /// match during document analysis.
    pub fn is_member(self) -> bool {
        matches!(
            self,
            Label::MethodDeclaration
                | Label::ConstructorDeclaration
                | Label::PropertyDeclaration
                | Label::IndexerDeclaration
                | Label::FieldDeclaration
        )
    }
}
