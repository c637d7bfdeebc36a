use livediff::{
    analyze_document, parse_tree_text, ActiveStatement, ActiveStatementFlags, AnalysisError,
    AnalysisRequest, AnalysisResult, AnalyzerOptions, CancellationToken, InjectedFailure,
    KnownMatch, NodeId, RudeEditKind, RuntimeCapabilities, SyntaxKind, SyntaxTree,
};
use pretty_assertions::assert_eq;

fn tree(source: &str) -> SyntaxTree {
    parse_tree_text(source).unwrap()
}

fn stmt(name: &str) -> String {
    format!(
        "(expression_statement (identifier_name (identifier_token \"{}\")))",
        name
    )
}

fn method(name: &str, body: &str) -> String {
    format!(
        "(method_declaration (keyword_token \"void\") (identifier_token \"{}\") \
           (parameter_list (punctuation_token \"(\") (punctuation_token \")\")) \
           (block {}))",
        name, body
    )
}

fn unit(members: &str) -> String {
    format!(
        "(compilation_unit (class_declaration \
           (keyword_token \"class\") (identifier_token \"C\") {}))",
        members
    )
}

fn nth(tree: &SyntaxTree, kind: SyntaxKind, n: usize) -> NodeId {
    tree.descendants(tree.root())
        .filter(|&id| tree.kind(id) == kind)
        .nth(n)
        .unwrap_or_else(|| panic!("no {:?} #{} in tree", kind, n))
}

fn analyze(
    old: Option<&SyntaxTree>,
    new: &SyntaxTree,
    active: &[ActiveStatement],
    capabilities: RuntimeCapabilities,
    options: AnalyzerOptions,
) -> AnalysisResult {
    analyze_document(&AnalysisRequest {
        old_tree: old,
        new_tree: new,
        active_statements: active,
        known_matches: &[],
        capabilities,
        options,
        cancel: CancellationToken::new(),
    })
    .unwrap()
}

fn rude_kinds(result: &AnalysisResult) -> Vec<RudeEditKind> {
    result.rude_edits.iter().map(|r| r.kind).collect()
}

#[test]
fn trivia_only_edit_is_no_change() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&unit(&method(
        "M",
        &format!("(comment_trivia \"note\") {}", stmt("a")),
    )));
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert!(!result.has_changes);
    assert!(result.rude_edits.is_empty());
    assert!(result.updated_members.is_empty());
}

#[test]
fn renaming_a_method_is_rude() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&unit(&method("N", &stmt("a"))));
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert!(result.has_changes);
    assert_eq!(rude_kinds(&result), vec![RudeEditKind::Renamed]);
    assert_eq!(
        result.rude_edits[0].node,
        Some(nth(&new, SyntaxKind::MethodDeclaration, 0))
    );
    assert_eq!(result.updated_members.len(), 1);
}

#[test]
fn inserting_a_method_requires_the_capability() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&unit(&format!(
        "{} {}",
        method("M", &stmt("a")),
        method("P", &stmt("b"))
    )));

    let denied = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert_eq!(rude_kinds(&denied), vec![RudeEditKind::Insert]);
    assert_eq!(
        denied.rude_edits[0].node,
        Some(nth(&new, SyntaxKind::MethodDeclaration, 1))
    );

    let allowed = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE | RuntimeCapabilities::ADD_METHOD_TO_EXISTING_TYPE,
        AnalyzerOptions::default(),
    );
    assert!(allowed.rude_edits.is_empty());
}

#[test]
fn inserting_a_type_requires_the_capability() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&format!(
        "(compilation_unit \
           (class_declaration (keyword_token \"class\") (identifier_token \"C\") {}) \
           (class_declaration (keyword_token \"class\") (identifier_token \"D\")))",
        method("M", &stmt("a"))
    ));

    let denied = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert_eq!(rude_kinds(&denied), vec![RudeEditKind::Insert]);

    let allowed = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE | RuntimeCapabilities::NEW_TYPE_DEFINITION,
        AnalyzerOptions::default(),
    );
    assert!(allowed.rude_edits.is_empty());
}

#[test]
fn inserting_a_static_field_requires_its_own_capability() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&unit(&format!(
        "{} (field_declaration (keyword_token \"static\") (keyword_token \"int\") \
           (variable_declarator (identifier_token \"s\")))",
        method("M", &stmt("a"))
    )));

    let instance_only = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE | RuntimeCapabilities::ADD_INSTANCE_FIELD_TO_EXISTING_TYPE,
        AnalyzerOptions::default(),
    );
    assert_eq!(rude_kinds(&instance_only), vec![RudeEditKind::Insert]);

    let allowed = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE | RuntimeCapabilities::ADD_STATIC_FIELD_TO_EXISTING_TYPE,
        AnalyzerOptions::default(),
    );
    assert!(allowed.rude_edits.is_empty());
}

#[test]
fn deleting_a_method_is_rude() {
    let old = tree(&unit(&format!(
        "{} {}",
        method("M", &stmt("a")),
        method("P", &stmt("b"))
    )));
    let new = tree(&unit(&method("M", &stmt("a"))));
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::all(),
        AnalyzerOptions::default(),
    );
    assert_eq!(rude_kinds(&result), vec![RudeEditKind::Delete]);
}

#[test]
fn changing_a_signature_is_rude() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&unit(
        "(method_declaration (keyword_token \"void\") (identifier_token \"M\") \
           (parameter_list (punctuation_token \"(\") \
             (parameter (identifier_token \"x\")) (punctuation_token \")\")) \
           (block (expression_statement (identifier_name (identifier_token \"a\")))))",
    ));
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::all(),
        AnalyzerOptions::default(),
    );
    let mut kinds = rude_kinds(&result);
    kinds.sort_by_key(|k| k.name());
    assert_eq!(kinds, vec![RudeEditKind::Insert, RudeEditKind::Update]);
}

#[test]
fn active_statement_is_relocated_over_an_insertion() {
    let old = tree(&unit(&method("M", &format!("{} {}", stmt("a"), stmt("b")))));
    let new = tree(&unit(&method(
        "M",
        &format!("{} {} {}", stmt("x"), stmt("a"), stmt("b")),
    )));
    let old_b = nth(&old, SyntaxKind::ExpressionStatement, 1);
    let active = [ActiveStatement::new(
        0,
        old.span(old_b),
        ActiveStatementFlags::LEAF_FRAME,
    )];
    let result = analyze(
        Some(&old),
        &new,
        &active,
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );

    let new_b = nth(&new, SyntaxKind::ExpressionStatement, 2);
    assert_eq!(result.active_statements[0].span, new.span(new_b));
    assert!(!result.active_statements[0].is_stale());
    assert!(result.rude_edits.is_empty());
}

#[test]
fn deleting_an_active_statement_is_rude_and_stale() {
    let old = tree(&unit(&method("M", &format!("{} {}", stmt("a"), stmt("b")))));
    let new = tree(&unit(&method("M", &stmt("a"))));
    let old_b = nth(&old, SyntaxKind::ExpressionStatement, 1);
    let active = [ActiveStatement::new(
        0,
        old.span(old_b),
        ActiveStatementFlags::LEAF_FRAME,
    )];
    let result = analyze(
        Some(&old),
        &new,
        &active,
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert!(result.active_statements[0].is_stale());
    assert_eq!(rude_kinds(&result), vec![RudeEditKind::DeleteActiveStatement]);
}

#[test]
fn editing_a_non_leaf_active_statement_is_rude() {
    let old = tree(&unit(&method("M", &format!("{} {}", stmt("a"), stmt("b")))));
    let new = tree(&unit(&method("M", &format!("{} {}", stmt("a"), stmt("bb")))));
    let old_b = nth(&old, SyntaxKind::ExpressionStatement, 1);

    let leaf = analyze(
        Some(&old),
        &new,
        &[ActiveStatement::new(
            0,
            old.span(old_b),
            ActiveStatementFlags::LEAF_FRAME,
        )],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert!(leaf.rude_edits.is_empty());

    let non_leaf = analyze(
        Some(&old),
        &new,
        &[ActiveStatement::new(
            0,
            old.span(old_b),
            ActiveStatementFlags::NON_LEAF_FRAME,
        )],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert_eq!(
        rude_kinds(&non_leaf),
        vec![RudeEditKind::ActiveStatementUpdate]
    );
}

const AWAIT_STMT: &str = "(expression_statement \
    (await_expression (identifier_name (identifier_token \"t\"))))";
const PLAIN_STMT: &str = "(expression_statement (identifier_name (identifier_token \"t\")))";

#[test]
fn deleting_a_suspension_point_around_an_active_statement_is_rude() {
    let old = tree(&unit(&method("M", &format!("{} {}", stmt("a"), AWAIT_STMT))));
    let new = tree(&unit(&method("M", &format!("{} {}", stmt("a"), PLAIN_STMT))));
    let old_a = nth(&old, SyntaxKind::ExpressionStatement, 0);
    let active = [ActiveStatement::new(
        0,
        old.span(old_a),
        ActiveStatementFlags::LEAF_FRAME,
    )];
    let result = analyze(
        Some(&old),
        &new,
        &active,
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert_eq!(
        rude_kinds(&result),
        vec![RudeEditKind::DeleteAroundActiveStatement]
    );
}

#[test]
fn inserting_a_suspension_point_around_an_active_statement_is_rude() {
    let old = tree(&unit(&method("M", &format!("{} {}", stmt("a"), PLAIN_STMT))));
    let new = tree(&unit(&method("M", &format!("{} {}", stmt("a"), AWAIT_STMT))));
    let old_a = nth(&old, SyntaxKind::ExpressionStatement, 0);
    let active = [ActiveStatement::new(
        0,
        old.span(old_a),
        ActiveStatementFlags::LEAF_FRAME,
    )];
    let result = analyze(
        Some(&old),
        &new,
        &active,
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert_eq!(
        rude_kinds(&result),
        vec![RudeEditKind::InsertAroundActiveStatement]
    );
}

#[test]
fn changing_the_await_shape_is_rude() {
    let old = tree(&unit(&method("M", &format!("{} {}", stmt("a"), AWAIT_STMT))));
    let new = tree(&unit(&method(
        "M",
        &format!(
            "{} (await_foreach_statement (keyword_token \"await\") \
               (keyword_token \"foreach\") (block))",
            stmt("a")
        ),
    )));
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert_eq!(rude_kinds(&result), vec![RudeEditKind::ChangingAwaitShape]);
}

fn closure_method(closure: &str) -> String {
    method(
        "M",
        &format!(
            "(local_declaration_statement \
               (variable_declarator (identifier_token \"f\") \
                 (equals_value_clause {})))",
            closure
        ),
    )
}

const LAMBDA: &str = "(lambda_expression (parameter_list (identifier_token \"x\")) \
     (identifier_name (identifier_token \"x\")))";
const ANONYMOUS: &str = "(anonymous_method_expression (keyword_token \"delegate\") \
     (block (return_statement (keyword_token \"return\"))))";

#[test]
fn closure_form_conversion_depends_on_the_matching_mode() {
    let old = tree(&unit(&closure_method(LAMBDA)));
    let new = tree(&unit(&closure_method(ANONYMOUS)));
    let capabilities =
        RuntimeCapabilities::BASELINE | RuntimeCapabilities::UPDATE_METHOD_CONTAINING_CLOSURE;

    let cross_form = analyze(
        Some(&old),
        &new,
        &[],
        capabilities,
        AnalyzerOptions::default(),
    );
    assert!(cross_form.rude_edits.is_empty());

    let mut options = AnalyzerOptions::default();
    options.match_options.match_across_closure_forms = false;
    let same_form = analyze(Some(&old), &new, &[], capabilities, options);
    assert_eq!(
        rude_kinds(&same_form),
        vec![RudeEditKind::SwitchBetweenLambdaAndLocalFunction]
    );
}

#[test]
fn updating_a_method_with_a_closure_requires_the_capability() {
    let old = tree(&unit(&closure_method(LAMBDA)));
    let new = tree(&unit(&closure_method(
        "(lambda_expression (parameter_list (identifier_token \"y\")) \
           (identifier_name (identifier_token \"y\")))",
    )));
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert_eq!(rude_kinds(&result), vec![RudeEditKind::Update]);
}

#[test]
fn an_added_file_is_rude() {
    let new = tree(&unit(&method("M", &stmt("a"))));
    let result = analyze(
        None,
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert!(result.has_changes);
    assert_eq!(rude_kinds(&result), vec![RudeEditKind::InsertFile]);
}

#[test]
fn experimental_features_block_analysis() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&unit(&method("M", &stmt("b"))));
    let mut options = AnalyzerOptions::default();
    options.experimental_features_enabled = true;
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        options,
    );
    assert_eq!(
        rude_kinds(&result),
        vec![RudeEditKind::ExperimentalFeaturesEnabled]
    );
}

#[test]
fn oversized_documents_are_rejected() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&unit(&method("M", &stmt("b"))));
    let mut options = AnalyzerOptions::default();
    options.max_tokens = 1;
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        options,
    );
    assert_eq!(rude_kinds(&result), vec![RudeEditKind::SourceFileTooBig]);
}

#[test]
fn syntax_errors_suppress_classification() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&unit(&method(
        "N",
        &format!("{} (error (punctuation_token \"@\"))", stmt("a")),
    )));
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    assert!(result.has_changes);
    assert!(result.has_syntax_errors);
    assert!(result.rude_edits.is_empty());
}

#[test]
fn a_panic_is_contained_to_its_document() {
    let source = unit(&method("M", &stmt("a")));
    let old = tree(&source);
    let new = tree(&source);

    let mut results = Vec::new();
    for doc in 0..3 {
        let mut options = AnalyzerOptions::default();
        if doc == 1 {
            options.injected_failure = Some(InjectedFailure::Panic);
        }
        results.push(analyze(
            Some(&old),
            &new,
            &[],
            RuntimeCapabilities::BASELINE,
            options,
        ));
    }

    assert!(results[0].rude_edits.is_empty());
    assert!(results[2].rude_edits.is_empty());
    assert_eq!(rude_kinds(&results[1]), vec![RudeEditKind::InternalError]);
    assert_eq!(
        results[1].rude_edits[0].detail.as_deref(),
        Some("injected analysis failure")
    );
}

#[test]
fn out_of_memory_gets_its_own_kind() {
    let source = unit(&method("M", &stmt("a")));
    let old = tree(&source);
    let new = tree(&source);
    let mut options = AnalyzerOptions::default();
    options.injected_failure = Some(InjectedFailure::OutOfMemory);
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        options,
    );
    assert_eq!(rude_kinds(&result), vec![RudeEditKind::OutOfMemory]);
}

#[test]
fn cancellation_propagates() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&unit(&method("M", &stmt("b"))));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = analyze_document(&AnalysisRequest {
        old_tree: Some(&old),
        new_tree: &new,
        active_statements: &[],
        known_matches: &[],
        capabilities: RuntimeCapabilities::BASELINE,
        options: AnalyzerOptions::default(),
        cancel,
    })
    .unwrap_err();
    assert_eq!(err, AnalysisError::Canceled);
}

#[test]
fn known_match_into_a_sibling_member_is_ignored() {
    let old = tree(&unit(&format!(
        "{} {}",
        method("M", &stmt("a")),
        method("P", &stmt("b"))
    )));
    let new = tree(&unit(&format!(
        "{} {}",
        method("M", &stmt("aa")),
        method("P", &stmt("b"))
    )));
    let old_m_stmt = nth(&old, SyntaxKind::ExpressionStatement, 0);
    let new_p_stmt = nth(&new, SyntaxKind::ExpressionStatement, 1);

    // The pin crosses from M's body into P's; honoring it would relocate
    // state into the wrong member.
    let result = analyze_document(&AnalysisRequest {
        old_tree: Some(&old),
        new_tree: &new,
        active_statements: &[],
        known_matches: &[KnownMatch {
            old: old_m_stmt,
            new: new_p_stmt,
        }],
        capabilities: RuntimeCapabilities::BASELINE,
        options: AnalyzerOptions::default(),
        cancel: CancellationToken::new(),
    })
    .unwrap();

    let new_m_stmt = nth(&new, SyntaxKind::ExpressionStatement, 0);
    let old_p_stmt = nth(&old, SyntaxKind::ExpressionStatement, 1);
    assert_eq!(result.syntax_map.get(&new_m_stmt), Some(&old_m_stmt));
    assert_eq!(result.syntax_map.get(&new_p_stmt), Some(&old_p_stmt));
}

#[test]
fn syntax_map_covers_matched_members() {
    let old = tree(&unit(&method("M", &stmt("a"))));
    let new = tree(&unit(&method("M", &stmt("b"))));
    let result = analyze(
        Some(&old),
        &new,
        &[],
        RuntimeCapabilities::BASELINE,
        AnalyzerOptions::default(),
    );
    let old_method = nth(&old, SyntaxKind::MethodDeclaration, 0);
    let new_method = nth(&new, SyntaxKind::MethodDeclaration, 0);
    assert_eq!(result.syntax_map.get(&new_method), Some(&old_method));
    assert_eq!(
        result.updated_members,
        vec![livediff::MemberUpdate {
            old_member: old_method,
            new_member: new_method,
        }]
    );
}
