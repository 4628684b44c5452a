//! End-to-end engine scenarios: register tables, analyze SQL, check the
//! inferred bind-variable types and error accounting.

use squill::{
    BaseType, Column, ColumnFeature, ColumnType, Engine, NodeKind, ResolvedType, Severity, Table,
    TypeHint,
};

fn engine() -> Engine {
    let mut engine = Engine::new();
    engine.register_table(Table::new(
        "demo",
        vec![
            Column::new("id", ColumnType::Integer, false).with_feature(ColumnFeature::PrimaryKey),
            Column::new("content", ColumnType::Text, true),
        ],
    ));
    engine.register_table(Table::new(
        "tbl",
        vec![
            Column::new("id", ColumnType::Integer, false),
            Column::new("date", ColumnType::DateTime, false),
        ],
    ));
    engine
}

/// Resolved types of every bind variable in document order, panicking on
/// unresolved ones.
fn variable_types(ctx: &squill::AnalysisContext) -> Vec<ResolvedType> {
    let mut out = Vec::new();
    ctx.ast.walk(ctx.root, &mut |ast, id| {
        if matches!(ast.kind(id), NodeKind::Variable(_)) {
            out.push(
                ctx.type_of(id)
                    .resolved()
                    .unwrap_or_else(|| panic!("variable {id} not resolved")),
            );
        }
    });
    out
}

fn analyze_clean(sql: &str) -> squill::AnalysisContext {
    let ctx = engine().analyze(sql);
    assert!(
        !ctx.has_critical_errors(),
        "critical errors for {sql:?}: {:?}",
        ctx.errors
    );
    ctx
}

#[test]
fn scenario_eq_integer() {
    let ctx = analyze_clean("SELECT * FROM demo WHERE id = ?");
    let vars = variable_types(&ctx);
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].base, BaseType::Integer);
    assert!(!vars[0].is_array);
}

#[test]
fn scenario_like_text() {
    let ctx = analyze_clean("SELECT * FROM demo WHERE content LIKE ?");
    assert_eq!(variable_types(&ctx)[0].base, BaseType::Text);
}

#[test]
fn scenario_in_variable_expands_to_array() {
    let ctx = analyze_clean("SELECT * FROM demo WHERE content IN ?");
    let ty = variable_types(&ctx)[0];
    assert_eq!(ty.base, BaseType::Text);
    assert!(ty.is_array);
}

#[test]
fn scenario_in_parenthesized_variable_stays_scalar() {
    let ctx = analyze_clean("SELECT * FROM demo WHERE content IN (?)");
    let ty = variable_types(&ctx)[0];
    assert_eq!(ty.base, BaseType::Text);
    assert!(!ty.is_array);
}

#[test]
fn scenario_datetime_hint() {
    let ctx =
        analyze_clean("SELECT * FROM demo JOIN tbl ON demo.id = tbl.id WHERE date = ?");
    let ty = variable_types(&ctx)[0];
    assert_eq!(ty.base, BaseType::Integer);
    assert_eq!(ty.hint, Some(TypeHint::IsDateTime));
}

#[test]
fn scenario_nth_value_signature() {
    let ctx = analyze_clean("SELECT nth_value('string', ?1) = ?2");
    let vars = variable_types(&ctx);
    assert_eq!(vars.len(), 2);
    assert_eq!(vars[0].base, BaseType::Integer);
    assert_eq!(vars[1].base, BaseType::Text);
}

#[test]
fn scenario_range_preceding_is_integer() {
    let ctx = analyze_clean("SELECT row_number() OVER (RANGE ? PRECEDING)");
    assert_eq!(variable_types(&ctx)[0].base, BaseType::Integer);
}

// ── Beyond the seven core scenarios ──

#[test]
fn test_insert_values_infer_column_types() {
    let ctx = analyze_clean("INSERT INTO demo (id, content) VALUES (?, ?)");
    let vars = variable_types(&ctx);
    assert_eq!(vars[0].base, BaseType::Integer);
    assert_eq!(vars[1].base, BaseType::Text);
}

#[test]
fn test_named_variables_share_an_index() {
    let result = engine().parse("SELECT * FROM demo WHERE id = :key OR id = :key");
    assert!(result.errors.is_empty());
    let mut indices = Vec::new();
    result.ast.walk(result.root, &mut |ast, id| {
        if let NodeKind::Variable(v) = ast.kind(id) {
            indices.push((v.index, v.name.clone()));
        }
    });
    assert_eq!(
        indices,
        vec![(1, Some("key".to_owned())), (1, Some("key".to_owned()))]
    );
}

#[test]
fn test_parse_multiple_spans_and_shared_errors() {
    let results = engine().parse_multiple("SELECT 1;  SELECT %% ; SELECT 3");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].sql, "SELECT 1");
    assert_eq!(results[2].sql, "SELECT 3");
    // One statement failed; the full error list is shared by all results.
    assert!(!results[0].errors.is_empty());
    assert_eq!(results[0].errors.len(), results[2].errors.len());
}

#[test]
fn test_parser_errors_surface_in_analysis_context() {
    let ctx = engine().analyze("SELECT FROM demo");
    assert!(ctx.has_critical_errors());
    assert!(ctx.errors.iter().any(|e| e.message.starts_with("syntax:")));
}

#[test]
fn test_warning_severity_does_not_fail_analysis() {
    let ctx = engine().analyze("SELECT a.id FROM demo a JOIN tbl a ON 1 = 1");
    assert!(!ctx.has_critical_errors(), "errors: {:?}", ctx.errors);
    assert!(ctx.errors.iter().any(|e| e.severity == Severity::Warning));
}

#[test]
fn test_star_expansion_is_visible_to_callers() {
    let ctx = analyze_clean("SELECT * FROM demo");
    let NodeKind::Select(select) = ctx.ast.kind(ctx.root) else {
        panic!("expected select root");
    };
    // demo has two columns, so the star became two result columns.
    assert_eq!(select.columns.len(), 2);
    for &col in &select.columns {
        assert!(ctx.type_of(col).is_resolved());
    }
}

#[test]
fn test_round_trip_token_kinds() {
    let engine = engine();
    let parsed = engine.parse("SELECT 1;");
    let rendered = squill_ast::render(&parsed.ast, parsed.root);
    let original: Vec<_> = engine
        .tokenize("SELECT 1")
        .expect("clean")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    let reparsed: Vec<_> = engine
        .tokenize(&rendered)
        .expect("rendered SQL lexes cleanly")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(original, reparsed);
}

#[test]
fn test_cte_window_and_limit_pipeline() {
    let ctx = analyze_clean(
        "WITH ranked AS (SELECT id, row_number() OVER (ORDER BY id) AS rn FROM demo) \
         SELECT * FROM ranked WHERE rn = ? LIMIT ?",
    );
    let vars = variable_types(&ctx);
    assert_eq!(vars.len(), 2);
    assert_eq!(vars[0].base, BaseType::Integer);
    assert_eq!(vars[1].base, BaseType::Integer);
}

#[test]
fn test_update_and_delete_analyze() {
    let update = analyze_clean("UPDATE demo SET content = ? WHERE id = ?");
    let vars = variable_types(&update);
    assert_eq!(vars[0].base, BaseType::Text);
    assert_eq!(vars[1].base, BaseType::Integer);

    let delete = analyze_clean("DELETE FROM demo WHERE content LIKE ?");
    assert_eq!(variable_types(&delete)[0].base, BaseType::Text);
}
