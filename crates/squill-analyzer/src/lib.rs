//! Semantic analysis for the squill SQL front-end.
//!
//! Four passes over a parsed statement, threading one mutable
//! [`AnalysisContext`]:
//!
//! 1. parent assignment (so passes can ascend),
//! 2. scope construction ([`finder`]),
//! 3. star expansion ([`columns`]), reference resolution ([`references`]),
//!    and type inference ([`types`]) — these three only when the root is a
//!    CRUD statement.
//!
//! Every pass is total: failure paths record an [`squill_error::AnalysisError`]
//! in the context and carry on. Nothing here panics on malformed input —
//! an `Error` placeholder from parse recovery simply stays untyped.

pub mod columns;
pub mod context;
pub mod finder;
pub mod functions;
pub mod references;
pub mod scope;
pub mod types;

pub use context::AnalysisContext;
pub use references::{
    analysis_metrics_snapshot, reset_analysis_metrics, AnalysisMetricsSnapshot,
};
pub use scope::{ColumnBinding, Scope, ScopeId, ScopeTree, Symbol};

use squill_ast::{Ast, NodeId};
use squill_types::Table;

/// Analyze one parsed statement against the registered tables.
///
/// Takes exclusive ownership of the tree; the returned context owns it for
/// its whole lifetime.
#[must_use]
pub fn analyze(mut ast: Ast, root: NodeId, source: String, tables: &[Table]) -> AnalysisContext {
    let span = tracing::debug_span!(
        target: "squill.analyze",
        "analyze",
        errors = tracing::field::Empty,
    );
    let _guard = span.enter();

    ast.assign_parents(root);
    let mut ctx = AnalysisContext::new(ast, root, source, tables);
    finder::run(&mut ctx);

    if ctx.ast.kind(root).is_crud() {
        columns::run(&mut ctx);
        references::run(&mut ctx);
        types::run(&mut ctx);
    }

    span.record("errors", ctx.errors.len() as u64);
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use squill_ast::NodeKind;
    use squill_error::Severity;
    use squill_types::{
        BaseType, Column, ColumnType, ResolveResult, ResolvedType, TypeHint,
    };

    fn tables() -> Vec<Table> {
        vec![
            Table::new(
                "demo",
                vec![
                    Column::new("id", ColumnType::Integer, false)
                        .with_feature(squill_types::ColumnFeature::PrimaryKey),
                    Column::new("content", ColumnType::Text, true),
                ],
            ),
            Table::new(
                "tbl",
                vec![
                    Column::new("id", ColumnType::Integer, false),
                    Column::new("date", ColumnType::DateTime, false),
                ],
            ),
        ]
    }

    fn analyze_sql(sql: &str) -> AnalysisContext {
        let result = squill_parser::parse(sql);
        assert!(
            result.errors.is_empty(),
            "parse errors for {sql:?}: {:?}",
            result.errors
        );
        analyze(result.ast, result.root, result.sql, &tables())
    }

    /// Resolved types of all variables, in document order.
    fn variable_types(ctx: &AnalysisContext) -> Vec<ResolveResult> {
        let mut out = Vec::new();
        ctx.ast.walk(ctx.root, &mut |ast, id| {
            if matches!(ast.kind(id), NodeKind::Variable(_)) {
                out.push(ctx.type_of(id));
            }
        });
        out
    }

    fn single_variable_type(ctx: &AnalysisContext) -> ResolvedType {
        let vars = variable_types(ctx);
        assert_eq!(vars.len(), 1, "expected one variable, got {vars:?}");
        vars[0].resolved().expect("variable should be resolved")
    }

    // ── End-to-end inference scenarios ──

    #[test]
    fn test_eq_variable_takes_column_type() {
        let ctx = analyze_sql("SELECT * FROM demo WHERE id = ?");
        assert!(!ctx.has_critical_errors(), "errors: {:?}", ctx.errors);
        let ty = single_variable_type(&ctx);
        assert_eq!(ty.base, BaseType::Integer);
        assert!(!ty.is_array);
    }

    #[test]
    fn test_like_variable_is_text() {
        let ctx = analyze_sql("SELECT * FROM demo WHERE content LIKE ?");
        assert!(!ctx.has_critical_errors());
        let ty = single_variable_type(&ctx);
        assert_eq!(ty.base, BaseType::Text);
        assert!(!ty.is_array);
    }

    #[test]
    fn test_in_variable_is_array() {
        let ctx = analyze_sql("SELECT * FROM demo WHERE content IN ?");
        assert!(!ctx.has_critical_errors());
        let ty = single_variable_type(&ctx);
        assert_eq!(ty.base, BaseType::Text);
        assert!(ty.is_array);
    }

    #[test]
    fn test_in_parenthesized_variable_is_scalar() {
        let ctx = analyze_sql("SELECT * FROM demo WHERE content IN (?)");
        assert!(!ctx.has_critical_errors());
        let ty = single_variable_type(&ctx);
        assert_eq!(ty.base, BaseType::Text);
        assert!(!ty.is_array);
    }

    #[test]
    fn test_datetime_hint_rides_equality() {
        let ctx =
            analyze_sql("SELECT * FROM demo JOIN tbl ON demo.id = tbl.id WHERE date = ?");
        assert!(!ctx.has_critical_errors(), "errors: {:?}", ctx.errors);
        let ty = single_variable_type(&ctx);
        assert_eq!(ty.base, BaseType::Integer);
        assert_eq!(ty.hint, Some(TypeHint::IsDateTime));
    }

    #[test]
    fn test_function_signature_drives_both_variables() {
        let ctx = analyze_sql("SELECT nth_value('string', ?1) = ?2");
        assert!(!ctx.has_critical_errors());
        let vars = variable_types(&ctx);
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].resolved().unwrap().base, BaseType::Integer);
        assert_eq!(vars[1].resolved().unwrap().base, BaseType::Text);
    }

    #[test]
    fn test_frame_bound_variable_is_integer() {
        let ctx = analyze_sql("SELECT row_number() OVER (RANGE ? PRECEDING)");
        assert!(!ctx.has_critical_errors());
        let ty = single_variable_type(&ctx);
        assert_eq!(ty.base, BaseType::Integer);
    }

    #[test]
    fn test_limit_and_offset_variables_are_integer() {
        let ctx = analyze_sql("SELECT * FROM demo LIMIT ? OFFSET ?");
        assert!(!ctx.has_critical_errors());
        let vars = variable_types(&ctx);
        assert_eq!(vars.len(), 2);
        for var in vars {
            assert_eq!(var.resolved().unwrap().base, BaseType::Integer);
        }
    }

    #[test]
    fn test_having_count_variable_is_integer() {
        let ctx = analyze_sql(
            "SELECT content FROM demo GROUP BY content HAVING count(*) = ?",
        );
        assert!(!ctx.has_critical_errors());
        assert_eq!(
            single_variable_type(&ctx).base,
            BaseType::Integer
        );
    }

    #[test]
    fn test_between_variables_take_subject_type() {
        let ctx = analyze_sql("SELECT * FROM demo WHERE id BETWEEN ? AND ?");
        assert!(!ctx.has_critical_errors());
        for var in variable_types(&ctx) {
            assert_eq!(var.resolved().unwrap().base, BaseType::Integer);
        }
    }

    #[test]
    fn test_insert_values_variables_take_column_types() {
        let ctx = analyze_sql("INSERT INTO demo (id, content) VALUES (?, ?)");
        assert!(!ctx.has_critical_errors(), "errors: {:?}", ctx.errors);
        let vars = variable_types(&ctx);
        assert_eq!(vars[0].resolved().unwrap().base, BaseType::Integer);
        assert_eq!(vars[1].resolved().unwrap().base, BaseType::Text);
    }

    #[test]
    fn test_insert_without_column_list_uses_declaration_order() {
        let ctx = analyze_sql("INSERT INTO demo VALUES (?, ?)");
        assert!(!ctx.has_critical_errors());
        let vars = variable_types(&ctx);
        assert_eq!(vars[0].resolved().unwrap().base, BaseType::Integer);
        assert_eq!(vars[1].resolved().unwrap().base, BaseType::Text);
    }

    #[test]
    fn test_update_assignment_variable_takes_column_type() {
        let ctx = analyze_sql("UPDATE demo SET content = ? WHERE id = ?");
        assert!(!ctx.has_critical_errors(), "errors: {:?}", ctx.errors);
        let vars = variable_types(&ctx);
        assert_eq!(vars[0].resolved().unwrap().base, BaseType::Text);
        assert_eq!(vars[1].resolved().unwrap().base, BaseType::Integer);
    }

    // ── Star expansion ──

    #[test]
    fn test_star_expands_in_from_then_declaration_order() {
        let ctx = analyze_sql("SELECT * FROM demo JOIN tbl ON demo.id = tbl.id");
        assert!(!ctx.has_critical_errors());
        let NodeKind::Select(select) = ctx.ast.kind(ctx.root) else {
            panic!("expected select");
        };
        let names: Vec<String> = select
            .columns
            .iter()
            .map(|&col| match ctx.ast.kind(col) {
                NodeKind::ExprResultColumn { expr, .. } => match ctx.ast.kind(*expr) {
                    NodeKind::Reference(r) => {
                        format!("{}.{}", r.table.as_deref().unwrap_or(""), r.column)
                    }
                    other => panic!("expected reference, got {other:?}"),
                },
                other => panic!("expected expanded column, got {other:?}"),
            })
            .collect();
        assert_eq!(
            names,
            vec!["demo.id", "demo.content", "tbl.id", "tbl.date"]
        );
    }

    #[test]
    fn test_table_star_expands_one_source() {
        let ctx = analyze_sql("SELECT tbl.* FROM demo JOIN tbl ON demo.id = tbl.id");
        assert!(!ctx.has_critical_errors());
        let NodeKind::Select(select) = ctx.ast.kind(ctx.root) else {
            panic!("expected select");
        };
        assert_eq!(select.columns.len(), 2);
    }

    #[test]
    fn test_star_expansion_types_columns() {
        let ctx = analyze_sql("SELECT * FROM demo");
        let NodeKind::Select(select) = ctx.ast.kind(ctx.root) else {
            panic!("expected select");
        };
        let id_col = ctx.type_of(select.columns[0]).resolved().expect("typed");
        assert_eq!(id_col.base, BaseType::Integer);
        let content_col = ctx.type_of(select.columns[1]).resolved().expect("typed");
        assert_eq!(content_col.base, BaseType::Text);
        assert!(content_col.nullable);
    }

    #[test]
    fn test_star_through_subquery() {
        let ctx = analyze_sql("SELECT * FROM (SELECT id FROM demo) sub WHERE sub.id = ?");
        assert!(!ctx.has_critical_errors(), "errors: {:?}", ctx.errors);
        assert_eq!(single_variable_type(&ctx).base, BaseType::Integer);
    }

    // ── Reference resolution ──

    #[test]
    fn test_unresolved_table_is_critical() {
        let ctx = analyze_sql("SELECT * FROM missing");
        assert!(ctx.has_critical_errors());
        assert!(ctx.errors.iter().any(|e| e.message.contains("missing")));
    }

    #[test]
    fn test_unresolved_column_is_critical() {
        let ctx = analyze_sql("SELECT nope FROM demo");
        assert!(ctx.has_critical_errors());
        assert!(ctx
            .errors
            .iter()
            .any(|e| e.message.contains("no such column: nope")));
    }

    #[test]
    fn test_ambiguous_column_is_critical() {
        let ctx = analyze_sql("SELECT id FROM demo JOIN tbl ON demo.id = tbl.id");
        assert!(ctx.has_critical_errors());
        assert!(ctx
            .errors
            .iter()
            .any(|e| e.message.contains("ambiguous column name: id")));
    }

    #[test]
    fn test_duplicate_alias_is_warning_only() {
        let ctx = analyze_sql("SELECT t.id FROM demo t JOIN tbl t ON 1 = 1");
        assert!(!ctx.has_critical_errors(), "errors: {:?}", ctx.errors);
        assert!(ctx
            .errors
            .iter()
            .any(|e| e.severity == Severity::Warning
                && e.message.contains("duplicate table alias: t")));
    }

    #[test]
    fn test_every_reference_resolves_or_errors() {
        let ctx = analyze_sql("SELECT id, nope, content FROM demo");
        let mut references = 0usize;
        let mut resolved = 0usize;
        ctx.ast.walk(ctx.root, &mut |ast, id| {
            if matches!(ast.kind(id), NodeKind::Reference(_)) {
                references += 1;
                if ctx.resolved_symbol(id).is_some() {
                    resolved += 1;
                }
            }
        });
        let reference_errors = ctx
            .errors
            .iter()
            .filter(|e| e.message.contains("no such column"))
            .count();
        assert_eq!(references, resolved + reference_errors);
        assert_eq!(reference_errors, 1);
    }

    #[test]
    fn test_correlated_subquery_resolves_outer_column() {
        let ctx = analyze_sql(
            "SELECT * FROM demo WHERE EXISTS (SELECT 1 FROM tbl WHERE tbl.id = demo.id)",
        );
        assert!(!ctx.has_critical_errors(), "errors: {:?}", ctx.errors);
    }

    #[test]
    fn test_cte_is_visible_and_typed() {
        let ctx = analyze_sql(
            "WITH recent AS (SELECT id FROM demo) SELECT * FROM recent WHERE id = ?",
        );
        assert!(!ctx.has_critical_errors(), "errors: {:?}", ctx.errors);
        assert_eq!(single_variable_type(&ctx).base, BaseType::Integer);
    }

    // ── Fixed point / monotonicity ──

    #[test]
    fn test_types_are_total_over_typeable_nodes() {
        let ctx = analyze_sql("SELECT id + 1, content FROM demo WHERE content LIKE ? LIMIT 5");
        ctx.ast.walk(ctx.root, &mut |ast, id| {
            if ast.kind(id).is_typeable() {
                assert!(
                    ctx.types.contains_key(&id),
                    "typeable node {id} has no entry ({:?})",
                    ast.kind(id)
                );
            }
        });
    }

    #[test]
    fn test_boolean_column_carries_hint() {
        let tables = vec![Table::new(
            "flags",
            vec![Column::new("active", ColumnType::Boolean, false)],
        )];
        let result = squill_parser::parse("SELECT * FROM flags WHERE active = ?");
        let ctx = analyze(result.ast, result.root, result.sql, &tables);
        assert!(!ctx.has_critical_errors());
        let mut var_ty = None;
        ctx.ast.walk(ctx.root, &mut |ast, id| {
            if matches!(ast.kind(id), NodeKind::Variable(_)) {
                var_ty = ctx.type_of(id).resolved();
            }
        });
        let var_ty = var_ty.expect("variable resolved");
        assert_eq!(var_ty.base, BaseType::Boolean);
        assert_eq!(var_ty.hint, Some(TypeHint::IsBoolean));
    }

    #[test]
    fn test_non_crud_root_skips_resolution() {
        let ctx = analyze_sql("CREATE TABLE fresh (id INTEGER PRIMARY KEY)");
        assert!(ctx.errors.is_empty());
        assert!(ctx.types.is_empty());
    }

    #[test]
    fn test_analysis_never_panics_on_recovered_tree() {
        // A statement with parse errors still analyzes; the Error node
        // simply stays untyped.
        let result = squill_parser::parse("SELECT FROM demo WHERE id = ?");
        assert!(!result.errors.is_empty());
        let ctx = analyze(result.ast, result.root, result.sql, &tables());
        let mut saw_variable = false;
        ctx.ast.walk(ctx.root, &mut |ast, id| {
            if matches!(ast.kind(id), NodeKind::Variable(_)) {
                saw_variable = true;
                assert_eq!(
                    ctx.type_of(id).resolved().map(|t| t.base),
                    Some(BaseType::Integer)
                );
            }
        });
        assert!(saw_variable);
    }
}
