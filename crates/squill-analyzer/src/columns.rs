//! Star expansion.
//!
//! Rewrites `*` and `table.*` result columns into explicit `Reference`
//! result columns: FROM sources left-to-right, then columns in declaration
//! order. Runs over selects innermost-first so a sub-select's output list
//! is already explicit when the enclosing select expands against it. The
//! replacement nodes are real arena nodes with parents assigned, so the
//! downstream resolvers treat them like hand-written columns.

use squill_ast::{NodeId, NodeKind, Reference, Span};

use crate::context::AnalysisContext;
use crate::scope::{select_output_bindings, ColumnBinding, Symbol};

/// Expand stars in every select reachable from the root.
pub fn run(ctx: &mut AnalysisContext) {
    let selects: Vec<NodeId> = ctx
        .ast
        .post_order(ctx.root)
        .into_iter()
        .filter(|&id| matches!(ctx.ast.kind(id), NodeKind::Select(_)))
        .collect();
    for select in selects {
        expand_select(ctx, select);
    }
}

fn expand_select(ctx: &mut AnalysisContext, select: NodeId) {
    let Some(&scope) = ctx.statement_scopes.get(&select) else {
        return;
    };
    let NodeKind::Select(stmt) = ctx.ast.kind(select) else {
        return;
    };
    let columns = stmt.columns.clone();
    if !columns
        .iter()
        .any(|&c| matches!(ctx.ast.kind(c), NodeKind::StarResultColumn(_)))
    {
        return;
    }

    let mut expanded = Vec::with_capacity(columns.len());
    for col in columns {
        let span = ctx.ast.span(col);
        match ctx.ast.kind(col).clone() {
            NodeKind::StarResultColumn(None) => {
                let sources = ctx.scopes.scope(scope).sources.clone();
                if sources.is_empty() {
                    ctx.error_critical(
                        "cannot expand '*' without a FROM clause",
                        span,
                        Some(col),
                    );
                    continue;
                }
                for (alias, symbol) in &sources {
                    for binding in source_bindings(ctx, symbol, alias) {
                        expanded.push(make_column(ctx, select, &binding, span));
                    }
                }
            }
            NodeKind::StarResultColumn(Some(table)) => {
                match ctx.scopes.lookup(scope, &table).cloned() {
                    Some(symbol @ (Symbol::Table(_) | Symbol::Subquery { .. } | Symbol::Cte { .. })) => {
                        for binding in source_bindings(ctx, &symbol, &table) {
                            expanded.push(make_column(ctx, select, &binding, span));
                        }
                    }
                    _ => {
                        ctx.error_critical(
                            format!("no such table: {table}"),
                            span,
                            Some(col),
                        );
                    }
                }
            }
            _ => expanded.push(col),
        }
    }

    if let NodeKind::Select(stmt) = &mut ctx.ast.node_mut(select).kind {
        stmt.columns = expanded;
    }
}

/// The output columns a FROM source contributes, in declaration order.
fn source_bindings(ctx: &AnalysisContext, symbol: &Symbol, alias: &str) -> Vec<ColumnBinding> {
    let source = if alias.is_empty() { None } else { Some(alias) };
    match symbol {
        Symbol::Table(table) => table
            .columns
            .iter()
            .map(|c| ColumnBinding {
                name: c.name.clone(),
                column: Some(c.clone()),
                origin: None,
                source: source.map(ToOwned::to_owned),
            })
            .collect(),
        Symbol::Subquery { select } => select_output_bindings(&ctx.ast, *select, None, source),
        Symbol::Cte { select, columns } => {
            let declared = if columns.is_empty() {
                None
            } else {
                Some(columns.as_slice())
            };
            select_output_bindings(&ctx.ast, *select, declared, source)
        }
        Symbol::Column(_) => Vec::new(),
    }
}

/// Allocate `alias.name` (or bare `name`) as an expression result column
/// under `select`, with parents assigned.
fn make_column(
    ctx: &mut AnalysisContext,
    select: NodeId,
    binding: &ColumnBinding,
    span: Span,
) -> NodeId {
    let reference = match &binding.source {
        Some(source) => Reference::qualified(source.clone(), binding.name.clone()),
        None => Reference::bare(binding.name.clone()),
    };
    let expr = ctx.ast.alloc(NodeKind::Reference(reference), span);
    let col = ctx.ast.alloc(
        NodeKind::ExprResultColumn {
            expr,
            alias: None,
        },
        span,
    );
    ctx.ast.node_mut(expr).parent = Some(col);
    ctx.ast.node_mut(col).parent = Some(select);
    col
}
