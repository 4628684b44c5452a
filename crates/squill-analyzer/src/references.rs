//! Reference resolution.
//!
//! Maps every `Reference` node in a CRUD tree to a column symbol, or
//! records exactly one critical error for it. Qualified references look up
//! their table/subquery symbol through the scope chain; unqualified
//! references search the enclosing FROM sources left-to-right, walking out
//! through parent scopes (correlated subqueries) when nothing matches
//! locally. Multiple matches at one level are ambiguous.

use std::sync::atomic::{AtomicU64, Ordering};

use squill_ast::{NodeId, NodeKind};

use crate::context::AnalysisContext;
use crate::scope::{symbol_column, ColumnBinding, Symbol};

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

static SQUILL_ANALYSIS_ERRORS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Point-in-time snapshot of analyzer metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnalysisMetricsSnapshot {
    pub squill_analysis_errors_total: u64,
}

/// Take a point-in-time snapshot of analyzer metrics.
#[must_use]
pub fn analysis_metrics_snapshot() -> AnalysisMetricsSnapshot {
    AnalysisMetricsSnapshot {
        squill_analysis_errors_total: SQUILL_ANALYSIS_ERRORS_TOTAL.load(Ordering::Relaxed),
    }
}

/// Reset analyzer metrics (tests/diagnostics).
pub fn reset_analysis_metrics() {
    SQUILL_ANALYSIS_ERRORS_TOTAL.store(0, Ordering::Relaxed);
}

pub(crate) fn record_errors(count: usize) {
    if count > 0 {
        SQUILL_ANALYSIS_ERRORS_TOTAL.fetch_add(count as u64, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve every `Reference` node reachable from the root.
pub fn run(ctx: &mut AnalysisContext) {
    let before = ctx.errors.len();
    let references: Vec<NodeId> = ctx
        .ast
        .post_order(ctx.root)
        .into_iter()
        .filter(|&id| matches!(ctx.ast.kind(id), NodeKind::Reference(_)))
        .collect();
    for reference in references {
        resolve_reference(ctx, reference);
    }
    record_errors(ctx.errors.len() - before);
}

fn resolve_reference(ctx: &mut AnalysisContext, node: NodeId) {
    if ctx.resolved.contains_key(&node) {
        return;
    }
    let NodeKind::Reference(reference) = ctx.ast.kind(node).clone() else {
        return;
    };
    let span = ctx.ast.span(node);
    let scope = ctx.scope_for(node);

    let outcome = match &reference.table {
        Some(table) => resolve_qualified(ctx, scope, table, &reference.column),
        None => resolve_unqualified(ctx, scope, &reference.column),
    };

    match outcome {
        Ok(binding) => {
            ctx.resolved.insert(node, Symbol::Column(binding));
        }
        Err(message) => {
            tracing::error!(
                target: "squill.analyze",
                reference = %reference.column,
                %message,
                "unresolvable reference"
            );
            ctx.error_critical(message, span, Some(node));
        }
    }
}

fn resolve_qualified(
    ctx: &AnalysisContext,
    scope: crate::scope::ScopeId,
    table: &str,
    column: &str,
) -> Result<ColumnBinding, String> {
    match ctx.scopes.lookup(scope, table) {
        Some(symbol @ (Symbol::Table(_) | Symbol::Subquery { .. } | Symbol::Cte { .. })) => {
            symbol_column(&ctx.ast, symbol, table, column)
                .ok_or_else(|| format!("no such column: {table}.{column}"))
        }
        _ => Err(format!("no such table: {table}")),
    }
}

fn resolve_unqualified(
    ctx: &AnalysisContext,
    scope: crate::scope::ScopeId,
    column: &str,
) -> Result<ColumnBinding, String> {
    let mut cur = Some(scope);
    while let Some(scope_id) = cur {
        let scope_data = ctx.scopes.scope(scope_id);
        let mut matches: Vec<ColumnBinding> = Vec::new();
        for (alias, symbol) in &scope_data.sources {
            if let Some(binding) = symbol_column(&ctx.ast, symbol, alias, column) {
                matches.push(binding);
            }
        }
        match matches.len() {
            0 => cur = scope_data.parent,
            1 => return Ok(matches.into_iter().next().expect("one match")),
            _ => {
                let candidates: Vec<String> = matches
                    .iter()
                    .map(|b| b.source.clone().unwrap_or_default())
                    .collect();
                return Err(format!(
                    "ambiguous column name: {column} (candidates: {})",
                    candidates.join(", ")
                ));
            }
        }
    }
    Err(format!("no such column: {column}"))
}
