//! Scope construction.
//!
//! Gives every statement and sub-select a local scope parented on the
//! enclosing one (the root scope holds the registered tables). Registers,
//! in order: CTEs (before their bodies, so a recursive CTE can see
//! itself), FROM sources (tables under both real name and alias,
//! sub-selects under their alias), and the target tables of
//! INSERT/UPDATE/DELETE. A duplicate alias within one scope is a
//! non-critical finding; an unknown table is critical.

use squill_ast::{JoinConstraint, NodeId, NodeKind};

use crate::context::AnalysisContext;
use crate::scope::{ScopeId, Symbol};

/// Build scopes for every statement reachable from the root.
pub fn run(ctx: &mut AnalysisContext) {
    let root = ctx.root;
    let root_scope = ctx.root_scope;
    match ctx.ast.kind(root) {
        NodeKind::CreateTrigger(trigger) => {
            // Trigger bodies hold CRUD statements; give each its own scope.
            for stmt in trigger.body.clone() {
                visit_statement(ctx, stmt, root_scope);
            }
        }
        kind if kind.is_crud() => visit_statement(ctx, root, root_scope),
        _ => {}
    }
}

fn visit_statement(ctx: &mut AnalysisContext, stmt: NodeId, parent: ScopeId) {
    let scope = ctx.scopes.alloc(Some(parent));
    ctx.statement_scopes.insert(stmt, scope);

    match ctx.ast.kind(stmt).clone() {
        NodeKind::Select(select) => {
            // CTEs first: registered before their bodies are visited.
            for cte_id in &select.ctes {
                let NodeKind::Cte {
                    name,
                    columns,
                    body,
                } = ctx.ast.kind(*cte_id).clone()
                else {
                    continue;
                };
                ctx.scopes.insert(
                    scope,
                    &name,
                    Symbol::Cte {
                        select: body,
                        columns,
                    },
                );
                visit_statement(ctx, body, scope);
            }

            if let Some(from) = select.from {
                visit_from(ctx, from, scope);
            }

            for &col in &select.columns {
                visit_expressions(ctx, col, scope);
            }
            for clause in [
                select.where_clause,
                select.group_by,
                select.having,
                select.windows,
                select.order_by,
                select.limit,
            ]
            .into_iter()
            .flatten()
            {
                visit_expressions(ctx, clause, scope);
            }

            // Compound siblings resolve in their own sibling scopes.
            for (_, core) in &select.compounds {
                visit_statement(ctx, *core, parent);
            }
        }
        NodeKind::Insert(insert) => {
            register_ctes(ctx, &insert.ctes, scope);
            register_target_table(ctx, insert.table, scope);
            match insert.source {
                squill_ast::InsertSource::Values(rows) => {
                    for row in rows {
                        for expr in row {
                            visit_expressions(ctx, expr, scope);
                        }
                    }
                }
                squill_ast::InsertSource::Select(select) => {
                    visit_statement(ctx, select, scope);
                }
                squill_ast::InsertSource::DefaultValues => {}
            }
            for &col in &insert.returning {
                visit_expressions(ctx, col, scope);
            }
        }
        NodeKind::Update(update) => {
            register_ctes(ctx, &update.ctes, scope);
            register_target_table(ctx, update.table, scope);
            if let Some(from) = update.from {
                visit_from(ctx, from, scope);
            }
            for assignment in &update.assignments {
                visit_expressions(ctx, assignment.value, scope);
            }
            if let Some(where_clause) = update.where_clause {
                visit_expressions(ctx, where_clause, scope);
            }
            for &col in &update.returning {
                visit_expressions(ctx, col, scope);
            }
        }
        NodeKind::Delete(delete) => {
            register_ctes(ctx, &delete.ctes, scope);
            register_target_table(ctx, delete.table, scope);
            if let Some(where_clause) = delete.where_clause {
                visit_expressions(ctx, where_clause, scope);
            }
            for &col in &delete.returning {
                visit_expressions(ctx, col, scope);
            }
        }
        _ => {}
    }
}

fn register_ctes(ctx: &mut AnalysisContext, ctes: &[NodeId], scope: ScopeId) {
    for &cte_id in ctes {
        let NodeKind::Cte {
            name,
            columns,
            body,
        } = ctx.ast.kind(cte_id).clone()
        else {
            continue;
        };
        ctx.scopes.insert(
            scope,
            &name,
            Symbol::Cte {
                select: body,
                columns,
            },
        );
        visit_statement(ctx, body, scope);
    }
}

fn visit_from(ctx: &mut AnalysisContext, from: NodeId, scope: ScopeId) {
    let NodeKind::From(from_clause) = ctx.ast.kind(from).clone() else {
        return;
    };
    register_source(ctx, from_clause.source, scope);
    for join in from_clause.joins {
        let NodeKind::Join {
            source, constraint, ..
        } = ctx.ast.kind(join).clone()
        else {
            continue;
        };
        register_source(ctx, source, scope);
        if let Some(JoinConstraint::On(expr)) = constraint {
            visit_expressions(ctx, expr, scope);
        }
    }
}

/// Register one FROM source into the scope's bindings and ordered source
/// list.
fn register_source(ctx: &mut AnalysisContext, source: NodeId, scope: ScopeId) {
    match ctx.ast.kind(source).clone() {
        NodeKind::TableReference { name, alias } => {
            let span = ctx.ast.span(source);
            // A CTE or registered table visible from here?
            let symbol = match ctx.scopes.lookup(scope, &name) {
                Some(found @ (Symbol::Table(_) | Symbol::Cte { .. })) => found.clone(),
                _ => {
                    ctx.error_critical(format!("no such table: {name}"), span, Some(source));
                    return;
                }
            };

            let effective = alias.clone().unwrap_or_else(|| name.clone());
            if ctx.scopes.lookup_local(scope, &effective).is_some() {
                tracing::warn!(
                    target: "squill.analyze",
                    alias = %effective,
                    "duplicate table alias in scope"
                );
                ctx.error_warning(
                    format!("duplicate table alias: {effective}"),
                    span,
                    Some(source),
                );
            }
            ctx.scopes.insert(scope, &name, symbol.clone());
            if let Some(alias) = &alias {
                ctx.scopes.insert(scope, alias, symbol.clone());
            }
            ctx.scopes.add_source(scope, &effective, symbol);
        }
        NodeKind::SelectSource { select, alias } => {
            // Resolve the sub-select in its own scope before exposing it.
            visit_statement(ctx, select, scope);
            let symbol = Symbol::Subquery { select };
            if let Some(alias) = alias {
                if !ctx.scopes.insert(scope, &alias, symbol.clone()) {
                    ctx.error_warning(
                        format!("duplicate table alias: {alias}"),
                        ctx.ast.span(source),
                        Some(source),
                    );
                }
                ctx.scopes.add_source(scope, &alias, symbol);
            } else {
                // Anonymous sub-select: reachable for unqualified lookups
                // and star expansion, but not addressable by name.
                ctx.scopes.add_source(scope, "", symbol);
            }
        }
        _ => {}
    }
}

/// Register the target table of an INSERT/UPDATE/DELETE.
fn register_target_table(ctx: &mut AnalysisContext, table: NodeId, scope: ScopeId) {
    register_source(ctx, table, scope);
}

/// Walk an expression subtree looking for nested selects; each one gets its
/// own scope parented on `scope`. Other expression nodes need nothing here.
fn visit_expressions(ctx: &mut AnalysisContext, node: NodeId, scope: ScopeId) {
    match ctx.ast.kind(node) {
        NodeKind::Subquery(select)
        | NodeKind::Exists { select, .. }
        | NodeKind::InSubquery { select, .. } => {
            let select = *select;
            // The subject of IN (SELECT ...) still belongs to this scope.
            if let NodeKind::InSubquery { subject, .. } = ctx.ast.kind(node) {
                let subject = *subject;
                visit_expressions(ctx, subject, scope);
            }
            visit_statement(ctx, select, scope);
        }
        NodeKind::Select(_) => visit_statement(ctx, node, scope),
        _ => {
            for child in ctx.ast.children(node) {
                visit_expressions(ctx, child, scope);
            }
        }
    }
}
