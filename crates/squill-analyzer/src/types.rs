//! Bidirectional type inference.
//!
//! Two flows over the tree:
//!
//! - *Synthetic* (downward): a node's type from its children — literals
//!   are self-evident, a reference inherits its column's type, operators
//!   combine per the operator rules, function calls per the signature
//!   table.
//! - *Expected* (upward): the type a parent imposes on a child — the other
//!   side of a comparison, a LIKE pattern, a BETWEEN bound, a function
//!   parameter, a frame bound, an insert position.
//!
//! The passes alternate until a fixed point. The lattice only moves
//! `Unknown`/`NeedsContext` → `Resolved`, never back, so termination is
//! bounded by the node count. Hints (`IsDateTime`, `IsBoolean`) ride the
//! resolved type through comparisons, which is what turns `date = ?` into
//! an integer variable carrying `IsDateTime`.

use squill_ast::{
    BinaryOp, FrameBound, FunctionArgs, Literal, NodeId, NodeKind, UnaryOp, WindowSpec,
};
use squill_types::{BaseType, Column, ResolveResult, ResolvedType, TypeHint};

use crate::context::AnalysisContext;
use crate::functions::{signature, ResultRule};
use crate::scope::Symbol;

const MAX_ITERATIONS: usize = 16;
const MAX_EXPECTATION_DEPTH: usize = 8;

/// Run inference to a fixed point. Afterwards every typeable node has an
/// entry in `ctx.types` (possibly still `NeedsContext` for variables no
/// context constrains).
pub fn run(ctx: &mut AnalysisContext) {
    let span = tracing::debug_span!(
        target: "squill.analyze",
        "type_resolution",
        nodes = tracing::field::Empty,
        resolved = tracing::field::Empty,
    );
    let _guard = span.enter();

    let order = ctx.ast.post_order(ctx.root);

    for &id in &order {
        let kind = ctx.ast.kind(id);
        if kind.is_typeable() {
            let initial = if matches!(kind, NodeKind::Variable(_)) {
                ResolveResult::NeedsContext
            } else {
                ResolveResult::Unknown
            };
            ctx.types.entry(id).or_insert(initial);
        }
    }

    let mut iterations = 0;
    loop {
        let synth_changed = synth_pass(ctx, &order);
        let expect_changed = expect_pass(ctx, &order);
        iterations += 1;
        if (!synth_changed && !expect_changed) || iterations >= MAX_ITERATIONS {
            break;
        }
    }

    span.record("nodes", order.len() as u64);
    span.record(
        "resolved",
        ctx.types.values().filter(|r| r.is_resolved()).count() as u64,
    );
}

/// Resolve `id` to `ty` unless it already settled. Monotone by
/// construction: a `Resolved` entry is never overwritten.
fn set_resolved(ctx: &mut AnalysisContext, id: NodeId, ty: ResolvedType) -> bool {
    let entry = ctx.types.entry(id).or_insert(ResolveResult::Unknown);
    if entry.is_resolved() {
        return false;
    }
    *entry = ResolveResult::Resolved(ty);
    true
}

fn ty_of(ctx: &AnalysisContext, id: NodeId) -> Option<ResolvedType> {
    ctx.types.get(&id).and_then(ResolveResult::resolved)
}

// ---------------------------------------------------------------------------
// Synthetic pass
// ---------------------------------------------------------------------------

fn synth_pass(ctx: &mut AnalysisContext, order: &[NodeId]) -> bool {
    let mut changed = false;
    for &id in order {
        if ty_of(ctx, id).is_some() {
            continue;
        }
        if let Some(ty) = synth(ctx, id) {
            changed |= set_resolved(ctx, id, ty);
        }
    }
    changed
}

#[allow(clippy::too_many_lines)]
fn synth(ctx: &AnalysisContext, id: NodeId) -> Option<ResolvedType> {
    match ctx.ast.kind(id) {
        NodeKind::Literal(literal) => Some(literal_type(literal)),

        NodeKind::Reference(_) => symbol_type(ctx, ctx.resolved.get(&id)?),

        // Variables are expectation-driven.
        NodeKind::Variable(_) => None,

        NodeKind::Binary { op, lhs, rhs } => match op {
            _ if op.is_comparison() || op.is_logical() => Some(ResolvedType::boolean()),
            BinaryOp::Concat => Some(ResolvedType::text()),
            _ if op.is_bitwise() => Some(ResolvedType::integer()),
            // Arithmetic: real wins, otherwise integer; a datetime hint on
            // either side survives (`date + 3600` is still a datetime).
            _ => {
                let l = ty_of(ctx, *lhs);
                let r = ty_of(ctx, *rhs);
                let known = l.or(r)?;
                let base = if l.map(|t| t.base) == Some(BaseType::Real)
                    || r.map(|t| t.base) == Some(BaseType::Real)
                {
                    BaseType::Real
                } else {
                    BaseType::Integer
                };
                let hint = [l, r]
                    .into_iter()
                    .flatten()
                    .find_map(|t| t.hint)
                    .filter(|_| base == BaseType::Integer);
                Some(ResolvedType {
                    base,
                    nullable: l.map_or(false, |t| t.nullable)
                        || r.map_or(false, |t| t.nullable)
                        || known.nullable,
                    is_array: false,
                    hint,
                })
            }
        },

        NodeKind::Unary { op, operand } => match op {
            UnaryOp::Not => Some(ResolvedType::boolean()),
            UnaryOp::BitNot => Some(ResolvedType::integer()),
            UnaryOp::Negate | UnaryOp::Plus => ty_of(ctx, *operand),
        },

        NodeKind::Between { .. }
        | NodeKind::InList { .. }
        | NodeKind::InSubquery { .. }
        | NodeKind::InVariable { .. }
        | NodeKind::Like { .. }
        | NodeKind::IsNull { .. }
        | NodeKind::Exists { .. } => Some(ResolvedType::boolean()),

        NodeKind::Case {
            whens, else_expr, ..
        } => whens
            .iter()
            .map(|arm| arm.then)
            .chain(else_expr.iter().copied())
            .find_map(|branch| ty_of(ctx, branch))
            .map(|t| t.with_nullable(true)),

        NodeKind::FunctionCall { name, args, .. }
        | NodeKind::WindowFunction { name, args, .. } => {
            let sig = signature(name)?;
            match sig.result {
                ResultRule::Fixed(base) => Some(ResolvedType::of(base)),
                ResultRule::ArgAt(index) => match args {
                    FunctionArgs::List(items) => ty_of(ctx, *items.get(index)?),
                    FunctionArgs::Star => None,
                },
                ResultRule::FirstResolvedArg => match args {
                    FunctionArgs::List(items) => {
                        items.iter().find_map(|&arg| ty_of(ctx, arg))
                    }
                    FunctionArgs::Star => None,
                },
            }
        }

        NodeKind::Cast { target, .. } => Some(cast_type(&target.name)),
        NodeKind::Collate { expr, .. } => ty_of(ctx, *expr),

        NodeKind::Subquery(select) => select_first_column_type(ctx, *select),

        NodeKind::ExprResultColumn { expr, .. } => ty_of(ctx, *expr),

        _ => None,
    }
}

fn literal_type(literal: &Literal) -> ResolvedType {
    match literal {
        Literal::Integer(_) => ResolvedType::integer(),
        Literal::Real(_) => ResolvedType::real(),
        Literal::String(_) => ResolvedType::text(),
        Literal::Blob(_) => ResolvedType::blob(),
        Literal::Null => ResolvedType::null(),
        Literal::True | Literal::False => ResolvedType::boolean(),
        // SQLite yields text for the CURRENT_* constants.
        Literal::CurrentTime | Literal::CurrentDate | Literal::CurrentTimestamp => {
            ResolvedType::text()
        }
    }
}

/// Type contributed by a resolved column symbol.
fn symbol_type(ctx: &AnalysisContext, symbol: &Symbol) -> Option<ResolvedType> {
    match symbol {
        Symbol::Column(binding) => binding
            .column
            .as_ref()
            .map(Column::resolved_type)
            .or_else(|| binding.origin.and_then(|origin| ty_of(ctx, origin))),
        _ => None,
    }
}

fn select_first_column_type(ctx: &AnalysisContext, select: NodeId) -> Option<ResolvedType> {
    let NodeKind::Select(stmt) = ctx.ast.kind(select) else {
        return None;
    };
    ty_of(ctx, *stmt.columns.first()?)
}

/// Affinity of a CAST target, SQLite-style substring rules.
fn cast_type(name: &str) -> ResolvedType {
    let upper = name.to_ascii_uppercase();
    if upper.contains("BOOL") {
        ResolvedType::boolean().with_hint(TypeHint::IsBoolean)
    } else if upper.contains("DATE") || upper.contains("TIMESTAMP") {
        ResolvedType::integer().with_hint(TypeHint::IsDateTime)
    } else if upper.contains("INT") {
        ResolvedType::integer()
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        ResolvedType::text()
    } else if upper.contains("BLOB") {
        ResolvedType::blob()
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        ResolvedType::real()
    } else {
        ResolvedType::integer()
    }
}

// ---------------------------------------------------------------------------
// Expectation pass
// ---------------------------------------------------------------------------

fn expect_pass(ctx: &mut AnalysisContext, order: &[NodeId]) -> bool {
    let mut changed = false;
    for &id in order {
        if !matches!(ctx.ast.kind(id), NodeKind::Variable(_)) {
            continue;
        }
        if ty_of(ctx, id).is_some() {
            continue;
        }
        if let Some(ty) = expected_for(ctx, id, 0) {
            changed |= set_resolved(ctx, id, ty);
        }
    }
    changed
}

/// The type the parent of `node` imposes on it, if any.
#[allow(clippy::too_many_lines)]
fn expected_for(ctx: &AnalysisContext, node: NodeId, depth: usize) -> Option<ResolvedType> {
    if depth > MAX_EXPECTATION_DEPTH {
        return None;
    }
    let parent = ctx.ast.parent(node)?;

    match ctx.ast.kind(parent) {
        NodeKind::Binary { op, lhs, rhs } => {
            if op.is_comparison() {
                let sibling = if *lhs == node { *rhs } else { *lhs };
                return ty_of(ctx, sibling).map(ResolvedType::as_scalar);
            }
            if op.is_logical() {
                return Some(ResolvedType::boolean());
            }
            if op.is_bitwise() {
                return Some(ResolvedType::integer());
            }
            if *op == BinaryOp::Concat {
                return Some(ResolvedType::text());
            }
            // Arithmetic: the other operand's numeric type.
            let sibling = if *lhs == node { *rhs } else { *lhs };
            ty_of(ctx, sibling).map(ResolvedType::as_scalar)
        }

        NodeKind::Unary { op, .. } => match op {
            UnaryOp::Not => Some(ResolvedType::boolean()),
            UnaryOp::BitNot => Some(ResolvedType::integer()),
            // Sign passes the surrounding expectation straight through.
            UnaryOp::Negate | UnaryOp::Plus => expected_for(ctx, parent, depth + 1),
        },

        NodeKind::Between {
            subject, low, high, ..
        } => {
            if node == *subject {
                ty_of(ctx, *low).or_else(|| ty_of(ctx, *high))
            } else {
                ty_of(ctx, *subject).map(ResolvedType::as_scalar)
            }
        }

        // `x IN ?` — the variable expands to a list of the subject's type.
        NodeKind::InVariable {
            subject, variable, ..
        } => {
            if node == *variable {
                ty_of(ctx, *subject).map(ResolvedType::as_array)
            } else {
                None
            }
        }

        // `x IN (?)` — the parenthesized variable is a scalar element.
        NodeKind::InList { subject, items, .. } => {
            if items.contains(&node) {
                ty_of(ctx, *subject).map(ResolvedType::as_scalar)
            } else {
                items.iter().find_map(|&item| ty_of(ctx, item))
            }
        }

        NodeKind::InSubquery { subject, select, .. } => {
            if node == *subject {
                select_first_column_type(ctx, *select)
            } else {
                None
            }
        }

        NodeKind::Like { .. } => Some(ResolvedType::text()),

        NodeKind::Case {
            operand,
            whens,
            else_expr,
        } => {
            if operand.is_some_and(|o| o == node) {
                return whens.iter().find_map(|arm| ty_of(ctx, arm.when));
            }
            if whens.iter().any(|arm| arm.when == node) {
                return match operand {
                    Some(operand) => ty_of(ctx, *operand),
                    None => Some(ResolvedType::boolean()),
                };
            }
            // A THEN/ELSE branch unifies with the first resolved branch,
            // falling back to whatever the CASE itself is expected to be.
            whens
                .iter()
                .map(|arm| arm.then)
                .chain(else_expr.iter().copied())
                .filter(|&branch| branch != node)
                .find_map(|branch| ty_of(ctx, branch))
                .or_else(|| expected_for(ctx, parent, depth + 1))
        }

        NodeKind::FunctionCall { name, args, .. } => {
            argument_expectation(name, args, node)
        }
        NodeKind::WindowFunction { name, args, window } => {
            argument_expectation(name, args, node)
                .or_else(|| frame_expectation(window, node))
        }
        NodeKind::WindowClause(windows) => windows
            .iter()
            .find_map(|w| frame_expectation(&w.spec, node)),

        // LIMIT and OFFSET are row counts.
        NodeKind::Limit { .. } => Some(ResolvedType::integer()),

        NodeKind::Where(_) | NodeKind::Having(_) => Some(ResolvedType::boolean()),
        NodeKind::Join { constraint, .. } => match constraint {
            Some(squill_ast::JoinConstraint::On(expr)) if *expr == node => {
                Some(ResolvedType::boolean())
            }
            _ => None,
        },

        // `SET column = value`: the value takes the column's type.
        NodeKind::Update(update) => update
            .assignments
            .iter()
            .find(|a| a.value == node)
            .and_then(|a| ctx.resolved.get(&a.column))
            .and_then(|symbol| symbol_type(ctx, symbol)),

        // `INSERT ... VALUES`: each position takes its target column type.
        NodeKind::Insert(insert) => {
            let squill_ast::InsertSource::Values(rows) = &insert.source else {
                return None;
            };
            let position = rows
                .iter()
                .find_map(|row| row.iter().position(|&value| value == node))?;
            let (_, symbol) = ctx.first_source_of(parent)?;
            let Symbol::Table(table) = symbol else {
                return None;
            };
            let column = if insert.columns.is_empty() {
                table.columns.get(position)
            } else {
                table.find_column(insert.columns.get(position)?)
            };
            column.map(Column::resolved_type)
        }

        _ => None,
    }
}

fn argument_expectation(
    name: &str,
    args: &FunctionArgs,
    node: NodeId,
) -> Option<ResolvedType> {
    let FunctionArgs::List(items) = args else {
        return None;
    };
    let index = items.iter().position(|&arg| arg == node)?;
    signature(name)?.param_expected(index)
}

fn frame_expectation(window: &WindowSpec, node: NodeId) -> Option<ResolvedType> {
    let frame = window.frame.as_ref()?;
    let in_frame = std::iter::once(&frame.start)
        .chain(frame.end.as_ref())
        .any(|bound| matches!(bound, FrameBound::Preceding(e) | FrameBound::Following(e) if *e == node));
    in_frame.then(ResolvedType::integer)
}
