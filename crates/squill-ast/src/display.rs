//! SQL rendering for arena nodes.
//!
//! [`render`] reconstructs SQL text for any node, which gives the
//! round-trip property the tests rely on: parsing the rendered text of a
//! parsed statement yields the same token kinds. Binary and unary
//! sub-expressions are always parenthesized so precedence survives the
//! trip without tracking binding power here.

use std::fmt::{self, Write as _};

use crate::node::{
    ColumnConstraintDef, CompoundOp, FrameBound, FrameType, FunctionArgs, InsertSource,
    JoinConstraint, JoinKind, Literal, NodeKind, NullsOrder, OrderingTerm, SortDirection,
    TableConstraintDef, TriggerEvent, TriggerTiming, TypeName, UnaryOp, WindowSpec,
};
use crate::{Ast, NodeId};

/// Render the subtree rooted at `id` back to SQL text.
#[must_use]
pub fn render(ast: &Ast, id: NodeId) -> String {
    let mut out = String::new();
    write_node(&mut out, ast, id).expect("writing to String cannot fail");
    out
}

fn needs_quoting(name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    let first = name.as_bytes()[0];
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return true;
    }
    name.bytes()
        .any(|b| !(b.is_ascii_alphanumeric() || b == b'_'))
}

fn write_ident(out: &mut String, name: &str) -> fmt::Result {
    if needs_quoting(name) {
        write!(out, "\"{}\"", name.replace('"', "\"\""))
    } else {
        out.write_str(name)
    }
}

fn write_literal(out: &mut String, literal: &Literal) -> fmt::Result {
    match literal {
        Literal::Integer(n) => write!(out, "{n}"),
        Literal::Real(v) => {
            if v.fract() == 0.0 && !v.is_infinite() && !v.is_nan() {
                write!(out, "{v:.1}")
            } else {
                write!(out, "{v}")
            }
        }
        Literal::String(s) => write!(out, "'{}'", s.replace('\'', "''")),
        Literal::Blob(bytes) => {
            out.write_str("X'")?;
            for b in bytes {
                write!(out, "{b:02X}")?;
            }
            out.write_str("'")
        }
        Literal::Null => out.write_str("NULL"),
        Literal::True => out.write_str("TRUE"),
        Literal::False => out.write_str("FALSE"),
        Literal::CurrentTime => out.write_str("CURRENT_TIME"),
        Literal::CurrentDate => out.write_str("CURRENT_DATE"),
        Literal::CurrentTimestamp => out.write_str("CURRENT_TIMESTAMP"),
    }
}

fn write_type_name(out: &mut String, ty: &TypeName) -> fmt::Result {
    out.write_str(&ty.name)?;
    match (&ty.arg1, &ty.arg2) {
        (Some(a1), Some(a2)) => write!(out, "({a1}, {a2})"),
        (Some(a1), None) => write!(out, "({a1})"),
        _ => Ok(()),
    }
}

/// Parenthesize operator expressions so rendered text re-parses with the
/// same structure.
fn write_operand(out: &mut String, ast: &Ast, id: NodeId) -> fmt::Result {
    if matches!(
        ast.kind(id),
        NodeKind::Binary { .. } | NodeKind::Unary { .. }
    ) {
        out.write_str("(")?;
        write_node(out, ast, id)?;
        out.write_str(")")
    } else {
        write_node(out, ast, id)
    }
}

fn write_comma_nodes(out: &mut String, ast: &Ast, ids: &[NodeId]) -> fmt::Result {
    for (i, &id) in ids.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_node(out, ast, id)?;
    }
    Ok(())
}

fn write_ordering_terms(out: &mut String, ast: &Ast, terms: &[OrderingTerm]) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_node(out, ast, term.expr)?;
        match term.direction {
            Some(SortDirection::Asc) => out.write_str(" ASC")?,
            Some(SortDirection::Desc) => out.write_str(" DESC")?,
            None => {}
        }
        match term.nulls {
            Some(NullsOrder::First) => out.write_str(" NULLS FIRST")?,
            Some(NullsOrder::Last) => out.write_str(" NULLS LAST")?,
            None => {}
        }
    }
    Ok(())
}

fn write_frame_bound(out: &mut String, ast: &Ast, bound: &FrameBound) -> fmt::Result {
    match bound {
        FrameBound::UnboundedPreceding => out.write_str("UNBOUNDED PRECEDING"),
        FrameBound::Preceding(e) => {
            write_node(out, ast, *e)?;
            out.write_str(" PRECEDING")
        }
        FrameBound::CurrentRow => out.write_str("CURRENT ROW"),
        FrameBound::Following(e) => {
            write_node(out, ast, *e)?;
            out.write_str(" FOLLOWING")
        }
        FrameBound::UnboundedFollowing => out.write_str("UNBOUNDED FOLLOWING"),
    }
}

fn write_window_spec(out: &mut String, ast: &Ast, spec: &WindowSpec) -> fmt::Result {
    out.write_str("(")?;
    let mut lead = "";
    if let Some(base) = &spec.base {
        write_ident(out, base)?;
        lead = " ";
    }
    if !spec.partition_by.is_empty() {
        out.write_str(lead)?;
        out.write_str("PARTITION BY ")?;
        write_comma_nodes(out, ast, &spec.partition_by)?;
        lead = " ";
    }
    if !spec.order_by.is_empty() {
        out.write_str(lead)?;
        out.write_str("ORDER BY ")?;
        write_ordering_terms(out, ast, &spec.order_by)?;
        lead = " ";
    }
    if let Some(frame) = &spec.frame {
        out.write_str(lead)?;
        out.write_str(match frame.frame_type {
            FrameType::Rows => "ROWS ",
            FrameType::Range => "RANGE ",
            FrameType::Groups => "GROUPS ",
        })?;
        if let Some(end) = &frame.end {
            out.write_str("BETWEEN ")?;
            write_frame_bound(out, ast, &frame.start)?;
            out.write_str(" AND ")?;
            write_frame_bound(out, ast, end)?;
        } else {
            write_frame_bound(out, ast, &frame.start)?;
        }
    }
    out.write_str(")")
}

fn write_function_args(out: &mut String, ast: &Ast, args: &FunctionArgs) -> fmt::Result {
    match args {
        FunctionArgs::Star => out.write_str("*"),
        FunctionArgs::List(items) => write_comma_nodes(out, ast, items),
    }
}

fn write_ctes(
    out: &mut String,
    ast: &Ast,
    recursive: bool,
    ctes: &[NodeId],
) -> fmt::Result {
    if ctes.is_empty() {
        return Ok(());
    }
    out.write_str(if recursive { "WITH RECURSIVE " } else { "WITH " })?;
    write_comma_nodes(out, ast, ctes)?;
    out.write_str(" ")
}

fn write_returning(out: &mut String, ast: &Ast, returning: &[NodeId]) -> fmt::Result {
    if returning.is_empty() {
        return Ok(());
    }
    out.write_str(" RETURNING ")?;
    write_comma_nodes(out, ast, returning)
}

#[allow(clippy::too_many_lines)]
fn write_node(out: &mut String, ast: &Ast, id: NodeId) -> fmt::Result {
    match ast.kind(id) {
        NodeKind::Select(select) => {
            write_ctes(out, ast, select.recursive, &select.ctes)?;
            out.write_str("SELECT ")?;
            if select.distinct {
                out.write_str("DISTINCT ")?;
            }
            write_comma_nodes(out, ast, &select.columns)?;
            if let Some(from) = select.from {
                out.write_str(" ")?;
                write_node(out, ast, from)?;
            }
            if let Some(where_clause) = select.where_clause {
                out.write_str(" ")?;
                write_node(out, ast, where_clause)?;
            }
            if let Some(group_by) = select.group_by {
                out.write_str(" ")?;
                write_node(out, ast, group_by)?;
            }
            if let Some(having) = select.having {
                out.write_str(" ")?;
                write_node(out, ast, having)?;
            }
            if let Some(windows) = select.windows {
                out.write_str(" ")?;
                write_node(out, ast, windows)?;
            }
            for (op, core) in &select.compounds {
                out.write_str(match op {
                    CompoundOp::Union => " UNION ",
                    CompoundOp::UnionAll => " UNION ALL ",
                    CompoundOp::Intersect => " INTERSECT ",
                    CompoundOp::Except => " EXCEPT ",
                })?;
                write_node(out, ast, *core)?;
            }
            if let Some(order_by) = select.order_by {
                out.write_str(" ")?;
                write_node(out, ast, order_by)?;
            }
            if let Some(limit) = select.limit {
                out.write_str(" ")?;
                write_node(out, ast, limit)?;
            }
            Ok(())
        }
        NodeKind::Insert(insert) => {
            write_ctes(out, ast, insert.recursive, &insert.ctes)?;
            out.write_str("INSERT INTO ")?;
            write_node(out, ast, insert.table)?;
            if !insert.columns.is_empty() {
                out.write_str(" (")?;
                for (i, col) in insert.columns.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    write_ident(out, col)?;
                }
                out.write_str(")")?;
            }
            match &insert.source {
                InsertSource::Values(rows) => {
                    out.write_str(" VALUES ")?;
                    for (i, row) in rows.iter().enumerate() {
                        if i > 0 {
                            out.write_str(", ")?;
                        }
                        out.write_str("(")?;
                        write_comma_nodes(out, ast, row)?;
                        out.write_str(")")?;
                    }
                }
                InsertSource::Select(select) => {
                    out.write_str(" ")?;
                    write_node(out, ast, *select)?;
                }
                InsertSource::DefaultValues => out.write_str(" DEFAULT VALUES")?,
            }
            write_returning(out, ast, &insert.returning)
        }
        NodeKind::Update(update) => {
            write_ctes(out, ast, update.recursive, &update.ctes)?;
            out.write_str("UPDATE ")?;
            write_node(out, ast, update.table)?;
            out.write_str(" SET ")?;
            for (i, assignment) in update.assignments.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_node(out, ast, assignment.column)?;
                out.write_str(" = ")?;
                write_node(out, ast, assignment.value)?;
            }
            if let Some(from) = update.from {
                out.write_str(" ")?;
                write_node(out, ast, from)?;
            }
            if let Some(where_clause) = update.where_clause {
                out.write_str(" ")?;
                write_node(out, ast, where_clause)?;
            }
            write_returning(out, ast, &update.returning)
        }
        NodeKind::Delete(delete) => {
            write_ctes(out, ast, delete.recursive, &delete.ctes)?;
            out.write_str("DELETE FROM ")?;
            write_node(out, ast, delete.table)?;
            if let Some(where_clause) = delete.where_clause {
                out.write_str(" ")?;
                write_node(out, ast, where_clause)?;
            }
            write_returning(out, ast, &delete.returning)
        }
        NodeKind::CreateTable(create) => {
            out.write_str("CREATE TABLE ")?;
            if create.if_not_exists {
                out.write_str("IF NOT EXISTS ")?;
            }
            write_ident(out, &create.name)?;
            out.write_str(" (")?;
            let mut first = true;
            for col in &create.columns {
                if !first {
                    out.write_str(", ")?;
                }
                first = false;
                write_ident(out, &col.name)?;
                if let Some(ty) = &col.type_name {
                    out.write_str(" ")?;
                    write_type_name(out, ty)?;
                }
                for constraint in &col.constraints {
                    match constraint {
                        ColumnConstraintDef::PrimaryKey {
                            direction,
                            autoincrement,
                        } => {
                            out.write_str(" PRIMARY KEY")?;
                            match direction {
                                Some(SortDirection::Asc) => out.write_str(" ASC")?,
                                Some(SortDirection::Desc) => out.write_str(" DESC")?,
                                None => {}
                            }
                            if *autoincrement {
                                out.write_str(" AUTOINCREMENT")?;
                            }
                        }
                        ColumnConstraintDef::NotNull => out.write_str(" NOT NULL")?,
                        ColumnConstraintDef::Unique => out.write_str(" UNIQUE")?,
                        ColumnConstraintDef::Default(e) => {
                            out.write_str(" DEFAULT (")?;
                            write_node(out, ast, *e)?;
                            out.write_str(")")?;
                        }
                        ColumnConstraintDef::Check(e) => {
                            out.write_str(" CHECK (")?;
                            write_node(out, ast, *e)?;
                            out.write_str(")")?;
                        }
                        ColumnConstraintDef::Collate(name) => {
                            out.write_str(" COLLATE ")?;
                            write_ident(out, name)?;
                        }
                        ColumnConstraintDef::References { table, columns } => {
                            out.write_str(" REFERENCES ")?;
                            write_ident(out, table)?;
                            if !columns.is_empty() {
                                out.write_str(" (")?;
                                for (i, c) in columns.iter().enumerate() {
                                    if i > 0 {
                                        out.write_str(", ")?;
                                    }
                                    write_ident(out, c)?;
                                }
                                out.write_str(")")?;
                            }
                        }
                    }
                }
            }
            for constraint in &create.constraints {
                out.write_str(", ")?;
                match constraint {
                    TableConstraintDef::PrimaryKey(cols) => {
                        out.write_str("PRIMARY KEY (")?;
                        write_ident_list(out, cols)?;
                        out.write_str(")")?;
                    }
                    TableConstraintDef::Unique(cols) => {
                        out.write_str("UNIQUE (")?;
                        write_ident_list(out, cols)?;
                        out.write_str(")")?;
                    }
                    TableConstraintDef::Check(e) => {
                        out.write_str("CHECK (")?;
                        write_node(out, ast, *e)?;
                        out.write_str(")")?;
                    }
                    TableConstraintDef::ForeignKey {
                        columns,
                        table,
                        references,
                    } => {
                        out.write_str("FOREIGN KEY (")?;
                        write_ident_list(out, columns)?;
                        out.write_str(") REFERENCES ")?;
                        write_ident(out, table)?;
                        if !references.is_empty() {
                            out.write_str(" (")?;
                            write_ident_list(out, references)?;
                            out.write_str(")")?;
                        }
                    }
                }
            }
            out.write_str(")")
        }
        NodeKind::CreateIndex(create) => {
            out.write_str("CREATE ")?;
            if create.unique {
                out.write_str("UNIQUE ")?;
            }
            out.write_str("INDEX ")?;
            if create.if_not_exists {
                out.write_str("IF NOT EXISTS ")?;
            }
            write_ident(out, &create.name)?;
            out.write_str(" ON ")?;
            write_ident(out, &create.table)?;
            out.write_str(" (")?;
            for (i, col) in create.columns.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_node(out, ast, col.expr)?;
                match col.direction {
                    Some(SortDirection::Asc) => out.write_str(" ASC")?,
                    Some(SortDirection::Desc) => out.write_str(" DESC")?,
                    None => {}
                }
            }
            out.write_str(")")?;
            if let Some(where_clause) = create.where_clause {
                out.write_str(" ")?;
                write_node(out, ast, where_clause)?;
            }
            Ok(())
        }
        NodeKind::CreateTrigger(create) => {
            out.write_str("CREATE TRIGGER ")?;
            write_ident(out, &create.name)?;
            match create.timing {
                Some(TriggerTiming::Before) => out.write_str(" BEFORE")?,
                Some(TriggerTiming::After) => out.write_str(" AFTER")?,
                Some(TriggerTiming::InsteadOf) => out.write_str(" INSTEAD OF")?,
                None => {}
            }
            match &create.event {
                TriggerEvent::Delete => out.write_str(" DELETE")?,
                TriggerEvent::Insert => out.write_str(" INSERT")?,
                TriggerEvent::Update(cols) => {
                    out.write_str(" UPDATE")?;
                    if !cols.is_empty() {
                        out.write_str(" OF ")?;
                        write_ident_list(out, cols)?;
                    }
                }
            }
            out.write_str(" ON ")?;
            write_ident(out, &create.table)?;
            if create.for_each_row {
                out.write_str(" FOR EACH ROW")?;
            }
            if let Some(when) = create.when {
                out.write_str(" WHEN ")?;
                write_node(out, ast, when)?;
            }
            out.write_str(" BEGIN ")?;
            for stmt in &create.body {
                write_node(out, ast, *stmt)?;
                out.write_str("; ")?;
            }
            out.write_str("END")
        }

        NodeKind::Cte {
            name,
            columns,
            body,
        } => {
            write_ident(out, name)?;
            if !columns.is_empty() {
                out.write_str(" (")?;
                write_ident_list(out, columns)?;
                out.write_str(")")?;
            }
            out.write_str(" AS (")?;
            write_node(out, ast, *body)?;
            out.write_str(")")
        }
        NodeKind::From(from) => {
            out.write_str("FROM ")?;
            write_node(out, ast, from.source)?;
            for join in &from.joins {
                out.write_str(" ")?;
                write_node(out, ast, *join)?;
            }
            Ok(())
        }
        NodeKind::Join {
            kind,
            natural,
            source,
            constraint,
        } => {
            if *natural {
                out.write_str("NATURAL ")?;
            }
            out.write_str(match kind {
                JoinKind::Cross => "CROSS JOIN ",
                JoinKind::Inner => "JOIN ",
                JoinKind::Left => "LEFT JOIN ",
                JoinKind::Right => "RIGHT JOIN ",
                JoinKind::Full => "FULL JOIN ",
            })?;
            write_node(out, ast, *source)?;
            match constraint {
                Some(JoinConstraint::On(expr)) => {
                    out.write_str(" ON ")?;
                    write_node(out, ast, *expr)?;
                }
                Some(JoinConstraint::Using(cols)) => {
                    out.write_str(" USING (")?;
                    write_ident_list(out, cols)?;
                    out.write_str(")")?;
                }
                None => {}
            }
            Ok(())
        }
        NodeKind::Where(expr) => {
            out.write_str("WHERE ")?;
            write_node(out, ast, *expr)
        }
        NodeKind::GroupBy(exprs) => {
            out.write_str("GROUP BY ")?;
            write_comma_nodes(out, ast, exprs)
        }
        NodeKind::Having(expr) => {
            out.write_str("HAVING ")?;
            write_node(out, ast, *expr)
        }
        NodeKind::OrderBy(terms) => {
            out.write_str("ORDER BY ")?;
            write_ordering_terms(out, ast, terms)
        }
        NodeKind::Limit { limit, offset } => {
            out.write_str("LIMIT ")?;
            write_node(out, ast, *limit)?;
            if let Some(offset) = offset {
                out.write_str(" OFFSET ")?;
                write_node(out, ast, *offset)?;
            }
            Ok(())
        }
        NodeKind::WindowClause(windows) => {
            out.write_str("WINDOW ")?;
            for (i, window) in windows.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_ident(out, &window.name)?;
                out.write_str(" AS ")?;
                write_window_spec(out, ast, &window.spec)?;
            }
            Ok(())
        }

        NodeKind::StarResultColumn(table) => {
            if let Some(table) = table {
                write_ident(out, table)?;
                out.write_str(".")?;
            }
            out.write_str("*")
        }
        NodeKind::ExprResultColumn { expr, alias } => {
            write_node(out, ast, *expr)?;
            if let Some(alias) = alias {
                out.write_str(" AS ")?;
                write_ident(out, alias)?;
            }
            Ok(())
        }

        NodeKind::TableReference { name, alias } => {
            write_ident(out, name)?;
            if let Some(alias) = alias {
                out.write_str(" AS ")?;
                write_ident(out, alias)?;
            }
            Ok(())
        }
        NodeKind::SelectSource { select, alias } => {
            out.write_str("(")?;
            write_node(out, ast, *select)?;
            out.write_str(")")?;
            if let Some(alias) = alias {
                out.write_str(" AS ")?;
                write_ident(out, alias)?;
            }
            Ok(())
        }

        NodeKind::Literal(literal) => write_literal(out, literal),
        NodeKind::Reference(reference) => {
            if let Some(table) = &reference.table {
                write_ident(out, table)?;
                out.write_str(".")?;
            }
            write_ident(out, &reference.column)
        }
        NodeKind::Variable(variable) => match &variable.name {
            Some(name) => write!(out, ":{name}"),
            None => write!(out, "?{}", variable.index),
        },
        NodeKind::Binary { op, lhs, rhs } => {
            write_operand(out, ast, *lhs)?;
            write!(out, " {op} ")?;
            write_operand(out, ast, *rhs)
        }
        NodeKind::Unary { op, operand } => {
            match op {
                UnaryOp::Not => out.write_str("NOT ")?,
                UnaryOp::Negate => out.write_str("-")?,
                UnaryOp::Plus => out.write_str("+")?,
                UnaryOp::BitNot => out.write_str("~")?,
            }
            write_operand(out, ast, *operand)
        }
        NodeKind::Between {
            subject,
            low,
            high,
            not,
        } => {
            write_operand(out, ast, *subject)?;
            if *not {
                out.write_str(" NOT")?;
            }
            out.write_str(" BETWEEN ")?;
            write_operand(out, ast, *low)?;
            out.write_str(" AND ")?;
            write_operand(out, ast, *high)
        }
        NodeKind::InList { subject, items, not } => {
            write_operand(out, ast, *subject)?;
            if *not {
                out.write_str(" NOT")?;
            }
            out.write_str(" IN (")?;
            write_comma_nodes(out, ast, items)?;
            out.write_str(")")
        }
        NodeKind::InSubquery {
            subject,
            select,
            not,
        } => {
            write_operand(out, ast, *subject)?;
            if *not {
                out.write_str(" NOT")?;
            }
            out.write_str(" IN (")?;
            write_node(out, ast, *select)?;
            out.write_str(")")
        }
        NodeKind::InVariable {
            subject,
            variable,
            not,
        } => {
            write_operand(out, ast, *subject)?;
            if *not {
                out.write_str(" NOT")?;
            }
            out.write_str(" IN ")?;
            write_node(out, ast, *variable)
        }
        NodeKind::Like {
            subject,
            pattern,
            escape,
            op,
            not,
        } => {
            write_operand(out, ast, *subject)?;
            if *not {
                out.write_str(" NOT")?;
            }
            write!(out, " {op} ")?;
            write_operand(out, ast, *pattern)?;
            if let Some(escape) = escape {
                out.write_str(" ESCAPE ")?;
                write_node(out, ast, *escape)?;
            }
            Ok(())
        }
        NodeKind::Case {
            operand,
            whens,
            else_expr,
        } => {
            out.write_str("CASE")?;
            if let Some(operand) = operand {
                out.write_str(" ")?;
                write_node(out, ast, *operand)?;
            }
            for arm in whens {
                out.write_str(" WHEN ")?;
                write_node(out, ast, arm.when)?;
                out.write_str(" THEN ")?;
                write_node(out, ast, arm.then)?;
            }
            if let Some(else_expr) = else_expr {
                out.write_str(" ELSE ")?;
                write_node(out, ast, *else_expr)?;
            }
            out.write_str(" END")
        }
        NodeKind::FunctionCall {
            name,
            args,
            distinct,
        } => {
            out.write_str(name)?;
            out.write_str("(")?;
            if *distinct {
                out.write_str("DISTINCT ")?;
            }
            write_function_args(out, ast, args)?;
            out.write_str(")")
        }
        NodeKind::WindowFunction { name, args, window } => {
            out.write_str(name)?;
            out.write_str("(")?;
            write_function_args(out, ast, args)?;
            out.write_str(") OVER ")?;
            write_window_spec(out, ast, window)
        }
        NodeKind::Cast { expr, target } => {
            out.write_str("CAST(")?;
            write_node(out, ast, *expr)?;
            out.write_str(" AS ")?;
            write_type_name(out, target)?;
            out.write_str(")")
        }
        NodeKind::Collate { expr, collation } => {
            write_operand(out, ast, *expr)?;
            out.write_str(" COLLATE ")?;
            write_ident(out, collation)
        }
        NodeKind::IsNull { expr, not } => {
            write_operand(out, ast, *expr)?;
            out.write_str(if *not { " IS NOT NULL" } else { " IS NULL" })
        }
        NodeKind::Exists { select, not } => {
            if *not {
                out.write_str("NOT ")?;
            }
            out.write_str("EXISTS (")?;
            write_node(out, ast, *select)?;
            out.write_str(")")
        }
        NodeKind::Subquery(select) => {
            out.write_str("(")?;
            write_node(out, ast, *select)?;
            out.write_str(")")
        }
        NodeKind::Error => out.write_str("/* error */ NULL"),
    }
}

fn write_ident_list(out: &mut String, names: &[String]) -> fmt::Result {
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_ident(out, name)?;
    }
    Ok(())
}
