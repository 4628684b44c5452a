//! Node kinds and their payloads.
//!
//! A single tagged variant covers all node families — statements, clauses,
//! expressions, result columns, and table sources — with recursion expressed
//! through arena ids. Mutually recursive forms (expressions containing
//! subqueries containing expressions) cost nothing extra here.

use std::fmt;

use crate::NodeId;

// ---------------------------------------------------------------------------
// Operators and small enums
// ---------------------------------------------------------------------------

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // String
    Concat,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Is,
    IsNot,

    // Logical
    And,
    Or,

    // Bitwise
    BitAnd,
    BitOr,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOp {
    /// Whether the operator compares its operands (result is boolean and a
    /// bind variable on one side takes the other side's type).
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Is | Self::IsNot
        )
    }

    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    #[must_use]
    pub const fn is_bitwise(self) -> bool {
        matches!(
            self,
            Self::BitAnd | Self::BitOr | Self::ShiftLeft | Self::ShiftRight
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Concat => "||",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
            Self::And => "AND",
            Self::Or => "OR",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
        })
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Plus,
    BitNot,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Negate => "-",
            Self::Plus => "+",
            Self::BitNot => "~",
            Self::Not => "NOT",
        })
    }
}

/// Pattern-match operator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeOp {
    Like,
    Glob,
    Match,
    Regexp,
}

impl fmt::Display for LikeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Like => "LIKE",
            Self::Glob => "GLOB",
            Self::Match => "MATCH",
            Self::Regexp => "REGEXP",
        })
    }
}

/// Compound SELECT operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompoundOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

/// Sort direction in ordering terms and indexed columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// NULLS FIRST / NULLS LAST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullsOrder {
    First,
    Last,
}

/// Join kinds. A bare `,` in FROM is a cross join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Cross,
    Inner,
    Left,
    Right,
    Full,
}

// ---------------------------------------------------------------------------
// Literals and leaf payloads
// ---------------------------------------------------------------------------

/// A literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Real(f64),
    String(String),
    Blob(Vec<u8>),
    Null,
    True,
    False,
    CurrentTime,
    CurrentDate,
    CurrentTimestamp,
}

/// A column reference, possibly qualified with a table name or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub table: Option<String>,
    pub column: String,
}

impl Reference {
    #[must_use]
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    #[must_use]
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

/// A bind variable with its assigned one-based index.
///
/// The parser assigns indices: an explicit `?N` wins, otherwise the
/// variable takes one plus the highest index seen so far in the statement;
/// all occurrences of the same `:name`/`@name`/`$name` share an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub index: u32,
    pub name: Option<String>,
}

/// A declared type name as written in DDL, e.g. `VARCHAR(255)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub name: String,
    pub arg1: Option<String>,
    pub arg2: Option<String>,
}

// ---------------------------------------------------------------------------
// Window specifications
// ---------------------------------------------------------------------------

/// ORDER BY term (also used inside window specifications).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingTerm {
    pub expr: NodeId,
    pub direction: Option<SortDirection>,
    pub nulls: Option<NullsOrder>,
}

/// Window frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Rows,
    Range,
    Groups,
}

/// Window frame boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(NodeId),
    CurrentRow,
    Following(NodeId),
    UnboundedFollowing,
}

/// Window frame specification.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSpec {
    pub frame_type: FrameType,
    pub start: FrameBound,
    pub end: Option<FrameBound>,
}

/// A window specification: `OVER (PARTITION BY ... ORDER BY ... frame)` or
/// `OVER name`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    pub base: Option<String>,
    pub partition_by: Vec<NodeId>,
    pub order_by: Vec<OrderingTerm>,
    pub frame: Option<FrameSpec>,
}

/// A named window in the WINDOW clause.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedWindow {
    pub name: String,
    pub spec: WindowSpec,
}

// ---------------------------------------------------------------------------
// Clause payloads
// ---------------------------------------------------------------------------

/// The FROM clause: one leading source plus zero or more joins.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub source: NodeId,
    pub joins: Vec<NodeId>,
}

/// Join constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    On(NodeId),
    Using(Vec<String>),
}

/// Function argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArgs {
    /// `func(*)`, as in `count(*)`.
    Star,
    List(Vec<NodeId>),
}

impl FunctionArgs {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Star => 1,
            Self::List(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::List(items) if items.is_empty())
    }
}

/// One arm of a CASE expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseWhen {
    pub when: NodeId,
    pub then: NodeId,
}

// ---------------------------------------------------------------------------
// Statement payloads
// ---------------------------------------------------------------------------

/// A SELECT statement (one core; compound siblings are separate Select
/// nodes linked through `compounds`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub recursive: bool,
    /// CTE nodes, in declaration order.
    pub ctes: Vec<NodeId>,
    pub distinct: bool,
    /// Result column nodes.
    pub columns: Vec<NodeId>,
    pub from: Option<NodeId>,
    pub where_clause: Option<NodeId>,
    pub group_by: Option<NodeId>,
    pub having: Option<NodeId>,
    pub windows: Option<NodeId>,
    pub order_by: Option<NodeId>,
    pub limit: Option<NodeId>,
    pub compounds: Vec<(CompoundOp, NodeId)>,
}

/// Source of rows for INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<NodeId>>),
    Select(NodeId),
    DefaultValues,
}

/// An INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub recursive: bool,
    pub ctes: Vec<NodeId>,
    /// Target table reference node.
    pub table: NodeId,
    /// Explicit column name list, empty when omitted.
    pub columns: Vec<String>,
    pub source: InsertSource,
    pub returning: Vec<NodeId>,
}

/// One `SET column = value` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Reference node naming the target column.
    pub column: NodeId,
    pub value: NodeId,
}

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub recursive: bool,
    pub ctes: Vec<NodeId>,
    pub table: NodeId,
    pub assignments: Vec<Assignment>,
    pub from: Option<NodeId>,
    pub where_clause: Option<NodeId>,
    pub returning: Vec<NodeId>,
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub recursive: bool,
    pub ctes: Vec<NodeId>,
    pub table: NodeId,
    pub where_clause: Option<NodeId>,
    pub returning: Vec<NodeId>,
}

/// A column constraint in CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraintDef {
    PrimaryKey {
        direction: Option<SortDirection>,
        autoincrement: bool,
    },
    NotNull,
    Unique,
    Default(NodeId),
    Check(NodeId),
    Collate(String),
    /// Parsed for fidelity; foreign keys are not wired into resolution.
    References {
        table: String,
        columns: Vec<String>,
    },
}

/// A column definition in CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub type_name: Option<TypeName>,
    pub constraints: Vec<ColumnConstraintDef>,
}

/// A table-level constraint in CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraintDef {
    PrimaryKey(Vec<String>),
    Unique(Vec<String>),
    Check(NodeId),
    ForeignKey {
        columns: Vec<String>,
        table: String,
        references: Vec<String>,
    },
}

/// A CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub name: String,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDefinition>,
    pub constraints: Vec<TableConstraintDef>,
}

/// An indexed column in CREATE INDEX.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedColumn {
    pub expr: NodeId,
    pub direction: Option<SortDirection>,
}

/// A CREATE INDEX statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStatement {
    pub name: String,
    pub unique: bool,
    pub if_not_exists: bool,
    pub table: String,
    pub columns: Vec<IndexedColumn>,
    pub where_clause: Option<NodeId>,
}

/// Trigger firing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

/// Trigger firing event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TriggerEvent {
    Delete,
    Insert,
    /// `UPDATE` or `UPDATE OF col, ...`.
    Update(Vec<String>),
}

/// A CREATE TRIGGER statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTriggerStatement {
    pub name: String,
    pub timing: Option<TriggerTiming>,
    pub event: TriggerEvent,
    pub table: String,
    pub for_each_row: bool,
    pub when: Option<NodeId>,
    /// Body statement nodes, in order.
    pub body: Vec<NodeId>,
}

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// The tagged variant covering every node family.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // === Statements ===
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateTable(CreateTableStatement),
    CreateIndex(CreateIndexStatement),
    CreateTrigger(CreateTriggerStatement),

    // === Clauses ===
    /// A common table expression: `name [(cols)] AS (select)`.
    Cte {
        name: String,
        columns: Vec<String>,
        body: NodeId,
    },
    From(FromClause),
    Join {
        kind: JoinKind,
        natural: bool,
        source: NodeId,
        constraint: Option<JoinConstraint>,
    },
    Where(NodeId),
    GroupBy(Vec<NodeId>),
    Having(NodeId),
    OrderBy(Vec<OrderingTerm>),
    Limit {
        limit: NodeId,
        offset: Option<NodeId>,
    },
    WindowClause(Vec<NamedWindow>),

    // === Result columns ===
    /// `*` or `table.*`.
    StarResultColumn(Option<String>),
    ExprResultColumn {
        expr: NodeId,
        alias: Option<String>,
    },

    // === Table sources ===
    TableReference {
        name: String,
        alias: Option<String>,
    },
    /// A sub-select in FROM: `(SELECT ...) [AS alias]`.
    SelectSource {
        select: NodeId,
        alias: Option<String>,
    },

    // === Expressions ===
    Literal(Literal),
    Reference(Reference),
    Variable(Variable),
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Between {
        subject: NodeId,
        low: NodeId,
        high: NodeId,
        not: bool,
    },
    InList {
        subject: NodeId,
        items: Vec<NodeId>,
        not: bool,
    },
    InSubquery {
        subject: NodeId,
        select: NodeId,
        not: bool,
    },
    /// `expr IN ?` — the variable expands into a list at bind time.
    InVariable {
        subject: NodeId,
        variable: NodeId,
        not: bool,
    },
    Like {
        subject: NodeId,
        pattern: NodeId,
        escape: Option<NodeId>,
        op: LikeOp,
        not: bool,
    },
    Case {
        operand: Option<NodeId>,
        whens: Vec<CaseWhen>,
        else_expr: Option<NodeId>,
    },
    FunctionCall {
        name: String,
        args: FunctionArgs,
        distinct: bool,
    },
    WindowFunction {
        name: String,
        args: FunctionArgs,
        window: WindowSpec,
    },
    Cast {
        expr: NodeId,
        target: TypeName,
    },
    Collate {
        expr: NodeId,
        collation: String,
    },
    IsNull {
        expr: NodeId,
        not: bool,
    },
    Exists {
        select: NodeId,
        not: bool,
    },
    /// A scalar subquery `(SELECT ...)` in expression position.
    Subquery(NodeId),
    /// Placeholder emitted during parse recovery.
    Error,
}

impl NodeKind {
    /// Whether this node is a statement.
    #[must_use]
    pub const fn is_statement(&self) -> bool {
        matches!(
            self,
            Self::Select(_)
                | Self::Insert(_)
                | Self::Update(_)
                | Self::Delete(_)
                | Self::CreateTable(_)
                | Self::CreateIndex(_)
                | Self::CreateTrigger(_)
        )
    }

    /// Whether this statement reads or writes tabular data and therefore
    /// goes through column, reference, and type resolution.
    #[must_use]
    pub const fn is_crud(&self) -> bool {
        matches!(
            self,
            Self::Select(_) | Self::Insert(_) | Self::Update(_) | Self::Delete(_)
        )
    }

    /// Whether this node can carry a resolved type.
    #[must_use]
    pub const fn is_typeable(&self) -> bool {
        matches!(
            self,
            Self::Literal(_)
                | Self::Reference(_)
                | Self::Variable(_)
                | Self::Binary { .. }
                | Self::Unary { .. }
                | Self::Between { .. }
                | Self::InList { .. }
                | Self::InSubquery { .. }
                | Self::InVariable { .. }
                | Self::Like { .. }
                | Self::Case { .. }
                | Self::FunctionCall { .. }
                | Self::WindowFunction { .. }
                | Self::Cast { .. }
                | Self::Collate { .. }
                | Self::IsNull { .. }
                | Self::Exists { .. }
                | Self::Subquery(_)
                | Self::ExprResultColumn { .. }
                | Self::Error
        )
    }

    /// Push direct children, resolution-first (see [`crate::Ast::children`]).
    #[allow(clippy::too_many_lines)]
    pub(crate) fn push_children(&self, out: &mut Vec<NodeId>) {
        match self {
            Self::Select(select) => {
                out.extend(&select.ctes);
                out.extend(select.from);
                out.extend(&select.columns);
                out.extend(select.where_clause);
                out.extend(select.group_by);
                out.extend(select.having);
                out.extend(select.windows);
                out.extend(select.order_by);
                out.extend(select.limit);
                out.extend(select.compounds.iter().map(|&(_, id)| id));
            }
            Self::Insert(insert) => {
                out.extend(&insert.ctes);
                out.push(insert.table);
                match &insert.source {
                    InsertSource::Values(rows) => {
                        for row in rows {
                            out.extend(row);
                        }
                    }
                    InsertSource::Select(select) => out.push(*select),
                    InsertSource::DefaultValues => {}
                }
                out.extend(&insert.returning);
            }
            Self::Update(update) => {
                out.extend(&update.ctes);
                out.push(update.table);
                out.extend(update.from);
                for assignment in &update.assignments {
                    out.push(assignment.column);
                    out.push(assignment.value);
                }
                out.extend(update.where_clause);
                out.extend(&update.returning);
            }
            Self::Delete(delete) => {
                out.extend(&delete.ctes);
                out.push(delete.table);
                out.extend(delete.where_clause);
                out.extend(&delete.returning);
            }
            Self::CreateTable(create) => {
                for col in &create.columns {
                    for constraint in &col.constraints {
                        match constraint {
                            ColumnConstraintDef::Default(e) | ColumnConstraintDef::Check(e) => {
                                out.push(*e);
                            }
                            _ => {}
                        }
                    }
                }
                for constraint in &create.constraints {
                    if let TableConstraintDef::Check(e) = constraint {
                        out.push(*e);
                    }
                }
            }
            Self::CreateIndex(create) => {
                out.extend(create.columns.iter().map(|c| c.expr));
                out.extend(create.where_clause);
            }
            Self::CreateTrigger(create) => {
                out.extend(create.when);
                out.extend(&create.body);
            }

            Self::Cte { body, .. } => out.push(*body),
            Self::From(from) => {
                out.push(from.source);
                out.extend(&from.joins);
            }
            Self::Join {
                source, constraint, ..
            } => {
                out.push(*source);
                if let Some(JoinConstraint::On(expr)) = constraint {
                    out.push(*expr);
                }
            }
            Self::Where(expr) | Self::Having(expr) => out.push(*expr),
            Self::GroupBy(exprs) => out.extend(exprs),
            Self::OrderBy(terms) => out.extend(terms.iter().map(|t| t.expr)),
            Self::Limit { limit, offset } => {
                out.push(*limit);
                out.extend(*offset);
            }
            Self::WindowClause(windows) => {
                for window in windows {
                    push_window_spec(&window.spec, out);
                }
            }

            Self::StarResultColumn(_) => {}
            Self::ExprResultColumn { expr, .. } => out.push(*expr),

            Self::TableReference { .. } => {}
            Self::SelectSource { select, .. } => out.push(*select),

            Self::Literal(_) | Self::Reference(_) | Self::Variable(_) | Self::Error => {}
            Self::Binary { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            Self::Unary { operand, .. } => out.push(*operand),
            Self::Between {
                subject, low, high, ..
            } => {
                out.push(*subject);
                out.push(*low);
                out.push(*high);
            }
            Self::InList { subject, items, .. } => {
                out.push(*subject);
                out.extend(items);
            }
            Self::InSubquery {
                subject, select, ..
            } => {
                out.push(*subject);
                out.push(*select);
            }
            Self::InVariable {
                subject, variable, ..
            } => {
                out.push(*subject);
                out.push(*variable);
            }
            Self::Like {
                subject,
                pattern,
                escape,
                ..
            } => {
                out.push(*subject);
                out.push(*pattern);
                out.extend(*escape);
            }
            Self::Case {
                operand,
                whens,
                else_expr,
            } => {
                out.extend(*operand);
                for arm in whens {
                    out.push(arm.when);
                    out.push(arm.then);
                }
                out.extend(*else_expr);
            }
            Self::FunctionCall { args, .. } => {
                if let FunctionArgs::List(items) = args {
                    out.extend(items);
                }
            }
            Self::WindowFunction { args, window, .. } => {
                if let FunctionArgs::List(items) = args {
                    out.extend(items);
                }
                push_window_spec(window, out);
            }
            Self::Cast { expr, .. } | Self::Collate { expr, .. } | Self::IsNull { expr, .. } => {
                out.push(*expr);
            }
            Self::Exists { select, .. } => out.push(*select),
            Self::Subquery(select) => out.push(*select),
        }
    }
}

fn push_window_spec(spec: &WindowSpec, out: &mut Vec<NodeId>) {
    out.extend(&spec.partition_by);
    out.extend(spec.order_by.iter().map(|t| t.expr));
    if let Some(frame) = &spec.frame {
        for bound in std::iter::once(&frame.start).chain(frame.end.as_ref()) {
            if let FrameBound::Preceding(e) | FrameBound::Following(e) = bound {
                out.push(*e);
            }
        }
    }
}
