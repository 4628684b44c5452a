//! SQL abstract syntax tree for the squill front-end.
//!
//! The tree lives in an arena: every node is a [`Node`] stored in an
//! [`Ast`] and addressed by a stable [`NodeId`]. Child links are ids, and
//! each node carries a `parent` slot that a dedicated pre-order pass fills
//! after parsing. Storing the parent as an index (rather than an owning
//! back-reference) keeps the tree acyclic for the borrow checker while
//! letting the analyzer ascend from any node — the type resolver walks
//! *up* from bind variables to the expressions that constrain them.
//!
//! Analysis passes key their side tables (resolved types, resolved
//! references) on the same [`NodeId`]s.

mod display;
mod node;

use std::fmt;

pub use display::render;
pub use node::{
    Assignment, BinaryOp, CaseWhen, ColumnConstraintDef, ColumnDefinition, CompoundOp,
    CreateIndexStatement, CreateTableStatement, CreateTriggerStatement, DeleteStatement,
    FrameBound, FrameSpec, FrameType, FromClause, FunctionArgs, IndexedColumn, InsertSource,
    InsertStatement, JoinConstraint, JoinKind, LikeOp, Literal, NamedWindow, NodeKind,
    NullsOrder, OrderingTerm, Reference, SelectStatement, SortDirection, TableConstraintDef,
    TriggerEvent, TriggerTiming, TypeName, UnaryOp, UpdateStatement, Variable, WindowSpec,
};

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// A byte range into the original SQL source: offset plus length.
///
/// Every token and every AST node carries one so diagnostics can point back
/// at the exact source location.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset of the first character.
    pub offset: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    #[must_use]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// A zero-length placeholder span at position 0.
    pub const ZERO: Self = Self { offset: 0, len: 0 };

    /// Byte offset one past the last character.
    #[must_use]
    pub const fn end(self) -> u32 {
        self.offset + self.len
    }

    /// The smallest span covering both.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let offset = if self.offset < other.offset {
            self.offset
        } else {
            other.offset
        };
        let end = if self.end() > other.end() {
            self.end()
        } else {
            other.end()
        };
        Self {
            offset,
            len: end - offset,
        }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.offset, self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.offset, self.end())
    }
}

// ---------------------------------------------------------------------------
// Node identity
// ---------------------------------------------------------------------------

/// Stable index of a node within its [`Ast`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Node and arena
// ---------------------------------------------------------------------------

/// One AST node: a tagged kind, its source span, and its parent slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Filled by [`Ast::assign_parents`]; `None` on the root (and on nodes
    /// not yet visited by the pass).
    pub parent: Option<NodeId>,
}

/// The arena holding every node of one parsed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node and return its id.
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("AST arena exceeds u32 indices"));
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        id
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of a node, enumerated resolution-first: for a SELECT
    /// the FROM clause precedes the result columns, so a post-order walk
    /// types subquery outputs before the references that read them.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.kind(id).push_children(&mut out);
        out
    }

    /// Assign the `parent` slot on every node reachable from `root` with a
    /// single pre-order traversal. The root keeps `parent = None`.
    pub fn assign_parents(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for child in self.children(id) {
                self.nodes[child.index()].parent = Some(id);
                stack.push(child);
            }
        }
    }

    /// Pre-order traversal from `root`.
    pub fn walk(&self, root: NodeId, f: &mut impl FnMut(&Self, NodeId)) {
        f(self, root);
        for child in self.children(root) {
            self.walk(child, f);
        }
    }

    /// Nodes reachable from `root` in post-order (children before parents).
    #[must_use]
    pub fn post_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.post_order_into(root, &mut out);
        out
    }

    fn post_order_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(id) {
            self.post_order_into(child, out);
        }
        out.push(id);
    }

    /// Iterator over `id`'s ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&cur| self.parent(cur))
    }

    /// All node ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(|i| NodeId(i as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let a = Span::new(2, 3);
        let b = Span::new(7, 4);
        let m = a.merge(b);
        assert_eq!(m.offset, 2);
        assert_eq!(m.end(), 11);
        // Merge is symmetric.
        assert_eq!(b.merge(a), m);
    }

    #[test]
    fn test_span_end_and_empty() {
        assert_eq!(Span::new(5, 2).end(), 7);
        assert!(Span::ZERO.is_empty());
        assert!(!Span::new(0, 1).is_empty());
    }

    #[test]
    fn test_alloc_and_lookup() {
        let mut ast = Ast::new();
        let id = ast.alloc(NodeKind::Literal(Literal::Integer(1)), Span::new(0, 1));
        assert_eq!(ast.len(), 1);
        assert_eq!(ast.span(id), Span::new(0, 1));
        assert!(ast.parent(id).is_none());
        assert!(matches!(
            ast.kind(id),
            NodeKind::Literal(Literal::Integer(1))
        ));
    }

    #[test]
    fn test_assign_parents_on_expression() {
        let mut ast = Ast::new();
        let one = ast.alloc(NodeKind::Literal(Literal::Integer(1)), Span::new(0, 1));
        let two = ast.alloc(NodeKind::Literal(Literal::Integer(2)), Span::new(4, 1));
        let add = ast.alloc(
            NodeKind::Binary {
                op: BinaryOp::Add,
                lhs: one,
                rhs: two,
            },
            Span::new(0, 5),
        );
        ast.assign_parents(add);
        assert_eq!(ast.parent(one), Some(add));
        assert_eq!(ast.parent(two), Some(add));
        assert!(ast.parent(add).is_none());
    }

    #[test]
    fn test_post_order_children_first() {
        let mut ast = Ast::new();
        let one = ast.alloc(NodeKind::Literal(Literal::Integer(1)), Span::ZERO);
        let neg = ast.alloc(
            NodeKind::Unary {
                op: UnaryOp::Negate,
                operand: one,
            },
            Span::ZERO,
        );
        let order = ast.post_order(neg);
        assert_eq!(order, vec![one, neg]);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let mut ast = Ast::new();
        let lit = ast.alloc(NodeKind::Literal(Literal::Integer(1)), Span::ZERO);
        let neg = ast.alloc(
            NodeKind::Unary {
                op: UnaryOp::Negate,
                operand: lit,
            },
            Span::ZERO,
        );
        let outer = ast.alloc(
            NodeKind::Unary {
                op: UnaryOp::Not,
                operand: neg,
            },
            Span::ZERO,
        );
        ast.assign_parents(outer);
        let chain: Vec<_> = ast.ancestors(lit).collect();
        assert_eq!(chain, vec![neg, outer]);
    }
}
