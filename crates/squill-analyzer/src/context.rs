//! The analysis context: the one mutable state threaded through every
//! analyzer pass.
//!
//! The context exclusively owns the AST it wraps. All side tables key on
//! [`NodeId`], so passes communicate through the context instead of
//! mutating nodes in place (resolved types and resolved references never
//! touch the tree).

use std::collections::HashMap;

use squill_ast::{Ast, NodeId, Span};
use squill_error::AnalysisError;
use squill_types::{ResolveResult, Table};

use crate::scope::{ScopeId, ScopeTree, Symbol};

/// Result of analyzing one parsed statement.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// The analyzed tree (parents assigned), exclusively owned.
    pub ast: Ast,
    /// Root statement node.
    pub root: NodeId,
    /// The statement's source text.
    pub source: String,
    /// Accumulated findings; the pipeline never aborts while a tree exists.
    pub errors: Vec<AnalysisError>,
    /// Resolved types per typeable node.
    pub types: HashMap<NodeId, ResolveResult>,
    /// Resolved symbol per `Reference` node.
    pub resolved: HashMap<NodeId, Symbol>,
    /// All scopes of this analysis.
    pub scopes: ScopeTree,
    /// The root scope holding every registered table.
    pub root_scope: ScopeId,
    /// Statement/sub-select node → its local scope.
    pub statement_scopes: HashMap<NodeId, ScopeId>,
}

impl AnalysisContext {
    /// Build a context around a parsed tree. The root scope is populated
    /// with every registered table, bound under its own name.
    #[must_use]
    pub fn new(ast: Ast, root: NodeId, source: String, tables: &[Table]) -> Self {
        let mut scopes = ScopeTree::new();
        let root_scope = scopes.alloc(None);
        for table in tables {
            scopes.insert(root_scope, &table.name, Symbol::Table(table.clone()));
        }
        Self {
            ast,
            root,
            source,
            errors: Vec::new(),
            types: HashMap::new(),
            resolved: HashMap::new(),
            scopes,
            root_scope,
            statement_scopes: HashMap::new(),
        }
    }

    /// The resolution status of a node; `Unknown` when the resolver has not
    /// touched it.
    #[must_use]
    pub fn type_of(&self, node: NodeId) -> ResolveResult {
        self.types.get(&node).copied().unwrap_or(ResolveResult::Unknown)
    }

    /// The symbol a `Reference` node resolved to, if resolution succeeded.
    #[must_use]
    pub fn resolved_symbol(&self, node: NodeId) -> Option<&Symbol> {
        self.resolved.get(&node)
    }

    #[must_use]
    pub fn has_critical_errors(&self) -> bool {
        self.errors.iter().any(AnalysisError::is_critical)
    }

    pub fn error_critical(&mut self, message: impl Into<String>, span: Span, node: Option<NodeId>) {
        self.errors.push(AnalysisError::critical(message, span, node));
    }

    pub fn error_warning(&mut self, message: impl Into<String>, span: Span, node: Option<NodeId>) {
        self.errors.push(AnalysisError::warning(message, span, node));
    }

    /// The scope governing `node`: the nearest enclosing statement's scope,
    /// falling back to the root scope.
    #[must_use]
    pub fn scope_for(&self, node: NodeId) -> ScopeId {
        if let Some(&scope) = self.statement_scopes.get(&node) {
            return scope;
        }
        for ancestor in self.ast.ancestors(node) {
            if let Some(&scope) = self.statement_scopes.get(&ancestor) {
                return scope;
            }
        }
        self.root_scope
    }

    /// The statement scope's FROM-source symbol for the analysis target of
    /// an INSERT/UPDATE/DELETE (its first registered source).
    #[must_use]
    pub fn first_source_of(&self, stmt: NodeId) -> Option<&(String, Symbol)> {
        let scope = self.statement_scopes.get(&stmt)?;
        self.scopes.scope(*scope).sources.first()
    }
}
