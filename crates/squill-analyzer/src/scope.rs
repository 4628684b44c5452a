//! Naming scopes and symbols.
//!
//! Scopes live in their own arena and chain through `parent`; lookups are
//! ASCII-case-insensitive (names are normalized to lowercase at insertion
//! and lookup, the source text is never mutated) and return the innermost
//! binding, so inner statements shadow outer ones. Each scope additionally
//! keeps its `FROM` sources in syntactic order — unqualified column
//! resolution and star expansion both depend on that order.

use std::collections::HashMap;

use squill_ast::{Ast, NodeId, NodeKind};
use squill_types::{Column, Table};

/// Stable index of a scope within the [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// A named thing visible in a scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// A registered table, visible under its name or a FROM alias.
    Table(Table),
    /// A resolved column. This is what every resolvable `Reference`
    /// ultimately maps to.
    Column(ColumnBinding),
    /// A sub-select in FROM, exposing its result columns.
    Subquery { select: NodeId },
    /// A common table expression. `columns` is the declared column-name
    /// list (may be empty, in which case the body's output names apply).
    Cte {
        select: NodeId,
        columns: Vec<String>,
    },
}

/// The resolution of one column reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBinding {
    /// Output column name.
    pub name: String,
    /// The declared table column, when the reference lands on one.
    pub column: Option<Column>,
    /// The defining expression node for subquery/CTE outputs.
    pub origin: Option<NodeId>,
    /// The alias or table name that exposes the column.
    pub source: Option<String>,
}

/// One naming scope.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// Lowercased name → symbol.
    bindings: HashMap<String, Symbol>,
    /// FROM sources in syntactic order: (effective alias, symbol).
    pub sources: Vec<(String, Symbol)>,
}

/// Arena of scopes for one analysis.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).expect("scope arena exceeds u32"));
        self.scopes.push(Scope {
            parent,
            ..Scope::default()
        });
        id
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Bind `name` in `id`. Returns false when the name was already bound
    /// locally (the caller decides whether that is worth a diagnostic);
    /// the new binding wins either way.
    pub fn insert(&mut self, id: ScopeId, name: &str, symbol: Symbol) -> bool {
        self.scopes[id.0 as usize]
            .bindings
            .insert(name.to_ascii_lowercase(), symbol)
            .is_none()
    }

    /// Record a FROM source in syntactic order.
    pub fn add_source(&mut self, id: ScopeId, alias: &str, symbol: Symbol) {
        self.scopes[id.0 as usize]
            .sources
            .push((alias.to_owned(), symbol));
    }

    /// Innermost binding for `name`, walking the parent chain.
    #[must_use]
    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<&Symbol> {
        let key = name.to_ascii_lowercase();
        let mut cur = Some(id);
        while let Some(scope_id) = cur {
            let scope = self.scope(scope_id);
            if let Some(symbol) = scope.bindings.get(&key) {
                return Some(symbol);
            }
            cur = scope.parent;
        }
        None
    }

    /// Binding for `name` in `id` itself, ignoring parents.
    #[must_use]
    pub fn lookup_local(&self, id: ScopeId, name: &str) -> Option<&Symbol> {
        self.scope(id).bindings.get(&name.to_ascii_lowercase())
    }
}

// ---------------------------------------------------------------------------
// Output-column enumeration
// ---------------------------------------------------------------------------

/// The output columns a select exposes to an enclosing scope, in order.
///
/// `declared` (a CTE's column-name list) renames outputs positionally.
/// Works on expanded result lists; a star that has not been expanded yet
/// contributes nothing.
#[must_use]
pub fn select_output_bindings(
    ast: &Ast,
    select: NodeId,
    declared: Option<&[String]>,
    source: Option<&str>,
) -> Vec<ColumnBinding> {
    let NodeKind::Select(stmt) = ast.kind(select) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (i, &col) in stmt.columns.iter().enumerate() {
        let NodeKind::ExprResultColumn { expr, alias } = ast.kind(col) else {
            continue;
        };
        let name = declared
            .and_then(|names| names.get(i).cloned())
            .or_else(|| alias.clone())
            .or_else(|| match ast.kind(*expr) {
                NodeKind::Reference(reference) => Some(reference.column.clone()),
                _ => None,
            })
            .unwrap_or_else(|| format!("column{}", i + 1));
        out.push(ColumnBinding {
            name,
            column: None,
            origin: Some(*expr),
            source: source.map(ToOwned::to_owned),
        });
    }
    out
}

/// Look up `column` within a table-like symbol. `source` is the alias the
/// symbol is visible under.
#[must_use]
pub fn symbol_column(
    ast: &Ast,
    symbol: &Symbol,
    source: &str,
    column: &str,
) -> Option<ColumnBinding> {
    match symbol {
        Symbol::Table(table) => table.find_column(column).map(|c| ColumnBinding {
            name: c.name.clone(),
            column: Some(c.clone()),
            origin: None,
            source: Some(source.to_owned()),
        }),
        Symbol::Subquery { select } => select_output_bindings(ast, *select, None, Some(source))
            .into_iter()
            .find(|b| b.name.eq_ignore_ascii_case(column)),
        Symbol::Cte { select, columns } => {
            let declared = if columns.is_empty() {
                None
            } else {
                Some(columns.as_slice())
            };
            select_output_bindings(ast, *select, declared, Some(source))
                .into_iter()
                .find(|b| b.name.eq_ignore_ascii_case(column))
        }
        Symbol::Column(_) => None,
    }
}
