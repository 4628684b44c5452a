//! Shared type models for the squill SQL front-end.
//!
//! Two families live here. The *registration model* (`Table`, `Column`,
//! `ColumnType`, `ColumnFeature`) is produced by an external collaborator —
//! typically a parser over a host-language table DSL — and handed to the
//! engine via `register_table`. The *inference model* (`BaseType`,
//! `TypeHint`, `ResolvedType`, `ResolveResult`) is what the analyzer
//! computes for expressions, result columns, and bind variables.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Registration model
// ---------------------------------------------------------------------------

/// Declared type of a table column.
///
/// `DateTime` and `Boolean` are logical refinements: at the SQL level they
/// are carried as `Integer` and surface as type hints on resolved types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    Text,
    Integer,
    Real,
    Blob,
    DateTime,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "BOOLEAN",
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
            Self::DateTime => "DATETIME",
        })
    }
}

/// A feature attached to a column declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnFeature {
    AutoIncrement,
    PrimaryKey,
    UniqueKey,
    NotNull,
    /// Length bounds on a text column.
    LimitingTextLength {
        min: Option<u32>,
        max: Option<u32>,
    },
}

/// A single column of a registered table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, in original case.
    pub name: String,
    /// Declared type.
    pub ty: ColumnType,
    /// Whether NULL is an admissible value.
    pub nullable: bool,
    /// Declaration features.
    pub features: Vec<ColumnFeature>,
}

impl Column {
    /// Create a column with no features.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable,
            features: Vec::new(),
        }
    }

    /// Attach a feature, builder-style.
    #[must_use]
    pub fn with_feature(mut self, feature: ColumnFeature) -> Self {
        self.features.push(feature);
        self
    }

    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.features.contains(&ColumnFeature::PrimaryKey)
    }

    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.features.contains(&ColumnFeature::AutoIncrement)
    }

    /// The resolved type this column contributes to expressions that read
    /// it. `DateTime` columns surface as integer with an `IsDateTime` hint;
    /// `Boolean` columns carry `IsBoolean`.
    #[must_use]
    pub fn resolved_type(&self) -> ResolvedType {
        let (base, hint) = match self.ty {
            ColumnType::Boolean => (BaseType::Boolean, Some(TypeHint::IsBoolean)),
            ColumnType::Text => (BaseType::Text, None),
            ColumnType::Integer => (BaseType::Integer, None),
            ColumnType::Real => (BaseType::Real, None),
            ColumnType::Blob => (BaseType::Blob, None),
            ColumnType::DateTime => (BaseType::Integer, Some(TypeHint::IsDateTime)),
        };
        ResolvedType {
            base,
            nullable: self.nullable,
            is_array: false,
            hint,
        }
    }
}

/// A table registered with the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name, in original case.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Raw table-level constraint text, opaque to the front-end.
    pub constraints: Vec<String>,
}

impl Table {
    /// Create a table with the given columns and no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            constraints: Vec::new(),
        }
    }

    /// Find a column by name (ASCII-case-insensitive).
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.find_column(name).is_some()
    }
}

// ---------------------------------------------------------------------------
// Inference model
// ---------------------------------------------------------------------------

/// Base type of a resolved expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    Integer,
    Text,
    Real,
    Blob,
    Boolean,
    Null,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Real => "real",
            Self::Blob => "blob",
            Self::Boolean => "boolean",
            Self::Null => "null",
        })
    }
}

/// A refinement riding alongside a base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeHint {
    /// An integer that is really a point in time.
    IsDateTime,
    /// A value that is really a truth value.
    IsBoolean,
}

/// The type the analyzer assigns to an expression or bind variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedType {
    pub base: BaseType,
    /// Whether NULL is an admissible value.
    pub nullable: bool,
    /// True only for bind variables that expand into an `IN ?` list.
    pub is_array: bool,
    pub hint: Option<TypeHint>,
}

impl ResolvedType {
    /// A non-null scalar of the given base.
    #[must_use]
    pub const fn of(base: BaseType) -> Self {
        Self {
            base,
            nullable: false,
            is_array: false,
            hint: None,
        }
    }

    #[must_use]
    pub const fn integer() -> Self {
        Self::of(BaseType::Integer)
    }

    #[must_use]
    pub const fn text() -> Self {
        Self::of(BaseType::Text)
    }

    #[must_use]
    pub const fn real() -> Self {
        Self::of(BaseType::Real)
    }

    #[must_use]
    pub const fn blob() -> Self {
        Self::of(BaseType::Blob)
    }

    #[must_use]
    pub const fn boolean() -> Self {
        Self::of(BaseType::Boolean)
    }

    #[must_use]
    pub const fn null() -> Self {
        Self {
            base: BaseType::Null,
            nullable: true,
            is_array: false,
            hint: None,
        }
    }

    #[must_use]
    pub const fn with_hint(mut self, hint: TypeHint) -> Self {
        self.hint = Some(hint);
        self
    }

    #[must_use]
    pub const fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// The same type marked as an expanding `IN ?` list.
    #[must_use]
    pub const fn as_array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// The same type as a plain scalar.
    #[must_use]
    pub const fn as_scalar(mut self) -> Self {
        self.is_array = false;
        self
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        if self.is_array {
            f.write_str("[]")?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        if let Some(hint) = self.hint {
            write!(f, " ({hint:?})")?;
        }
        Ok(())
    }
}

/// Resolution status of a typeable node.
///
/// Inference is iterative: a node can be undetermined (`Unknown`), waiting
/// for an expectation imposed by its parent (`NeedsContext`, the initial
/// state of every bind variable), or settled (`Resolved`). The lattice only
/// moves upward — once `Resolved`, a node never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveResult {
    Unknown,
    NeedsContext,
    Resolved(ResolvedType),
}

impl ResolveResult {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The resolved type, if settled.
    #[must_use]
    pub const fn resolved(&self) -> Option<ResolvedType> {
        match self {
            Self::Resolved(ty) => Some(*ty),
            _ => None,
        }
    }
}
