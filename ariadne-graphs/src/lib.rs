//! Tree-sitter based scope-graph extraction and resolution for 4 languages.
//!
//! Produces a per-file [`scope_graph::ScopeGraph`] (definitions, references,
//! imports, lexical scopes), resolves every reference project-wide through
//! the [`resolver`], and projects a [`call_graph::CallGraph`] with
//! entry-point detection.

pub mod call_graph;
pub mod languages;
pub mod module_resolver;
pub mod resolver;
pub mod scope_graph;
pub mod type_tracker;

use serde::{Deserialize, Serialize};

pub use languages::{LanguageRegistry, LanguageSupport};

/// Error type for the graph engine.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// Source file could not be parsed by tree-sitter.
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// Path of the file that failed to parse.
        path: String,
        /// Description of the parse failure.
        message: String,
    },

    /// The file's language is not supported by the graph engine.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Internal tree-sitter error (grammar registration, node access, etc.).
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    /// Filesystem I/O error reading source files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for `Result<T, GraphError>`.
pub type Result<T> = std::result::Result<T, GraphError>;

// ── Span types ─────────────────────────────────────────────────────

/// Byte and line/column span within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    /// Byte offset of the span start.
    pub start_byte: usize,
    /// Byte offset of the span end (exclusive).
    pub end_byte: usize,
    /// Zero-based starting row.
    pub start_row: usize,
    /// Zero-based starting column.
    pub start_col: usize,
    /// Zero-based ending row.
    pub end_row: usize,
    /// Zero-based ending column.
    pub end_col: usize,
}

impl TextRange {
    /// Whether `self` fully contains `inner`.
    pub fn contains(&self, inner: &TextRange) -> bool {
        self.start_byte <= inner.start_byte && inner.end_byte <= self.end_byte
    }

    /// Whether a zero-based (row, column) position falls inside this span.
    pub fn contains_point(&self, row: usize, col: usize) -> bool {
        let after_start =
            self.start_row < row || (self.start_row == row && self.start_col <= col);
        let before_end = row < self.end_row || (row == self.end_row && col <= self.end_col);
        after_start && before_end
    }

    /// Span size in bytes, for smallest-enclosing comparisons.
    pub fn len(&self) -> usize {
        self.end_byte.saturating_sub(self.start_byte)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<tree_sitter::Range> for TextRange {
    fn from(r: tree_sitter::Range) -> Self {
        Self {
            start_byte: r.start_byte,
            end_byte: r.end_byte,
            start_row: r.start_point.row,
            start_col: r.start_point.column,
            end_row: r.end_point.row,
            end_col: r.end_point.column,
        }
    }
}

/// Zero-based row/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl From<Point> for tree_sitter::Point {
    fn from(p: Point) -> Self {
        tree_sitter::Point::new(p.row, p.column)
    }
}

/// A source edit, as reported by an editor or watcher.
///
/// Byte offsets count UTF-8 bytes; positions are zero-based. Converts to
/// [`tree_sitter::InputEdit`] for incremental re-parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_position: Point,
    pub old_end_position: Point,
    pub new_end_position: Point,
}

impl From<&Edit> for tree_sitter::InputEdit {
    fn from(e: &Edit) -> Self {
        tree_sitter::InputEdit {
            start_byte: e.start_byte,
            old_end_byte: e.old_end_byte,
            new_end_byte: e.new_end_byte,
            start_position: e.start_position.into(),
            old_end_position: e.old_end_position.into(),
            new_end_position: e.new_end_position.into(),
        }
    }
}

// ── Symbol kind ────────────────────────────────────────────────────

/// Classification of a source-code definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    /// Free function (or arrow function bound to a name).
    Function,
    /// Method inside a class body or impl block.
    Method,
    /// Class constructor (`constructor`, `__init__`, or synthesized).
    Constructor,
    /// Class, struct, or trait implementation target.
    Class,
    /// Interface or trait declaration.
    Interface,
    /// Enum declaration.
    Enum,
    /// A member of an enum.
    EnumMember,
    /// Type alias.
    TypeAlias,
    /// Namespace (TS `namespace`, Rust `mod`).
    Namespace,
    /// Class field, interface member signature, or object property.
    Property,
    /// Function or method parameter.
    Parameter,
    /// Mutable local or module-level binding.
    Variable,
    /// `const`/`static` binding.
    Constant,
    /// The implicit module-level scope of a file, or a module import binding.
    Module,
}

impl SymbolKind {
    /// Canonical lowercase tag used inside [`scope_graph::SymbolId`] strings.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::EnumMember => "enum-member",
            Self::TypeAlias => "type-alias",
            Self::Namespace => "namespace",
            Self::Property => "property",
            Self::Parameter => "parameter",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Module => "module",
        }
    }

    /// Whether a definition of this kind can be the target of a call edge.
    pub fn is_callable(self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Constructor | Self::Module)
    }
}

// ── Access modifier ────────────────────────────────────────────────

/// Declared (or conventional) visibility of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Public,
    Protected,
    Private,
}
