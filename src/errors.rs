//! Errors
//!
//! Custom error types used throughout the `dtree` crate.
use thiserror::Error;

/// Errors raised by the node store, the aggregator and the executor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    /// The requested target attribute does not exist.
    #[error("Target attribute {0} is out of range for an attribute set of size {1}.")]
    InvalidTarget(usize, usize),
    /// An attribute id does not exist in the attribute set.
    #[error("Attribute {0} does not exist.")]
    UnknownAttribute(usize),
    /// A node was created at a cursor position that already holds one.
    #[error("The cursor already points to a node.")]
    CursorOccupied,
    /// The cursor points to an empty slot.
    #[error("The cursor does not point to a node.")]
    CursorEmpty,
    /// A branch operation was requested on a leaf.
    #[error("The current node is not a test node.")]
    NotATestNode,
    /// A leaf operation was requested on a test node.
    #[error("The current node is not a leaf.")]
    NotALeaf,
    /// Branch index outside the branch array of the node.
    #[error("Branch index {0} is out of range for a node with {1} branches.")]
    IndexOutOfRange(usize, usize),
    /// Moving up from the root.
    #[error("The cursor is already at the root.")]
    AtRoot,
    /// Aliasing a branch that already owns or aliases a child.
    #[error("Branch {0} already holds a child or an alias.")]
    BranchOccupied(usize),
    /// Aliasing would close a cycle.
    #[error("Aliasing branch {0} to branch {1} would create a cycle.")]
    AliasCycle(usize, usize),
    /// Aliasing a branch of a test on an ordered attribute.
    #[error("Branches of the ordered test on attribute {0} cannot be aliased.")]
    OrderedAlias(usize),
    /// Class id outside the target's value range.
    #[error("Class {0} is out of range for a target with {1} classes.")]
    ClassOutOfRange(usize, usize),
    /// A leaf setter for the wrong kind of target was used.
    #[error("The operation requires a {0} target.")]
    TargetMismatch(&'static str),
    /// Statistics were read before the aggregator ran on the latest structure.
    #[error("The tree statistics are stale, aggregate the tree first.")]
    NotAggregated,
    /// Memory for a node or its branches could not be reserved.
    #[error("Out of memory while allocating a node.")]
    OutOfMemory,
    /// Unable to write the tree to a sink.
    #[error("Unable to write tree: {0}")]
    UnableToWrite(String),
    /// Unable to read a file.
    #[error("Unable to read from a file {0}")]
    UnableToRead(String),
}

/// Reasons a parse can fail, the first group aborts the parse.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// Malformed grammar.
    #[error("unexpected {found}, expected {expected}")]
    Unexpected { expected: String, found: String },
    /// A number was expected.
    #[error("invalid number \"{0}\"")]
    InvalidNumber(String),
    /// End of input inside a quoted name.
    #[error("unterminated string")]
    UnterminatedString,
    /// The target named in the header does not exist.
    #[error("unknown target attribute \"{0}\"")]
    UnknownTarget(String),
    /// An ordered test without a cut, or a nominal test with one.
    #[error("attribute \"{0}\" {1}")]
    CutMismatch(String, &'static str),
    /// Nesting deeper than the parser allows.
    #[error("tree nesting exceeds {0} levels")]
    TooDeep(usize),
    /// The node store rejected an operation.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// Unknown test attribute (recoverable).
    #[error("unknown attribute \"{0}\"")]
    UnknownAttribute(String),
    /// Unknown value or class name (recoverable).
    #[error("unknown value \"{value}\" of attribute \"{attribute}\"")]
    UnknownValue { attribute: String, value: String },
    /// Value listed twice in one test node or leaf (recoverable).
    #[error("duplicate value \"{value}\" of attribute \"{attribute}\"")]
    DuplicateValue { attribute: String, value: String },
}

impl ParseErrorKind {
    /// Fatal errors abort the parse, the rest are skipped over.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ParseErrorKind::UnknownAttribute(_)
                | ParseErrorKind::UnknownValue { .. }
                | ParseErrorKind::DuplicateValue { .. }
        )
    }
}

/// A parse error with the position of the offending token.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{line}:{column}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: usize, column: usize) -> Self {
        ParseError { kind, line, column }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}
