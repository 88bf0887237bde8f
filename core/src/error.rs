//! Error types shared across the block graph model.

use crate::block::BlockKind;
use crate::value::ValueType;
use serde::Serialize;
use thiserror::Error;

/// Why an expression was rejected or could not be evaluated.
///
/// The first four variants are the sandbox rejection classes; they are
/// reported before any evaluation takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationError {
    #[error("forbidden character {character:?} at position {position}")]
    ForbiddenCharacter { character: char, position: usize },

    #[error("call syntax is not allowed (parenthesis at position {position})")]
    ForbiddenCall { position: usize },

    #[error("attribute access is not allowed ('.' at position {position})")]
    ForbiddenAttributeAccess { position: usize },

    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("expression is empty")]
    Empty,

    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("numeric literal `{0}` is out of range")]
    NumberOutOfRange(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,
}

impl EvaluationError {
    /// True for the sandbox rejection classes.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EvaluationError::ForbiddenCharacter { .. }
                | EvaluationError::ForbiddenCall { .. }
                | EvaluationError::ForbiddenAttributeAccess { .. }
                | EvaluationError::UnknownIdentifier(_)
        )
    }
}

/// Assignment to a name already bound with a different type.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("variable `{name}` is bound to {bound}, cannot assign {attempted}")]
pub struct TypeConflictError {
    pub name: String,
    pub bound: ValueType,
    pub attempted: ValueType,
}

/// What was wrong with a block payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadFault {
    #[error("malformed payload: {0}")]
    Shape(String),

    #[error("`{0}` is not a valid variable name")]
    VariableName(String),

    #[error("expected {expected} adjacent block(s), found {found}")]
    AdjacencyCount { expected: usize, found: usize },

    #[error("rejected expression `{expression}`: {source}")]
    Expression {
        expression: String,
        #[source]
        source: EvaluationError,
    },
}

/// A block payload that does not match the shape its kind requires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid payload for {kind} block `{block}`: {fault}")]
pub struct InvalidPayloadError {
    pub block: String,
    pub kind: BlockKind,
    pub fault: PayloadFault,
}

/// A structured failure produced by a block's `signal`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockFault {
    #[error("evaluation of `{expression}` failed: {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: EvaluationError,
    },

    #[error(transparent)]
    TypeConflict(#[from] TypeConflictError),
}

impl BlockFault {
    /// Short machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            BlockFault::Evaluation { .. } => "evaluation",
            BlockFault::TypeConflict(_) => "type_conflict",
        }
    }
}

/// Structural problems found while building a graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphBuildError {
    #[error("duplicate block id `{0}`")]
    DuplicateBlockId(String),

    #[error("expected exactly one start block, found {found}")]
    MissingStartBlock { found: usize },

    #[error("block `{from}` points to unknown block `{to}`")]
    DanglingAdjacency { from: String, to: String },

    #[error("block `{block}` fans out to several blocks but concurrent branching is disabled")]
    ConcurrentBranchingUnsupported { block: String },

    #[error(transparent)]
    InvalidPayload(#[from] InvalidPayloadError),
}

/// Read access failures on a built graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("block `{0}` not found")]
    NotFound(String),
}

/// Failures loading a program description.
#[derive(Error, Debug)]
pub enum ProgramError {
    #[error("failed to read program file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse program description: {0}")]
    Parse(#[from] serde_json::Error),
}
