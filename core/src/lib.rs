pub mod block;
pub mod environment;
pub mod error;
pub mod eval;
pub mod graph;
pub mod outcome;
pub mod program;
pub mod schematic;
pub mod value;

pub mod prelude {
    pub use crate::block::{Block, BlockDescription, BlockKind, Operation};
    pub use crate::environment::{Bindings, Environment};
    pub use crate::error::{BlockFault, EvaluationError, GraphBuildError, TypeConflictError};
    pub use crate::eval::{Expression, evaluate};
    pub use crate::graph::{BuildOptions, Graph};
    pub use crate::outcome::{BlockId, SignalResult};
    pub use crate::program::Program;
    pub use crate::value::{Value, ValueType};
}

pub use block::{Block, BlockDescription, BlockKind, Operation};
pub use environment::{Bindings, Environment};
pub use error::{
    BlockFault, EvaluationError, GraphBuildError, GraphError, InvalidPayloadError, PayloadFault,
    ProgramError, TypeConflictError,
};
pub use eval::{Expression, evaluate};
pub use graph::{BuildOptions, Graph};
pub use outcome::{BlockId, SignalResult};
pub use program::Program;
pub use schematic::{Edge, EdgeType, Node, Schematic};
pub use value::{Value, ValueType};
pub use rust_decimal::Decimal;
