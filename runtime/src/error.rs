use crate::executor::ContinuationId;
use blockflow_core::{BlockFault, BlockId, Environment};
use serde::Serialize;
use thiserror::Error;

/// A continuation that ended because a block faulted.
///
/// Carries everything needed to report the failure: which block, how it was
/// reached and the environment as it stood when the block faulted.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("block `{block}` failed in continuation {continuation}: {fault}")]
pub struct BlockFailure {
    pub continuation: ContinuationId,
    pub block: BlockId,
    pub previous: Option<BlockId>,
    #[source]
    pub fault: BlockFault,
    pub environment: Environment,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    #[error(transparent)]
    BlockFailed(#[from] BlockFailure),

    #[error(
        "step budget of {budget} exhausted before entering block `{block}` (continuation {continuation})"
    )]
    StepBudgetExceeded {
        budget: u64,
        block: BlockId,
        continuation: ContinuationId,
        /// Environment of the halted continuation.
        environment: Environment,
    },

    #[error("block `{block}` fans out but fan-out is disabled (continuation {continuation})")]
    ConcurrentBranchingUnsupported {
        block: BlockId,
        continuation: ContinuationId,
        environment: Environment,
    },

    #[error("fan-out would exceed the limit of {limit} continuations")]
    ContinuationLimitExceeded { limit: usize },

    #[error("block `{0}` is not part of the graph")]
    MissingBlock(BlockId),
}

impl RunError {
    /// Short machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::BlockFailed(failure) => failure.fault.kind(),
            RunError::StepBudgetExceeded { .. } => "step_budget_exceeded",
            RunError::ConcurrentBranchingUnsupported { .. } => "concurrent_branching_unsupported",
            RunError::ContinuationLimitExceeded { .. } => "continuation_limit_exceeded",
            RunError::MissingBlock(_) => "missing_block",
        }
    }

    /// Environment of the continuation the error stopped, when there is one.
    pub fn environment(&self) -> Option<&Environment> {
        match self {
            RunError::BlockFailed(failure) => Some(&failure.environment),
            RunError::StepBudgetExceeded { environment, .. }
            | RunError::ConcurrentBranchingUnsupported { environment, .. } => Some(environment),
            RunError::ContinuationLimitExceeded { .. } | RunError::MissingBlock(_) => None,
        }
    }

    /// True when the run was truncated by a limit rather than by a defect in
    /// the program; raising the limit and retrying may succeed.
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            RunError::StepBudgetExceeded { .. } | RunError::ContinuationLimitExceeded { .. }
        )
    }
}
