pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod trace;

pub mod prelude {
    pub use crate::config::ExecutorConfig;
    pub use crate::engine::Engine;
    pub use crate::error::{BlockFailure, RunError};
    pub use crate::executor::{ContinuationId, ContinuationStatus, Executor, RunReport, StepRecord};
    pub use crate::trace::{Trace, TraceEvent};
}

pub use config::{ConfigError, ExecutorConfig};
pub use engine::Engine;
pub use error::{BlockFailure, RunError};
pub use executor::{
    ContinuationId, ContinuationOutcome, ContinuationStatus, Executor, RunReport, StepRecord,
};
pub use trace::{Trace, TraceEvent};
