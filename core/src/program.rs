//! Program descriptions as loaded from disk.
//!
//! The on-disk encoding is JSON:
//!
//! ```json
//! {
//!   "name": "count-to-three",
//!   "blocks": [
//!     { "id": "start", "kind": "start", "adjacents": ["init"] },
//!     { "id": "init", "kind": "decimal_assign",
//!       "payload": { "name": "n", "expression": "0" } }
//!   ]
//! }
//! ```

use crate::block::BlockDescription;
use crate::error::{GraphBuildError, ProgramError};
use crate::graph::{BuildOptions, Graph};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub blocks: Vec<BlockDescription>,
}

impl Program {
    pub fn new(name: impl Into<String>, blocks: Vec<BlockDescription>) -> Self {
        Self {
            name: name.into(),
            description: None,
            blocks,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ProgramError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProgramError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let program = Self::from_json_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            program = %program.name,
            blocks = program.blocks.len(),
            "program loaded"
        );
        Ok(program)
    }

    pub fn to_json_pretty(&self) -> Result<String, ProgramError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn build(&self) -> Result<Graph, GraphBuildError> {
        Graph::build(&self.blocks)
    }

    pub fn build_with(&self, options: BuildOptions) -> Result<Graph, GraphBuildError> {
        Graph::build_with(&self.blocks, options)
    }
}
