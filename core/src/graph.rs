//! Graph - The Immutable Block Arena
//!
//! The graph owns every block by value in an indexed store and validates the
//! structural invariants once, at build time:
//! - block ids are unique,
//! - exactly one block is a start block,
//! - every adjacency resolves to a block in the graph.
//!
//! After `build` succeeds nothing can mutate it; executors only borrow it.

use crate::block::{Block, BlockDescription, BlockKind};
use crate::error::{GraphBuildError, GraphError};
use crate::outcome::BlockId;
use crate::schematic::Schematic;
use std::collections::HashMap;

/// Knobs applied while building a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Accept blocks that forward to several blocks at once. When false such
    /// graphs are rejected with `ConcurrentBranchingUnsupported`.
    pub allow_fan_out: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            allow_fan_out: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    blocks: Vec<Block>,
    index: HashMap<BlockId, usize>,
    start: usize,
}

impl Graph {
    /// Build a graph with default options.
    pub fn build(descriptions: &[BlockDescription]) -> Result<Self, GraphBuildError> {
        Self::build_with(descriptions, BuildOptions::default())
    }

    /// Build a graph, checking duplicate ids, payloads, the start block,
    /// dangling adjacency and (optionally) fan-out, in that order.
    pub fn build_with(
        descriptions: &[BlockDescription],
        options: BuildOptions,
    ) -> Result<Self, GraphBuildError> {
        let mut index = HashMap::with_capacity(descriptions.len());
        for (position, description) in descriptions.iter().enumerate() {
            if index.insert(description.id.clone(), position).is_some() {
                return Err(GraphBuildError::DuplicateBlockId(description.id.clone()));
            }
        }

        let blocks = descriptions
            .iter()
            .map(Block::construct)
            .collect::<Result<Vec<_>, _>>()?;

        let starts: Vec<usize> = blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| block.kind() == BlockKind::Start)
            .map(|(position, _)| position)
            .collect();
        let start = match starts.as_slice() {
            [only] => *only,
            _ => {
                return Err(GraphBuildError::MissingStartBlock {
                    found: starts.len(),
                });
            }
        };

        for block in &blocks {
            if let Some(target) = block.adjacents().iter().find(|t| !index.contains_key(*t)) {
                return Err(GraphBuildError::DanglingAdjacency {
                    from: block.id().to_string(),
                    to: target.clone(),
                });
            }
        }

        if !options.allow_fan_out {
            if let Some(block) = blocks.iter().find(|block| block.fans_out()) {
                return Err(GraphBuildError::ConcurrentBranchingUnsupported {
                    block: block.id().to_string(),
                });
            }
        }

        tracing::debug!(
            blocks = blocks.len(),
            start = %blocks[start].id(),
            "graph built"
        );

        Ok(Self {
            blocks,
            index,
            start,
        })
    }

    /// Read-only access by id.
    pub fn lookup(&self, id: &str) -> Result<&Block, GraphError> {
        self.get(id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.index.get(id).map(|&position| &self.blocks[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The unique start block.
    pub fn start(&self) -> &Block {
        &self.blocks[self.start]
    }

    /// Blocks in description order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false for a built graph, which holds at least its start block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// True when some block forwards to several blocks at once.
    pub fn has_fan_out(&self) -> bool {
        self.blocks.iter().any(Block::fans_out)
    }

    /// Export the static view used by visualization tooling.
    pub fn schematic(&self, name: impl Into<String>) -> Schematic {
        Schematic::from_graph(name, self)
    }

    /// Number of blocks of each kind, in kind-code order.
    pub fn kind_counts(&self) -> Vec<(BlockKind, usize)> {
        let mut counts: Vec<(BlockKind, usize)> = Vec::new();
        for block in &self.blocks {
            match counts.iter_mut().find(|(kind, _)| *kind == block.kind()) {
                Some((_, count)) => *count += 1,
                None => counts.push((block.kind(), 1)),
            }
        }
        counts.sort_by_key(|(kind, _)| kind.code());
        counts
    }
}
