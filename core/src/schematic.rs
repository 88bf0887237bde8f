use crate::block::{Block, BlockKind, Operation};
use crate::graph::Graph;
use serde::{Deserialize, Serialize};

/// The Static Analysis View of a Program.
///
/// `Schematic` is the graph representation exported from a built [`Graph`].
/// It is used for visualization and documentation; it never drives execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schematic {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Schematic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Walk the graph in block order. Decision edges become `Branch`,
    /// fan-out edges `Fork`, everything else `Linear`.
    pub fn from_graph(name: impl Into<String>, graph: &Graph) -> Self {
        let mut schematic = Self::new(name);
        for block in graph.blocks() {
            schematic.nodes.push(Node {
                id: block.id().to_string(),
                kind: block.kind(),
                code: block.kind().code(),
                label: node_label(block),
            });

            let decision = matches!(block.operation(), Operation::Decide { .. });
            for (position, target) in block.adjacents().iter().enumerate() {
                let kind = if decision {
                    EdgeType::Branch(position == 0)
                } else if block.fans_out() {
                    EdgeType::Fork
                } else {
                    EdgeType::Linear
                };
                schematic.edges.push(Edge {
                    from: block.id().to_string(),
                    to: target.clone(),
                    label: kind.label(),
                    kind,
                });
            }
        }
        schematic
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.from == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: BlockKind,
    pub code: u16,
    pub label: String, // e.g. "x = 1+1", "n<3 ?"
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeType,
    pub label: Option<String>, // e.g. "true", "false"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Single forward edge.
    Linear,
    /// One of several edges that each start a continuation.
    Fork,
    /// Decision edge taken when the condition equals the flag.
    Branch(bool),
}

impl EdgeType {
    fn label(self) -> Option<String> {
        match self {
            EdgeType::Branch(flag) => Some(flag.to_string()),
            EdgeType::Linear | EdgeType::Fork => None,
        }
    }
}

fn node_label(block: &Block) -> String {
    match block.operation() {
        Operation::Start => "start".to_string(),
        Operation::Assign {
            name, expression, ..
        } => format!("{name} = {}", expression.source()),
        Operation::Decide { condition } => format!("{} ?", condition.source()),
    }
}
