//! Block - One Node of the Program Graph
//!
//! A block holds an identity, its outgoing edges and a kind-specific
//! operation. Its single behavior is [`Block::signal`], which computes where
//! control goes next and may mutate the environment of the current run.
//!
//! # Philosophy
//! > Block = Operation + Edges. The block decides; the executor moves.
//!
//! Kinds form a closed set dispatched by `match`, so adding a kind is a
//! compile error everywhere it is not handled.

use crate::environment::Environment;
use crate::error::{BlockFault, InvalidPayloadError, PayloadFault};
use crate::eval::Expression;
use crate::graph::Graph;
use crate::outcome::{BlockId, SignalResult};
use crate::value::ValueType;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Tag selecting block behavior and payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Entry point; exactly one per graph.
    Start,
    /// Assigns a decimal variable from an expression.
    DecimalAssign,
    /// Assigns a bool variable from an expression.
    BoolAssign,
    /// Evaluates a condition and continues on exactly one of two edges.
    Decision,
}

impl BlockKind {
    /// Stable numeric code used in diagnostics (the base block is 100 and the
    /// variable-block family is 102).
    pub fn code(self) -> u16 {
        match self {
            BlockKind::Start => 101,
            BlockKind::DecimalAssign => 103,
            BlockKind::BoolAssign => 104,
            BlockKind::Decision => 105,
        }
    }

    /// The value type an assignment kind stores.
    pub fn assigned_type(self) -> Option<ValueType> {
        match self {
            BlockKind::DecimalAssign => Some(ValueType::Decimal),
            BlockKind::BoolAssign => Some(ValueType::Bool),
            BlockKind::Start | BlockKind::Decision => None,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Start => "start",
            BlockKind::DecimalAssign => "decimal_assign",
            BlockKind::BoolAssign => "bool_assign",
            BlockKind::Decision => "decision",
        };
        f.write_str(name)
    }
}

/// Abstract program description of one block, as produced by a loader.
///
/// The payload stays untyped JSON until [`Block::construct`] checks it
/// against the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDescription {
    pub id: BlockId,
    pub kind: BlockKind,
    #[serde(default)]
    pub adjacents: Vec<BlockId>,
    #[serde(default)]
    pub payload: JsonValue,
}

impl BlockDescription {
    pub fn new(id: impl Into<BlockId>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            adjacents: Vec::new(),
            payload: JsonValue::Null,
        }
    }

    pub fn start(id: impl Into<BlockId>) -> Self {
        Self::new(id, BlockKind::Start)
    }

    pub fn decimal_assign(
        id: impl Into<BlockId>,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self::assign(id, BlockKind::DecimalAssign, name, expression)
    }

    pub fn bool_assign(
        id: impl Into<BlockId>,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self::assign(id, BlockKind::BoolAssign, name, expression)
    }

    /// A decision block continuing on `when_true` or `when_false`.
    pub fn decision(
        id: impl Into<BlockId>,
        condition: impl Into<String>,
        when_true: impl Into<BlockId>,
        when_false: impl Into<BlockId>,
    ) -> Self {
        Self::new(id, BlockKind::Decision)
            .with_payload(serde_json::json!({ "condition": condition.into() }))
            .with_adjacents([when_true.into(), when_false.into()])
    }

    fn assign(
        id: impl Into<BlockId>,
        kind: BlockKind,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self::new(id, kind).with_payload(serde_json::json!({
            "name": name.into(),
            "expression": expression.into(),
        }))
    }

    pub fn with_adjacents<I, S>(mut self, adjacents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<BlockId>,
    {
        self.adjacents = adjacents.into_iter().map(Into::into).collect();
        self
    }

    /// Append one outgoing edge.
    pub fn to(mut self, target: impl Into<BlockId>) -> Self {
        self.adjacents.push(target.into());
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AssignPayload {
    #[serde(alias = "variable_name")]
    name: String,
    #[serde(alias = "variable_value")]
    expression: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DecisionPayload {
    condition: String,
}

/// The validated, kind-specific behavior of a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Start,
    Assign {
        name: String,
        value_type: ValueType,
        expression: Expression,
    },
    Decide {
        condition: Expression,
    },
}

/// A constructed block. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: BlockId,
    kind: BlockKind,
    adjacents: Vec<BlockId>,
    operation: Operation,
}

impl Block {
    /// Validate the payload against the kind and run the boot step.
    ///
    /// Knows nothing about the rest of the graph; dangling edges are the
    /// graph's concern.
    pub fn construct(description: &BlockDescription) -> Result<Self, InvalidPayloadError> {
        let BlockDescription {
            id,
            kind,
            adjacents,
            payload,
        } = description;
        let invalid = |fault: PayloadFault| InvalidPayloadError {
            block: id.clone(),
            kind: *kind,
            fault,
        };

        let operation = match kind {
            BlockKind::Start => {
                let empty = match payload {
                    JsonValue::Null => true,
                    JsonValue::Object(map) => map.is_empty(),
                    _ => false,
                };
                if !empty {
                    return Err(invalid(PayloadFault::Shape(
                        "start blocks take no payload".into(),
                    )));
                }
                Operation::Start
            }
            BlockKind::DecimalAssign => {
                assign_operation(payload, ValueType::Decimal).map_err(invalid)?
            }
            BlockKind::BoolAssign => assign_operation(payload, ValueType::Bool).map_err(invalid)?,
            BlockKind::Decision => {
                let DecisionPayload { condition } = serde_json::from_value(payload.clone())
                    .map_err(|e| invalid(PayloadFault::Shape(e.to_string())))?;
                if adjacents.len() != 2 {
                    return Err(invalid(PayloadFault::AdjacencyCount {
                        expected: 2,
                        found: adjacents.len(),
                    }));
                }
                Operation::Decide {
                    condition: boot_expression(&condition).map_err(invalid)?,
                }
            }
        };

        Ok(Self {
            id: id.clone(),
            kind: *kind,
            adjacents: adjacents.clone(),
            operation,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn adjacents(&self) -> &[BlockId] {
        &self.adjacents
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// True when forwarding from this block starts independent continuations.
    /// Decision blocks always pick exactly one edge.
    pub fn fans_out(&self) -> bool {
        !matches!(self.operation, Operation::Decide { .. }) && self.adjacents.len() > 1
    }

    /// Receive control and decide where it goes next.
    ///
    /// `previous` is the block that signaled into this one (`None` at the
    /// start of a continuation). Side effects are confined to `environment`;
    /// on a fault the environment is left as it was.
    pub fn signal(
        &self,
        _graph: &Graph,
        _previous: Option<&str>,
        environment: &mut Environment,
    ) -> SignalResult {
        match &self.operation {
            Operation::Start => SignalResult::forward(&self.adjacents),
            Operation::Assign {
                name,
                value_type,
                expression,
            } => {
                let value = match expression.evaluate(&*environment) {
                    Ok(value) => value.coerce(*value_type),
                    Err(source) => {
                        return SignalResult::Fault(BlockFault::Evaluation {
                            expression: expression.source().to_string(),
                            source,
                        });
                    }
                };
                if let Err(conflict) = environment.assign(name.clone(), value) {
                    return SignalResult::Fault(conflict.into());
                }
                SignalResult::forward(&self.adjacents)
            }
            Operation::Decide { condition } => match condition.evaluate(&*environment) {
                Ok(value) => {
                    let branch = if value.as_bool() { 0 } else { 1 };
                    SignalResult::Next(self.adjacents[branch].clone())
                }
                Err(source) => SignalResult::Fault(BlockFault::Evaluation {
                    expression: condition.source().to_string(),
                    source,
                }),
            },
        }
    }
}

fn assign_operation(payload: &JsonValue, value_type: ValueType) -> Result<Operation, PayloadFault> {
    let AssignPayload { name, expression } = serde_json::from_value(payload.clone())
        .map_err(|e| PayloadFault::Shape(e.to_string()))?;
    if !is_valid_name(&name) {
        return Err(PayloadFault::VariableName(name));
    }
    Ok(Operation::Assign {
        name,
        value_type,
        expression: boot_expression(&expression)?,
    })
}

/// Boot step: compile once so forbidden expressions never reach a run.
fn boot_expression(source: &str) -> Result<Expression, PayloadFault> {
    Expression::compile(source).map_err(|source_err| PayloadFault::Expression {
        expression: source.to_string(),
        source: source_err,
    })
}

/// Variable names must be referable from expressions.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
