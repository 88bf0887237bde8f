use crate::error::BlockFault;
use serde::Serialize;

pub type BlockId = String;

/// The explicit result of one block's `signal`.
///
/// `SignalResult` is "Control Flow as Data": a block never jumps or raises,
/// it returns one of these and the executor acts on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SignalResult {
    /// No further block; this path of the run ends successfully.
    Terminate,

    /// Hand control to exactly one block.
    Next(BlockId),

    /// Hand control to every listed block (ordered, non-empty, more than one).
    /// Each target runs as an independent continuation.
    Fork(Vec<BlockId>),

    /// A structured failure; this path of the run ends with an error.
    Fault(BlockFault),
}

impl SignalResult {
    /// Forward control along `adjacents`: none terminates, one continues,
    /// several fork.
    pub fn forward(adjacents: &[BlockId]) -> Self {
        match adjacents {
            [] => SignalResult::Terminate,
            [single] => SignalResult::Next(single.clone()),
            many => SignalResult::Fork(many.to_vec()),
        }
    }

    /// Short label used in traces and logs.
    pub fn label(&self) -> &'static str {
        match self {
            SignalResult::Terminate => "terminate",
            SignalResult::Next(_) => "next",
            SignalResult::Fork(_) => "fork",
            SignalResult::Fault(_) => "fault",
        }
    }

    /// Block ids control moves to, in adjacency order.
    pub fn targets(&self) -> &[BlockId] {
        match self {
            SignalResult::Next(id) => std::slice::from_ref(id),
            SignalResult::Fork(ids) => ids,
            SignalResult::Terminate | SignalResult::Fault(_) => &[],
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, SignalResult::Fault(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SignalResult::Terminate | SignalResult::Fault(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_by_adjacency_count() {
        assert_eq!(SignalResult::forward(&[]), SignalResult::Terminate);
        assert_eq!(
            SignalResult::forward(&["a".to_string()]),
            SignalResult::Next("a".into())
        );
        assert_eq!(
            SignalResult::forward(&["a".to_string(), "b".to_string()]),
            SignalResult::Fork(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_targets() {
        let fork = SignalResult::Fork(vec!["x".into(), "y".into()]);
        assert_eq!(fork.targets(), ["x".to_string(), "y".to_string()]);
        assert!(SignalResult::Terminate.targets().is_empty());
        assert!(SignalResult::Terminate.is_terminal());
    }
}
