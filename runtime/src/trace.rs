use crate::executor::ContinuationId;
use blockflow_core::BlockId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a discrete event in the execution trace of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A block is about to receive control.
    BlockEntered {
        step: u64,
        continuation: ContinuationId,
        block: BlockId,
        previous: Option<BlockId>,
    },
    /// A block returned its signal result.
    BlockExited {
        step: u64,
        continuation: ContinuationId,
        block: BlockId,
        outcome: String, // "terminate", "next", "fork", "fault"
        duration_us: u64,
    },
    /// A fan-out spawned child continuations, in adjacency order.
    Forked {
        continuation: ContinuationId,
        block: BlockId,
        children: Vec<ContinuationId>,
    },
    /// A continuation reached a terminal state.
    ContinuationFinished {
        continuation: ContinuationId,
        status: String, // "completed", "forked", "failed"
    },
}

impl TraceEvent {
    pub fn continuation(&self) -> ContinuationId {
        match self {
            TraceEvent::BlockEntered { continuation, .. }
            | TraceEvent::BlockExited { continuation, .. }
            | TraceEvent::Forked { continuation, .. }
            | TraceEvent::ContinuationFinished { continuation, .. } => *continuation,
        }
    }
}

/// A sequential record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Blocks entered by `continuation`, in order.
    pub fn path(&self, continuation: ContinuationId) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::BlockEntered {
                    continuation: c,
                    block,
                    ..
                } if *c == continuation => Some(block.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every block entered, in exploration order.
    pub fn blocks_entered(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::BlockEntered { block, .. } => Some(block.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_filters_by_continuation() {
        let mut trace = Trace::new(Uuid::new_v4());
        let root = ContinuationId(0);
        let child = ContinuationId(1);
        trace.push(TraceEvent::BlockEntered {
            step: 1,
            continuation: root,
            block: "start".into(),
            previous: None,
        });
        trace.push(TraceEvent::Forked {
            continuation: root,
            block: "start".into(),
            children: vec![child],
        });
        trace.push(TraceEvent::BlockEntered {
            step: 2,
            continuation: child,
            block: "a".into(),
            previous: Some("start".into()),
        });

        assert_eq!(trace.path(root), vec!["start"]);
        assert_eq!(trace.path(child), vec!["a"]);
        assert_eq!(trace.blocks_entered(), vec!["start", "a"]);
        assert_eq!(trace.events[1].continuation(), root);
    }

    #[test]
    fn test_trace_json_is_tagged() {
        let mut trace = Trace::new(Uuid::nil());
        trace.push(TraceEvent::ContinuationFinished {
            continuation: ContinuationId(0),
            status: "completed".into(),
        });
        let json: serde_json::Value =
            serde_json::from_str(&trace.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["run_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["events"][0]["event"], "continuation_finished");
        assert_eq!(json["events"][0]["continuation"], 0);
    }
}
