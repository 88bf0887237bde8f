//! Executor - The Block Scheduler
//!
//! The Executor drives one run of a [`Graph`], one signal call at a time.
//!
//! * It holds a shared reference to the graph and nothing else from the
//!   engine; cursors and environments are private to the run.
//! * A fan-out ends the current continuation and queues one child per target,
//!   each with its own copy of the environment. The worklist is FIFO, so the
//!   exploration order depends only on the graph.
//! * The run is over when every continuation has terminated. A fault ends
//!   only the continuation it happened in; siblings keep running.

use crate::config::ExecutorConfig;
use crate::error::{BlockFailure, RunError};
use crate::trace::{Trace, TraceEvent};
use blockflow_core::{Block, BlockId, Environment, Graph, SignalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Identifies one continuation of a run. Allocated in spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationId(pub u32);

impl ContinuationId {
    pub const ROOT: ContinuationId = ContinuationId(0);
}

impl fmt::Display for ContinuationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Cursor {
    id: ContinuationId,
    parent: Option<ContinuationId>,
    current: BlockId,
    previous: Option<BlockId>,
    environment: Environment,
    steps: u64,
}

/// What one call to [`Executor::step`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    /// 1-based index of the signal call within the run.
    pub step: u64,
    pub continuation: ContinuationId,
    pub block: BlockId,
    pub previous: Option<BlockId>,
    pub result: SignalResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContinuationStatus {
    Completed { environment: Environment },
    Forked { children: Vec<ContinuationId> },
    Failed(BlockFailure),
}

impl ContinuationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ContinuationStatus::Completed { .. } => "completed",
            ContinuationStatus::Forked { .. } => "forked",
            ContinuationStatus::Failed(_) => "failed",
        }
    }
}

/// How one continuation ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuationOutcome {
    pub id: ContinuationId,
    pub parent: Option<ContinuationId>,
    /// The block whose signal ended the continuation.
    pub last_block: BlockId,
    pub steps: u64,
    pub status: ContinuationStatus,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub steps: u64,
    /// Terminated continuations, in the order they terminated.
    pub outcomes: Vec<ContinuationOutcome>,
    pub trace: Option<Trace>,
}

impl RunReport {
    /// Final environments of the continuations that completed.
    pub fn completed(&self) -> impl Iterator<Item = &Environment> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.status {
            ContinuationStatus::Completed { environment } => Some(environment),
            _ => None,
        })
    }

    /// The first completed environment. For a run without fan-out this is
    /// the final environment of the run.
    pub fn final_environment(&self) -> Option<&Environment> {
        self.completed().next()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BlockFailure> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.status {
            ContinuationStatus::Failed(failure) => Some(failure),
            _ => None,
        })
    }

    pub fn first_failure(&self) -> Option<&BlockFailure> {
        self.failures().next()
    }

    pub fn is_success(&self) -> bool {
        self.first_failure().is_none()
    }

    pub fn outcome(&self, id: ContinuationId) -> Option<&ContinuationOutcome> {
        self.outcomes.iter().find(|outcome| outcome.id == id)
    }
}

pub struct Executor<'g> {
    graph: &'g Graph,
    config: ExecutorConfig,
    run_id: Uuid,
    queue: VecDeque<Cursor>,
    outcomes: Vec<ContinuationOutcome>,
    spawned: u32,
    steps: u64,
    halted: Option<RunError>,
    trace: Option<Trace>,
    started_at: DateTime<Utc>,
    clock: Instant,
    span: tracing::Span,
}

impl<'g> Executor<'g> {
    /// Prepare a run: the root continuation sits on the start block with an
    /// empty environment.
    pub fn new(label: &str, graph: &'g Graph, config: ExecutorConfig) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", blockflow.program = %label, blockflow.run = %run_id);
        let trace = config.record_trace.then(|| Trace::new(run_id));
        let started_at = trace
            .as_ref()
            .map(|trace| trace.started_at)
            .unwrap_or_else(Utc::now);

        let root = Cursor {
            id: ContinuationId::ROOT,
            parent: None,
            current: graph.start().id().to_string(),
            previous: None,
            environment: Environment::new(),
            steps: 0,
        };

        Self {
            graph,
            config,
            run_id,
            queue: VecDeque::from([root]),
            outcomes: Vec::new(),
            spawned: 1,
            steps: 0,
            halted: None,
            trace,
            started_at,
            clock: Instant::now(),
            span,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Signal calls made so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// True once every continuation has terminated.
    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Continuations still waiting to run, the active one included.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The active continuation and the block it will signal next.
    pub fn current(&self) -> Option<(ContinuationId, &str)> {
        self.queue
            .front()
            .map(|cursor| (cursor.id, cursor.current.as_str()))
    }

    /// Environment of the active continuation.
    pub fn environment(&self) -> Option<&Environment> {
        self.queue.front().map(|cursor| &cursor.environment)
    }

    pub fn outcomes(&self) -> &[ContinuationOutcome] {
        &self.outcomes
    }

    /// Signal the current block of the active continuation.
    ///
    /// Returns `Ok(None)` once the run has terminated. After an error the
    /// executor is halted and keeps returning that error.
    pub fn step(&mut self) -> Result<Option<StepRecord>, RunError> {
        if let Some(err) = &self.halted {
            return Err(err.clone());
        }
        let span = self.span.clone();
        let _entered = span.enter();
        let result = self.advance();
        if let Err(err) = &result {
            self.halted = Some(err.clone());
        }
        result
    }

    /// Step until every continuation has terminated. Block failures are
    /// recorded in the report; only limit violations are errors here.
    pub fn run(mut self) -> Result<RunReport, RunError> {
        while self.step()?.is_some() {}
        Ok(self.into_report())
    }

    /// Like [`run`](Self::run), but the first failed continuation (in
    /// exploration order) becomes `RunError::BlockFailed`.
    pub fn run_to_completion(self) -> Result<RunReport, RunError> {
        let report = self.run()?;
        match report.first_failure() {
            Some(failure) => Err(RunError::BlockFailed(failure.clone())),
            None => Ok(report),
        }
    }

    /// Finish the run as it stands. Pending continuations are dropped.
    pub fn into_report(self) -> RunReport {
        let elapsed = self.clock.elapsed();
        let _entered = self.span.enter();
        let failed = self
            .outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, ContinuationStatus::Failed(_)))
            .count();
        tracing::info!(
            steps = self.steps,
            continuations = self.outcomes.len(),
            failed,
            pending = self.queue.len(),
            ?elapsed,
            "run finished"
        );
        RunReport {
            run_id: self.run_id,
            started_at: self.started_at,
            elapsed,
            steps: self.steps,
            outcomes: self.outcomes,
            trace: self.trace,
        }
    }

    fn advance(&mut self) -> Result<Option<StepRecord>, RunError> {
        let Some(mut cursor) = self.queue.pop_front() else {
            return Ok(None);
        };
        let block = match self.admit(&cursor) {
            Ok(block) => block,
            Err(err) => {
                self.queue.push_front(cursor);
                return Err(err);
            }
        };

        self.steps += 1;
        cursor.steps += 1;
        let step = self.steps;
        tracing::debug!(
            step,
            continuation = %cursor.id,
            block = %block.id(),
            kind = %block.kind(),
            "signal"
        );
        self.record(|| TraceEvent::BlockEntered {
            step,
            continuation: cursor.id,
            block: cursor.current.clone(),
            previous: cursor.previous.clone(),
        });

        let started = Instant::now();
        let result = block.signal(self.graph, cursor.previous.as_deref(), &mut cursor.environment);
        let duration_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

        self.record(|| TraceEvent::BlockExited {
            step,
            continuation: cursor.id,
            block: cursor.current.clone(),
            outcome: result.label().to_string(),
            duration_us,
        });

        let record = StepRecord {
            step,
            continuation: cursor.id,
            block: cursor.current.clone(),
            previous: cursor.previous.clone(),
            result: result.clone(),
        };

        match result {
            SignalResult::Next(next) => {
                cursor.previous = Some(std::mem::replace(&mut cursor.current, next));
                self.queue.push_front(cursor);
            }
            SignalResult::Terminate => {
                let environment = cursor.environment.clone();
                self.finish(cursor, ContinuationStatus::Completed { environment });
            }
            SignalResult::Fork(targets) => {
                let children = self.fork(&cursor, &targets)?;
                tracing::debug!(
                    continuation = %cursor.id,
                    block = %cursor.current,
                    children = children.len(),
                    "fan-out"
                );
                self.record(|| TraceEvent::Forked {
                    continuation: cursor.id,
                    block: cursor.current.clone(),
                    children: children.clone(),
                });
                self.finish(cursor, ContinuationStatus::Forked { children });
            }
            SignalResult::Fault(fault) => {
                tracing::warn!(
                    continuation = %cursor.id,
                    block = %cursor.current,
                    kind = fault.kind(),
                    error = %fault,
                    "block faulted"
                );
                let failure = BlockFailure {
                    continuation: cursor.id,
                    block: cursor.current.clone(),
                    previous: cursor.previous.clone(),
                    fault,
                    environment: cursor.environment.clone(),
                };
                self.finish(cursor, ContinuationStatus::Failed(failure));
            }
        }

        Ok(Some(record))
    }

    /// Check the step budget, resolve the block about to be signaled and
    /// refuse it when it fans out under `allow_fan_out = false`.
    fn admit(&self, cursor: &Cursor) -> Result<&'g Block, RunError> {
        if let Some(budget) = self.config.step_budget {
            if self.steps >= budget {
                tracing::warn!(
                    budget,
                    continuation = %cursor.id,
                    block = %cursor.current,
                    "step budget exhausted"
                );
                return Err(RunError::StepBudgetExceeded {
                    budget,
                    block: cursor.current.clone(),
                    continuation: cursor.id,
                    environment: cursor.environment.clone(),
                });
            }
        }
        let graph: &'g Graph = self.graph;
        let block = graph
            .lookup(&cursor.current)
            .map_err(|_| RunError::MissingBlock(cursor.current.clone()))?;
        if !self.config.allow_fan_out && block.fans_out() {
            tracing::warn!(
                continuation = %cursor.id,
                block = %cursor.current,
                "fan-out disabled"
            );
            return Err(RunError::ConcurrentBranchingUnsupported {
                block: cursor.current.clone(),
                continuation: cursor.id,
                environment: cursor.environment.clone(),
            });
        }
        Ok(block)
    }

    /// Queue one child per target, in adjacency order.
    fn fork(
        &mut self,
        parent: &Cursor,
        targets: &[BlockId],
    ) -> Result<Vec<ContinuationId>, RunError> {
        let total = self.spawned as usize + targets.len();
        if let Some(limit) = self.config.max_continuations {
            if total > limit {
                tracing::warn!(limit, requested = total, "continuation limit exceeded");
                return Err(RunError::ContinuationLimitExceeded { limit });
            }
        }
        if u32::try_from(total).is_err() {
            return Err(RunError::ContinuationLimitExceeded {
                limit: u32::MAX as usize,
            });
        }

        let mut children = Vec::with_capacity(targets.len());
        for target in targets {
            let id = ContinuationId(self.spawned);
            self.spawned += 1;
            self.queue.push_back(Cursor {
                id,
                parent: Some(parent.id),
                current: target.clone(),
                previous: Some(parent.current.clone()),
                environment: parent.environment.clone(),
                steps: 0,
            });
            children.push(id);
        }
        Ok(children)
    }

    fn finish(&mut self, cursor: Cursor, status: ContinuationStatus) {
        tracing::debug!(
            continuation = %cursor.id,
            block = %cursor.current,
            status = status.label(),
            "continuation finished"
        );
        self.record(|| TraceEvent::ContinuationFinished {
            continuation: cursor.id,
            status: status.label().to_string(),
        });
        self.outcomes.push(ContinuationOutcome {
            id: cursor.id,
            parent: cursor.parent,
            last_block: cursor.current,
            steps: cursor.steps,
            status,
        });
    }

    fn record(&mut self, event: impl FnOnce() -> TraceEvent) {
        if let Some(trace) = &mut self.trace {
            trace.push(event());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockflow_core::BlockDescription;

    fn graph(descriptions: &[BlockDescription]) -> Graph {
        Graph::build(descriptions).unwrap()
    }

    #[test]
    fn test_step_by_step() {
        let graph = graph(&[
            BlockDescription::start("start").to("a"),
            BlockDescription::decimal_assign("a", "x", "1+1"),
        ]);
        let mut executor = Executor::new("test", &graph, ExecutorConfig::default());
        assert_eq!(executor.current(), Some((ContinuationId::ROOT, "start")));

        let first = executor.step().unwrap().unwrap();
        assert_eq!(first.step, 1);
        assert_eq!(first.block, "start");
        assert_eq!(first.previous, None);
        assert_eq!(first.result, SignalResult::Next("a".into()));
        assert_eq!(executor.current(), Some((ContinuationId::ROOT, "a")));

        let second = executor.step().unwrap().unwrap();
        assert_eq!(second.previous.as_deref(), Some("start"));
        assert_eq!(second.result, SignalResult::Terminate);

        assert!(executor.is_finished());
        assert_eq!(executor.step().unwrap(), None);
        assert_eq!(executor.steps(), 2);
    }

    #[test]
    fn test_halted_executor_repeats_error() {
        let graph = graph(&[BlockDescription::start("start").to("start")]);
        let config = ExecutorConfig::default().with_step_budget(1);
        let mut executor = Executor::new("loop", &graph, config);
        assert!(executor.step().unwrap().is_some());
        let err = executor.step().unwrap_err();
        assert!(matches!(err, RunError::StepBudgetExceeded { budget: 1, .. }));
        assert_eq!(executor.step().unwrap_err(), err);
        assert_eq!(executor.steps(), 1);
        // the halted continuation stays queued
        assert_eq!(executor.pending(), 1);
        assert_eq!(executor.current(), Some((ContinuationId::ROOT, "start")));
    }

    #[test]
    fn test_fan_out_refused_before_signal() {
        let graph = graph(&[
            BlockDescription::start("start").with_adjacents(["a", "b"]),
            BlockDescription::decimal_assign("a", "x", "1"),
            BlockDescription::decimal_assign("b", "x", "2"),
        ]);
        let config = ExecutorConfig::default().with_allow_fan_out(false);
        let mut executor = Executor::new("strict", &graph, config);
        let err = executor.step().unwrap_err();
        assert_eq!(err.kind(), "concurrent_branching_unsupported");
        assert_eq!(executor.steps(), 0);
        assert_eq!(executor.pending(), 1);
        assert!(executor.outcomes().is_empty());
    }

    #[test]
    fn test_trace_can_be_disabled() {
        let graph = graph(&[BlockDescription::start("start")]);
        let config = ExecutorConfig::default().with_record_trace(false);
        let report = Executor::new("quiet", &graph, config).run().unwrap();
        assert!(report.trace.is_none());
        assert_eq!(report.steps, 1);
    }

    #[test]
    fn test_continuation_id_display() {
        assert_eq!(ContinuationId(3).to_string(), "#3");
        assert_eq!(serde_json::to_string(&ContinuationId(3)).unwrap(), "3");
    }
}
