//! The simplifier driver: streaming scheduler, collapse-step loop, and the
//! push/pull surface the rest of the assembler talks to.
//!
//! Unlike a driver over a fully-buffered, memory-mapped byte slice, this
//! engine's upstream may be produced incrementally and block on I/O between
//! nodes, possibly from parallel workers. So rather than adapting a blocking `Iterator`, the driver
//! exposes a push/pull pair: the producer calls [`Simplifier::push`] as
//! each new path-node becomes available (naming its predecessors by the
//! `NodeId`s this same driver handed back for nodes it already accepted),
//! and the consumer calls [`Simplifier::try_emit`] to drain whatever has
//! become safe to emit so far.

use tracing::{debug, instrument, trace};

use crate::arena::{Arena, NodeId};
use crate::buffers::Buffers;
use crate::collapse;
use crate::config::SimplifierConfig;
use crate::error::{Result, SimplifierError};
use crate::node::PathNode;

/// Running tallies exposed for diagnostics and the weight-conservation
/// property tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollapseSummary {
    pub nodes_in: u64,
    pub nodes_out: u64,
    pub collapses_performed: u64,
    pub weight_in: u64,
    pub weight_out: u64,
}

/// The streaming path-collapse engine.
///
/// A `Simplifier` is single-threaded and holds no resources beyond its own
/// arena and buffers; dropping it mid-stream is always safe.
pub struct Simplifier {
    arena: Arena<PathNode>,
    buffers: Buffers,
    config: SimplifierConfig,
    max_node_width: i64,
    max_node_length: i64,
    last_input_start: i64,
    finished: bool,
    poisoned: bool,
    summary: CollapseSummary,
}

impl Simplifier {
    pub fn new(config: SimplifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            arena: Arena::new(),
            buffers: Buffers::new(),
            config,
            max_node_width: 0,
            max_node_length: 0,
            last_input_start: i64::MIN,
            finished: false,
            poisoned: false,
            summary: CollapseSummary::default(),
        })
    }

    pub fn config(&self) -> &SimplifierConfig {
        &self.config
    }

    pub fn summary(&self) -> &CollapseSummary {
        &self.summary
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn check_poisoned(&self) -> Result<()> {
        if self.poisoned {
            return Err(SimplifierError::invariant("simplifier is poisoned after a prior fatal error"));
        }
        Ok(())
    }

    fn input_position(&self) -> i64 {
        if self.finished {
            i64::MAX
        } else {
            self.last_input_start
        }
    }

    fn process_offset(&self) -> i64 {
        self.config.max_path_collapse_length as i64 + 1
    }

    fn process_horizon(&self) -> i64 {
        self.input_position().saturating_sub(self.process_offset())
    }

    fn emit_offset(&self) -> i64 {
        self.process_offset() + 2 * self.max_node_length + 2 * self.max_node_width
            + self.config.max_path_collapse_length as i64
            + 2
    }

    fn emit_threshold(&self) -> i64 {
        self.input_position().saturating_sub(self.emit_offset())
    }

    /// Accept one upstream path-node. `predecessors` must be `NodeId`s
    /// already handed back by an earlier `push` call on this same
    /// simplifier. `first_start` must be non-decreasing across calls.
    #[instrument(level = "debug", skip(self, kmers, weights, reference_flags, predecessors))]
    pub fn push(
        &mut self,
        kmers: Vec<u64>,
        first_start: i64,
        first_end: i64,
        weights: Vec<u64>,
        reference_flags: Vec<bool>,
        predecessors: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.check_poisoned()?;
        let result = self.push_inner(kmers, first_start, first_end, weights, reference_flags, predecessors);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn push_inner(
        &mut self,
        kmers: Vec<u64>,
        first_start: i64,
        first_end: i64,
        weights: Vec<u64>,
        reference_flags: Vec<bool>,
        predecessors: Vec<NodeId>,
    ) -> Result<NodeId> {
        if self.finished {
            return Err(SimplifierError::malformed("push called after finish"));
        }
        if first_start > first_end {
            return Err(SimplifierError::malformed("first_start exceeds first_end"));
        }
        if first_start < self.last_input_start {
            return Err(SimplifierError::malformed(format!(
                "input out of order: first_start {} precedes previously seen {}",
                first_start, self.last_input_start
            )));
        }
        let width = (first_end - first_start + 1) as usize;
        if weights.len() != width || reference_flags.len() != width {
            return Err(SimplifierError::malformed(
                "weights/reference_flags length does not match positional width",
            ));
        }
        for &pred in &predecessors {
            if !self.arena.contains(pred) {
                return Err(SimplifierError::malformed(format!(
                    "predecessor {:?} is not a live node",
                    pred
                )));
            }
        }

        let weight_in: u64 = weights.iter().sum();
        let length = kmers.len() as i64;
        let node = PathNode {
            kmers,
            first_start,
            first_end,
            weights,
            reference_flags,
            predecessors: predecessors.clone(),
            successors: Vec::new(),
        };
        let id = self.arena.insert(node);
        for pred in predecessors {
            self.arena.get_mut(pred)?.successors.push(id);
        }
        self.buffers.insert_unprocessed(&self.arena, id)?;

        self.max_node_width = self.max_node_width.max(width as i64);
        self.max_node_length = self.max_node_length.max(length);
        self.last_input_start = first_start;
        self.summary.nodes_in += 1;
        self.summary.weight_in += weight_in;

        trace!(node_id = ?id, first_start, "ingested path-node");
        self.drain_collapse_steps()?;
        Ok(id)
    }

    /// Signal that the upstream source is exhausted. The process horizon
    /// and emit threshold become unbounded, so every remaining buffered
    /// node receives a final collapse attempt and then drains out in order
    /// as `try_emit` is called.
    pub fn finish(&mut self) -> Result<()> {
        self.check_poisoned()?;
        self.finished = true;
        let result = self.drain_collapse_steps();
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn collapse_step(&mut self) -> Result<bool> {
        let process_horizon = self.process_horizon();
        let Some((key, id)) = self.buffers.unprocessed.peek_min() else {
            return Ok(false);
        };
        if !self.finished && key.0 >= process_horizon {
            return Ok(false);
        }
        self.buffers.unprocessed.remove(id);
        self.buffers.insert_processed(&self.arena, id)?;
        let collapsed = collapse::collapse_attempt(&mut self.arena, &mut self.buffers, &self.config, id)?;
        if collapsed {
            self.summary.collapses_performed += 1;
            debug!(node_id = ?id, "collapse attempt succeeded");
        }
        Ok(true)
    }

    fn drain_collapse_steps(&mut self) -> Result<()> {
        while self.collapse_step()? {}
        Ok(())
    }

    /// Emit the smallest settled node in `processed`, if any is currently
    /// safe to release. Returns `None` if nothing has settled yet — the
    /// caller should push more input or call [`Simplifier::finish`].
    #[instrument(level = "debug", skip(self))]
    pub fn try_emit(&mut self) -> Result<Option<PathNode>> {
        self.check_poisoned()?;
        let result = self.try_emit_inner();
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    fn try_emit_inner(&mut self) -> Result<Option<PathNode>> {
        self.drain_collapse_steps()?;
        let emit_threshold = self.emit_threshold();
        let Some((key, id)) = self.buffers.processed.peek_min() else {
            return Ok(None);
        };
        if !self.finished && key.0 > emit_threshold {
            return Ok(None);
        }
        self.buffers.processed.remove(id);
        let node = self.arena.remove(id)?;
        self.summary.nodes_out += 1;
        self.summary.weight_out += node.weights.iter().sum::<u64>();
        trace!(node_id = ?id, first_start = node.first_start, "emitted path-node");
        Ok(Some(node))
    }

    /// Drain every remaining settled node, in order. Only meaningful after
    /// [`Simplifier::finish`]; before that it returns only what has already
    /// settled, same as repeated [`Simplifier::try_emit`] calls.
    pub fn drain(&mut self) -> Result<Vec<PathNode>> {
        let mut out = Vec::new();
        while let Some(node) = self.try_emit()? {
            out.push(node);
        }
        Ok(out)
    }
}
