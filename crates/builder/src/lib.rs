#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![no_std]

extern crate alloc;

mod error;
mod liveset;
mod postorder;

use alloc::{collections::BTreeMap, vec, vec::Vec};
use core::cmp;

use linearscan_config::Config;
use linearscan_pipeline::{BlockId, NodeId, Pipeline, Position};
use tracing::{debug, info, trace};

pub use self::{error::*, liveset::*};

/// Computes the live ranges and use positions of every node from the pipeline's control flow.
///
/// Liveness is solved first, per block, by a worklist iteration over dense bitsets. The ranges
/// are then laid down block by block in reverse order, walking each block's instructions
/// backward.
pub struct IntervalBuilder<'c, 'p> {
	config: &'c mut Config<'p>,
	predecessors: Vec<Vec<BlockId>>,
	live_in: Vec<LiveSet>,
	live_out: Vec<LiveSet>,
}

impl<'c, 'p> IntervalBuilder<'c, 'p> {
	pub fn new(config: &'c mut Config<'p>) -> Self {
		let pipeline = config.pipeline();
		let empty = LiveSet::empty(pipeline.nodes.len());

		Self {
			predecessors: pipeline.predecessors(),
			live_in: vec![empty.clone(); pipeline.block_count()],
			live_out: vec![empty; pipeline.block_count()],
			config,
		}
	}

	#[must_use]
	pub fn live_in(&self, block: BlockId) -> &LiveSet {
		&self.live_in[block.index()]
	}

	#[must_use]
	pub fn live_out(&self, block: BlockId) -> &LiveSet {
		&self.live_out[block.index()]
	}

	#[tracing::instrument(skip_all)]
	pub fn build_intervals(&mut self) -> Result<(), BuildError> {
		let pipeline = self.config.pipeline();

		self.check_phis(pipeline)?;
		self.compute_liveness(pipeline)?;

		for block in pipeline.block_ids().rev() {
			self.build_block(pipeline, block)?;
		}

		info!(
			blocks = pipeline.block_count(),
			nodes = pipeline.nodes.len(),
			"built intervals"
		);

		Ok(())
	}

	fn check_phis(&self, pipeline: &Pipeline) -> Result<(), BuildError> {
		for block in pipeline.block_ids() {
			let predecessors = self.predecessors[block.index()].len();
			for &phi in &pipeline.block(block).instructions {
				if !self.config.is_phi(phi) {
					continue;
				}

				let inputs = pipeline.node(phi).inputs.len();
				if inputs != predecessors {
					return Err(BuildError::PhiArity {
						phi,
						block,
						inputs,
						predecessors,
					});
				}
			}
		}

		Ok(())
	}

	#[tracing::instrument(skip_all)]
	fn compute_liveness(&mut self, pipeline: &Pipeline) -> Result<(), BuildError> {
		let num_nodes = pipeline.nodes.len();
		let num_blocks = pipeline.block_count();

		let mut defs = vec![LiveSet::empty(num_nodes); num_blocks];
		let mut upward_exposed = vec![LiveSet::empty(num_nodes); num_blocks];
		let mut phi_out = vec![LiveSet::empty(num_nodes); num_blocks];

		for block in pipeline.block_ids() {
			let span = pipeline.block_span(block);
			for &node in &pipeline.block(block).instructions {
				if self.config.defines_value(node) {
					defs[block.index()].insert(node);
				}

				let inputs = &pipeline.node(node).inputs;
				if self.config.is_phi(node) {
					for (&input, &pred) in inputs.iter().zip(&self.predecessors[block.index()]) {
						phi_out[pred.index()].insert(input);
					}

					continue;
				}

				for &input in inputs {
					let local = span.contains(input.raw_u32()) && input < node;
					if !local {
						upward_exposed[block.index()].insert(input);
					}
				}
			}
		}

		let order = postorder::calculate(num_blocks, pipeline.entry_block(), |block| {
			pipeline.block_successors(block)
		})?;

		let mut worklist = order.iter().rev().copied().collect::<Vec<_>>();
		let mut queued = vec![true; num_blocks];
		let limit = num_blocks * num_blocks + num_blocks + 1;
		let mut visits = 0usize;

		while let Some(block) = worklist.pop() {
			queued[block.index()] = false;
			visits += 1;
			if visits > limit {
				return Err(BuildError::NoFixedPoint { visits: limit });
			}

			let mut live_out = phi_out[block.index()].clone();
			for &succ in pipeline.block_successors(block) {
				live_out.union_from(&self.live_in[succ.index()]);
			}

			let mut live_in = live_out.clone();
			live_in.subtract(&defs[block.index()]);
			live_in.union_from(&upward_exposed[block.index()]);

			self.live_out[block.index()] = live_out;

			if live_in != self.live_in[block.index()] {
				trace!(%block, %live_in, "live-in changed");
				self.live_in[block.index()] = live_in;

				for &pred in &self.predecessors[block.index()] {
					if !queued[pred.index()] {
						queued[pred.index()] = true;
						worklist.push(pred);
					}
				}
			}
		}

		debug!(visits, "liveness converged");

		Ok(())
	}

	fn build_block(&mut self, pipeline: &Pipeline, block: BlockId) -> Result<(), BuildError> {
		let span = pipeline.block_span(block);
		let info = pipeline.block(block);

		let header = self.config.interval_of(info.node);
		self.config.intervals_mut()[header].add_range(span.from, span.to);

		let mut pending = BTreeMap::<NodeId, Position>::new();

		for value in &self.live_out[block.index()] {
			if span.contains(value.raw_u32()) {
				pending.insert(value, span.to);
			} else {
				let id = self.config.interval_of(value);
				self.config.intervals_mut()[id].fill_range(span.from, span.to);
			}
		}

		for &node in info.instructions.iter().rev() {
			let pos = node.raw_u32();
			let id = self.config.interval_of(node);
			let end = pending.remove(&node).unwrap_or(pos + 1);
			let is_phi = self.config.is_phi(node);
			let output = self
				.config
				.defines_value(node)
				.then(|| self.config.output_operand(node));

			let interval = &mut self.config.intervals_mut()[id];
			interval.add_range(pos, end);
			if is_phi {
				interval.update_start(span.from)?;
			}

			if let Some(output) = output {
				interval.add_use(pos, output);
			}

			if is_phi {
				continue;
			}

			for (i, &input) in pipeline.node(node).inputs.iter().enumerate() {
				let operand = self.config.input_operand(node, i);
				let input_id = self.config.interval_of(input);
				self.config.intervals_mut()[input_id].add_use(pos, operand);
				pending.entry(input).or_insert(pos);
			}
		}

		for (value, end) in pending {
			let id = self.config.interval_of(value);
			self.config.intervals_mut()[id].add_range(span.from, cmp::max(end, span.from + 1));
		}

		trace!(%block, from = span.from, to = span.to, "built block");

		Ok(())
	}
}
