#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![no_std]

extern crate alloc;

mod builder;
mod error;

use alloc::{string::String, vec, vec::Vec};

use linearscan_utils::define_index;
use serde::{Deserialize, Serialize};

pub use self::{builder::*, error::*};

/// A point in the flattened instruction numbering. An instruction's position is its node index.
pub type Position = u32;

define_index!(NodeId);
define_index!(BlockId);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
	pub line: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub end: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
	pub index: NodeId,
	pub opcode: String,
	#[serde(default)]
	pub inputs: Vec<NodeId>,
	#[serde(default)]
	pub loc: Location,
}

impl Node {
	#[must_use]
	pub const fn position(&self) -> Position {
		self.index.raw_u32()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
	/// The block's own pseudo node (`start` or `region`).
	pub node: NodeId,
	pub instructions: Vec<NodeId>,
	#[serde(default)]
	pub successors: Vec<BlockId>,
	#[serde(default)]
	pub loc: Location,
}

/// Half-open span of positions covered by a block's instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpan {
	pub from: Position,
	pub to: Position,
}

impl BlockSpan {
	#[must_use]
	pub const fn contains(self, pos: Position) -> bool {
		self.from <= pos && pos < self.to
	}
}

/// The input graph: a flat node array plus the blocks laid out over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
	pub nodes: Vec<Node>,
	pub blocks: Vec<Block>,
}

impl Pipeline {
	#[must_use]
	pub fn node(&self, id: NodeId) -> &Node {
		&self.nodes[id.index()]
	}

	#[must_use]
	pub fn block(&self, id: BlockId) -> &Block {
		&self.blocks[id.index()]
	}

	#[must_use]
	pub fn block_count(&self) -> usize {
		self.blocks.len()
	}

	#[must_use]
	pub const fn entry_block(&self) -> BlockId {
		BlockId::new(0)
	}

	pub fn block_ids(&self) -> impl DoubleEndedIterator<Item = BlockId> + ExactSizeIterator {
		(0..self.blocks.len()).map(BlockId::new)
	}

	#[must_use]
	pub fn block_successors(&self, id: BlockId) -> &[BlockId] {
		&self.block(id).successors
	}

	/// Requires a validated pipeline, where every block has at least one instruction.
	#[must_use]
	pub fn block_span(&self, id: BlockId) -> BlockSpan {
		let instructions = &self.block(id).instructions;
		let from = instructions.first().map_or(0, |first| first.raw_u32());
		let to = instructions.last().map_or(from, |last| last.raw_u32() + 1);

		BlockSpan { from, to }
	}

	/// Predecessors of every block, in the order the edges appear over the block list.
	/// Phi inputs are matched against this order.
	#[must_use]
	pub fn predecessors(&self) -> Vec<Vec<BlockId>> {
		let mut preds = vec![Vec::new(); self.blocks.len()];
		for block in self.block_ids() {
			for &succ in self.block_successors(block) {
				preds[succ.index()].push(block);
			}
		}

		preds
	}

	/// `true` for every node that is a block's pseudo node.
	#[must_use]
	pub fn block_node_mask(&self) -> Vec<bool> {
		let mut mask = vec![false; self.nodes.len()];
		for block in &self.blocks {
			if let Some(slot) = mask.get_mut(block.node.index()) {
				*slot = true;
			}
		}

		mask
	}

	pub fn validate(&self) -> Result<(), PipelineError> {
		if self.blocks.is_empty() {
			return Err(PipelineError::NoBlocks);
		}

		for (i, node) in self.nodes.iter().enumerate() {
			if node.index.index() != i {
				return Err(PipelineError::MisnumberedNode {
					expected: NodeId::new(i),
					found: node.index,
				});
			}

			if let Some(&input) = node.inputs.iter().find(|input| !self.has_node(**input)) {
				return Err(PipelineError::UnknownNode(input));
			}
		}

		let block_nodes = self.block_node_mask();
		let mut owner = vec![None::<BlockId>; self.nodes.len()];

		for block_id in self.block_ids() {
			let block = self.block(block_id);

			if !self.has_node(block.node) {
				return Err(PipelineError::UnknownNode(block.node));
			}

			if let Some(&succ) = block
				.successors
				.iter()
				.find(|succ| succ.index() >= self.blocks.len())
			{
				return Err(PipelineError::UnknownBlock(succ));
			}

			if block.instructions.is_empty() {
				return Err(PipelineError::EmptyBlock(block_id));
			}

			for (i, &inst) in block.instructions.iter().enumerate() {
				if !self.has_node(inst) {
					return Err(PipelineError::UnknownNode(inst));
				}

				if block_nodes[inst.index()] {
					return Err(PipelineError::BlockNodeAsInstruction(inst));
				}

				if owner[inst.index()].replace(block_id).is_some() {
					return Err(PipelineError::DuplicateInstruction(inst));
				}

				if i > 0 && block.instructions[i - 1].raw_u32() + 1 != inst.raw_u32() {
					return Err(PipelineError::NonContiguousBlock(block_id));
				}
			}
		}

		for node in &self.nodes {
			if let Some(&input) = node.inputs.iter().find(|input| block_nodes[input.index()]) {
				return Err(PipelineError::BlockNodeAsInput {
					node: node.index,
					input,
				});
			}
		}

		Ok(())
	}

	fn has_node(&self, id: NodeId) -> bool {
		id.is_valid() && id.index() < self.nodes.len()
	}
}
