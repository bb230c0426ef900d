use alloc::{string::String, vec::Vec};

use super::{Block, BlockId, Location, Node, NodeId, Pipeline, PipelineError};

/// Lays out a [`Pipeline`] the way a parsed pipeline description is numbered: every block's
/// pseudo node first, then the instructions in block order.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
	nodes: Vec<Node>,
	blocks: Vec<Block>,
}

impl PipelineBuilder {
	#[must_use]
	pub fn new(block_count: usize) -> Self {
		let mut this = Self {
			nodes: Vec::with_capacity(block_count),
			blocks: Vec::with_capacity(block_count),
		};

		for i in 0..block_count {
			let node = this.push_node(if matches!(i, 0) { "start" } else { "region" }, &[]);
			let loc = this.nodes[node.index()].loc;
			this.blocks.push(Block {
				node,
				instructions: Vec::new(),
				successors: Vec::new(),
				loc,
			});
		}

		this
	}

	/// Appends an instruction to `block`. Instructions must be added in block order.
	pub fn instruction(&mut self, block: BlockId, opcode: &str, inputs: &[NodeId]) -> NodeId {
		let node = self.push_node(opcode, inputs);
		self.blocks[block.index()].instructions.push(node);
		node
	}

	/// Replaces the inputs of `node`, for phis that read values defined further down.
	pub fn set_inputs(&mut self, node: NodeId, inputs: &[NodeId]) {
		self.nodes[node.index()].inputs = inputs.to_vec();
	}

	pub fn edge(&mut self, from: BlockId, to: BlockId) {
		self.blocks[from.index()].successors.push(to);
	}

	pub fn build(self) -> Result<Pipeline, PipelineError> {
		let pipeline = Pipeline {
			nodes: self.nodes,
			blocks: self.blocks,
		};

		pipeline.validate()?;

		Ok(pipeline)
	}

	fn push_node(&mut self, opcode: &str, inputs: &[NodeId]) -> NodeId {
		let index = NodeId::new(self.nodes.len());
		self.nodes.push(Node {
			index,
			opcode: String::from(opcode),
			inputs: inputs.to_vec(),
			loc: Location {
				line: index.raw_u32() + 1,
				end: None,
			},
		});

		index
	}
}
