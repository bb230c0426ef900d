use core::{
	error::Error as CoreError,
	fmt::{Display, Formatter, Result as FmtResult},
};

use super::{BlockId, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
	NoBlocks,
	MisnumberedNode { expected: NodeId, found: NodeId },
	UnknownNode(NodeId),
	UnknownBlock(BlockId),
	EmptyBlock(BlockId),
	NonContiguousBlock(BlockId),
	DuplicateInstruction(NodeId),
	BlockNodeAsInstruction(NodeId),
	BlockNodeAsInput { node: NodeId, input: NodeId },
}

impl Display for PipelineError {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::NoBlocks => f.write_str("pipeline has no blocks"),
			Self::MisnumberedNode { expected, found } => {
				write!(f, "node #{expected} is numbered #{found}")
			}
			Self::UnknownNode(node) => write!(f, "node #{node} does not exist"),
			Self::UnknownBlock(block) => write!(f, "block #{block} does not exist"),
			Self::EmptyBlock(block) => write!(f, "block #{block} has no instructions"),
			Self::NonContiguousBlock(block) => {
				write!(f, "instructions of block #{block} are not numbered contiguously")
			}
			Self::DuplicateInstruction(node) => {
				write!(f, "node #{node} appears in more than one block")
			}
			Self::BlockNodeAsInstruction(node) => {
				write!(f, "block node #{node} is listed as an instruction")
			}
			Self::BlockNodeAsInput { node, input } => {
				write!(f, "node #{node} reads block node #{input}, which carries no value")
			}
		}
	}
}

impl CoreError for PipelineError {}
