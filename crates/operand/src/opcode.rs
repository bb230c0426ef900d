use alloc::{string::String, vec::Vec};

use serde::{Deserialize, Serialize};

use super::{Operand, OperandKind};

/// Describes what one named instruction demands from the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opcode {
	pub name: String,
	pub output: Option<Operand>,
	pub inputs: Vec<Operand>,
	pub scratches: Vec<Operand>,
}

impl Opcode {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			output: None,
			inputs: Vec::new(),
			scratches: Vec::new(),
		}
	}

	#[must_use]
	pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = Operand>) -> Self {
		self.inputs.extend(inputs);
		self
	}

	/// The constraint on input `index`, `any` past the declared inputs.
	#[must_use]
	pub fn input(&self, index: usize) -> Operand {
		self.inputs.get(index).copied().unwrap_or_default()
	}

	/// Scratches of one operand kind, in declaration order.
	pub fn scratches_of(&self, kind: OperandKind) -> impl Iterator<Item = Operand> + '_ {
		self.scratches
			.iter()
			.copied()
			.filter(move |op| op.kind() == kind)
	}
}
