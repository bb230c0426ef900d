use alloc::{collections::BTreeMap, string::String, vec::Vec};

use serde::{Deserialize, Serialize};

/// Construction input of a [`Config`](crate::Config), usually read from a target description.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOptions {
	#[serde(default)]
	pub registers: Vec<String>,
	#[serde(default)]
	pub opcodes: BTreeMap<String, OpcodeOptions>,
}

impl ConfigOptions {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_registers<I, S>(mut self, registers: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.registers.extend(registers.into_iter().map(Into::into));
		self
	}

	#[must_use]
	pub fn with_opcode(mut self, name: impl Into<String>, opcode: OpcodeOptions) -> Self {
		self.opcodes.insert(name.into(), opcode);
		self
	}
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeOptions {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub output: Option<OperandOptions>,
	#[serde(default)]
	pub inputs: Vec<OperandOptions>,
	/// Number of free scratch registers the instruction clobbers.
	#[serde(default)]
	pub scratches: usize,
	/// Spill slots the instruction reserves, by index.
	#[serde(default)]
	pub spill: Vec<i64>,
	/// Registers the instruction destroys, by index or name.
	#[serde(default)]
	pub clobbers: Vec<ResourceValue>,
}

impl OpcodeOptions {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn output(mut self, output: impl Into<OperandOptions>) -> Self {
		self.output = Some(output.into());
		self
	}

	#[must_use]
	pub fn inputs<I, O>(mut self, inputs: I) -> Self
	where
		I: IntoIterator<Item = O>,
		O: Into<OperandOptions>,
	{
		self.inputs.extend(inputs.into_iter().map(Into::into));
		self
	}

	#[must_use]
	pub const fn scratches(mut self, count: usize) -> Self {
		self.scratches = count;
		self
	}

	#[must_use]
	pub fn spill(mut self, slots: impl IntoIterator<Item = i64>) -> Self {
		self.spill.extend(slots);
		self
	}

	#[must_use]
	pub fn clobbers<I, R>(mut self, registers: I) -> Self
	where
		I: IntoIterator<Item = R>,
		R: Into<ResourceValue>,
	{
		self.clobbers.extend(registers.into_iter().map(Into::into));
		self
	}
}

/// Either a bare kind (`"register"`) or a kind pinned to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperandOptions {
	Kind(String),
	Pinned {
		kind: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		value: Option<ResourceValue>,
	},
}

impl OperandOptions {
	#[must_use]
	pub fn pinned(kind: impl Into<String>, value: impl Into<ResourceValue>) -> Self {
		Self::Pinned {
			kind: kind.into(),
			value: Some(value.into()),
		}
	}

	#[must_use]
	pub fn kind(&self) -> &str {
		match self {
			Self::Kind(kind) | Self::Pinned { kind, .. } => kind,
		}
	}

	#[must_use]
	pub const fn value(&self) -> Option<&ResourceValue> {
		match self {
			Self::Kind(..) => None,
			Self::Pinned { value, .. } => value.as_ref(),
		}
	}
}

impl From<&str> for OperandOptions {
	fn from(value: &str) -> Self {
		Self::Kind(value.into())
	}
}

/// A pinned resource: an index, or the name of a configured register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceValue {
	Index(u32),
	Name(String),
}

impl From<u32> for ResourceValue {
	fn from(value: u32) -> Self {
		Self::Index(value)
	}
}

impl From<&str> for ResourceValue {
	fn from(value: &str) -> Self {
		Self::Name(value.into())
	}
}
