#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![no_std]

extern crate alloc;

mod error;
mod options;

use alloc::{string::String, vec::Vec};
use core::{hash::BuildHasherDefault, iter};

use linearscan_interval::{Interval, IntervalId, Intervals};
use linearscan_operand::{Opcode, Operand, OperandKind};
use linearscan_pipeline::{NodeId, Pipeline};
use rustc_hash::FxHasher;
use tracing::{debug, trace};

pub use self::{error::*, options::*};

type FxHashMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<FxHasher>>;

pub const PHI_OPCODE: &str = "ssa:phi";

/// Undeclared opcodes with these names transfer control and produce no value.
pub const CONTROL_OPCODES: [&str; 3] = ["branch", "jump", "return"];

/// Per-run context: the register file, the opcode table and every interval of the run.
///
/// The first `pipeline.nodes.len()` intervals are the root intervals of the nodes, in node order.
#[derive(Debug, Clone)]
pub struct Config<'p> {
	pipeline: &'p Pipeline,
	registers: Vec<String>,
	opcodes: FxHashMap<String, Opcode>,
	intervals: Intervals,
	block_nodes: Vec<bool>,
}

impl<'p> Config<'p> {
	#[tracing::instrument(skip_all)]
	pub fn new(pipeline: &'p Pipeline, options: &ConfigOptions) -> Result<Self, ConfigError> {
		pipeline.validate()?;

		for (i, register) in options.registers.iter().enumerate() {
			if options.registers[..i].contains(register) {
				return Err(ConfigError::DuplicateRegister(register.clone()));
			}
		}

		let intervals = pipeline
			.nodes
			.iter()
			.map(|node| Interval::new(Some(node.index)))
			.collect::<Intervals>();

		let mut this = Self {
			pipeline,
			registers: options.registers.clone(),
			opcodes: FxHashMap::with_capacity_and_hasher(
				options.opcodes.len(),
				BuildHasherDefault::default(),
			),
			intervals,
			block_nodes: pipeline.block_node_mask(),
		};

		for (name, opcode) in &options.opcodes {
			this.define_opcode(name, opcode)?;
		}

		debug!(
			registers = this.registers.len(),
			opcodes = this.opcodes.len(),
			intervals = this.intervals.len(),
			"configured"
		);

		Ok(this)
	}

	#[must_use]
	pub const fn pipeline(&self) -> &'p Pipeline {
		self.pipeline
	}

	#[must_use]
	pub fn registers(&self) -> &[String] {
		&self.registers
	}

	#[must_use]
	pub fn register_count(&self) -> usize {
		self.registers.len()
	}

	#[must_use]
	pub fn register_name(&self, index: u32) -> Option<&str> {
		self.registers.get(index as usize).map(String::as_str)
	}

	/// Resolves one operand declaration of `opcode`.
	pub fn create_operand(
		&self,
		opcode: &str,
		options: &OperandOptions,
	) -> Result<Operand, ConfigError> {
		let kind = options
			.kind()
			.parse::<OperandKind>()
			.map_err(|_| ConfigError::UnknownOperandKind {
				opcode: String::from(opcode),
				kind: String::from(options.kind()),
			})?;

		let value = match (kind, options.value()) {
			(OperandKind::Any, _) | (_, None) => None,
			(OperandKind::Register, Some(ResourceValue::Index(index))) => {
				if *index as usize >= self.registers.len() {
					return Err(ConfigError::RegisterOutOfRange {
						opcode: String::from(opcode),
						index: *index,
					});
				}

				Some(*index)
			}
			(OperandKind::Register, Some(ResourceValue::Name(name))) => {
				let Some(index) = self.registers.iter().position(|r| r == name) else {
					return Err(ConfigError::UnknownRegister {
						opcode: String::from(opcode),
						name: name.clone(),
					});
				};

				Some(index as u32)
			}
			(OperandKind::Spill, Some(ResourceValue::Index(slot))) => Some(*slot),
			(OperandKind::Spill, Some(ResourceValue::Name(name))) => {
				return Err(ConfigError::UnknownRegister {
					opcode: String::from(opcode),
					name: name.clone(),
				});
			}
		};

		Ok(Operand::new(kind, value))
	}

	/// Declares `name`, replacing any previous declaration.
	pub fn define_opcode(
		&mut self,
		name: &str,
		options: &OpcodeOptions,
	) -> Result<&Opcode, ConfigError> {
		let inputs = options
			.inputs
			.iter()
			.map(|input| self.create_operand(name, input))
			.collect::<Result<Vec<_>, _>>()?;

		let mut opcode = Opcode::new(name).with_inputs(inputs);
		opcode.output = options
			.output
			.as_ref()
			.map(|output| self.create_operand(name, output))
			.transpose()?;

		opcode
			.scratches
			.extend(iter::repeat_n(Operand::register(), options.scratches));

		for &index in &options.spill {
			let malformed = || ConfigError::MalformedSpill {
				opcode: String::from(name),
				index,
			};

			let slot = u32::try_from(index).map_err(|_| malformed())?;
			let operand = Operand::fixed_spill(slot);
			if opcode.scratches.contains(&operand) {
				return Err(malformed());
			}

			opcode.scratches.push(operand);
		}

		for register in &options.clobbers {
			let operand = self.create_operand(
				name,
				&OperandOptions::Pinned {
					kind: String::from("register"),
					value: Some(register.clone()),
				},
			)?;

			if opcode.scratches.contains(&operand) {
				return Err(ConfigError::DuplicateClobber {
					opcode: String::from(name),
					register: operand.value().unwrap_or_default(),
				});
			}

			opcode.scratches.push(operand);
		}

		trace!(
			opcode = name,
			output = ?opcode.output,
			inputs = opcode.inputs.len(),
			scratches = opcode.scratches.len(),
			"defined opcode"
		);

		Ok(self
			.opcodes
			.entry(String::from(name))
			.insert(opcode)
			.into_mut())
	}

	#[must_use]
	pub fn opcode(&self, name: &str) -> Option<&Opcode> {
		self.opcodes.get(name)
	}

	/// The declaration of the opcode `node` runs, if any.
	#[must_use]
	pub fn opcode_of(&self, node: NodeId) -> Option<&Opcode> {
		self.opcode(&self.pipeline.node(node).opcode)
	}

	/// Constraint on input `index` of `node`, `any` when undeclared.
	#[must_use]
	pub fn input_operand(&self, node: NodeId, index: usize) -> Operand {
		self.opcode_of(node)
			.map_or_else(Operand::any, |opcode| opcode.input(index))
	}

	/// Constraint on the value `node` defines, `any` when undeclared.
	#[must_use]
	pub fn output_operand(&self, node: NodeId) -> Operand {
		self.opcode_of(node)
			.and_then(|opcode| opcode.output)
			.unwrap_or_default()
	}

	/// Scratch operands `node` clobbers.
	#[must_use]
	pub fn scratches_of(&self, node: NodeId) -> &[Operand] {
		self.opcode_of(node)
			.map(|opcode| opcode.scratches.as_slice())
			.unwrap_or_default()
	}

	/// Highest spill slot pinned by any declared opcode.
	#[must_use]
	pub fn max_pinned_spill(&self) -> Option<u32> {
		self.opcodes
			.values()
			.flat_map(|opcode| opcode.scratches_of(OperandKind::Spill))
			.filter_map(Operand::as_fixed_spill)
			.max()
	}

	#[must_use]
	pub fn is_block_node(&self, node: NodeId) -> bool {
		self.block_nodes.get(node.index()).copied().unwrap_or(false)
	}

	#[must_use]
	pub fn is_phi(&self, node: NodeId) -> bool {
		self.pipeline.node(node).opcode == PHI_OPCODE
	}

	/// Whether `node` produces a value that needs a location.
	#[must_use]
	pub fn defines_value(&self, node: NodeId) -> bool {
		if self.is_block_node(node) {
			return false;
		}

		match self.opcode_of(node) {
			Some(opcode) => opcode.output.is_some(),
			None => !CONTROL_OPCODES.contains(&self.pipeline.node(node).opcode.as_str()),
		}
	}

	#[must_use]
	pub const fn intervals(&self) -> &Intervals {
		&self.intervals
	}

	pub const fn intervals_mut(&mut self) -> &mut Intervals {
		&mut self.intervals
	}

	/// Root interval of `node`.
	#[must_use]
	pub fn interval_of(&self, node: NodeId) -> IntervalId {
		IntervalId::new(node.index())
	}

	/// Root intervals of every node, in node order.
	pub fn roots(&self) -> impl DoubleEndedIterator<Item = IntervalId> + ExactSizeIterator {
		(0..self.pipeline.nodes.len()).map(IntervalId::new)
	}
}
