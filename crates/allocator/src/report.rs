use alloc::{string::String, vec::Vec};

use linearscan_config::Config;
use linearscan_interval::{Interval, IntervalId, LiveRange, Use};
use linearscan_operand::Operand;
use linearscan_pipeline::{Location, NodeId};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of the intervals of a run, grouped the way they are drawn: one group per
/// node holding its root interval, the pieces split off it and its scratches, then one group per
/// register pseudo interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
	pub registers: Vec<String>,
	pub nodes: Vec<NodeReport>,
	pub fixed: Vec<RegisterReport>,
}

impl Report {
	/// `fixed` are the register pseudo intervals, by register index. Pass an empty slice before
	/// allocation.
	#[must_use]
	pub fn new(config: &Config<'_>, fixed: &[IntervalId]) -> Self {
		let intervals = config.intervals();
		let pipeline = config.pipeline();

		let mut nodes = pipeline
			.nodes
			.iter()
			.map(|node| NodeReport {
				node: node.index,
				opcode: node.opcode.clone(),
				loc: node.loc,
				value: config.defines_value(node.index),
				intervals: intervals
					.family(config.interval_of(node.index))
					.map(|id| IntervalReport::new(id, &intervals[id]))
					.collect(),
				scratches: Vec::new(),
			})
			.collect::<Vec<_>>();

		for (id, interval) in intervals.iter().skip(nodes.len()) {
			if interval.parent().is_some() || fixed.contains(&id) {
				continue;
			}

			if let Some(group) = interval.node().and_then(|node| nodes.get_mut(node.index())) {
				group.scratches.push(IntervalReport::new(id, interval));
			}
		}

		let fixed = fixed
			.iter()
			.zip(config.registers())
			.map(|(&id, register)| RegisterReport {
				register: register.clone(),
				interval: IntervalReport::new(id, &intervals[id]),
			})
			.collect();

		Self {
			registers: config.registers().to_vec(),
			nodes,
			fixed,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
	pub node: NodeId,
	pub opcode: String,
	pub loc: Location,
	pub value: bool,
	/// The root interval followed by its split children.
	pub intervals: Vec<IntervalReport>,
	pub scratches: Vec<IntervalReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterReport {
	pub register: String,
	pub interval: IntervalReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalReport {
	pub id: IntervalId,
	pub alive: bool,
	pub ranges: Vec<LiveRange>,
	pub uses: Vec<Use>,
	pub allocation: Option<Operand>,
}

impl IntervalReport {
	fn new(id: IntervalId, interval: &Interval) -> Self {
		Self {
			id,
			alive: !interval.is_empty(),
			ranges: interval.ranges().to_vec(),
			uses: interval.uses().to_vec(),
			allocation: interval.allocation(),
		}
	}
}

#[cfg(test)]
mod tests {
	use alloc::boxed::Box;
	use core::error::Error;

	use linearscan_builder::IntervalBuilder;
	use linearscan_config::{Config, ConfigOptions, OpcodeOptions};
	use linearscan_operand::Operand;
	use linearscan_pipeline::{BlockId, PipelineBuilder};

	use super::Report;
	use crate::LinearScan;

	#[test]
	fn groups_follow_nodes() -> Result<(), Box<dyn Error>> {
		let mut builder = PipelineBuilder::new(1);
		let block = BlockId::new(0);
		let a = builder.instruction(block, "literal", &[]);
		let b = builder.instruction(block, "mul", &[a]);
		builder.instruction(block, "return", &[b]);
		let pipeline = builder.build()?;

		let options = ConfigOptions::new()
			.with_registers(["r0", "r1"])
			.with_opcode("mul", OpcodeOptions::new().output("register").scratches(1));
		let mut config = Config::new(&pipeline, &options)?;
		IntervalBuilder::new(&mut config).build_intervals()?;

		let before = Report::new(&config, &[]);
		assert!(before.fixed.is_empty());
		assert!(before.nodes.iter().all(|node| node.scratches.is_empty()));
		assert!(before.nodes[0].intervals[0].alive);
		assert!(!before.nodes[0].value);

		let mut allocator = LinearScan::new(&mut config);
		allocator.allocate()?;
		let fixed = allocator.fixed_intervals().to_vec();

		let report = Report::new(&config, &fixed);
		assert_eq!(report.nodes.len(), pipeline.nodes.len());
		assert_eq!(report.registers, ["r0", "r1"]);
		assert_eq!(report.fixed.len(), 2);
		assert!(report.fixed.iter().all(|register| !register.interval.alive));

		let mul = &report.nodes[b.index()];
		assert_eq!(mul.opcode, "mul");
		assert_eq!(mul.loc.line, 3);
		assert!(mul.value);
		assert_eq!(mul.scratches.len(), 1);
		assert_eq!(mul.intervals.len(), 1);
		assert_eq!(mul.intervals[0].allocation, Some(Operand::fixed_register(0)));
		assert_eq!(mul.scratches[0].allocation, Some(Operand::fixed_register(1)));

		let text = ron::to_string(&report)?;
		assert!(text.contains("opcode:\"mul\""), "{text}");

		Ok(())
	}
}
