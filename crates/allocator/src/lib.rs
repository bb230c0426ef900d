#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![no_std]

extern crate alloc;

mod error;
mod report;

use alloc::{collections::BinaryHeap, vec, vec::Vec};
use core::{cmp::Reverse, hash::BuildHasherDefault, mem};

use linearscan_config::Config;
use linearscan_interval::{Interval, IntervalId, Position, Use};
use linearscan_operand::{Operand, OperandKind};
use rustc_hash::FxHasher;
use tracing::{debug, info, trace, warn};

pub use self::{error::*, report::*};

type FxHashMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Linear-scan register assignment over the intervals of a [`Config`].
///
/// Intervals are visited in order of their start position. An interval that cannot keep a
/// register for its whole lifetime is split; pieces that end up in memory share one spill slot
/// per value.
///
/// A piece serves every use in its use list, including the last read at its end. The move into
/// a piece split off at `at` runs before the instruction at `at` reads its inputs.
pub struct LinearScan<'c, 'p> {
	config: &'c mut Config<'p>,
	unhandled: BinaryHeap<Reverse<(Position, IntervalId)>>,
	active: Vec<IntervalId>,
	inactive: Vec<IntervalId>,
	handled: Vec<IntervalId>,
	/// Pieces that ended at the current position and are read there.
	reading: Vec<IntervalId>,
	fixed: Vec<IntervalId>,
	spill_slots: FxHashMap<IntervalId, u32>,
	next_slot: u32,
}

impl<'c, 'p> LinearScan<'c, 'p> {
	pub fn new(config: &'c mut Config<'p>) -> Self {
		let next_slot = config.max_pinned_spill().map_or(0, |slot| slot + 1);

		Self {
			config,
			unhandled: BinaryHeap::new(),
			active: Vec::new(),
			inactive: Vec::new(),
			handled: Vec::new(),
			reading: Vec::new(),
			fixed: Vec::new(),
			spill_slots: FxHashMap::default(),
			next_slot,
		}
	}

	/// Pseudo intervals of the configured registers, by register index.
	#[must_use]
	pub fn fixed_intervals(&self) -> &[IntervalId] {
		&self.fixed
	}

	/// Spill slot shared by every spilled piece of `root`.
	#[must_use]
	pub fn spill_slot(&self, root: IntervalId) -> Option<u32> {
		self.spill_slots.get(&root).copied()
	}

	/// Number of spill slots in use, pinned slots included.
	#[must_use]
	pub const fn spill_slot_count(&self) -> u32 {
		self.next_slot
	}

	#[tracing::instrument(skip_all)]
	pub fn allocate(&mut self) -> Result<(), AllocError> {
		self.collect()?;

		let registers = self.config.register_count();
		if matches!(registers, 0) {
			warn!("no registers configured, every interval is spilled");
		}

		let positions = self.config.pipeline().nodes.len();
		let limit = (self.unhandled.len() + 1) * (positions + 1) * 2;
		let mut steps = 0usize;

		while let Some(Reverse((position, current))) = self.unhandled.pop() {
			steps += 1;
			if steps > limit {
				return Err(AllocError::NoProgress { steps: limit });
			}

			self.expire(position)?;
			trace!(%current, position, "allocating");

			if matches!(registers, 0) {
				self.assign_spill(current);
				continue;
			}

			let interval = &self.config.intervals()[current];
			let demand = head_uses(interval, position).fold((false, false), |(spill, register), u| {
				match u.value.kind() {
					OperandKind::Spill => (true, register),
					OperandKind::Register => (spill, true),
					OperandKind::Any => (spill, register),
				}
			});

			let pinned_apart = {
				let mut pins = head_uses(interval, position).filter_map(|u| u.value.as_fixed_register());
				pins.next().is_some_and(|first| pins.any(|pin| pin != first))
			};

			if pinned_apart || matches!(demand, (true, true)) {
				return Err(AllocError::Conflict {
					interval: current,
					position,
				});
			}

			if matches!(demand, (true, false)) {
				self.spill_from(current, position)?;
				continue;
			}

			if !self.try_allocate_free(current, position)? {
				self.allocate_blocked(current, position)?;
			}
		}

		info!(
			steps,
			handled = self.handled.len(),
			splits = self.config.intervals().history().len(),
			spill_slots = self.next_slot,
			"allocated registers"
		);

		Ok(())
	}

	/// Queues every value interval and scratch, and lays out the register pseudo intervals.
	fn collect(&mut self) -> Result<(), AllocError> {
		let config = &mut *self.config;
		let pipeline = config.pipeline();

		for register in 0..config.register_count() as u32 {
			let mut interval = Interval::new(None);
			interval.set_allocation(Some(Operand::fixed_register(register)));
			self.fixed.push(config.intervals_mut().push(interval));
		}

		for node in &pipeline.nodes {
			if config.is_block_node(node.index) {
				continue;
			}

			let pos = node.position();
			let scratches = config.scratches_of(node.index).to_vec();
			for scratch in scratches {
				let mut interval = Interval::new(Some(node.index));
				interval.add_range(pos, pos + 1);

				let pinned = match scratch {
					Operand::Register(Some(register)) => {
						let fixed = self.fixed[register as usize];
						config.intervals_mut()[fixed].add_range(pos, pos + 1);
						continue;
					}
					Operand::Spill(Some(slot)) => Some(Operand::fixed_spill(slot)),
					Operand::Spill(None) => {
						let slot = self.next_slot;
						self.next_slot += 1;
						Some(Operand::fixed_spill(slot))
					}
					Operand::Register(None) | Operand::Any => {
						interval.add_use(pos, Operand::register());
						None
					}
				};

				interval.set_allocation(pinned);
				let id = config.intervals_mut().push(interval);
				if pinned.is_some() {
					self.handled.push(id);
				} else {
					self.unhandled.push(Reverse((pos, id)));
				}
			}
		}

		for root in config.roots() {
			let interval = &config.intervals()[root];
			let Some(node) = interval.node() else {
				continue;
			};

			if interval.is_empty() || !config.defines_value(node) {
				continue;
			}

			self.unhandled.push(Reverse((interval.start()?, root)));
		}

		for &fixed in &self.fixed {
			if config.intervals()[fixed].is_empty() {
				self.handled.push(fixed);
			} else {
				self.inactive.push(fixed);
			}
		}

		debug!(
			unhandled = self.unhandled.len(),
			registers = self.fixed.len(),
			"collected intervals"
		);

		Ok(())
	}

	fn expire(&mut self, position: Position) -> Result<(), AllocError> {
		let intervals = self.config.intervals();

		self.reading
			.retain(|&id| intervals[id].end().is_ok_and(|end| end == position));

		for id in mem::take(&mut self.active)
			.into_iter()
			.chain(mem::take(&mut self.inactive))
		{
			let interval = &intervals[id];
			let end = interval.end()?;
			if end <= position {
				if end == position && interval.uses().iter().any(|u| u.pos == end) {
					self.reading.push(id);
				}

				self.handled.push(id);
			} else if interval.covers(position) {
				self.active.push(id);
			} else {
				self.inactive.push(id);
			}
		}

		Ok(())
	}

	fn register_of(&self, id: IntervalId) -> Option<u32> {
		self.config.intervals()[id]
			.allocation()
			.and_then(Operand::as_fixed_register)
	}

	fn is_fixed(&self, id: IntervalId) -> bool {
		self.fixed.contains(&id)
	}

	/// Whether `id` is a value's root interval, written by its instruction after the inputs are
	/// read. Any other piece is filled before the instruction at its start reads.
	fn is_definition(&self, id: IntervalId) -> bool {
		let interval = &self.config.intervals()[id];

		interval.parent().is_none()
			&& interval
				.node()
				.is_some_and(|node| self.config.interval_of(node) == id)
	}

	/// Registers that pieces ending at the current position are still read from. Only a
	/// definition may reuse them.
	fn read_registers(&self, current: IntervalId) -> Vec<u32> {
		if self.is_definition(current) {
			return Vec::new();
		}

		self.reading
			.iter()
			.filter_map(|&id| self.register_of(id))
			.collect()
	}

	fn try_allocate_free(
		&mut self,
		current: IntervalId,
		position: Position,
	) -> Result<bool, AllocError> {
		let read = self.read_registers(current);
		let intervals = self.config.intervals();
		let interval = &intervals[current];
		let end = interval.end()?;

		let mut free_until = vec![Position::MAX; self.config.register_count()];
		for register in self
			.active
			.iter()
			.filter_map(|&id| self.register_of(id))
			.chain(read)
		{
			free_until[register as usize] = 0;
		}

		for &id in &self.inactive {
			if let Some(register) = self.register_of(id)
				&& let Some(at) = intervals[id].next_intersection(interval)
			{
				let slot = &mut free_until[register as usize];
				*slot = (*slot).min(at);
			}
		}

		let hint = interval
			.uses()
			.iter()
			.filter(|u| u.pos >= position)
			.find_map(|u| u.value.as_fixed_register());

		let register = match (required_register(interval, position), hint) {
			(Some(required), _) => required,
			(None, Some(hint)) if free_until[hint as usize] >= end => hint,
			_ => furthest(&free_until),
		};

		let free = free_until[register as usize];
		if free <= position {
			return Ok(false);
		}

		let split_at = [
			(free < end).then_some(free),
			constraint_change(interval, position, register),
		]
		.into_iter()
		.flatten()
		.min();

		self.assign_register(current, register);
		if let Some(at) = split_at
			&& at < end
		{
			self.split_and_requeue(current, at)?;
		}

		Ok(true)
	}

	fn allocate_blocked(
		&mut self,
		current: IntervalId,
		position: Position,
	) -> Result<(), AllocError> {
		let read = self.read_registers(current);
		let intervals = self.config.intervals();
		let interval = &intervals[current];
		let end = interval.end()?;

		let registers = self.config.register_count();
		let mut use_pos = vec![Position::MAX; registers];
		let mut block_pos = vec![Position::MAX; registers];

		for register in read {
			let register = register as usize;
			use_pos[register] = position;
			block_pos[register] = position;
		}

		for &id in &self.active {
			let Some(register) = self.register_of(id) else {
				continue;
			};

			let register = register as usize;
			if self.is_fixed(id) {
				use_pos[register] = 0;
				block_pos[register] = 0;
			} else {
				let next = register_needed_from(&intervals[id], position);
				use_pos[register] = use_pos[register].min(next);
			}
		}

		for &id in &self.inactive {
			let Some(register) = self.register_of(id) else {
				continue;
			};

			let Some(at) = intervals[id].next_intersection(interval) else {
				continue;
			};

			let register = register as usize;
			if self.is_fixed(id) {
				block_pos[register] = block_pos[register].min(at);
				use_pos[register] = use_pos[register].min(at);
			} else {
				let next = register_needed_from(&intervals[id], position);
				use_pos[register] = use_pos[register].min(next);
			}
		}

		let first_use = register_needed_from(interval, position);
		let register =
			required_register(interval, position).unwrap_or_else(|| furthest(&use_pos));
		let index = register as usize;

		if first_use == position && use_pos[index] <= position {
			return Err(AllocError::Exhausted {
				interval: current,
				position,
			});
		}

		if first_use > use_pos[index] {
			trace!(%current, position, first_use, "spilling current interval");
			return self.spill_from(current, position);
		}

		let split_at = [
			(block_pos[index] < end).then_some(block_pos[index]),
			constraint_change(interval, position, register),
		]
		.into_iter()
		.flatten()
		.min();

		let evicted = self
			.active
			.iter()
			.copied()
			.filter(|&id| !self.is_fixed(id) && self.register_of(id) == Some(register))
			.chain(self.inactive.iter().copied().filter(|&id| {
				!self.is_fixed(id)
					&& self.register_of(id) == Some(register)
					&& intervals[id].intersects(interval)
			}))
			.collect::<Vec<_>>();

		self.assign_register(current, register);
		if let Some(at) = split_at
			&& at < end
		{
			self.split_and_requeue(current, at)?;
		}

		self.active.retain(|id| !evicted.contains(id));
		self.inactive.retain(|id| !evicted.contains(id));

		for id in evicted {
			trace!(%id, register, position, "evicting");
			self.spill_from(id, position)?;
		}

		Ok(())
	}

	/// Moves the part of `id` from `at` on into memory, up to where it next needs a register.
	fn spill_from(&mut self, id: IntervalId, at: Position) -> Result<(), AllocError> {
		let start = self.config.intervals()[id].start()?;

		let target = if at > start {
			let child = self.config.intervals_mut().split(id, at)?;
			self.handled.push(id);
			child
		} else {
			id
		};

		let start = self.config.intervals()[target].start()?;
		let needed = register_needed_from(&self.config.intervals()[target], start);

		if needed == Position::MAX {
			self.assign_spill(target);
		} else if needed > start {
			self.assign_spill(target);
			self.split_and_requeue(target, needed)?;
		} else if target == id {
			// requeueing the same piece would repeat this decision
			return Err(AllocError::Exhausted {
				interval: target,
				position: start,
			});
		} else {
			self.config.intervals_mut()[target].set_allocation(None);
			self.unhandled.push(Reverse((start, target)));
		}

		Ok(())
	}

	fn assign_register(&mut self, id: IntervalId, register: u32) {
		trace!(
			%id,
			register = self.config.register_name(register),
			"assigned register"
		);
		self.config.intervals_mut()[id].set_allocation(Some(Operand::fixed_register(register)));
		self.active.push(id);
	}

	fn assign_spill(&mut self, id: IntervalId) {
		let root = self.config.intervals().root_of(id);
		let slot = *self.spill_slots.entry(root).or_insert_with(|| {
			let slot = self.next_slot;
			self.next_slot += 1;
			slot
		});

		trace!(%id, slot, "spilled");
		self.config.intervals_mut()[id].set_allocation(Some(Operand::fixed_spill(slot)));
		self.handled.push(id);
	}

	fn split_and_requeue(
		&mut self,
		id: IntervalId,
		at: Position,
	) -> Result<IntervalId, AllocError> {
		let child = self.config.intervals_mut().split(id, at)?;
		let start = self.config.intervals()[child].start()?;
		self.unhandled.push(Reverse((start, child)));

		Ok(child)
	}
}

/// Uses no split can separate from `position`: those at it, and the last read of a piece that
/// ends one tick later.
fn head_uses(interval: &Interval, position: Position) -> impl Iterator<Item = &Use> {
	let last = interval.end().ok().filter(|&end| end == position + 1);

	interval
		.uses()
		.iter()
		.filter(move |u| u.pos == position || Some(u.pos) == last)
}

/// Register the head uses at `position` pin the interval to.
fn required_register(interval: &Interval, position: Position) -> Option<u32> {
	head_uses(interval, position).find_map(|u| u.value.as_fixed_register())
}

/// First position from which `interval` has to sit in a register. A register read at the end
/// is served by a piece starting one tick earlier.
fn register_needed_from(interval: &Interval, position: Position) -> Position {
	let Some(pos) = interval
		.first_use_after(position, Some(OperandKind::Register))
		.map(|u| u.pos)
	else {
		return Position::MAX;
	};

	match interval.end() {
		Ok(end) if pos >= end => end.saturating_sub(1).max(position),
		_ => pos,
	}
}

const fn serves(register: u32, operand: Operand) -> bool {
	match operand {
		Operand::Register(Some(pinned)) => pinned == register,
		Operand::Spill(..) => false,
		Operand::Register(None) | Operand::Any => true,
	}
}

/// Where to split so that a later use `register` cannot serve, a use pinned elsewhere or one
/// wanting memory, lands in a piece of its own.
fn constraint_change(interval: &Interval, position: Position, register: u32) -> Option<Position> {
	let end = interval.end().ok()?;

	interval
		.uses()
		.iter()
		.filter(|u| u.pos > position)
		.find(|u| !serves(register, u.value))
		.map(|u| u.pos.min(end.saturating_sub(1)))
		.filter(|&at| at > position)
}

/// Register with the highest position, lowest index on ties.
fn furthest(positions: &[Position]) -> u32 {
	let mut best = 0;
	for (i, &pos) in positions.iter().enumerate() {
		if pos > positions[best] {
			best = i;
		}
	}

	best as u32
}
