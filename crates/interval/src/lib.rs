#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![no_std]

extern crate alloc;

mod arena;
mod error;
mod range;

use alloc::vec::Vec;
use core::{
	cmp, iter,
	fmt::{Display, Formatter, Result as FmtResult},
};

use linearscan_operand::{Operand, OperandKind};
pub use linearscan_pipeline::Position;
use linearscan_pipeline::NodeId;
use linearscan_utils::{InsertOrPush as _, define_index};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub use self::{arena::*, error::*, range::*};

define_index!(IntervalId);

/// Live ranges and use positions of one value, or of one piece of it after splitting.
///
/// Ranges stay sorted, pairwise disjoint and coalesced: two consecutive ranges always satisfy
/// `ranges[i].end < ranges[i + 1].start`. Uses stay sorted by position.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
	node: Option<NodeId>,
	ranges: Vec<LiveRange>,
	uses: Vec<Use>,
	parent: Option<IntervalId>,
	children: Vec<IntervalId>,
	allocation: Option<Operand>,
}

impl Interval {
	#[must_use]
	pub const fn new(node: Option<NodeId>) -> Self {
		Self {
			node,
			ranges: Vec::new(),
			uses: Vec::new(),
			parent: None,
			children: Vec::new(),
			allocation: None,
		}
	}

	#[must_use]
	pub const fn node(&self) -> Option<NodeId> {
		self.node
	}

	#[must_use]
	pub fn ranges(&self) -> &[LiveRange] {
		&self.ranges
	}

	#[must_use]
	pub fn uses(&self) -> &[Use] {
		&self.uses
	}

	#[must_use]
	pub const fn parent(&self) -> Option<IntervalId> {
		self.parent
	}

	#[must_use]
	pub fn children(&self) -> &[IntervalId] {
		&self.children
	}

	#[must_use]
	pub const fn allocation(&self) -> Option<Operand> {
		self.allocation
	}

	pub const fn set_allocation(&mut self, allocation: Option<Operand>) {
		self.allocation = allocation;
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.ranges.is_empty()
	}

	pub fn start(&self) -> Result<Position, IntervalError> {
		self.ranges
			.first()
			.map(|range| range.start)
			.ok_or(IntervalError::Empty)
	}

	pub fn end(&self) -> Result<Position, IntervalError> {
		self.ranges
			.last()
			.map(|range| range.end)
			.ok_or(IntervalError::Empty)
	}

	#[must_use]
	pub fn covers(&self, pos: Position) -> bool {
		let index = self.ranges.partition_point(|range| range.end <= pos);

		self.ranges
			.get(index)
			.is_some_and(|range| range.contains(pos))
	}

	/// Adds `[start, end)`, merging it with every range it touches. An empty span is ignored.
	///
	/// # Panics
	///
	/// When `start > end`.
	pub fn add_range(&mut self, start: Position, end: Position) {
		assert!(start <= end, "inverted range [{start};{end})");
		if start == end {
			return;
		}

		// ranges are mostly produced back to front
		match self.ranges.first() {
			None => self.ranges.push(LiveRange::new(start, end)),
			Some(first) if end < first.start => self.ranges.insert(0, LiveRange::new(start, end)),
			Some(..) => self.fill_range(start, end),
		}
	}

	/// Makes `[start, end)` covered without giving up any existing coverage. Every range
	/// touching the new span collapses into one.
	///
	/// # Panics
	///
	/// When `start > end`.
	pub fn fill_range(&mut self, start: Position, end: Position) {
		assert!(start <= end, "inverted range [{start};{end})");
		if start == end {
			return;
		}

		let lo = self.ranges.partition_point(|range| range.end < start);
		let hi = self.ranges.partition_point(|range| range.start <= end);

		if lo >= hi {
			self.ranges.insert_or_push(lo, LiveRange::new(start, end));
			return;
		}

		let merged = LiveRange::new(
			cmp::min(start, self.ranges[lo].start),
			cmp::max(end, self.ranges[hi - 1].end),
		);

		trace!(%merged, absorbed = hi - lo, "filling range");

		self.ranges.splice(lo..hi, iter::once(merged));
	}

	/// Moves the interval's first range start down to `start`. Never raises it.
	pub fn update_start(&mut self, start: Position) -> Result<(), IntervalError> {
		let first = self.ranges.first_mut().ok_or(IntervalError::Empty)?;

		if start < first.start {
			first.start = start;
		}

		Ok(())
	}

	/// Records a use at `pos`. Uses already at `pos` stay in front of the new one.
	pub fn add_use(&mut self, pos: Position, value: Operand) -> Use {
		let new_use = Use::new(pos, value);

		self.uses.insert_sorted_by_key(new_use, |u| u.pos);

		new_use
	}

	/// First use at or after `pos`, optionally restricted to one operand kind.
	#[must_use]
	pub fn first_use_after(&self, pos: Position, kind: Option<OperandKind>) -> Option<Use> {
		let index = self.uses.partition_point(|u| u.pos < pos);

		self.uses[index..]
			.iter()
			.copied()
			.find(|u| kind.is_none_or(|kind| u.value.kind() == kind))
	}

	/// First position covered by both `self` and `other`.
	#[must_use]
	pub fn next_intersection(&self, other: &Self) -> Option<Position> {
		let (mut i, mut j) = (0, 0);

		while let (Some(a), Some(b)) = (self.ranges.get(i), other.ranges.get(j)) {
			if a.end <= b.start {
				i += 1;
			} else if b.end <= a.start {
				j += 1;
			} else {
				return Some(cmp::max(a.start, b.start));
			}
		}

		None
	}

	#[must_use]
	pub fn intersects(&self, other: &Self) -> bool {
		self.next_intersection(other).is_some()
	}

	/// Cuts everything at or after `at` off into a new, unlinked interval. A use exactly at `at`
	/// moves with the tail. See [`Intervals::split`] for the linked version.
	pub fn split_off(&mut self, at: Position) -> Result<Self, IntervalError> {
		if let (Some(first), Some(last)) = (self.ranges.first(), self.ranges.last())
			&& !(first.start <= at && at < last.end)
		{
			return Err(IntervalError::SplitOutOfBounds {
				at,
				start: first.start,
				end: last.end,
			});
		}

		let index = self.ranges.partition_point(|range| range.end <= at);
		let mut tail_ranges = self.ranges.split_off(index);

		if let Some(straddling) = tail_ranges.first_mut()
			&& straddling.start < at
		{
			self.ranges.push(LiveRange::new(straddling.start, at));
			straddling.start = at;
		}

		let index = self.uses.partition_point(|u| u.pos < at);
		let tail_uses = self.uses.split_off(index);

		Ok(Self {
			node: self.node,
			ranges: tail_ranges,
			uses: tail_uses,
			parent: None,
			children: Vec::new(),
			allocation: None,
		})
	}
}

impl Display for Interval {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		for (i, range) in self.ranges.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}

			Display::fmt(range, f)?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use alloc::{string::ToString as _, vec::Vec};

	use linearscan_operand::{Operand, OperandKind};

	use super::{Interval, IntervalError, Intervals, LiveRange};

	fn bounds(interval: &Interval) -> Result<(u32, u32), IntervalError> {
		Ok((interval.start()?, interval.end()?))
	}

	fn assert_canonical(interval: &Interval) {
		for pair in interval.ranges().windows(2) {
			assert!(pair[0].end < pair[1].start, "{interval}");
		}
		assert!(interval.ranges().iter().all(|range| !range.is_empty()));
	}

	#[test]
	fn add_new_range() {
		let mut interval = Interval::new(None);
		interval.add_range(0, 1);
		assert_eq!(interval.ranges().len(), 1);

		interval.add_range(2, 3);

		assert_eq!(interval.ranges(), [LiveRange::new(0, 1), LiveRange::new(2, 3)]);
	}

	#[test]
	fn coalesce_to_previous_range() {
		let mut interval = Interval::new(None);
		interval.add_range(0, 1);
		interval.add_range(1, 2);

		assert_eq!(interval.ranges(), [LiveRange::new(0, 2)]);
	}

	#[test]
	fn coalesce_to_next_range() {
		let mut interval = Interval::new(None);
		interval.add_range(0, 1);
		interval.add_range(3, 4);
		interval.add_range(2, 3);

		assert_eq!(interval.ranges(), [LiveRange::new(0, 1), LiveRange::new(2, 4)]);
	}

	#[test]
	fn covers() {
		let mut interval = Interval::new(None);
		interval.add_range(0, 1);
		interval.add_range(3, 4);
		interval.add_range(2, 3);

		assert!(interval.covers(0));
		assert!(!interval.covers(1));
		assert!(interval.covers(2));
		assert!(interval.covers(3));
		assert!(!interval.covers(4));
	}

	#[test]
	fn update_start() -> Result<(), IntervalError> {
		let mut interval = Interval::new(None);
		interval.add_range(1, 2);
		interval.update_start(0)?;

		assert!(interval.covers(0));
		assert!(interval.covers(1));
		assert!(!interval.covers(2));

		interval.update_start(1)?;
		assert_eq!(interval.start()?, 0);

		Ok(())
	}

	#[test]
	fn empty_interval_has_no_bounds() {
		let mut interval = Interval::new(None);

		assert_eq!(interval.start(), Err(IntervalError::Empty));
		assert_eq!(interval.end(), Err(IntervalError::Empty));
		assert_eq!(interval.update_start(0), Err(IntervalError::Empty));
	}

	#[test]
	fn start_and_end() -> Result<(), IntervalError> {
		let mut interval = Interval::new(None);
		interval.add_range(0, 1);
		interval.add_range(2, 3);

		assert_eq!(bounds(&interval)?, (0, 3));

		Ok(())
	}

	#[test]
	fn empty_range_is_not_added() {
		let mut interval = Interval::new(None);
		interval.add_range(10, 10);
		interval.fill_range(10, 10);

		assert!(interval.is_empty());
	}

	#[test]
	#[should_panic(expected = "inverted range [5;3)")]
	fn inverted_range_panics() {
		Interval::new(None).add_range(5, 3);
	}

	#[test]
	#[should_panic(expected = "inverted range [5;3)")]
	fn inverted_fill_panics() {
		let mut interval = Interval::new(None);
		interval.add_range(0, 10);
		interval.fill_range(5, 3);
	}

	#[test]
	fn fill_empty_interval() -> Result<(), IntervalError> {
		let mut interval = Interval::new(None);
		interval.fill_range(0, 10);

		assert_eq!(bounds(&interval)?, (0, 10));

		Ok(())
	}

	#[test]
	fn fill_adds_chunks_at_either_side() -> Result<(), IntervalError> {
		let mut interval = Interval::new(None);
		interval.add_range(11, 12);
		interval.fill_range(0, 10);

		assert_eq!(interval.ranges().len(), 2);
		assert_eq!(bounds(&interval)?, (0, 12));

		let mut interval = Interval::new(None);
		interval.add_range(0, 10);
		interval.fill_range(11, 12);

		assert_eq!(interval.ranges().len(), 2);
		assert_eq!(bounds(&interval)?, (0, 12));

		Ok(())
	}

	#[test]
	fn fill_grows_interval() -> Result<(), IntervalError> {
		for ((start, end), (fill_start, fill_end)) in [
			((0, 10), (8, 12)),
			((8, 12), (0, 10)),
			((8, 10), (0, 12)),
			((8, 12), (0, 8)),
		] {
			let mut interval = Interval::new(None);
			interval.add_range(start, end);
			interval.fill_range(fill_start, fill_end);

			assert_eq!(interval.ranges().len(), 1);
			assert_eq!(bounds(&interval)?, (0, 12));
		}

		Ok(())
	}

	#[test]
	fn fill_consumes_middle_ranges() -> Result<(), IntervalError> {
		let mut interval = Interval::new(None);
		interval.add_range(8, 12);
		interval.add_range(6, 7);
		interval.add_range(3, 4);
		interval.add_range(0, 2);
		assert_eq!(interval.ranges().len(), 4);

		interval.fill_range(2, 9);

		assert_eq!(interval.ranges(), [LiveRange::new(0, 12)]);

		Ok(())
	}

	#[test]
	fn fill_never_shortens() -> Result<(), IntervalError> {
		let mut interval = Interval::new(None);
		interval.fill_range(0, 10);
		interval.fill_range(0, 6);

		assert_eq!(bounds(&interval)?, (0, 10));

		Ok(())
	}

	#[test]
	fn ranges_stay_canonical() {
		let mut interval = Interval::new(None);
		let mut covered = [false; 40];

		// deterministic scatter of overlapping, touching and disjoint spans
		for i in 0..25u32 {
			let start = (i * 7) % 33;
			let end = start + (i % 4);
			if i % 3 == 0 {
				interval.fill_range(start, end);
			} else {
				interval.add_range(start, end);
			}
			for slot in &mut covered[start as usize..end as usize] {
				*slot = true;
			}

			assert_canonical(&interval);
		}

		for (pos, covered) in covered.iter().enumerate() {
			assert_eq!(interval.covers(pos as u32), *covered, "position {pos}");
		}
	}

	#[test]
	fn uses_stay_sorted() {
		let mut interval = Interval::new(None);
		interval.add_use(3, Operand::any());
		interval.add_use(1, Operand::any());
		let added = interval.add_use(2, Operand::any());

		assert_eq!(added.pos, 2);
		assert_eq!(
			interval.uses().iter().map(|u| u.pos).collect::<Vec<_>>(),
			[1, 2, 3]
		);
	}

	#[test]
	fn first_use_after() {
		let mut interval = Interval::new(None);
		interval.add_use(3, Operand::any());
		interval.add_use(1, Operand::any());
		interval.add_use(2, Operand::any());

		assert_eq!(interval.first_use_after(1, None).map(|u| u.pos), Some(1));
		assert_eq!(interval.first_use_after(3, None).map(|u| u.pos), Some(3));
		assert_eq!(interval.first_use_after(0, None).map(|u| u.pos), Some(1));
		assert_eq!(interval.first_use_after(4, None), None);
	}

	#[test]
	fn filtered_first_use_after() {
		let mut interval = Interval::new(None);
		interval.add_use(1, Operand::any());
		interval.add_use(2, Operand::register());
		interval.add_use(3, Operand::any());

		let register = Some(OperandKind::Register);
		assert_eq!(interval.first_use_after(1, register).map(|u| u.pos), Some(2));
		assert_eq!(interval.first_use_after(3, register), None);
		assert_eq!(interval.first_use_after(0, register).map(|u| u.pos), Some(2));
		assert_eq!(interval.first_use_after(4, register), None);

		let mut previous = 0;
		for pos in 0..4 {
			if let Some(found) = interval.first_use_after(pos, None) {
				assert!(found.pos >= previous);
				previous = found.pos;
			}
		}
	}

	#[test]
	fn intersections() {
		let mut a = Interval::new(None);
		a.add_range(0, 4);
		a.add_range(10, 12);

		let mut b = Interval::new(None);
		b.add_range(4, 6);
		b.add_range(11, 20);

		assert_eq!(a.next_intersection(&b), Some(11));
		assert_eq!(b.next_intersection(&a), Some(11));

		let mut c = Interval::new(None);
		c.add_range(4, 10);
		assert!(!a.intersects(&c));
	}

	#[test]
	fn split_builds_flat_tree() -> Result<(), IntervalError> {
		let mut intervals = Intervals::new();
		let root = intervals.push(Interval::new(None));
		intervals[root].add_range(0, 40);

		let a = intervals.split(root, 10)?;
		let b = intervals.split(a, 20)?;
		let c = intervals.split(b, 30)?;

		for child in [a, b, c] {
			assert_eq!(intervals[child].parent(), Some(root));
			assert_eq!(intervals.root_of(child), root);
		}
		assert_eq!(intervals[root].children(), [a, b, c]);
		assert_eq!(intervals.family(root).collect::<Vec<_>>(), [root, a, b, c]);
		assert_eq!(intervals.history().len(), 3);
		assert_eq!(intervals.history()[1].interval, a);

		assert_eq!(bounds(&intervals[root])?, (0, 10));
		assert_eq!(bounds(&intervals[a])?, (10, 20));
		assert_eq!(bounds(&intervals[b])?, (20, 30));
		assert_eq!(bounds(&intervals[c])?, (30, 40));

		Ok(())
	}

	#[test]
	fn split_between_ranges() -> Result<(), IntervalError> {
		let mut interval = Interval::new(None);
		interval.add_range(0, 1);
		interval.add_range(2, 3);

		let child = interval.split_off(1)?;

		assert_eq!(bounds(&interval)?, (0, 1));
		assert_eq!(bounds(&child)?, (2, 3));

		Ok(())
	}

	#[test]
	fn split_inside_range() -> Result<(), IntervalError> {
		let mut interval = Interval::new(None);
		interval.add_range(0, 1);
		interval.add_range(2, 10);
		interval.add_range(12, 13);

		let child = interval.split_off(5)?;

		assert_eq!(bounds(&interval)?, (0, 5));
		assert!(interval.covers(0));
		assert!(!interval.covers(1));
		assert!(interval.covers(2));
		assert!(!interval.covers(5));

		assert_eq!(bounds(&child)?, (5, 13));
		assert!(child.covers(5));
		assert!(child.covers(9));
		assert!(!child.covers(10));
		assert!(child.covers(12));
		assert!(!child.covers(13));

		Ok(())
	}

	#[test]
	fn split_conserves_ranges_and_uses() -> Result<(), IntervalError> {
		let mut interval = Interval::new(None);
		interval.add_range(0, 3);
		interval.add_range(5, 9);
		for pos in [0, 2, 6, 6, 8] {
			interval.add_use(pos, Operand::any());
		}
		let before = interval.clone();

		let child = interval.split_off(6)?;

		let mut covered = interval.ranges().to_vec();
		covered.extend_from_slice(child.ranges());
		let mut rejoined = Interval::new(None);
		for range in covered {
			rejoined.add_range(range.start, range.end);
		}
		assert_eq!(rejoined.ranges(), before.ranges());

		assert_eq!(interval.uses().iter().map(|u| u.pos).collect::<Vec<_>>(), [0, 2]);
		assert_eq!(child.uses().iter().map(|u| u.pos).collect::<Vec<_>>(), [6, 6, 8]);
		assert_eq!(interval.end()?, 6);
		assert_eq!(child.start()?, 6);

		Ok(())
	}

	#[test]
	fn split_uses_without_ranges() -> Result<(), IntervalError> {
		let mut interval = Interval::new(None);
		interval.add_use(1, Operand::any());
		interval.add_use(3, Operand::any());
		interval.add_use(5, Operand::any());

		let child = interval.split_off(2)?;
		assert_eq!(interval.uses().iter().map(|u| u.pos).collect::<Vec<_>>(), [1]);
		assert_eq!(child.uses().iter().map(|u| u.pos).collect::<Vec<_>>(), [3, 5]);

		let mut interval = Interval::new(None);
		interval.add_use(1, Operand::any());
		interval.add_use(2, Operand::any());
		interval.add_use(3, Operand::any());

		let child = interval.split_off(2)?;
		assert_eq!(interval.uses().iter().map(|u| u.pos).collect::<Vec<_>>(), [1]);
		assert_eq!(child.uses().iter().map(|u| u.pos).collect::<Vec<_>>(), [2, 3]);

		Ok(())
	}

	#[test]
	fn split_out_of_bounds() {
		let mut interval = Interval::new(None);
		interval.add_range(4, 8);

		assert_eq!(
			interval.split_off(8),
			Err(IntervalError::SplitOutOfBounds {
				at: 8,
				start: 4,
				end: 8
			})
		);
		assert!(interval.split_off(2).is_err());
		assert_eq!(interval.to_string(), "[4;8)");
	}
}
