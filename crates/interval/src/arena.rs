use alloc::vec::Vec;
use core::{
	iter,
	ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{Interval, IntervalError, IntervalId, Position};

/// One entry of the split log: `interval` was truncated at `at`, its tail became `child`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
	pub interval: IntervalId,
	pub child: IntervalId,
	pub at: Position,
}

/// Append-only storage for every interval of one allocation run.
///
/// Parent and child links are ids into this arena. Splitting truncates the split interval in
/// place, appends the tail as a new entry and logs the split; nothing is ever removed.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Intervals {
	storage: Vec<Interval>,
	history: Vec<Split>,
}

impl Intervals {
	#[must_use]
	pub const fn new() -> Self {
		Self {
			storage: Vec::new(),
			history: Vec::new(),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.storage.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.storage.is_empty()
	}

	pub fn push(&mut self, interval: Interval) -> IntervalId {
		let id = IntervalId::new(self.storage.len());
		self.storage.push(interval);
		id
	}

	pub fn ids(&self) -> impl DoubleEndedIterator<Item = IntervalId> + ExactSizeIterator {
		(0..self.storage.len()).map(IntervalId::new)
	}

	pub fn iter(&self) -> impl Iterator<Item = (IntervalId, &Interval)> {
		self.storage
			.iter()
			.enumerate()
			.map(|(i, interval)| (IntervalId::new(i), interval))
	}

	#[must_use]
	pub fn history(&self) -> &[Split] {
		&self.history
	}

	/// The unsplit interval `id` descends from (itself for roots).
	#[must_use]
	pub fn root_of(&self, id: IntervalId) -> IntervalId {
		self[id].parent().unwrap_or(id)
	}

	/// `root` followed by its children in the order they were split off.
	pub fn family(&self, root: IntervalId) -> impl Iterator<Item = IntervalId> + '_ {
		iter::once(root).chain(self[root].children().iter().copied())
	}

	/// Splits `id` at `at` and returns the new tail. The tail's parent is the root of `id`, so
	/// repeated splits keep a flat tree.
	pub fn split(&mut self, id: IntervalId, at: Position) -> Result<IntervalId, IntervalError> {
		let root = self.root_of(id);

		let mut child = self[id].split_off(at)?;
		child.parent = Some(root);

		let child_id = self.push(child);
		self[root].children.push(child_id);
		self.history.push(Split {
			interval: id,
			child: child_id,
			at,
		});

		trace!(%id, child = %child_id, at, "split interval");

		Ok(child_id)
	}
}

impl Index<IntervalId> for Intervals {
	type Output = Interval;

	fn index(&self, index: IntervalId) -> &Self::Output {
		&self.storage[index.index()]
	}
}

impl IndexMut<IntervalId> for Intervals {
	fn index_mut(&mut self, index: IntervalId) -> &mut Self::Output {
		&mut self.storage[index.index()]
	}
}

impl FromIterator<Interval> for Intervals {
	fn from_iter<T>(iter: T) -> Self
	where
		T: IntoIterator<Item = Interval>,
	{
		Self {
			storage: Vec::from_iter(iter),
			history: Vec::new(),
		}
	}
}
