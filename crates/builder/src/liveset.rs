use alloc::{vec, vec::Vec};
use core::fmt::{Display, Formatter, Result as FmtResult, Write as _};

use linearscan_pipeline::NodeId;

type Bits = u64;

/// Dense set of value nodes, one bit per node.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LiveSet {
	bits: Vec<Bits>,
}

impl LiveSet {
	const BITS: usize = core::mem::size_of::<Bits>() * 8;

	#[must_use]
	pub fn empty(num_nodes: usize) -> Self {
		Self {
			bits: vec![0; num_nodes.div_ceil(Self::BITS)],
		}
	}

	const fn split_index(node: NodeId) -> (usize, usize) {
		let index = node.0 as usize;
		(index >> Self::BITS.ilog2(), index & (Self::BITS - 1))
	}

	#[must_use]
	pub fn contains(&self, node: NodeId) -> bool {
		let (index, bit) = Self::split_index(node);
		self.bits
			.get(index)
			.is_some_and(|bits| !matches!(bits & (1 << bit), 0))
	}

	/// Returns `true` when `node` was not in the set yet.
	pub fn insert(&mut self, node: NodeId) -> bool {
		let (index, bit) = Self::split_index(node);
		if index >= self.bits.len() {
			self.bits.resize(index + 1, 0);
		}

		let mask = 1 << bit;
		let fresh = matches!(self.bits[index] & mask, 0);
		self.bits[index] |= mask;
		fresh
	}

	pub fn remove(&mut self, node: NodeId) {
		let (index, bit) = Self::split_index(node);
		if let Some(bits) = self.bits.get_mut(index) {
			*bits &= !(1 << bit);
		}
	}

	/// Returns `true` when the set grew.
	pub fn union_from(&mut self, other: &Self) -> bool {
		if other.bits.len() > self.bits.len() {
			self.bits.resize(other.bits.len(), 0);
		}

		let mut changed = false;
		for (bits, other) in self.bits.iter_mut().zip(&other.bits) {
			let merged = *bits | other;
			changed |= merged != *bits;
			*bits = merged;
		}

		changed
	}

	pub fn subtract(&mut self, other: &Self) {
		for (bits, other) in self.bits.iter_mut().zip(&other.bits) {
			*bits &= !other;
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.bits.iter().all(|bits| matches!(bits, 0))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.bits.iter().map(|bits| bits.count_ones() as usize).sum()
	}

	#[must_use]
	pub const fn iter(&self) -> LiveSetIter<'_> {
		LiveSetIter {
			bits: self.bits.as_slice(),
			current: 0,
			index: 0,
			loaded: false,
		}
	}
}

impl Display for LiveSet {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_char('{')?;
		for (i, node) in self.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}

			Display::fmt(&node, f)?;
		}

		f.write_char('}')
	}
}

impl FromIterator<NodeId> for LiveSet {
	fn from_iter<T>(iter: T) -> Self
	where
		T: IntoIterator<Item = NodeId>,
	{
		let mut set = Self::default();
		for node in iter {
			set.insert(node);
		}

		set
	}
}

impl<'a> IntoIterator for &'a LiveSet {
	type IntoIter = LiveSetIter<'a>;
	type Item = NodeId;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Ascending iterator over a [`LiveSet`].
pub struct LiveSetIter<'a> {
	bits: &'a [Bits],
	current: Bits,
	index: usize,
	loaded: bool,
}

impl Iterator for LiveSetIter<'_> {
	type Item = NodeId;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			if !self.loaded {
				self.current = *self.bits.get(self.index)?;
				self.loaded = true;
			}

			if !matches!(self.current, 0) {
				let bit = self.current.trailing_zeros();
				self.current &= !(1 << bit);
				break Some(NodeId::new(bit as usize + self.index * LiveSet::BITS));
			}

			self.index += 1;
			self.loaded = false;
		}
	}
}
