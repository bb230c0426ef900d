use core::fmt::{Display, Formatter, Result as FmtResult, Write as _};

use linearscan_operand::Operand;
use serde::{Deserialize, Serialize};

use super::Position;

/// Half-open span `[start, end)` of positions. Never empty once stored in an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LiveRange {
	pub start: Position,
	pub end: Position,
}

impl LiveRange {
	#[must_use]
	pub const fn new(start: Position, end: Position) -> Self {
		debug_assert!(start < end);
		Self { start, end }
	}

	#[must_use]
	pub const fn contains(self, pos: Position) -> bool {
		self.start <= pos && pos < self.end
	}

	#[must_use]
	pub const fn is_empty(self) -> bool {
		self.start >= self.end
	}
}

impl Display for LiveRange {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_char('[')?;
		Display::fmt(&self.start, f)?;
		f.write_char(';')?;
		Display::fmt(&self.end, f)?;
		f.write_char(')')
	}
}

/// A demand for the value at `pos`, constrained by `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Use {
	pub pos: Position,
	pub value: Operand,
}

impl Use {
	#[must_use]
	pub const fn new(pos: Position, value: Operand) -> Self {
		Self { pos, value }
	}
}

impl Display for Use {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		Display::fmt(&self.pos, f)?;
		f.write_char(':')?;
		Display::fmt(&self.value, f)
	}
}
