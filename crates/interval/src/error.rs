use core::{
	error::Error as CoreError,
	fmt::{Display, Formatter, Result as FmtResult},
};

use super::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalError {
	Empty,
	SplitOutOfBounds {
		at: Position,
		start: Position,
		end: Position,
	},
}

impl Display for IntervalError {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::Empty => f.write_str("interval has no ranges"),
			Self::SplitOutOfBounds { at, start, end } => {
				write!(f, "cannot split interval [{start};{end}) at {at}")
			}
		}
	}
}

impl CoreError for IntervalError {}
