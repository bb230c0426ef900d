use core::{
	error::Error as CoreError,
	fmt::{Display, Formatter, Result as FmtResult},
};

use linearscan_interval::{IntervalError, IntervalId, Position};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
	Interval(IntervalError),
	/// `interval` needs a register at `position` and every register is taken there.
	Exhausted {
		interval: IntervalId,
		position: Position,
	},
	/// The uses `interval` serves at `position` want two different locations.
	Conflict {
		interval: IntervalId,
		position: Position,
	},
	NoProgress {
		steps: usize,
	},
}

impl Display for AllocError {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::Interval(..) => f.write_str("an interval operation failed"),
			Self::Exhausted { interval, position } => write!(
				f,
				"no register left for interval #{interval} at position {position}"
			),
			Self::Conflict { interval, position } => write!(
				f,
				"interval #{interval} is constrained to two locations at position {position}"
			),
			Self::NoProgress { steps } => {
				write!(f, "allocation made no progress after {steps} steps")
			}
		}
	}
}

impl CoreError for AllocError {
	fn source(&self) -> Option<&(dyn CoreError + 'static)> {
		match self {
			Self::Interval(e) => Some(e),
			_ => None,
		}
	}
}

impl From<IntervalError> for AllocError {
	fn from(value: IntervalError) -> Self {
		Self::Interval(value)
	}
}
