use core::{
	error::Error as CoreError,
	fmt::{Display, Formatter, Result as FmtResult},
};

use linearscan_interval::IntervalError;
use linearscan_pipeline::{BlockId, NodeId, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
	Pipeline(PipelineError),
	Interval(IntervalError),
	NoFixedPoint {
		visits: usize,
	},
	PhiArity {
		phi: NodeId,
		block: BlockId,
		inputs: usize,
		predecessors: usize,
	},
}

impl Display for BuildError {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::Pipeline(..) => f.write_str("invalid pipeline"),
			Self::Interval(..) => f.write_str("an interval operation failed"),
			Self::NoFixedPoint { visits } => {
				write!(f, "liveness did not converge after {visits} block visits")
			}
			Self::PhiArity {
				phi,
				block,
				inputs,
				predecessors,
			} => write!(
				f,
				"phi #{phi} has {inputs} inputs but block #{block} has {predecessors} predecessors"
			),
		}
	}
}

impl CoreError for BuildError {
	fn source(&self) -> Option<&(dyn CoreError + 'static)> {
		match self {
			Self::Pipeline(e) => Some(e),
			Self::Interval(e) => Some(e),
			_ => None,
		}
	}
}

impl From<PipelineError> for BuildError {
	fn from(value: PipelineError) -> Self {
		Self::Pipeline(value)
	}
}

impl From<IntervalError> for BuildError {
	fn from(value: IntervalError) -> Self {
		Self::Interval(value)
	}
}
