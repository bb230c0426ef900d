use alloc::string::String;
use core::{
	error::Error as CoreError,
	fmt::{Display, Formatter, Result as FmtResult},
};

use linearscan_pipeline::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
	Pipeline(PipelineError),
	DuplicateRegister(String),
	UnknownOperandKind { opcode: String, kind: String },
	UnknownRegister { opcode: String, name: String },
	RegisterOutOfRange { opcode: String, index: u32 },
	MalformedSpill { opcode: String, index: i64 },
	DuplicateClobber { opcode: String, register: u32 },
}

impl Display for ConfigError {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::Pipeline(..) => f.write_str("invalid pipeline"),
			Self::DuplicateRegister(name) => write!(f, "register `{name}` is declared twice"),
			Self::UnknownOperandKind { opcode, kind } => {
				write!(f, "opcode `{opcode}` uses unknown operand kind `{kind}`")
			}
			Self::UnknownRegister { opcode, name } => {
				write!(f, "opcode `{opcode}` pins unknown register `{name}`")
			}
			Self::RegisterOutOfRange { opcode, index } => {
				write!(f, "opcode `{opcode}` pins register #{index}, which is not configured")
			}
			Self::MalformedSpill { opcode, index } => {
				write!(f, "opcode `{opcode}` reserves invalid spill slot {index}")
			}
			Self::DuplicateClobber { opcode, register } => {
				write!(f, "opcode `{opcode}` clobbers register #{register} twice")
			}
		}
	}
}

impl CoreError for ConfigError {
	fn source(&self) -> Option<&(dyn CoreError + 'static)> {
		match self {
			Self::Pipeline(e) => Some(e),
			_ => None,
		}
	}
}

impl From<PipelineError> for ConfigError {
	fn from(value: PipelineError) -> Self {
		Self::Pipeline(value)
	}
}
