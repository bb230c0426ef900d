#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![no_std]

extern crate alloc;

mod opcode;

use core::{
	error::Error as CoreError,
	fmt::{Display, Formatter, Result as FmtResult, Write as _},
	str::FromStr,
};

use serde::{Deserialize, Serialize};

pub use self::opcode::*;

/// The kind of resource an operand lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandKind {
	Any,
	Register,
	Spill,
}

impl Display for OperandKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str(match self {
			Self::Any => "any",
			Self::Register => "register",
			Self::Spill => "spill",
		})
	}
}

impl FromStr for OperandKind {
	type Err = UnknownOperandKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"any" => Ok(Self::Any),
			"register" => Ok(Self::Register),
			"spill" => Ok(Self::Spill),
			_ => Err(UnknownOperandKind),
		}
	}
}

/// A resource requirement: either unconstrained, or a register/spill slot that may be
/// pinned to a specific index.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Operand {
	#[default]
	Any,
	Register(Option<u32>),
	Spill(Option<u32>),
}

impl Operand {
	#[must_use]
	pub const fn new(kind: OperandKind, value: Option<u32>) -> Self {
		match kind {
			OperandKind::Any => Self::Any,
			OperandKind::Register => Self::Register(value),
			OperandKind::Spill => Self::Spill(value),
		}
	}

	#[must_use]
	pub const fn any() -> Self {
		Self::Any
	}

	#[must_use]
	pub const fn register() -> Self {
		Self::Register(None)
	}

	#[must_use]
	pub const fn fixed_register(index: u32) -> Self {
		Self::Register(Some(index))
	}

	#[must_use]
	pub const fn spill() -> Self {
		Self::Spill(None)
	}

	#[must_use]
	pub const fn fixed_spill(slot: u32) -> Self {
		Self::Spill(Some(slot))
	}

	#[must_use]
	pub const fn kind(self) -> OperandKind {
		match self {
			Self::Any => OperandKind::Any,
			Self::Register(..) => OperandKind::Register,
			Self::Spill(..) => OperandKind::Spill,
		}
	}

	#[must_use]
	pub const fn value(self) -> Option<u32> {
		match self {
			Self::Any => None,
			Self::Register(value) | Self::Spill(value) => value,
		}
	}

	#[must_use]
	pub const fn as_fixed_register(self) -> Option<u32> {
		match self {
			Self::Register(value) => value,
			_ => None,
		}
	}

	#[must_use]
	pub const fn as_fixed_spill(self) -> Option<u32> {
		match self {
			Self::Spill(value) => value,
			_ => None,
		}
	}
}

impl Display for Operand {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		Display::fmt(&self.kind(), f)?;
		if let Some(value) = self.value() {
			f.write_char('(')?;
			Display::fmt(&value, f)?;
			f.write_char(')')?;
		}

		Ok(())
	}
}

impl From<OperandKind> for Operand {
	fn from(value: OperandKind) -> Self {
		Self::new(value, None)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownOperandKind;

impl Display for UnknownOperandKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str("operand kind must be one of `any`, `register` or `spill`")
	}
}

impl CoreError for UnknownOperandKind {}
