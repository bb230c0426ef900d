/// Defines a `u32` index newtype with an invalid sentinel, used for node, block and interval ids.
///
/// The expansion derives `serde` traits, so the calling crate must depend on `serde`.
#[macro_export]
macro_rules! define_index {
	($(#[$meta:meta])* $ix:ident) => {
		$(#[$meta])*
		#[derive(
			Debug,
			Clone,
			Copy,
			PartialEq,
			Eq,
			PartialOrd,
			Ord,
			Hash,
			::serde::Serialize,
			::serde::Deserialize,
		)]
		#[repr(transparent)]
		#[serde(transparent)]
		pub struct $ix(pub u32);

		impl $ix {
			#[inline(always)]
			#[must_use]
			pub const fn new(i: usize) -> Self {
				Self(i as u32)
			}

			#[must_use]
			#[inline(always)]
			pub fn index(self) -> usize {
				debug_assert!(self.is_valid());
				self.0 as usize
			}

			#[must_use]
			#[inline(always)]
			pub const fn invalid() -> Self {
				Self(u32::MAX)
			}

			#[must_use]
			#[inline(always)]
			pub const fn is_valid(self) -> bool {
				self.0 != u32::MAX
			}

			#[must_use]
			#[inline(always)]
			pub const fn raw_u32(self) -> u32 {
				self.0
			}
		}

		impl ::core::fmt::Display for $ix {
			fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
				::core::fmt::Display::fmt(&self.0, f)
			}
		}

		impl From<usize> for $ix {
			fn from(value: usize) -> Self {
				Self::new(value)
			}
		}

		impl From<$ix> for usize {
			fn from(value: $ix) -> Self {
				value.index()
			}
		}
	};
}
