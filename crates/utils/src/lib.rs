#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "index")]
#[macro_use]
mod index;
#[cfg(feature = "insert_or_push")]
mod insert_or_push;

#[cfg(feature = "insert_or_push")]
pub use self::insert_or_push::*;
