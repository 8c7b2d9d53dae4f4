#![doc = include_str!("../README.md")]

#[cfg(feature = "cli")]
pub mod cli;
pub mod plot;
pub mod rt;
pub mod surveillance;
pub mod utils;

#[doc(inline)]
#[cfg(feature = "cli")]
pub use crate::cli::{Cli, Verbosity};
#[doc(inline)]
pub use crate::surveillance::Dataset;
