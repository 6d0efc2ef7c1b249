//! Enumerates every strictly increasing combination of `length` positive
//! values that sums to a target, and streams the results into paginated files
//! without ever holding the full result set in memory.
//!
//! The pieces compose bottom-up:
//!
//! - [`resolve_bound`] picks the default per-element bound.
//! - [`CombinationGenerator`] runs the backtracking search and drains results
//!   in fixed-size [`Batch`]es.
//! - [`PagedSink`] rotates rows through pages and files on a
//!   [`store::Store`].
//! - [`CombinationFinder`] wires them together; [`find_combinations`] is the
//!   one-call entry point.
//!
//! ```no_run
//! let total = summands::find_combinations(30, 3, 0, "out", |n| println!("{n} found"))?;
//! println!("{total} combinations");
//! # Ok::<(), summands::Error>(())
//! ```

mod bound;
mod combination;
mod error;
mod finder;
mod generator;
mod params;
mod sink;
pub mod store;

pub use crate::bound::*;
pub use crate::combination::*;
pub use crate::error::*;
pub use crate::finder::*;
pub use crate::generator::*;
pub use crate::params::*;
pub use crate::sink::*;

/// Numeric type of targets, bounds and combination elements.
pub type Value = u64;
