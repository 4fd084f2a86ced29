//! # yieldgen
//!
//! Rust generator library backed by a producer thread
//!
//! the generator function runs on its own thread and can yield from any
//! depth of its call stack, the consumer pulls the values lazily as an
//! iterator. Exactly one side runs at a time.
//!
//! ```
//! use yieldgen::Gn;
//!
//! let g = Gn::new_scoped(|mut s| {
//!     for i in 0..3 {
//!         s.yield_with(i);
//!     }
//! });
//! assert_eq!(g.collect::<Vec<_>>(), vec![0, 1, 2]);
//! ```
//!

#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod gen_impl;
mod rt;
mod scope;
mod yield_;

pub use crate::gen_impl::{Canceller, Generator, Gn, DEFAULT_STACK_SIZE};
pub use crate::rt::{is_generator, Error};
pub use crate::scope::Scope;
pub use crate::yield_::{done, yield_from, yield_with};

/// finish the generator function early
///
/// the consumer sees the sequence exhausted, as if the function returned
#[macro_export]
macro_rules! done {
    () => {
        $crate::done()
    };
}
