//! # yield
//!
//! generator yield implementation without a scope
//!

use crate::gen_impl::Generator;
use crate::rt::{current_context, is_generator, Error};

/// yield something to the consumer of the generator running on this thread
///
/// it can be called from any nested function of the generator function,
/// calling it outside a generator panics with `Error::ContextErr` and a
/// type different from the generator output panics with `Error::TypeErr`
#[inline]
pub fn yield_with<T: Send + 'static>(v: T) {
    current_context::<T>().yield_value(v);
}

/// `yield_from`
/// yield all the values of another generator with the same output type
pub fn yield_from<T: Send + 'static>(g: Generator<T>) {
    let context = current_context::<T>();
    for v in g {
        context.yield_value(v);
    }
}

/// finish the generator function early, as if it returned normally
///
/// this is what `done!()` expands to
pub fn done() -> ! {
    if !is_generator() {
        error!("done from none generator context");
        std::panic::panic_any(Error::ContextErr);
    }
    // no panic hook output, the producer wrapper takes it as a normal exit
    std::panic::resume_unwind(Box::new(Error::Done))
}
