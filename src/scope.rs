//! # yield
//!
//! generator yield implementation
//!

use std::fmt;
use std::sync::Arc;

use crate::gen_impl::Generator;
use crate::rt::Context;

/// passed in scope type
/// it not use the thread local context to pass data, but keep it's own context ref
///
/// the scope only works on the producer thread it was given to, yielding
/// from any other thread panics with `Error::ContextErr`
pub struct Scope<T> {
    context: Arc<Context<T>>,
}

impl<T> Scope<T> {
    /// create a new scope object
    pub(crate) fn new(context: Arc<Context<T>>) -> Self {
        Scope { context }
    }

    /// yield something to the consumer
    ///
    /// it returns when the consumer asks for the next value, if the
    /// generator is cancelled meanwhile the generator function unwinds from here
    #[inline]
    pub fn yield_with(&mut self, v: T) {
        self.context.yield_value(v);
    }

    /// `yield_from`
    /// yield all the values of another generator with the same output type
    pub fn yield_from(&mut self, g: Generator<T>)
    where
        T: Send + 'static,
    {
        for v in g {
            self.yield_with(v);
        }
    }

    /// check if the consumer requested cancellation
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.context.is_cancelled()
    }
}

impl<T> fmt::Debug for Scope<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Scope<{}> {{ ... }}", std::any::type_name::<T>())
    }
}
