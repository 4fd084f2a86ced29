//! # generator
//!
//! Rust generator implementation
//!
//! every run of a generator owns a dedicated producer thread, the consumer
//! and the producer take turns through the run time [`Context`]
//!

use std::any::Any;
use std::fmt;
use std::panic;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::rt::{self, enter_context, Cancel, Context, Error};
use crate::scope::Scope;

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        /// default stack size of the producer thread, in bytes
        pub const DEFAULT_STACK_SIZE: usize = 0x4_0000;
    } else {
        /// default stack size of the producer thread, in bytes
        pub const DEFAULT_STACK_SIZE: usize = 0x2_0000;
    }
}

// name of the producer threads
const GENERATOR_THREAD_NAME: &str = "generator";

type GenFn<T> = dyn Fn(Scope<T>) + Send + Sync;

/// Generator helper
pub struct Gn {
    _priv: (),
}

impl Gn {
    /// create a scoped generator with default stack size
    pub fn new_scoped<T, F>(f: F) -> Generator<T>
    where
        F: Fn(Scope<T>) + Send + Sync + 'static,
        T: Send + 'static,
    {
        Self::new_scoped_opt(DEFAULT_STACK_SIZE, f)
    }

    /// create a scoped generator with specified stack size
    pub fn new_scoped_opt<T, F>(size: usize, f: F) -> Generator<T>
    where
        F: Fn(Scope<T>) + Send + Sync + 'static,
        T: Send + 'static,
    {
        Generator::with_fn(Arc::new(f), size)
    }

    /// create a new generator with default stack size
    ///
    /// the function yields with [`yield_with`](crate::yield_with)
    pub fn new<T, F>(f: F) -> Generator<T>
    where
        F: Fn() + Send + Sync + 'static,
        T: Send + 'static,
    {
        Self::new_opt(DEFAULT_STACK_SIZE, f)
    }

    /// create a new generator with specified stack size
    pub fn new_opt<T, F>(size: usize, f: F) -> Generator<T>
    where
        F: Fn() + Send + Sync + 'static,
        T: Send + 'static,
    {
        Self::new_scoped_opt(size, move |_: Scope<T>| f())
    }
}

/// the generator type
///
/// a generator is driven by exactly one consumer, every consuming method
/// takes `&mut self`. Dropping it cancels the producer and waits for the
/// producer thread to unwind.
pub struct Generator<T: Send + 'static> {
    // the generator function, shared by all the clones
    f: Arc<GenFn<T>>,
    stack_size: usize,
    // run time context of the current run
    context: Arc<Context<T>>,
    // the producer thread of the current run
    handle: Option<JoinHandle<()>>,
    started: bool,
    // value got by the last resume
    current: Option<T>,
    // the last resume result is not consumed yet
    moved: bool,
    // panic of the generator function waiting to be observed
    err: Option<Box<dyn Any + Send>>,
}

impl<T: Send + 'static> Generator<T> {
    fn with_fn(f: Arc<GenFn<T>>, stack_size: usize) -> Self {
        Generator {
            f,
            stack_size,
            context: Arc::new(Context::new()),
            handle: None,
            started: false,
            current: None,
            moved: false,
            err: None,
        }
    }

    /// launch the producer thread on first use
    fn ensure_started(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        let f = self.f.clone();
        let context = self.context.clone();
        let builder = thread::Builder::new()
            .name(GENERATOR_THREAD_NAME.to_owned())
            .stack_size(self.stack_size);

        match builder.spawn(move || gen_wrapper(f, context)) {
            Ok(handle) => {
                debug!("generator thread {:?} started", handle.thread().id());
                self.handle = Some(handle);
            }
            Err(e) => {
                error!("failed to spawn generator thread: {e}");
                let err: Box<dyn Any + Send> = Box::new(e.to_string());
                self.context.exit(Some(err));
            }
        }
    }

    /// resume the producer and wait for the next value
    fn advance(&mut self) {
        self.current = None;
        if !self.context.is_cancelled() {
            self.ensure_started();
            self.current = self.context.resume();
        }
        if self.current.is_none() {
            if let Some(err) = self.context.take_err() {
                self.err = Some(err);
            }
        }
        self.moved = true;
    }

    // consume the held value, resume first if it's already consumed
    fn pull(&mut self) -> Option<T> {
        if !self.moved {
            self.advance();
        }
        let ret = self.current.take();
        if ret.is_some() {
            self.moved = false;
        }
        ret
    }

    // a fault left by a producer that exited after the consumer was released
    fn take_fault(&mut self) -> Option<Box<dyn Any + Send>> {
        self.err.take().or_else(|| self.context.take_err())
    }

    /// check if there is a next value
    ///
    /// the producer is resumed at most once until the value is consumed,
    /// calling this repeatedly gives the same answer
    pub fn has_next(&mut self) -> bool {
        if !self.moved {
            self.advance();
        }
        self.current.is_some()
    }

    /// get the next value
    ///
    /// return `Error::Done` when the sequence is exhausted, and
    /// `Error::Panicked` once if the generator function panicked
    pub fn try_next(&mut self) -> Result<T, Error> {
        match self.pull() {
            Some(v) => Ok(v),
            None => match self.take_fault() {
                Some(cause) => Err(Error::Panicked(rt::panic_message(&*cause))),
                None => Err(Error::Done),
            },
        }
    }

    /// request cancellation
    ///
    /// the producer unwinds at its next yield, a consumer waiting for the
    /// next value returns with nothing
    pub fn cancel(&self) {
        debug!("generator cancel requested");
        self.context.cancel();
    }

    /// get a handle that cancels the current run from any thread
    pub fn canceller(&self) -> Canceller {
        Canceller {
            context: self.context.clone(),
        }
    }

    /// cancel the generator and wait for the producer thread to exit
    ///
    /// the wait only covers the unwinding of the generator function, plus
    /// the work before its next yield if a [`Canceller`] released the
    /// consumer in the middle of a resume
    pub fn close(&mut self) {
        self.context.cancel();
        if let Some(handle) = self.handle.take() {
            let id = handle.thread().id();
            if handle.join().is_err() {
                error!("generator thread {id:?} panicked while exiting");
            } else {
                trace!("generator thread {id:?} exited");
            }
        }
        if self.err.is_none() {
            self.err = self.context.take_err();
        }
    }

    /// reset the generator into a fresh, unstarted state
    ///
    /// a producer that is still suspended inside the generator function is
    /// cancelled and joined first, so the old run never leaks
    pub fn reset(&mut self) {
        if self.started && !self.context.is_finished() {
            warn!("generator is not done while reset");
        }
        self.close();
        if let Some(cause) = self.err.take() {
            error!(
                "generator panic is never observed: {}",
                rt::panic_message(&*cause)
            );
        }

        self.context = Arc::new(Context::new());
        self.started = false;
        self.current = None;
        self.moved = false;
    }

    /// the producer thread has been launched in this run
    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// is finished, either exhausted or cancelled
    #[inline]
    pub fn is_done(&self) -> bool {
        self.context.is_finished() || self.context.is_cancelled()
    }

    /// cancellation was requested in this run
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.context.is_cancelled()
    }
}

impl<T: Send + 'static> Drop for Generator<T> {
    fn drop(&mut self) {
        if self.started && !self.context.is_finished() {
            warn!("generator is not done while drop");
        }
        self.close();

        if let Some(cause) = self.err.take() {
            if !thread::panicking() {
                error!(
                    "generator panic is never observed: {}",
                    rt::panic_message(&*cause)
                );
            }
        }
    }
}

/// duplicate the generator
///
/// the copy shares only the generator function and starts fresh
impl<T: Send + 'static> Clone for Generator<T> {
    fn clone(&self) -> Self {
        Generator::with_fn(self.f.clone(), self.stack_size)
    }
}

impl<T: Send + 'static> Iterator for Generator<T> {
    type Item = T;
    // a panic of the generator function is resumed on the consumer
    fn next(&mut self) -> Option<T> {
        match self.pull() {
            Some(v) => Some(v),
            None => {
                if let Some(cause) = self.take_fault() {
                    panic::resume_unwind(cause);
                }
                None
            }
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Generator<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Generator<Output={}> {{ started: {}, done: {} }}",
            std::any::type_name::<T>(),
            self.started,
            self.is_done()
        )
    }
}

/// cancel handle of a generator run
///
/// it's bound to the run it was taken from, a `reset` starts a new run
#[derive(Clone)]
pub struct Canceller {
    context: Arc<dyn Cancel>,
}

impl Canceller {
    /// request cancellation of the generator run
    pub fn cancel(&self) {
        self.context.cancel();
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Canceller {{ ... }}")
    }
}

// the entry of the producer thread
fn gen_wrapper<T: Send + 'static>(f: Arc<GenFn<T>>, context: Arc<Context<T>>) {
    fn check_err(cause: Box<dyn Any + Send + 'static>) -> Option<Box<dyn Any + Send>> {
        if let Some(Error::Cancel | Error::Done) = cause.downcast_ref::<Error>() {
            // this is not an error at all, ignore it
            return None;
        }
        error!("panicked inside generator: {}", rt::panic_message(&*cause));
        Some(cause)
    }

    let ret = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let _guard = enter_context(&context);
        if context.wait_start() {
            f(Scope::new(context.clone()));
        }
    }));

    // always wake the consumer for the last time
    context.exit(ret.err().and_then(check_err));
    trace!("generator function exited");
}
