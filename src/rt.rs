//! # generator run time support
//!
//! the producer/consumer handoff and the per thread generator context
//!
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

thread_local! {
    // each producer thread records the context it is running for
    static CURRENT_CONTEXT: RefCell<Option<Box<dyn Any>>> = const { RefCell::new(None) };
}

/// generator error types
///
/// `Done` and `Panicked` are returned to the consumer, the others are
/// panic payloads raised inside the producer
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// the sequence is exhausted, also the `done!()` panic
    Done,
    /// Cancel panic
    Cancel,
    /// Type mismatch panic
    TypeErr,
    /// Wrong Context panic
    ContextErr,
    /// the generator function panicked with the message
    Panicked(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Done => write!(f, "generator is exhausted"),
            Error::Cancel => write!(f, "generator is cancelled"),
            Error::TypeErr => write!(f, "yield type mismatch"),
            Error::ContextErr => write!(f, "wrong generator context"),
            Error::Panicked(msg) => write!(f, "generator panicked: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// whose turn it is to run
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Turn {
    Producer,
    Consumer,
}

struct State<T> {
    turn: Turn,
    // the yielded value waiting for the consumer
    ret: Option<T>,
    cancelled: bool,
    // the producer has left the generator function
    finished: bool,
    // the thread that is allowed to yield
    owner: Option<ThreadId>,
    // propagate panic
    err: Option<Box<dyn Any + Send>>,
}

/// generator context
///
/// the rendezvous between the consumer and the producer thread, only one
/// side runs at a time and the other is parked on the condvar
pub struct Context<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
}

impl<T> Context<T> {
    /// return a fresh context, the producer is not allowed to run yet
    pub fn new() -> Self {
        Context {
            state: Mutex::new(State {
                turn: Turn::Consumer,
                ret: None,
                cancelled: false,
                finished: false,
                owner: None,
                err: None,
            }),
            cond: Condvar::new(),
        }
    }

    // user code never runs under the lock, so a poisoned lock is still consistent
    #[inline]
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn wait_turn<'a>(
        &self,
        state: MutexGuard<'a, State<T>>,
        turn: Turn,
    ) -> MutexGuard<'a, State<T>> {
        // spurious wake ups are absorbed by the predicate
        self.cond
            .wait_while(state, |s| s.turn != turn && !s.cancelled)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// bind the context to the current producer thread
    pub fn set_owner(&self, id: ThreadId) {
        self.lock().owner = Some(id);
    }

    /// park the producer until the first resume
    ///
    /// return false if the generator was cancelled before it got the turn
    pub fn wait_start(&self) -> bool {
        let state = self.lock();
        let state = self.wait_turn(state, Turn::Producer);
        !state.cancelled
    }

    /// producer side: hand over the value and park until the next resume
    ///
    /// a cancelled generator unwinds from here instead of parking
    pub fn yield_value(&self, v: T) {
        let mut state = self.lock();
        if state.owner != Some(thread::current().id()) {
            drop(state);
            error!("yield from none generator context");
            panic::panic_any(Error::ContextErr);
        }

        if state.cancelled {
            drop(state);
            raw_cancel();
        }

        state.ret = Some(v);
        state.turn = Turn::Consumer;
        self.cond.notify_all();

        let state = self.wait_turn(state, Turn::Producer);
        if state.cancelled {
            drop(state);
            raw_cancel();
        }
    }

    /// consumer side: give the turn to the producer and park until it
    /// yields a value or leaves the generator function
    pub fn resume(&self) -> Option<T> {
        let mut state = self.lock();
        if state.finished || state.cancelled {
            return None;
        }

        state.turn = Turn::Producer;
        self.cond.notify_all();

        let mut state = self.wait_turn(state, Turn::Consumer);
        if state.turn == Turn::Consumer {
            state.ret.take()
        } else {
            // woken by a cancel while the producer is still running
            None
        }
    }

    /// the producer left the generator function, wake the consumer for the last time
    pub fn exit(&self, err: Option<Box<dyn Any + Send>>) {
        let mut state = self.lock();
        state.finished = true;
        state.err = err;
        state.turn = Turn::Consumer;
        self.cond.notify_all();
    }

    /// request cancellation and wake up whoever is parked
    pub fn cancel(&self) {
        let mut state = self.lock();
        if !state.cancelled {
            state.cancelled = true;
            self.cond.notify_all();
        }
    }

    /// take the panic of the generator function if any
    pub fn take_err(&self) -> Option<Box<dyn Any + Send>> {
        self.lock().err.take()
    }

    /// the producer has left the generator function
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }
}

/// type erased cancel entry of a context
pub(crate) trait Cancel: Send + Sync {
    fn cancel(&self);
}

impl<T: Send> Cancel for Context<T> {
    fn cancel(&self) {
        Context::cancel(self)
    }
}

/// unregister the thread context when the producer leaves
pub struct ContextGuard {
    _priv: (),
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|cur| cur.borrow_mut().take());
    }
}

/// register `context` as the one the current thread produces for
///
/// a thread hosts exactly one generator, entering twice is a context error
pub fn enter_context<T: Send + 'static>(context: &Arc<Context<T>>) -> ContextGuard {
    CURRENT_CONTEXT.with(|cur| {
        let mut cur = cur.borrow_mut();
        if cur.is_some() {
            drop(cur);
            error!("generator entered from a running generator thread");
            panic::panic_any(Error::ContextErr);
        }
        let ctx: Box<dyn Any> = Box::new(context.clone());
        *cur = Some(ctx);
    });
    context.set_owner(thread::current().id());
    ContextGuard { _priv: () }
}

/// get the context of the generator running on this thread
pub fn current_context<T: 'static>() -> Arc<Context<T>> {
    CURRENT_CONTEXT.with(|cur| {
        let cur = cur.borrow();
        match cur.as_ref() {
            Some(ctx) => match ctx.downcast_ref::<Arc<Context<T>>>() {
                Some(ctx) => ctx.clone(),
                None => type_error::<T>("yield type mismatch error detected"),
            },
            None => {
                error!("yield from none generator context");
                panic::panic_any(Error::ContextErr)
            }
        }
    })
}

/// check the current context if it's generator
#[inline]
pub fn is_generator() -> bool {
    CURRENT_CONTEXT.with(|cur| cur.borrow().is_some())
}

#[inline]
#[cold]
fn type_error<A>(msg: &str) -> ! {
    error!("{msg}, expected type: {}", std::any::type_name::<A>());
    panic::panic_any(Error::TypeErr)
}

// unwind the generator function without invoking the panic hook
#[cold]
pub(crate) fn raw_cancel() -> ! {
    panic::resume_unwind(Box::new(Error::Cancel))
}

/// render a panic payload
pub(crate) fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(e) = cause.downcast_ref::<Error>() {
        e.to_string()
    } else if let Some(s) = cause.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
