//! Single-threaded futures for `ready` and `finished`.
//!
//! A [`Deferred`] owns the settle side; it hands out [`Promise`] handles to
//! observers. Continuations registered with [`Promise::then`] never run
//! inline: they are queued on the [`MicrotaskQueue`] and run at the next
//! checkpoint, strictly after the call that settled the promise returns.
//!
//! [`Deferred::reset`] swaps in a fresh pending promise. Handles obtained
//! before the reset keep observing the old one.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::error::AbortError;

/// A queued continuation.
pub type Microtask = Box<dyn FnOnce()>;

/// FIFO of continuations run at each checkpoint. Clones share the queue.
#[derive(Clone, Default)]
pub struct MicrotaskQueue {
    queue: Rc<RefCell<VecDeque<Microtask>>>,
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue").field("len", &self.len()).finish()
    }
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Run queued microtasks until the queue is empty, including those
    /// queued along the way. Returns how many ran.
    pub fn run(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// Observable state of a [`Promise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected(AbortError),
}

/// Outcome passed to continuations.
pub type Settlement = std::result::Result<(), AbortError>;

type Reaction = Box<dyn FnOnce(Settlement)>;

struct PromiseInner {
    state: PromiseState,
    reactions: Vec<Reaction>,
    observed: bool,
}

/// A read-only handle on a settle-once value.
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<PromiseInner>>,
    microtasks: MicrotaskQueue,
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").field("state", &self.state()).finish()
    }
}

impl Promise {
    fn pending(microtasks: MicrotaskQueue) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseInner {
                state: PromiseState::Pending,
                reactions: Vec::new(),
                observed: false,
            })),
            microtasks,
        }
    }

    pub fn state(&self) -> PromiseState {
        self.inner.borrow().state
    }

    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    /// Whether both handles observe the same promise.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a continuation. It runs on the microtask queue once the
    /// promise settles, or at the next checkpoint if it already has.
    pub fn then(&self, reaction: impl FnOnce(Settlement) + 'static) {
        let settled = {
            let mut inner = self.inner.borrow_mut();
            inner.observed = true;
            match inner.state {
                PromiseState::Pending => {
                    inner.reactions.push(Box::new(reaction));
                    return;
                }
                PromiseState::Fulfilled => Ok(()),
                PromiseState::Rejected(reason) => Err(reason),
            }
        };
        self.microtasks.enqueue(move || reaction(settled));
    }

    fn settle(&self, outcome: Settlement) -> bool {
        let reactions = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != PromiseState::Pending {
                return false;
            }
            inner.state = match outcome {
                Ok(()) => PromiseState::Fulfilled,
                Err(reason) => PromiseState::Rejected(reason),
            };
            if let Err(reason) = outcome {
                if !inner.observed {
                    // Nobody is listening; an abort is expected and swallowed.
                    log::debug!("unobserved rejection: {reason}");
                }
            }
            std::mem::take(&mut inner.reactions)
        };
        for reaction in reactions {
            self.microtasks.enqueue(move || reaction(outcome));
        }
        true
    }
}

/// The settle side of a [`Promise`].
#[derive(Debug)]
pub struct Deferred {
    promise: Promise,
    microtasks: MicrotaskQueue,
}

impl Deferred {
    pub fn new(microtasks: MicrotaskQueue) -> Self {
        Self {
            promise: Promise::pending(microtasks.clone()),
            microtasks,
        }
    }

    /// A handle on the current promise.
    pub fn promise(&self) -> Promise {
        self.promise.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.promise.is_pending()
    }

    /// Fulfill the current promise. Returns `false` if it already settled.
    pub fn resolve(&self) -> bool {
        self.promise.settle(Ok(()))
    }

    /// Reject the current promise. Returns `false` if it already settled.
    pub fn reject(&self, reason: AbortError) -> bool {
        self.promise.settle(Err(reason))
    }

    /// Replace the current promise with a fresh pending one.
    pub fn reset(&mut self) {
        self.promise = Promise::pending(self.microtasks.clone());
    }
}
