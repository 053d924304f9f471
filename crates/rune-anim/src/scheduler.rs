//! Per-tick task coalescing.
//!
//! A [`Scheduler`] keeps a FIFO of tasks keyed by identity. Requesting a
//! task that is already queued is a no-op; important tasks run ahead of
//! normal ones. The scheduler arms its [`TickSource`] when the queue goes
//! from empty to non-empty and disarms it once the queue drains.
//!
//! Each tick runs a snapshot of the queue taken when the tick starts, so a
//! task requested while the queue is draining waits for the next tick.
//! After the tasks have run, the sink is flushed once.
//!
//! The same type serves two roles: the frame scheduler, driven by a display
//! tick source, and the checkpoint scheduler, drained by the context at each
//! microtask checkpoint.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::sink::SharedSink;

/// A schedulable unit of work, called with the tick timestamp.
pub type FrameTask = Rc<dyn Fn(f64)>;

/// Handle returned by [`Scheduler::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(pub u64);

/// A recurring tick source outside the engine's control (a display refresh
/// callback, a timer, a test harness).
pub trait TickSource {
    fn arm(&mut self);
    fn disarm(&mut self);
}

#[derive(Debug, Default)]
struct ManualState {
    armed: Cell<bool>,
    arm_count: Cell<usize>,
    disarm_count: Cell<usize>,
}

/// A tick source that only records whether it is armed. The host drives
/// ticks itself, usually while [`is_armed`](ManualTickSource::is_armed).
///
/// Clones share state, so the host can keep one and hand one to the
/// scheduler.
#[derive(Debug, Clone, Default)]
pub struct ManualTickSource {
    state: Rc<ManualState>,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.state.armed.get()
    }

    pub fn arm_count(&self) -> usize {
        self.state.arm_count.get()
    }

    pub fn disarm_count(&self) -> usize {
        self.state.disarm_count.get()
    }
}

impl TickSource for ManualTickSource {
    fn arm(&mut self) {
        self.state.armed.set(true);
        self.state.arm_count.set(self.state.arm_count.get() + 1);
    }

    fn disarm(&mut self) {
        self.state.armed.set(false);
        self.state.disarm_count.set(self.state.disarm_count.get() + 1);
    }
}

struct Entry {
    handle: TaskHandle,
    important: bool,
    task: FrameTask,
}

/// Identity-keyed task queue drained once per tick.
pub struct Scheduler {
    name: &'static str,
    queue: RefCell<Vec<Entry>>,
    next_handle: Cell<u64>,
    source: RefCell<Box<dyn TickSource>>,
    armed: Cell<bool>,
    draining: Cell<bool>,
    sink: Option<SharedSink>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("queued", &self.len())
            .field("armed", &self.armed.get())
            .finish()
    }
}

impl Scheduler {
    pub fn new(name: &'static str, source: Box<dyn TickSource>) -> Self {
        Self {
            name,
            queue: RefCell::new(Vec::new()),
            next_handle: Cell::new(1),
            source: RefCell::new(source),
            armed: Cell::new(false),
            draining: Cell::new(false),
            sink: None,
        }
    }

    /// Flush `sink` at the end of every tick.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queue `task` for the next tick.
    ///
    /// Requesting a task that is already queued returns its existing handle
    /// and leaves its position and priority unchanged.
    pub fn request(&self, task: &FrameTask, important: bool) -> TaskHandle {
        let handle = {
            let mut queue = self.queue.borrow_mut();
            if let Some(entry) = queue.iter().find(|entry| Rc::ptr_eq(&entry.task, task)) {
                return entry.handle;
            }

            let handle = TaskHandle(self.next_handle.get());
            self.next_handle.set(handle.0 + 1);
            let entry = Entry {
                handle,
                important,
                task: Rc::clone(task),
            };
            if important {
                let position = queue.iter().take_while(|entry| entry.important).count();
                queue.insert(position, entry);
            } else {
                queue.push(entry);
            }
            handle
        };
        self.sync_source();
        handle
    }

    /// Remove `task` if it is queued.
    pub fn cancel(&self, task: &FrameTask) {
        let removed = {
            let mut queue = self.queue.borrow_mut();
            let before = queue.len();
            queue.retain(|entry| !Rc::ptr_eq(&entry.task, task));
            queue.len() != before
        };
        if removed {
            self.sync_source();
        }
    }

    pub fn is_scheduled(&self, task: &FrameTask) -> bool {
        self.queue.borrow().iter().any(|entry| Rc::ptr_eq(&entry.task, task))
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    /// Run every task queued when the tick starts, then flush the sink.
    ///
    /// A task canceled by an earlier task in the same tick does not run.
    pub fn tick(&self, timestamp: f64) {
        let snapshot: Vec<FrameTask> = self
            .queue
            .borrow()
            .iter()
            .map(|entry| Rc::clone(&entry.task))
            .collect();
        log::trace!("{} tick at {timestamp}: {} tasks", self.name, snapshot.len());

        self.draining.set(true);
        for task in snapshot {
            let still_queued = {
                let mut queue = self.queue.borrow_mut();
                match queue.iter().position(|entry| Rc::ptr_eq(&entry.task, &task)) {
                    Some(position) => {
                        queue.remove(position);
                        true
                    }
                    None => false,
                }
            };
            if still_queued {
                task(timestamp);
            }
        }
        self.draining.set(false);

        if let Some(sink) = &self.sink {
            sink.borrow_mut().flush();
        }
        self.sync_source();
    }

    /// Arm or disarm the tick source to match the queue. Deferred while a
    /// tick is draining so the source does not flap.
    fn sync_source(&self) {
        if self.draining.get() {
            return;
        }
        let wanted = !self.is_empty();
        if wanted == self.armed.get() {
            return;
        }
        self.armed.set(wanted);
        let mut source = self.source.borrow_mut();
        if wanted {
            log::debug!("{}: arming tick source", self.name);
            source.arm();
        } else {
            log::debug!("{}: disarming tick source", self.name);
            source.disarm();
        }
    }
}
