//! The engine context.
//!
//! An [`AnimationContext`] owns everything animations share: the microtask
//! queue behind `ready`/`finished`, the frame and checkpoint schedulers, the
//! mutation sink and the animation registry. Nothing is global; every
//! animation holds the context it was created in.
//!
//! The host drives the context through two entry points:
//! - [`AnimationContext::tick`] once per display frame;
//! - [`AnimationContext::run_microtasks`] after any synchronous batch of
//!   calls, to let promise continuations and settle points run.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::animation::Animation;
use crate::deferred::MicrotaskQueue;
use crate::interpolate::DEFAULT_PRECISION;
use crate::registry::AnimationRegistry;
use crate::scheduler::{ManualTickSource, Scheduler, TickSource};
use crate::sink::SharedSink;
use crate::timeline::Timeline;
use crate::types::{EffectId, SetterKind};

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Decimal places kept on numbers written into text values.
    pub precision: u32,
    /// Setter used for properties whose keyframes do not name one.
    pub default_setter: SetterKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            default_setter: SetterKind::Style,
        }
    }
}

pub struct AnimationContext {
    config: EngineConfig,
    microtasks: MicrotaskQueue,
    frames: Scheduler,
    checkpoint: Scheduler,
    sink: SharedSink,
    registry: RefCell<AnimationRegistry>,
    last_timestamp: Cell<f64>,
}

impl AnimationContext {
    /// Create a context whose frame scheduler arms `frame_source`.
    pub fn new(config: EngineConfig, sink: SharedSink, frame_source: impl TickSource + 'static) -> Rc<Self> {
        Rc::new(Self {
            config,
            microtasks: MicrotaskQueue::new(),
            frames: Scheduler::new("frames", Box::new(frame_source)).with_sink(sink.clone()),
            checkpoint: Scheduler::new("checkpoint", Box::new(ManualTickSource::new()))
                .with_sink(sink.clone()),
            sink,
            registry: RefCell::new(AnimationRegistry::new()),
            last_timestamp: Cell::new(0.0),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn microtasks(&self) -> &MicrotaskQueue {
        &self.microtasks
    }

    /// The scheduler drained once per display frame.
    pub fn frames(&self) -> &Scheduler {
        &self.frames
    }

    /// The scheduler drained once per microtask checkpoint.
    pub fn checkpoint(&self) -> &Scheduler {
        &self.checkpoint
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Timestamp of the most recent frame.
    pub fn last_timestamp(&self) -> f64 {
        self.last_timestamp.get()
    }

    /// Run one display frame: drain the frame scheduler, flush, then run a
    /// microtask checkpoint.
    pub fn tick(&self, timestamp: f64) {
        self.last_timestamp.set(timestamp);
        self.frames.tick(timestamp);
        self.run_microtasks();
    }

    /// Run a microtask checkpoint: pending continuations, then one drain of
    /// the checkpoint scheduler, then whatever that queued.
    pub fn run_microtasks(&self) {
        self.microtasks.run();
        if !self.checkpoint.is_empty() {
            self.checkpoint.tick(self.last_timestamp.get());
        }
        self.microtasks.run();
    }

    pub(crate) fn register(&self, animation: &Animation) {
        self.registry.borrow_mut().add(animation);
    }

    /// The live animation currently playing `effect`.
    pub fn find_by_effect(&self, effect: EffectId) -> Option<Animation> {
        self.registry.borrow().find_by_effect(effect)
    }

    /// Tick every live animation attached to `timeline`, outside the frame
    /// scheduler. Returns how many were ticked.
    pub fn update_all(&self, timeline: &Rc<Timeline>, timestamp: f64) -> usize {
        let ticks = self.registry.borrow_mut().ticks_for(timeline);
        for tick in &ticks {
            tick(timestamp);
        }
        ticks.len()
    }

    /// Number of live registered animations.
    pub fn animation_count(&self) -> usize {
        self.registry.borrow_mut().prune();
        self.registry.borrow().len()
    }
}
