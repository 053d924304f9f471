//! Keyframe animation engine.
//!
//! This crate provides:
//! - **Timing**: delay, iterations, direction and fill resolved into phases
//!   and progress for any local time
//! - **Playback**: a play/pause/finish/reverse/cancel state machine with
//!   asynchronous `ready` and `finished` promises
//! - **Keyframes**: list and columnar keyframe input resolved into an
//!   ordered, offset-complete set
//! - **Interpolation**: numbers, numeric templates (`"10px 20px"`, colors)
//!   and discrete values, shaped by easing functions
//! - **Scheduling**: per-frame and per-checkpoint task queues that batch
//!   writes into a [`MutationSink`]
//!
//! # Architecture
//!
//! ```text
//! AnimationContext
//!   ├── frames scheduler ──► Animation::tick ──► KeyframeEffect::apply
//!   ├── checkpoint scheduler (settle after synchronous changes)
//!   ├── MicrotaskQueue (ready / finished continuations)
//!   ├── AnimationRegistry (weak handles, lookup by effect or timeline)
//!   └── MutationSink (staged writes, flushed once per tick)
//! ```
//!
//! Everything is single-threaded; shared state lives in `Rc<RefCell<_>>`.

pub mod animate;
pub mod animation;
pub mod context;
pub mod deferred;
pub mod easing;
pub mod effect;
pub mod error;
pub mod interpolate;
pub mod keyframes;
pub mod registry;
pub mod scheduler;
pub mod sink;
pub mod timeline;
pub mod timing;
pub mod types;

pub use animate::animate;
pub use animation::{Animation, AnimationCallback, PlayState, WeakAnimation};
pub use context::{AnimationContext, EngineConfig};
pub use deferred::{Deferred, MicrotaskQueue, Promise, PromiseState, Settlement};
pub use easing::{EasingFunction, EasingInput, StepPosition};
pub use effect::KeyframeEffect;
pub use error::{AbortError, AnimationError, ErrorCategory, Result};
pub use interpolate::{Interpolate, Template};
pub use keyframes::{ColumnarKeyframes, ComputedKeyframe, KeyframeInput, KeyframeSet, OffsetInput, RawKeyframe};
pub use registry::AnimationRegistry;
pub use scheduler::{FrameTask, ManualTickSource, Scheduler, TaskHandle, TickSource};
pub use sink::{MutationSink, SharedSink, TargetTable};
pub use timeline::Timeline;
pub use timing::{
    compute_timing, ComputedTiming, EffectDuration, EffectTiming, EffectTimingOptions, FillMode,
    IterationCount, Phase, PlaybackDirection,
};
pub use types::{
    AnimatedValue, AnimationDirection, AnimationId, EffectId, InterpolationKind, KeyframeValue,
    PropertyDescriptor, SetterKind, TargetId,
};
