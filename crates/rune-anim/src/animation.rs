//! The playback state machine.
//!
//! An [`Animation`] plays one [`KeyframeEffect`] against a [`Timeline`]. Its
//! current time is derived: a hold time, when set, wins; otherwise it is
//! `(timeline time - start time) * playback rate`. Play and pause do not
//! complete synchronously. They leave a pending task that the next frame
//! resolves with the timeline's time as the ready time.
//!
//! Two tasks are registered per animation:
//! - the per-tick update on the frame scheduler, re-requested while running;
//! - the settle task on the checkpoint scheduler, which applies the effect
//!   once after a batch of synchronous state changes.
//!
//! Callbacks (`onfinish`, `oncancel`) always run after the animation's own
//! state borrow has been released, so they may call back into it.

use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::context::AnimationContext;
use crate::deferred::{Deferred, Promise};
use crate::effect::KeyframeEffect;
use crate::error::{AbortError, AnimationError, Result};
use crate::scheduler::FrameTask;
use crate::timeline::Timeline;
use crate::types::AnimationId;

/// Callback invoked with the animation that fired it.
pub type AnimationCallback = Rc<dyn Fn(&Animation)>;

/// Derived playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingTask {
    Play,
    Pause,
}

struct State {
    effect: Option<Rc<KeyframeEffect>>,
    timeline: Option<Rc<Timeline>>,
    playback_rate: f64,
    start_time: Option<f64>,
    hold_time: Option<f64>,
    previous_current_time: Option<f64>,
    pending: Option<PendingTask>,
    ready: Deferred,
    finished: Deferred,
    /// Bumped whenever a finish notification is scheduled or invalidated.
    finish_token: u64,
    onfinish: Option<AnimationCallback>,
    oncancel: Option<AnimationCallback>,
}

impl State {
    fn timeline_time(&self) -> Option<f64> {
        self.timeline.as_ref()?.current_time()
    }

    /// Current time ignoring the hold time.
    fn timeline_current_time(&self) -> Option<f64> {
        let timeline_time = self.timeline_time()?;
        let start_time = self.start_time?;
        Some((timeline_time - start_time) * self.playback_rate)
    }

    fn current_time(&self) -> Option<f64> {
        self.hold_time.or_else(|| self.timeline_current_time())
    }

    fn effect_end(&self) -> f64 {
        self.effect
            .as_ref()
            .map_or(0.0, |effect| effect.timing().end_time())
    }

    fn play_state(&self) -> PlayState {
        let current_time = self.current_time();
        if current_time.is_none() && self.start_time.is_none() && self.pending.is_none() {
            return PlayState::Idle;
        }
        if self.pending == Some(PendingTask::Pause)
            || (self.start_time.is_none() && self.pending != Some(PendingTask::Play))
        {
            return PlayState::Paused;
        }
        if let Some(time) = current_time {
            let rate = self.playback_rate;
            if (rate > 0.0 && time >= self.effect_end()) || (rate < 0.0 && time <= 0.0) {
                return PlayState::Finished;
            }
        }
        PlayState::Running
    }

    /// Seek without re-evaluating the finished state.
    fn set_current_time_silently(&mut self, seek_time: f64) {
        let timeline_time = self.timeline_time();
        match timeline_time {
            Some(timeline_time)
                if self.hold_time.is_none() && self.start_time.is_some() && self.playback_rate != 0.0 =>
            {
                self.start_time = Some(timeline_time - seek_time / self.playback_rate);
            }
            _ => self.hold_time = Some(seek_time),
        }
        if timeline_time.is_none() {
            self.start_time = None;
        }
        self.previous_current_time = None;
    }

    fn commit_pending_play(&mut self, ready_time: f64) {
        let rate = self.playback_rate;
        if let Some(hold_time) = self.hold_time {
            self.start_time = Some(if rate == 0.0 {
                ready_time
            } else {
                ready_time - hold_time / rate
            });
            if rate != 0.0 {
                self.hold_time = None;
            }
        } else if self.start_time.is_none() {
            self.start_time = Some(ready_time);
        }
        self.pending = None;
        self.ready.resolve();
    }

    fn commit_pending_pause(&mut self, ready_time: f64) {
        if let (Some(start_time), None) = (self.start_time, self.hold_time) {
            self.hold_time = Some((ready_time - start_time) * self.playback_rate);
        }
        self.start_time = None;
        self.pending = None;
        self.ready.resolve();
    }

    /// Pin the hold time at the boundary when playback has run past it, or
    /// release it when playback is back inside. Returns whether the
    /// animation is now finished.
    fn update_finished(&mut self, did_seek: bool) -> bool {
        let unconstrained = if did_seek {
            self.current_time()
        } else {
            self.timeline_current_time()
        };

        if let (Some(time), Some(_), None) = (unconstrained, self.start_time, self.pending) {
            let rate = self.playback_rate;
            let end = self.effect_end();
            if rate > 0.0 && time >= end {
                self.hold_time = Some(if did_seek {
                    time
                } else {
                    self.previous_current_time.map_or(end, |previous| previous.max(end))
                });
            } else if rate < 0.0 && time <= 0.0 {
                self.hold_time = Some(if did_seek {
                    time
                } else {
                    self.previous_current_time.map_or(0.0, |previous| previous.min(0.0))
                });
            } else if rate != 0.0 {
                if let Some(timeline_time) = self.timeline_time() {
                    if let (true, Some(hold_time)) = (did_seek, self.hold_time) {
                        self.start_time = Some(timeline_time - hold_time / rate);
                    }
                    self.hold_time = None;
                }
            }
        }

        self.previous_current_time = self.current_time();
        let finished = self.play_state() == PlayState::Finished;
        if !finished && !self.finished.is_pending() {
            self.finished.reset();
        }
        finished
    }
}

struct Shared {
    id: AnimationId,
    context: Rc<AnimationContext>,
    state: RefCell<State>,
    tick_task: FrameTask,
    settle_task: FrameTask,
}

/// A handle on an animation. Clones refer to the same animation.
#[derive(Clone)]
pub struct Animation {
    shared: Rc<Shared>,
}

/// A non-owning handle on an animation.
#[derive(Clone)]
pub struct WeakAnimation {
    shared: Weak<Shared>,
}

impl WeakAnimation {
    pub fn upgrade(&self) -> Option<Animation> {
        self.shared.upgrade().map(|shared| Animation { shared })
    }

    pub fn is_live(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Animation")
            .field("id", &self.shared.id)
            .field("play_state", &state.play_state())
            .field("current_time", &state.current_time())
            .field("start_time", &state.start_time)
            .field("playback_rate", &state.playback_rate)
            .finish()
    }
}

impl Animation {
    /// Create an idle animation and register it with `context`.
    ///
    /// An effect already played by another animation is detached from it
    /// first.
    pub fn new(
        context: &Rc<AnimationContext>,
        effect: Option<Rc<KeyframeEffect>>,
        timeline: Option<Rc<Timeline>>,
    ) -> Self {
        if let Some(owner) = effect.as_ref().and_then(|effect| effect.animation()) {
            owner.set_effect(None);
        }

        let shared = Rc::new_cyclic(|weak: &Weak<Shared>| {
            let tick_task: FrameTask = {
                let weak = weak.clone();
                Rc::new(move |timestamp| {
                    if let Some(shared) = weak.upgrade() {
                        Animation { shared }.tick(timestamp);
                    }
                })
            };
            let settle_task: FrameTask = {
                let weak = weak.clone();
                Rc::new(move |_| {
                    if let Some(shared) = weak.upgrade() {
                        Animation { shared }.apply_effect();
                    }
                })
            };
            if let Some(effect) = &effect {
                effect.attach(WeakAnimation { shared: weak.clone() });
            }

            let microtasks = context.microtasks().clone();
            // The ready promise starts out resolved.
            let ready = Deferred::new(microtasks.clone());
            ready.resolve();

            Shared {
                id: AnimationId::new(),
                context: Rc::clone(context),
                state: RefCell::new(State {
                    effect,
                    timeline,
                    playback_rate: 1.0,
                    start_time: None,
                    hold_time: None,
                    previous_current_time: None,
                    pending: None,
                    ready,
                    finished: Deferred::new(microtasks),
                    finish_token: 0,
                    onfinish: None,
                    oncancel: None,
                }),
                tick_task,
                settle_task,
            }
        });

        let animation = Animation { shared };
        context.register(&animation);
        log::debug!("animation {} created", animation.id().0);
        animation
    }

    fn state(&self) -> Ref<'_, State> {
        self.shared.state.borrow()
    }

    fn state_mut(&self) -> RefMut<'_, State> {
        self.shared.state.borrow_mut()
    }

    pub fn id(&self) -> AnimationId {
        self.shared.id
    }

    pub fn context(&self) -> Rc<AnimationContext> {
        Rc::clone(&self.shared.context)
    }

    pub fn downgrade(&self) -> WeakAnimation {
        WeakAnimation {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Whether both handles refer to the same animation.
    pub fn ptr_eq(&self, other: &Animation) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// The per-tick update as a schedulable task.
    pub fn tick_task(&self) -> FrameTask {
        Rc::clone(&self.shared.tick_task)
    }

    // ==================================================================
    // Read-only state
    // ==================================================================

    pub fn play_state(&self) -> PlayState {
        self.state().play_state()
    }

    /// Whether a play or pause is waiting for its ready time.
    pub fn pending(&self) -> bool {
        self.state().pending.is_some()
    }

    pub fn current_time(&self) -> Option<f64> {
        self.state().current_time()
    }

    pub fn start_time(&self) -> Option<f64> {
        self.state().start_time
    }

    pub fn playback_rate(&self) -> f64 {
        self.state().playback_rate
    }

    pub fn effect(&self) -> Option<Rc<KeyframeEffect>> {
        self.state().effect.clone()
    }

    pub fn timeline(&self) -> Option<Rc<Timeline>> {
        self.state().timeline.clone()
    }

    /// The current ready promise.
    pub fn ready(&self) -> Promise {
        self.state().ready.promise()
    }

    /// The current finished promise.
    pub fn finished(&self) -> Promise {
        self.state().finished.promise()
    }

    pub fn set_onfinish(&self, callback: Option<AnimationCallback>) {
        self.state_mut().onfinish = callback;
    }

    pub fn set_oncancel(&self, callback: Option<AnimationCallback>) {
        self.state_mut().oncancel = callback;
    }

    // ==================================================================
    // Playback control
    // ==================================================================

    /// Start or resume playback.
    ///
    /// Rewinds to the start (or to the end when playing backwards) when the
    /// current time is unresolved or outside the range playback can move
    /// through. Fails when playing backwards into an infinite end.
    pub fn play(&self) -> Result<()> {
        {
            let mut state = self.state_mut();
            let aborted_pause = state.pending == Some(PendingTask::Pause);
            let rate = state.playback_rate;
            let end = state.effect_end();
            let current_time = state.current_time();

            let seek_time = if rate > 0.0 && current_time.is_none_or(|time| time < 0.0 || time >= end) {
                Some(0.0)
            } else if rate < 0.0 && current_time.is_none_or(|time| time <= 0.0 || time > end) {
                if end == f64::INFINITY {
                    return Err(AnimationError::PlayReverseInfinite);
                }
                Some(end)
            } else if rate == 0.0 && current_time.is_none() {
                Some(0.0)
            } else {
                None
            };

            if state.hold_time.is_none() && seek_time.is_none() && !aborted_pause && state.pending.is_none() {
                return Ok(());
            }

            if let Some(seek_time) = seek_time {
                state.hold_time = Some(seek_time);
            }
            if state.hold_time.is_some() {
                state.start_time = None;
            }
            let had_pending = state.pending.take().is_some();
            if !had_pending {
                state.ready.reset();
            }
            state.pending = Some(PendingTask::Play);
            log::debug!("animation {}: play pending (hold {:?})", self.id().0, state.hold_time);
        }
        self.update_finished_state(false, false);
        self.schedule_update();
        Ok(())
    }

    /// Pause playback. A no-op when already paused or a pause is pending.
    pub fn pause(&self) -> Result<()> {
        {
            let mut state = self.state_mut();
            if state.pending == Some(PendingTask::Pause) || state.play_state() == PlayState::Paused {
                return Ok(());
            }

            if state.current_time().is_none() {
                let seek_time = if state.playback_rate >= 0.0 {
                    0.0
                } else {
                    let end = state.effect_end();
                    if end == f64::INFINITY {
                        return Err(AnimationError::PauseReverseInfinite);
                    }
                    end
                };
                state.hold_time = Some(seek_time);
                state.start_time = None;
            }

            let superseded_play = state.pending.take() == Some(PendingTask::Play);
            if !superseded_play {
                state.ready.reset();
            }
            state.pending = Some(PendingTask::Pause);
            log::debug!("animation {}: pause pending", self.id().0);
        }
        self.update_finished_state(false, false);
        self.schedule_update();
        Ok(())
    }

    /// Jump to the end (or the start when playing backwards) and finish now.
    ///
    /// Finish notification runs synchronously, before this returns.
    pub fn finish(&self) -> Result<()> {
        {
            let mut state = self.state_mut();
            let rate = state.playback_rate;
            let end = state.effect_end();
            if rate == 0.0 {
                return Err(AnimationError::FinishWithZeroRate);
            }
            if rate > 0.0 && end == f64::INFINITY {
                return Err(AnimationError::FinishInfinite);
            }

            let limit = if rate > 0.0 { end } else { 0.0 };
            state.set_current_time_silently(limit);

            if state.start_time.is_none() {
                if let Some(timeline_time) = state.timeline_time() {
                    state.start_time = Some(timeline_time - limit / rate);
                }
            }
            match state.pending {
                Some(PendingTask::Pause) if state.start_time.is_some() => {
                    state.hold_time = None;
                    state.pending = None;
                    state.ready.resolve();
                }
                Some(PendingTask::Play) if state.start_time.is_some() => {
                    state.pending = None;
                    state.ready.resolve();
                }
                _ => {}
            }
            log::debug!("animation {}: finish at {limit}", self.id().0);
        }
        self.update_finished_state(true, true);
        self.request_settle();
        Ok(())
    }

    /// Flip the playback direction and play.
    ///
    /// On failure the playback rate and times are restored.
    pub fn reverse(&self) -> Result<()> {
        let saved = {
            let mut state = self.state_mut();
            if state.timeline.is_none() {
                return Err(AnimationError::NoTimeline);
            }
            let saved = (
                state.playback_rate,
                state.start_time,
                state.hold_time,
                state.previous_current_time,
            );
            let current_time = state.current_time();
            state.playback_rate = -state.playback_rate;
            if let Some(time) = current_time {
                state.set_current_time_silently(time);
            }
            saved
        };

        if let Err(err) = self.play() {
            let mut state = self.state_mut();
            (
                state.playback_rate,
                state.start_time,
                state.hold_time,
                state.previous_current_time,
            ) = saved;
            return Err(err);
        }
        Ok(())
    }

    /// Stop playback, drop the effect's values and reject outstanding
    /// promises. A no-op when already idle.
    pub fn cancel(&self) {
        let (effect, callback) = {
            let mut state = self.state_mut();
            if state.play_state() == PlayState::Idle {
                return;
            }
            if state.pending.take().is_some() {
                state.ready.reject(AbortError);
                state.ready.reset();
            }
            state.finished.reject(AbortError);
            state.finished.reset();
            state.hold_time = None;
            state.start_time = None;
            state.previous_current_time = None;
            state.finish_token += 1;
            (state.effect.clone(), state.oncancel.clone())
        };
        log::debug!("animation {}: canceled", self.id().0);

        let context = &self.shared.context;
        if let Some(effect) = effect {
            effect.restore(context.sink());
        }
        context.frames().cancel(&self.shared.tick_task);
        context.checkpoint().cancel(&self.shared.settle_task);

        if let Some(callback) = callback {
            callback(self);
        }
    }

    // ==================================================================
    // Setters
    // ==================================================================

    /// Seek. Setting `None` is only allowed while the current time is
    /// already unresolved.
    ///
    /// Seeking while a pause is pending completes the pause in place.
    pub fn set_current_time(&self, time: Option<f64>) -> Result<()> {
        {
            let mut state = self.state_mut();
            let Some(time) = time else {
                if state.current_time().is_some() {
                    return Err(AnimationError::UnresolvedCurrentTime);
                }
                return Ok(());
            };

            state.set_current_time_silently(time);
            if state.pending == Some(PendingTask::Pause) {
                state.hold_time = Some(time);
                state.start_time = None;
                state.pending = None;
                state.ready.resolve();
            }
        }
        self.update_finished_state(true, false);
        self.schedule_update();
        Ok(())
    }

    /// Set the start time directly. Any pending task is resolved without
    /// computing a ready time.
    pub fn set_start_time(&self, start_time: Option<f64>) {
        {
            let mut state = self.state_mut();
            if state.timeline_time().is_none() && start_time.is_some() {
                state.hold_time = None;
            }
            let previous_current_time = state.current_time();
            state.start_time = start_time;
            match start_time {
                Some(_) if state.playback_rate != 0.0 => state.hold_time = None,
                Some(_) => {}
                None => state.hold_time = previous_current_time,
            }
            if state.pending.take().is_some() {
                state.ready.resolve();
            }
        }
        self.update_finished_state(true, false);
        self.schedule_update();
    }

    /// Change the playback rate, keeping the current time where it is.
    pub fn set_playback_rate(&self, rate: f64) {
        {
            let mut state = self.state_mut();
            let previous_time = state.current_time();
            state.playback_rate = rate;
            if let Some(time) = previous_time {
                state.set_current_time_silently(time);
            }
        }
        self.update_finished_state(true, false);
        self.schedule_update();
    }

    /// Replace the effect. The old effect's values are restored.
    pub fn set_effect(&self, effect: Option<Rc<KeyframeEffect>>) {
        let old = self.effect();
        let unchanged = match (&old, &effect) {
            (Some(old), Some(new)) => Rc::ptr_eq(old, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        if let Some(owner) = effect.as_ref().and_then(|effect| effect.animation()) {
            owner.set_effect(None);
        }
        if let Some(old) = &old {
            old.restore(self.shared.context.sink());
            old.detach();
        }
        if let Some(new) = &effect {
            new.attach(self.downgrade());
        }
        self.state_mut().effect = effect;

        self.update_finished_state(false, false);
        self.schedule_update();
    }

    pub fn set_timeline(&self, timeline: Option<Rc<Timeline>>) {
        {
            let mut state = self.state_mut();
            let unchanged = match (&state.timeline, &timeline) {
                (Some(old), Some(new)) => Rc::ptr_eq(old, new),
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                return;
            }
            state.timeline = timeline;
            if state.start_time.is_some() {
                state.hold_time = None;
            }
        }
        self.update_finished_state(false, false);
        self.schedule_update();
    }

    /// Called by the effect after its timing or keyframes were replaced.
    pub(crate) fn effect_changed(&self) {
        self.update_finished_state(false, false);
        self.schedule_update();
    }

    // ==================================================================
    // Ticking
    // ==================================================================

    /// The per-tick update.
    ///
    /// Advances the timeline, resolves the pending task with the timeline's
    /// time, re-evaluates the finished state and applies the effect. Asks
    /// for another tick only while attached to an active timeline and either
    /// running or holding a pending task.
    pub fn tick(&self, timestamp: f64) {
        if let Some(timeline) = self.timeline() {
            timeline.update(timestamp);
        }

        {
            let mut state = self.state_mut();
            if let (Some(pending), Some(ready_time)) = (state.pending, state.timeline_time()) {
                match pending {
                    PendingTask::Play => state.commit_pending_play(ready_time),
                    PendingTask::Pause => state.commit_pending_pause(ready_time),
                }
                log::debug!(
                    "animation {}: {pending:?} ready at {ready_time}",
                    self.id().0
                );
            }
        }

        self.update_finished_state(false, false);
        self.apply_effect();

        let keep_ticking = {
            let state = self.state();
            state.timeline_time().is_some()
                && (state.play_state() == PlayState::Running || state.pending.is_some())
        };
        if keep_ticking {
            self.shared.context.frames().request(&self.shared.tick_task, false);
        } else {
            log::trace!("animation {}: stopped ticking", self.id().0);
        }
    }

    /// Stage the effect's values at the current time.
    fn apply_effect(&self) {
        let (effect, local_time, rate) = {
            let state = self.state();
            (state.effect.clone(), state.current_time(), state.playback_rate)
        };
        let Some(effect) = effect else {
            return;
        };

        let context = &self.shared.context;
        let computed = effect.computed_timing_at(local_time, rate);
        if let Err(err) = effect.apply(context.sink(), context.config(), &computed) {
            log::warn!(
                "animation {}: failed to sample effect {} on {}: {err}",
                self.id().0,
                effect.id().0,
                effect.target()
            );
        }
    }

    fn request_settle(&self) {
        self.shared
            .context
            .checkpoint()
            .request(&self.shared.settle_task, false);
    }

    fn schedule_update(&self) {
        self.request_settle();
        let should_tick = {
            let state = self.state();
            state.play_state() == PlayState::Running || state.pending.is_some()
        };
        if should_tick {
            self.shared.context.frames().request(&self.shared.tick_task, false);
        }
    }

    /// Re-evaluate the finished state and schedule (or run) the finish
    /// notification when the animation has just become finished.
    fn update_finished_state(&self, did_seek: bool, synchronous: bool) {
        let notify_now = {
            let mut state = self.state_mut();
            let finished = state.update_finished(did_seek);
            if finished && state.finished.is_pending() {
                state.finish_token += 1;
                if synchronous {
                    true
                } else {
                    let token = state.finish_token;
                    let weak = self.downgrade();
                    self.shared.context.microtasks().enqueue(move || {
                        if let Some(animation) = weak.upgrade() {
                            animation.finish_notification(Some(token));
                        }
                    });
                    false
                }
            } else {
                false
            }
        };
        if notify_now {
            self.finish_notification(None);
        }
    }

    /// Resolve `finished` and fire `onfinish`. A deferred notification whose
    /// token is stale, or that finds the animation no longer finished, does
    /// nothing.
    fn finish_notification(&self, token: Option<u64>) {
        let (effect, callback, pending) = {
            let state = self.state();
            if token.is_some_and(|token| token != state.finish_token) {
                return;
            }
            if state.play_state() != PlayState::Finished || !state.finished.is_pending() {
                return;
            }
            state.finished.resolve();
            (state.effect.clone(), state.onfinish.clone(), state.pending.is_some())
        };
        log::debug!("animation {}: finished", self.id().0);

        let context = &self.shared.context;
        if let Some(effect) = effect {
            if !effect.timing().fill.resolve().applies_forwards() {
                effect.restore(context.sink());
            }
        }
        // A pending task still needs a frame to resolve.
        if !pending {
            context.frames().cancel(&self.shared.tick_task);
        }

        if let Some(callback) = callback {
            callback(self);
        }
    }
}
