//! Keyframe effects.
//!
//! A [`KeyframeEffect`] binds a target, a resolved keyframe list and a
//! validated timing snapshot. Both the keyframes and the timing are held
//! behind `Rc` and replaced wholesale on update, never edited in place.
//!
//! The effect keeps a weak back-reference to the animation playing it so it
//! can answer [`computed_timing`](KeyframeEffect::computed_timing) on its
//! own. The animation itself always passes local time and rate explicitly
//! through [`computed_timing_at`](KeyframeEffect::computed_timing_at).

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::animation::{Animation, WeakAnimation};
use crate::context::EngineConfig;
use crate::error::{AnimationError, Result};
use crate::keyframes::{KeyframeInput, KeyframeSet};
use crate::sink::SharedSink;
use crate::timing::{compute_timing, ComputedTiming, EffectTiming, EffectTimingOptions};
use crate::types::{AnimatedValue, AnimationDirection, EffectId, PropertyDescriptor, TargetId};

struct TimingCache {
    timing: Rc<EffectTiming>,
    local_time: Option<f64>,
    direction: AnimationDirection,
    computed: ComputedTiming,
}

/// Underlying values captured before the effect's first write, used for
/// implicit boundary keyframes.
#[derive(Default)]
struct AppliedState {
    base: HashMap<String, AnimatedValue>,
}

pub struct KeyframeEffect {
    id: EffectId,
    target: TargetId,
    timing: RefCell<Rc<EffectTiming>>,
    keyframes: RefCell<Rc<KeyframeSet>>,
    owner: RefCell<Option<WeakAnimation>>,
    cache: RefCell<Option<TimingCache>>,
    applied: RefCell<Option<AppliedState>>,
}

impl fmt::Debug for KeyframeEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyframeEffect")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("timing", &self.timing.borrow())
            .field("keyframes", &self.keyframes.borrow().len())
            .finish()
    }
}

impl KeyframeEffect {
    /// Validate timing options and resolve keyframes.
    pub fn new(
        target: impl Into<TargetId>,
        keyframes: &KeyframeInput,
        options: &EffectTimingOptions,
    ) -> Result<Self> {
        let timing = EffectTiming::from_options(options)?;
        let keyframes = KeyframeSet::resolve(keyframes)?;
        Ok(Self {
            id: EffectId::new(),
            target: target.into(),
            timing: RefCell::new(Rc::new(timing)),
            keyframes: RefCell::new(Rc::new(keyframes)),
            owner: RefCell::new(None),
            cache: RefCell::new(None),
            applied: RefCell::new(None),
        })
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn target(&self) -> &TargetId {
        &self.target
    }

    /// The current timing snapshot.
    pub fn timing(&self) -> Rc<EffectTiming> {
        Rc::clone(&self.timing.borrow())
    }

    /// Apply timing options on top of the current timing. On error the
    /// timing is unchanged.
    pub fn update_timing(&self, options: &EffectTimingOptions) -> Result<()> {
        let updated = self.timing().updated(options)?;
        *self.timing.borrow_mut() = Rc::new(updated);
        self.notify_owner();
        Ok(())
    }

    pub fn keyframes(&self) -> Rc<KeyframeSet> {
        Rc::clone(&self.keyframes.borrow())
    }

    /// Re-resolve and replace the keyframes. On error they are unchanged.
    pub fn set_keyframes(&self, input: &KeyframeInput) -> Result<()> {
        let resolved = KeyframeSet::resolve(input)?;
        *self.keyframes.borrow_mut() = Rc::new(resolved);
        self.notify_owner();
        Ok(())
    }

    /// The animation currently playing this effect.
    pub fn animation(&self) -> Option<Animation> {
        self.owner.borrow().as_ref().and_then(WeakAnimation::upgrade)
    }

    pub(crate) fn attach(&self, owner: WeakAnimation) {
        *self.owner.borrow_mut() = Some(owner);
    }

    pub(crate) fn detach(&self) {
        *self.owner.borrow_mut() = None;
    }

    /// Timing at the owning animation's current time and rate.
    pub fn computed_timing(&self) -> ComputedTiming {
        let (local_time, rate) = self
            .animation()
            .map(|animation| (animation.current_time(), animation.playback_rate()))
            .unwrap_or((None, 1.0));
        self.computed_timing_at(local_time, rate)
    }

    /// Timing at an explicit local time and playback rate, memoized on the
    /// local time, the rate's direction and the timing snapshot.
    pub fn computed_timing_at(&self, local_time: Option<f64>, playback_rate: f64) -> ComputedTiming {
        let timing = self.timing();
        let direction = AnimationDirection::from_rate(playback_rate);

        if let Some(cache) = self.cache.borrow().as_ref() {
            if Rc::ptr_eq(&cache.timing, &timing)
                && cache.local_time == local_time
                && cache.direction == direction
            {
                return cache.computed;
            }
        }

        let computed = compute_timing(&timing, local_time, playback_rate);
        *self.cache.borrow_mut() = Some(TimingCache {
            timing,
            local_time,
            direction,
            computed,
        });
        computed
    }

    /// Describe every animated property.
    pub fn descriptors(&self, config: &EngineConfig) -> Vec<PropertyDescriptor> {
        self.keyframes().descriptors(config.default_setter)
    }

    /// Check that every property needing an implicit boundary keyframe has
    /// an underlying value on the target.
    pub fn check_boundaries(&self, sink: &SharedSink, config: &EngineConfig) -> Result<()> {
        let keyframes = self.keyframes();
        let sink = sink.borrow();
        for descriptor in keyframes.descriptors(config.default_setter) {
            if keyframes.needs_implicit_boundary(&descriptor.name)
                && sink.computed_value(&self.target, &descriptor).is_none()
            {
                return Err(AnimationError::UnresolvableBoundary(descriptor.name));
            }
        }
        Ok(())
    }

    /// Sample every property at the owning animation's current time.
    ///
    /// Returns an empty map while the effect is not in effect (no progress).
    pub fn sample(&self) -> Result<BTreeMap<String, AnimatedValue>> {
        let Some(progress) = self.computed_timing().progress else {
            return Ok(BTreeMap::new());
        };
        let animation = self.animation();
        let context = animation.as_ref().map(Animation::context);
        let config = context.as_ref().map(|ctx| *ctx.config()).unwrap_or_default();

        let keyframes = self.keyframes();
        let applied = self.applied.borrow();
        let mut values = BTreeMap::new();
        for descriptor in keyframes.descriptors(config.default_setter) {
            let base = match applied.as_ref().and_then(|state| state.base.get(&descriptor.name)) {
                Some(base) => Some(base.clone()),
                None => context
                    .as_ref()
                    .and_then(|ctx| ctx.sink().borrow().computed_value(&self.target, &descriptor)),
            };
            if let Some(value) = keyframes.value_at(&descriptor.name, progress, base.as_ref(), config.precision)? {
                values.insert(descriptor.name, value);
            }
        }
        Ok(values)
    }

    /// Stage this effect's values for `computed` into the sink.
    ///
    /// Without progress the effect contributes nothing, and anything it
    /// applied earlier is restored. Every value is computed before any is
    /// staged, so a sampling error stages nothing.
    pub fn apply(&self, sink: &SharedSink, config: &EngineConfig, computed: &ComputedTiming) -> Result<()> {
        let Some(progress) = computed.progress else {
            self.restore(sink);
            return Ok(());
        };

        let keyframes = self.keyframes();
        let descriptors = keyframes.descriptors(config.default_setter);
        self.capture_initial(sink, &keyframes, &descriptors);

        let mut staged = Vec::with_capacity(descriptors.len());
        {
            let applied = self.applied.borrow();
            let base = applied.as_ref().map(|state| &state.base);
            for descriptor in descriptors {
                let underlying = base.and_then(|base| base.get(&descriptor.name));
                if let Some(value) = keyframes.value_at(&descriptor.name, progress, underlying, config.precision)? {
                    staged.push((descriptor, value));
                }
            }
        }

        let mut sink = sink.borrow_mut();
        for (descriptor, value) in staged {
            sink.apply(&self.target, &descriptor, value);
        }
        Ok(())
    }

    /// Put back every value this effect touched.
    pub fn restore(&self, sink: &SharedSink) {
        if self.applied.borrow_mut().take().is_some() {
            log::debug!("effect {} restoring {}", self.id.0, self.target);
        }
        sink.borrow_mut().restore(self.id);
    }

    /// Snapshot the target before the first write and capture underlying
    /// values for properties with implicit boundaries.
    fn capture_initial(&self, sink: &SharedSink, keyframes: &KeyframeSet, descriptors: &[PropertyDescriptor]) {
        let mut applied = self.applied.borrow_mut();
        let state = applied.get_or_insert_with(AppliedState::default);
        {
            let sink = sink.borrow();
            for descriptor in descriptors {
                if state.base.contains_key(&descriptor.name) || !keyframes.needs_implicit_boundary(&descriptor.name) {
                    continue;
                }
                if let Some(value) = sink.computed_value(&self.target, descriptor) {
                    state.base.insert(descriptor.name.clone(), value);
                }
            }
        }
        sink.borrow_mut().set_initial(self.id, &self.target, descriptors);
    }

    fn notify_owner(&self) {
        if let Some(animation) = self.animation() {
            animation.effect_changed();
        }
    }
}
