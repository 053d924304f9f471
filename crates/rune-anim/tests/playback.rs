use anyhow::Result;
use rune_anim::{
    animate, AbortError, AnimatedValue, Animation, AnimationContext, AnimationError, EffectTimingOptions,
    EngineConfig, FillMode, IterationCount, KeyframeEffect, KeyframeInput, ManualTickSource, PlayState,
    PlaybackDirection, PropertyDescriptor, PromiseState, Settlement, TargetId, TargetTable, Timeline,
};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct Harness {
    ctx: Rc<AnimationContext>,
    table: Rc<RefCell<TargetTable>>,
    timeline: Rc<Timeline>,
}

fn harness() -> Harness {
    let table = TargetTable::new().shared();
    let ctx = AnimationContext::new(EngineConfig::default(), table.clone(), ManualTickSource::new());
    Harness {
        ctx,
        table,
        timeline: Timeline::new(),
    }
}

impl Harness {
    fn value(&self, property: &str) -> Option<AnimatedValue> {
        self.table
            .borrow()
            .get(&TargetId::from("el"), &PropertyDescriptor::style(property))
            .cloned()
    }

    fn animate(&self, keyframes: serde_json::Value, options: EffectTimingOptions) -> Result<Animation> {
        let keyframes: KeyframeInput = serde_json::from_value(keyframes)?;
        Ok(animate(&self.ctx, "el", &keyframes, &options, Some(Rc::clone(&self.timeline)))?)
    }
}

#[test]
fn samples_midpoint_after_seek() -> Result<()> {
    let h = harness();
    let animation = h.animate(json!({ "prop": [0, 1] }), EffectTimingOptions::from(2.0))?;

    animation.set_current_time(Some(1.0))?;
    let effect = animation.effect().expect("effect attached");
    assert_eq!(effect.sample()?["prop"], AnimatedValue::Number(0.5));

    h.ctx.run_microtasks();
    assert_eq!(h.value("prop"), Some(AnimatedValue::Number(0.5)));
    Ok(())
}

#[test]
fn reverse_direction_ends_on_start_keyframe() -> Result<()> {
    let h = harness();
    let options = EffectTimingOptions::from(1.0)
        .with_direction(PlaybackDirection::Reverse)
        .with_fill(FillMode::Forwards);
    let animation = h.animate(json!({ "prop": [0, 1] }), options)?;

    h.ctx.tick(0.0);
    assert_eq!(h.value("prop"), Some(AnimatedValue::Number(1.0)));

    h.ctx.tick(5.0);
    assert_eq!(animation.play_state(), PlayState::Finished);
    assert_eq!(h.value("prop"), Some(AnimatedValue::Number(0.0)));
    Ok(())
}

#[test]
fn backwards_fill_applies_during_delay_before_ready() -> Result<()> {
    let h = harness();
    h.table
        .borrow_mut()
        .set(&TargetId::from("el"), &PropertyDescriptor::style("prop"), 0.75);

    let options = EffectTimingOptions::from(1.0)
        .with_delay(1.0)
        .with_fill(FillMode::Backwards);
    let animation = h.animate(json!({ "prop": [0, 1] }), options)?;

    h.ctx.run_microtasks();
    assert!(animation.ready().is_pending());
    assert_eq!(h.value("prop"), Some(AnimatedValue::Number(0.0)));
    Ok(())
}

#[test]
fn cancel_with_pending_play_rejects_once_and_replaces_promises() -> Result<()> {
    let h = harness();
    let animation = h.animate(json!({ "prop": [0, 1] }), EffectTimingOptions::from(100.0))?;
    let ready = animation.ready();
    let finished = animation.finished();

    let rejections = Rc::new(RefCell::new(Vec::new()));
    for (name, promise) in [("ready", &ready), ("finished", &finished)] {
        let rejections = Rc::clone(&rejections);
        promise.then(move |outcome| rejections.borrow_mut().push((name, outcome)));
    }

    animation.cancel();
    h.ctx.run_microtasks();

    let expected: Vec<(&str, Settlement)> = vec![("ready", Err(AbortError)), ("finished", Err(AbortError))];
    assert_eq!(*rejections.borrow(), expected);
    assert_eq!(ready.state(), PromiseState::Rejected(AbortError));
    assert!(animation.ready().is_pending());
    assert!(animation.finished().is_pending());
    assert!(!animation.ready().ptr_eq(&ready));
    assert!(!animation.finished().ptr_eq(&finished));

    animation.cancel();
    h.ctx.run_microtasks();
    assert_eq!(rejections.borrow().len(), 2);
    Ok(())
}

#[test]
fn cancel_returns_to_idle() -> Result<()> {
    let h = harness();
    let animation = h.animate(json!({ "prop": [0, 1] }), EffectTimingOptions::from(100.0))?;
    h.ctx.tick(0.0);
    h.ctx.tick(40.0);

    animation.cancel();
    assert_eq!(animation.play_state(), PlayState::Idle);
    assert_eq!(animation.current_time(), None);
    assert_eq!(animation.start_time(), None);
    assert_eq!(h.value("prop"), None);
    Ok(())
}

#[test]
fn finish_jumps_to_end_time() -> Result<()> {
    let h = harness();
    let options = EffectTimingOptions::from(200.0)
        .with_delay(100.0)
        .with_iterations(2.0)
        .with_end_delay(50.0);
    let animation = h.animate(json!({ "prop": [0, 1] }), options)?;
    let effect = animation.effect().expect("effect attached");
    assert_eq!(effect.timing().end_time(), 550.0);
    assert_eq!(effect.computed_timing().end_time, 550.0);

    animation.finish()?;
    assert_eq!(animation.current_time(), Some(550.0));
    assert_eq!(animation.play_state(), PlayState::Finished);
    assert_eq!(animation.finished().state(), PromiseState::Fulfilled);
    Ok(())
}

#[test]
fn finish_with_infinite_end_fails_without_side_effects() -> Result<()> {
    let h = harness();
    let options = EffectTimingOptions::from(100.0).with_iterations(IterationCount::Infinite);
    let animation = h.animate(json!({ "prop": [0, 1] }), options)?;
    h.ctx.tick(0.0);
    h.ctx.tick(30.0);

    assert_eq!(animation.finish(), Err(AnimationError::FinishInfinite));
    assert_eq!(animation.play_state(), PlayState::Running);
    assert_eq!(animation.current_time(), Some(30.0));
    assert!(animation.finished().is_pending());
    Ok(())
}

#[test]
fn reversing_twice_restores_rate() -> Result<()> {
    let h = harness();
    let animation = h.animate(json!({ "prop": [0, 1] }), EffectTimingOptions::from(100.0))?;
    h.ctx.tick(0.0);
    h.ctx.tick(25.0);

    animation.reverse()?;
    assert_eq!(animation.playback_rate(), -1.0);
    animation.reverse()?;
    assert_eq!(animation.playback_rate(), 1.0);
    assert_eq!(animation.current_time(), Some(25.0));

    h.ctx.tick(50.0);
    assert_eq!(animation.current_time(), Some(50.0));
    Ok(())
}

#[test]
fn onfinish_fires_once_per_finish() -> Result<()> {
    let h = harness();
    let animation = h.animate(json!({ "prop": [0, 1] }), EffectTimingOptions::from(10.0))?;
    let count = Rc::new(Cell::new(0));
    {
        let count = Rc::clone(&count);
        animation.set_onfinish(Some(Rc::new(move |_: &Animation| count.set(count.get() + 1))));
    }

    for t in [0.0, 5.0, 12.0, 20.0] {
        h.ctx.tick(t);
    }
    assert_eq!(count.get(), 1);

    animation.play()?;
    for t in [30.0, 35.0, 45.0] {
        h.ctx.tick(t);
    }
    assert_eq!(count.get(), 2);
    Ok(())
}

#[test]
fn retimed_effect_of_running_animation_moves_with_it() -> Result<()> {
    let h = harness();
    let keyframes: KeyframeInput = serde_json::from_value(json!({ "prop": [0, 100] }))?;
    let effect = Rc::new(KeyframeEffect::new("el", &keyframes, &EffectTimingOptions::from(100.0))?);
    let animation = Animation::new(&h.ctx, Some(Rc::clone(&effect)), Some(Rc::clone(&h.timeline)));
    animation.play()?;
    h.ctx.tick(0.0);
    h.ctx.tick(50.0);
    assert_eq!(h.value("prop"), Some(AnimatedValue::Number(50.0)));

    effect.update_timing(&EffectTimingOptions::new().with_duration(200.0))?;
    h.ctx.run_microtasks();
    assert_eq!(h.value("prop"), Some(AnimatedValue::Number(25.0)));
    Ok(())
}
