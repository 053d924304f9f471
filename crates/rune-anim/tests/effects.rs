use anyhow::Result;
use rune_anim::{
    AnimatedValue, Animation, AnimationContext, AnimationError, EffectTimingOptions, EngineConfig, FillMode,
    EffectTiming, KeyframeEffect, KeyframeInput, KeyframeSet, ManualTickSource, PropertyDescriptor, SetterKind,
    TargetId, TargetTable, Timeline,
};
use serde_json::json;
use std::rc::Rc;

fn keyframes(value: serde_json::Value) -> Result<KeyframeInput> {
    Ok(serde_json::from_value(value)?)
}

fn offsets(set: &KeyframeSet) -> Vec<f64> {
    set.frames().iter().map(|kf| kf.computed_offset).collect()
}

#[test]
fn extra_offsets_are_dropped() -> Result<()> {
    let set = KeyframeSet::resolve(&keyframes(json!({ "offset": [0, 0.5, 1], "prop": [0, 1] }))?)?;
    assert_eq!(set.len(), 2);
    assert_eq!(offsets(&set), vec![0.0, 0.5]);

    // The last kept keyframe sits at 0.5, so the end comes from the underlying value.
    let base = AnimatedValue::Number(2.0);
    assert_eq!(set.value_at("prop", 0.25, Some(&base), 4)?, Some(AnimatedValue::Number(0.5)));
    assert_eq!(set.value_at("prop", 0.75, Some(&base), 4)?, Some(AnimatedValue::Number(1.5)));
    assert_eq!(
        set.value_at("prop", 0.75, None, 4),
        Err(AnimationError::UnresolvableBoundary("prop".into()))
    );
    Ok(())
}

#[test]
fn resolved_offsets_survive_a_second_resolution() -> Result<()> {
    let set = KeyframeSet::resolve(&keyframes(json!([
        { "x": 0 },
        { "x": 1, "offset": 0.5 },
        { "x": 2 },
        { "x": 3 }
    ]))?)?;
    assert_eq!(offsets(&set), vec![0.0, 0.5, 0.75, 1.0]);

    let explicit: Vec<_> = set
        .frames()
        .iter()
        .map(|kf| json!({ "x": kf.values["x"].value().as_f64(), "offset": kf.computed_offset }))
        .collect();
    let again = KeyframeSet::resolve(&keyframes(serde_json::Value::Array(explicit))?)?;
    assert_eq!(offsets(&again), offsets(&set));
    Ok(())
}

#[test]
fn unordered_offsets_are_rejected() -> Result<()> {
    let err = KeyframeSet::resolve(&keyframes(json!([
        { "x": 0, "offset": 0.6 },
        { "x": 1, "offset": 0.4 }
    ]))?)
    .unwrap_err();
    assert!(matches!(err, AnimationError::OffsetsNotOrdered { index: 1, .. }));
    Ok(())
}

#[test]
fn implicit_start_keyframe_uses_underlying_value() -> Result<()> {
    let table = TargetTable::new().shared();
    let target = TargetId::from("card");
    let width = PropertyDescriptor::style("width");
    table.borrow_mut().set(&target, &width, "40px");

    let ctx = AnimationContext::new(EngineConfig::default(), table.clone(), ManualTickSource::new());
    let effect = KeyframeEffect::new(
        "card",
        &keyframes(json!([{ "width": "80px" }]))?,
        &EffectTimingOptions::from(100.0).with_fill(FillMode::Forwards),
    )?;
    let animation = Animation::new(&ctx, Some(Rc::new(effect)), Some(Timeline::new()));
    animation.play()?;

    ctx.tick(0.0);
    assert_eq!(table.borrow().get(&target, &width), Some(&AnimatedValue::from("40px")));
    ctx.tick(50.0);
    assert_eq!(table.borrow().get(&target, &width), Some(&AnimatedValue::from("60px")));
    ctx.tick(100.0);
    assert_eq!(table.borrow().get(&target, &width), Some(&AnimatedValue::from("80px")));
    Ok(())
}

#[test]
fn colors_and_attributes_reach_the_sink() -> Result<()> {
    let table = TargetTable::new().shared();
    let ctx = AnimationContext::new(EngineConfig::default(), table.clone(), ManualTickSource::new());
    let effect = KeyframeEffect::new(
        "icon",
        &keyframes(json!({
            "fill": [{ "value": "#000", "set": "attribute" }, "#f00"]
        }))?,
        &EffectTimingOptions::from(10.0),
    )?;
    let animation = Animation::new(&ctx, Some(Rc::new(effect)), None);

    animation.set_current_time(Some(5.0))?;
    ctx.run_microtasks();

    let fill = PropertyDescriptor::new("fill", SetterKind::Attribute);
    assert_eq!(
        table.borrow().get(&TargetId::from("icon"), &fill),
        Some(&AnimatedValue::from("rgb(127.5, 0, 0)"))
    );
    assert_eq!(table.borrow().get(&TargetId::from("icon"), &PropertyDescriptor::style("fill")), None);
    Ok(())
}

#[test]
fn failed_keyframe_update_keeps_previous_keyframes() -> Result<()> {
    let effect = KeyframeEffect::new(
        "el",
        &keyframes(json!({ "x": [0, 1] }))?,
        &EffectTimingOptions::from(10.0),
    )?;
    let before = effect.keyframes();

    let err = effect
        .set_keyframes(&keyframes(json!([{ "x": 0, "offset": 2 }]))?)
        .unwrap_err();
    assert_eq!(err, AnimationError::OffsetOutOfRange(2.0));
    assert!(Rc::ptr_eq(&before, &effect.keyframes()));
    Ok(())
}

#[test]
fn invalid_color_keyframe_is_rejected_at_construction() -> Result<()> {
    let bad = keyframes(json!({ "fill": ["#12345", "#000"] }))?;
    let err = KeyframeEffect::new("el", &bad, &EffectTimingOptions::from(10.0)).unwrap_err();
    assert_eq!(err, AnimationError::InvalidColor("#12345".into()));

    let effect = KeyframeEffect::new(
        "el",
        &keyframes(json!({ "fill": ["#000", "#fff"] }))?,
        &EffectTimingOptions::from(10.0),
    )?;
    let before = effect.keyframes();
    assert_eq!(effect.set_keyframes(&bad), Err(AnimationError::InvalidColor("#12345".into())));
    assert!(Rc::ptr_eq(&before, &effect.keyframes()));
    Ok(())
}

#[test]
fn structured_easing_options_are_validated() -> Result<()> {
    for easing in [
        json!({ "type": "steps", "count": 0, "position": "end" }),
        json!({ "type": "cubic_bezier", "x1": 3.0, "y1": 0.0, "x2": -2.0, "y2": 1.0 }),
    ] {
        let options: EffectTimingOptions =
            serde_json::from_value(json!({ "duration": { "millis": 100 }, "easing": easing }))?;
        assert!(matches!(
            EffectTiming::from_options(&options),
            Err(AnimationError::InvalidEasing(_))
        ));

        let effect = KeyframeEffect::new("el", &keyframes(json!({ "x": [0, 1] }))?, &EffectTimingOptions::from(100.0))?;
        let before = effect.timing();
        assert!(matches!(effect.update_timing(&options), Err(AnimationError::InvalidEasing(_))));
        assert!(Rc::ptr_eq(&before, &effect.timing()));
    }
    Ok(())
}
