//! One-call construction: build an effect, bind it to a new animation and
//! start playing.

use std::rc::Rc;

use crate::animation::Animation;
use crate::context::AnimationContext;
use crate::effect::KeyframeEffect;
use crate::error::Result;
use crate::keyframes::KeyframeInput;
use crate::timeline::Timeline;
use crate::timing::EffectTimingOptions;
use crate::types::TargetId;

/// Animate `target` with `keyframes` and start playback.
///
/// Fails before anything is registered when the options or keyframes are
/// invalid, or when a property lacks a boundary keyframe and the target has
/// no underlying value to fill it in.
pub fn animate(
    context: &Rc<AnimationContext>,
    target: impl Into<TargetId>,
    keyframes: &KeyframeInput,
    options: &EffectTimingOptions,
    timeline: Option<Rc<Timeline>>,
) -> Result<Animation> {
    let effect = KeyframeEffect::new(target, keyframes, options)?;
    effect.check_boundaries(context.sink(), context.config())?;

    let animation = Animation::new(context, Some(Rc::new(effect)), timeline);
    animation.play()?;
    Ok(animation)
}
