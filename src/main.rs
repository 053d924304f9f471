use anyhow::{Context, Result};
use rune_anim::{
    animate, Animation, AnimationContext, KeyframeInput, ManualTickSource, PlayState, TargetTable,
    Timeline,
};
use rune_config::MotionConfig;
use std::rc::Rc;

fn main() -> Result<()> {
    env_logger::init();

    let config = MotionConfig::load();
    let driver = &config.driver;
    log::info!(
        "driving '{}' at {} ms per frame (max {} frames)",
        driver.target,
        driver.frame_interval_ms,
        driver.max_frames
    );

    let keyframes: KeyframeInput =
        serde_json::from_str(&driver.keyframes).context("Failed to parse driver keyframes")?;

    let table = TargetTable::new().shared();
    table.borrow_mut().insert_target(driver.target.as_str());
    let frame_source = ManualTickSource::new();
    let ctx = AnimationContext::new(config.engine, table.clone(), frame_source.clone());
    let timeline = Timeline::new();

    let animation = animate(&ctx, driver.target.as_str(), &keyframes, &config.timing, Some(timeline))?;
    if driver.playback_rate != 1.0 {
        animation.set_playback_rate(driver.playback_rate);
    }
    animation.set_onfinish(Some(Rc::new(|animation: &Animation| {
        log::info!("animation {} finished at {:?}", animation.id().0, animation.current_time());
    })));
    ctx.run_microtasks();

    let effect = animation
        .effect()
        .context("animation lost its effect")?;
    let descriptors = effect.descriptors(ctx.config());

    let mut timestamp = 0.0;
    for frame in 0..driver.max_frames {
        if !frame_source.is_armed() {
            log::debug!("frame source disarmed after {frame} frames");
            break;
        }
        ctx.tick(timestamp);

        let values: Vec<String> = {
            let table = table.borrow();
            let target = effect.target();
            descriptors
                .iter()
                .filter_map(|descriptor| {
                    table
                        .get(target, descriptor)
                        .map(|value| format!("{}={}", descriptor.name, value))
                })
                .collect()
        };
        println!(
            "{:>8.1} ms  {:<9} {}",
            animation.current_time().unwrap_or(f64::NAN),
            format!("{:?}", animation.play_state()),
            values.join(" ")
        );

        timestamp += driver.frame_interval_ms;
    }

    if animation.play_state() != PlayState::Finished {
        log::warn!("stopped before the animation finished ({:?})", animation.play_state());
    }
    Ok(())
}
