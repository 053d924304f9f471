//! Effect timing: options, validation and the timing model.
//!
//! This module provides:
//! - `EffectTimingOptions`: partially specified timing, as supplied by callers
//! - `EffectTiming`: a validated, immutable timing snapshot
//! - `compute_timing`: the pure function turning a timing snapshot, a local
//!   time and a playback rate into a [`ComputedTiming`]
//!
//! All times are in milliseconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::easing::{EasingFunction, EasingInput};
use crate::error::{AnimationError, Result};
use crate::types::AnimationDirection;

/// How many times an effect repeats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IterationCount {
    /// Run a specific number of times (can be fractional).
    Count { count: f64 },
    /// Run indefinitely.
    Infinite,
}

impl Default for IterationCount {
    fn default() -> Self {
        Self::Count { count: 1.0 }
    }
}

impl IterationCount {
    pub fn value(&self) -> f64 {
        match *self {
            Self::Count { count } => count,
            Self::Infinite => f64::INFINITY,
        }
    }
}

impl From<f64> for IterationCount {
    fn from(count: f64) -> Self {
        if count == f64::INFINITY {
            Self::Infinite
        } else {
            Self::Count { count }
        }
    }
}

/// Iteration duration: explicit milliseconds, or `auto` (zero for keyframe
/// effects).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectDuration {
    #[default]
    Auto,
    Millis(f64),
}

impl EffectDuration {
    pub fn millis(&self) -> f64 {
        match *self {
            Self::Auto => 0.0,
            Self::Millis(ms) => ms,
        }
    }
}

impl From<f64> for EffectDuration {
    fn from(ms: f64) -> Self {
        Self::Millis(ms)
    }
}

/// Direction of playback for each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackDirection {
    /// Play every iteration forward.
    #[default]
    Normal,
    /// Play every iteration backward.
    Reverse,
    /// Alternate between forward and backward.
    Alternate,
    /// Alternate, starting with backward.
    AlternateReverse,
}

impl PlaybackDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Reverse => "reverse",
            Self::Alternate => "alternate",
            Self::AlternateReverse => "alternate-reverse",
        }
    }

    /// Whether the given iteration plays forward.
    ///
    /// An infinite iteration index counts as forward.
    pub fn is_forwards(&self, current_iteration: f64) -> bool {
        let parity = match self {
            Self::Normal => return true,
            Self::Reverse => return false,
            Self::Alternate => current_iteration,
            Self::AlternateReverse => current_iteration + 1.0,
        };
        parity.is_infinite() || parity % 2.0 == 0.0
    }
}

impl FromStr for PlaybackDirection {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normal" => Ok(Self::Normal),
            "reverse" => Ok(Self::Reverse),
            "alternate" => Ok(Self::Alternate),
            "alternate-reverse" => Ok(Self::AlternateReverse),
            other => Err(AnimationError::InvalidDirection(other.to_string())),
        }
    }
}

impl fmt::Display for PlaybackDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Whether sampled values persist outside the active interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillMode {
    None,
    /// Retain the final value after the active interval.
    Forwards,
    /// Apply the first value during the delay.
    Backwards,
    Both,
    /// Same as `None` for keyframe effects.
    #[default]
    Auto,
}

impl FillMode {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Forwards => "forwards",
            Self::Backwards => "backwards",
            Self::Both => "both",
            Self::Auto => "auto",
        }
    }

    /// The effective fill, with `auto` resolved.
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto => Self::None,
            other => other,
        }
    }

    /// Should values apply before the active interval (during the delay)?
    pub fn applies_backwards(&self) -> bool {
        matches!(self, Self::Backwards | Self::Both)
    }

    /// Should values be retained after the active interval?
    pub fn applies_forwards(&self) -> bool {
        matches!(self, Self::Forwards | Self::Both)
    }
}

impl FromStr for FillMode {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "forwards" => Ok(Self::Forwards),
            "backwards" => Ok(Self::Backwards),
            "both" => Ok(Self::Both),
            "auto" => Ok(Self::Auto),
            other => Err(AnimationError::InvalidFill(other.to_string())),
        }
    }
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Timing options as supplied by a caller. Unset fields keep their current
/// (or default) value.
///
/// # Example JSON
///
/// ```json
/// {
///   "duration": { "millis": 500 },
///   "delay": 100,
///   "iterations": { "type": "infinite" },
///   "direction": "alternate",
///   "fill": "both",
///   "easing": "ease-in-out"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectTimingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_delay: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<EffectDuration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<IterationCount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_start: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<PlaybackDirection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<FillMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub easing: Option<EasingInput>,
}

impl EffectTimingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration = Some(EffectDuration::Millis(duration_ms));
        self
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay = Some(delay_ms);
        self
    }

    pub fn with_end_delay(mut self, end_delay_ms: f64) -> Self {
        self.end_delay = Some(end_delay_ms);
        self
    }

    pub fn with_iterations(mut self, iterations: impl Into<IterationCount>) -> Self {
        self.iterations = Some(iterations.into());
        self
    }

    pub fn with_iteration_start(mut self, iteration_start: f64) -> Self {
        self.iteration_start = Some(iteration_start);
        self
    }

    pub fn with_direction(mut self, direction: PlaybackDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_easing(mut self, easing: impl Into<EasingInput>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    /// Fill every unset field from `defaults`.
    pub fn or(self, defaults: &EffectTimingOptions) -> Self {
        Self {
            delay: self.delay.or(defaults.delay),
            end_delay: self.end_delay.or(defaults.end_delay),
            duration: self.duration.or(defaults.duration),
            iterations: self.iterations.or(defaults.iterations),
            iteration_start: self.iteration_start.or(defaults.iteration_start),
            direction: self.direction.or(defaults.direction),
            fill: self.fill.or(defaults.fill),
            easing: self.easing.or_else(|| defaults.easing.clone()),
        }
    }
}

impl From<f64> for EffectTimingOptions {
    fn from(duration_ms: f64) -> Self {
        Self::new().with_duration(duration_ms)
    }
}

/// A validated timing snapshot. Owned by one effect and replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectTiming {
    pub delay: f64,
    pub end_delay: f64,
    pub duration: EffectDuration,
    pub iterations: f64,
    pub iteration_start: f64,
    pub direction: PlaybackDirection,
    pub fill: FillMode,
    pub easing: EasingFunction,
}

impl Default for EffectTiming {
    fn default() -> Self {
        Self {
            delay: 0.0,
            end_delay: 0.0,
            duration: EffectDuration::Auto,
            iterations: 1.0,
            iteration_start: 0.0,
            direction: PlaybackDirection::Normal,
            fill: FillMode::Auto,
            easing: EasingFunction::Linear,
        }
    }
}

impl EffectTiming {
    /// Validate options against the default timing.
    pub fn from_options(options: &EffectTimingOptions) -> Result<Self> {
        Self::default().updated(options)
    }

    /// Validate options and return a copy of `self` with them applied.
    /// `self` is never modified, so a failed update changes nothing.
    pub fn updated(&self, options: &EffectTimingOptions) -> Result<Self> {
        let mut timing = self.clone();

        if let Some(delay) = options.delay {
            if !delay.is_finite() {
                return Err(AnimationError::InvalidDelay(delay));
            }
            timing.delay = delay;
        }
        if let Some(end_delay) = options.end_delay {
            if !end_delay.is_finite() {
                return Err(AnimationError::InvalidEndDelay(end_delay));
            }
            timing.end_delay = end_delay;
        }
        if let Some(duration) = options.duration {
            if let EffectDuration::Millis(ms) = duration {
                if ms.is_nan() || ms < 0.0 {
                    return Err(AnimationError::InvalidDuration(ms));
                }
            }
            timing.duration = duration;
        }
        if let Some(iterations) = options.iterations {
            let count = iterations.value();
            if count.is_nan() || count < 0.0 {
                return Err(AnimationError::InvalidIterations(count));
            }
            timing.iterations = count;
        }
        if let Some(iteration_start) = options.iteration_start {
            if !iteration_start.is_finite() || iteration_start < 0.0 {
                return Err(AnimationError::InvalidIterationStart(iteration_start));
            }
            timing.iteration_start = iteration_start;
        }
        if let Some(direction) = options.direction {
            timing.direction = direction;
        }
        if let Some(fill) = options.fill {
            timing.fill = fill;
        }
        if let Some(easing) = &options.easing {
            timing.easing = easing.resolve()?;
        }

        Ok(timing)
    }

    /// Iteration duration with `auto` resolved to zero.
    pub fn duration_ms(&self) -> f64 {
        self.duration.millis()
    }

    /// Total time occupied by all iterations.
    pub fn active_duration(&self) -> f64 {
        let duration = self.duration_ms();
        if duration == 0.0 || self.iterations == 0.0 {
            0.0
        } else {
            duration * self.iterations
        }
    }

    pub fn end_time(&self) -> f64 {
        (self.delay + self.active_duration() + self.end_delay).max(0.0)
    }
}

/// Position of a local time relative to the active interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No local time.
    #[default]
    Idle,
    Before,
    Active,
    After,
}

/// The timing model's output for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ComputedTiming {
    pub active_duration: f64,
    pub end_time: f64,
    pub local_time: Option<f64>,
    pub phase: Phase,
    pub active_time: Option<f64>,
    pub overall_progress: Option<f64>,
    pub iteration_progress: Option<f64>,
    pub current_iteration: Option<f64>,
    pub directed_progress: Option<f64>,
    /// Eased progress; `None` means the effect contributes nothing.
    pub progress: Option<f64>,
}

/// Compute timing for `local_time` under `playback_rate`.
///
/// The sign of the playback rate decides which side an exact phase boundary
/// falls on: a backwards-moving animation sitting exactly at the start of the
/// active interval is still before it, a forwards-moving one sitting exactly
/// at its end is already after it.
pub fn compute_timing(timing: &EffectTiming, local_time: Option<f64>, playback_rate: f64) -> ComputedTiming {
    let active_duration = timing.active_duration();
    let end_time = timing.end_time();
    let mut computed = ComputedTiming {
        active_duration,
        end_time,
        local_time,
        ..ComputedTiming::default()
    };

    let Some(local) = local_time else {
        return computed;
    };

    let direction = AnimationDirection::from_rate(playback_rate);
    let before_active = timing.delay.max(0.0).min(end_time);
    let active_after = (timing.delay + active_duration).max(0.0).min(end_time);

    let phase = if local < before_active
        || (direction == AnimationDirection::Backwards && local == before_active)
    {
        Phase::Before
    } else if local > active_after
        || (direction == AnimationDirection::Forwards && local == active_after)
    {
        Phase::After
    } else {
        Phase::Active
    };
    computed.phase = phase;

    let fill = timing.fill.resolve();
    let active_time = match phase {
        Phase::Before if fill.applies_backwards() => Some((local - timing.delay).max(0.0)),
        Phase::Active => Some(local - timing.delay),
        Phase::After if fill.applies_forwards() => {
            Some((local - timing.delay).min(active_duration).max(0.0))
        }
        _ => None,
    };
    computed.active_time = active_time;
    let Some(active_time) = active_time else {
        return computed;
    };

    let duration = timing.duration_ms();
    let iterations = timing.iterations;
    let overall_progress = if duration == 0.0 {
        let completed = if phase == Phase::Before { 0.0 } else { iterations };
        completed + timing.iteration_start
    } else {
        active_time / duration + timing.iteration_start
    };

    let mut iteration_progress = if overall_progress.is_infinite() {
        timing.iteration_start % 1.0
    } else {
        overall_progress % 1.0
    };
    if iteration_progress == 0.0
        && matches!(phase, Phase::Active | Phase::After)
        && active_time == active_duration
        && iterations != 0.0
    {
        iteration_progress = 1.0;
    }

    let current_iteration = if phase == Phase::After && iterations.is_infinite() {
        f64::INFINITY
    } else if iteration_progress == 1.0 {
        overall_progress.floor() - 1.0
    } else {
        overall_progress.floor()
    };

    let going_forwards = timing.direction.is_forwards(current_iteration);
    let directed_progress = if going_forwards {
        iteration_progress
    } else {
        1.0 - iteration_progress
    };
    let before_flag =
        (phase == Phase::Before && going_forwards) || (phase == Phase::After && !going_forwards);

    computed.overall_progress = Some(overall_progress);
    computed.iteration_progress = Some(iteration_progress);
    computed.current_iteration = Some(current_iteration);
    computed.directed_progress = Some(directed_progress);
    computed.progress = Some(timing.easing.evaluate(directed_progress, before_flag));
    computed
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.0001;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn timing(options: EffectTimingOptions) -> EffectTiming {
        EffectTiming::from_options(&options).unwrap()
    }

    #[test]
    fn test_end_time() {
        let cases = [
            (0.0, 1000.0, 1.0, 0.0, 1000.0),
            (500.0, 1000.0, 2.0, 250.0, 2750.0),
            (-3000.0, 1000.0, 1.0, 0.0, 0.0),
            (100.0, 0.0, 5.0, 0.0, 100.0),
            (100.0, 1000.0, 0.0, -50.0, 50.0),
        ];
        for (delay, duration, iterations, end_delay, expected) in cases {
            let t = timing(
                EffectTimingOptions::new()
                    .with_delay(delay)
                    .with_duration(duration)
                    .with_iterations(iterations)
                    .with_end_delay(end_delay),
            );
            assert_eq!(t.end_time(), expected, "delay {delay} duration {duration}");
        }
    }

    #[test]
    fn test_infinite_duration_with_zero_iterations() {
        let t = timing(
            EffectTimingOptions::new()
                .with_duration(f64::INFINITY)
                .with_iterations(0.0),
        );
        assert_eq!(t.active_duration(), 0.0);

        let t = timing(EffectTimingOptions::new().with_duration(10.0).with_iterations(IterationCount::Infinite));
        assert_eq!(t.end_time(), f64::INFINITY);
    }

    #[test]
    fn test_unresolved_local_time_is_idle() {
        let t = timing(EffectTimingOptions::from(1000.0));
        let computed = compute_timing(&t, None, 1.0);
        assert_eq!(computed.phase, Phase::Idle);
        assert_eq!(computed.active_time, None);
        assert_eq!(computed.progress, None);
        assert_eq!(computed.end_time, 1000.0);
    }

    #[test]
    fn test_phase_boundaries_depend_on_rate() {
        let t = timing(EffectTimingOptions::new().with_delay(100.0).with_duration(1000.0));

        assert_eq!(compute_timing(&t, Some(100.0), 1.0).phase, Phase::Active);
        assert_eq!(compute_timing(&t, Some(100.0), -1.0).phase, Phase::Before);
        assert_eq!(compute_timing(&t, Some(1100.0), 1.0).phase, Phase::After);
        assert_eq!(compute_timing(&t, Some(1100.0), -1.0).phase, Phase::Active);
        assert_eq!(compute_timing(&t, Some(50.0), 1.0).phase, Phase::Before);
        assert_eq!(compute_timing(&t, Some(2000.0), -1.0).phase, Phase::After);
    }

    #[test]
    fn test_fill_controls_active_time() {
        let none = timing(EffectTimingOptions::new().with_delay(1000.0).with_duration(1000.0));
        assert_eq!(compute_timing(&none, Some(0.0), 1.0).progress, None);
        assert_eq!(compute_timing(&none, Some(3000.0), 1.0).progress, None);

        let backwards = timing(
            EffectTimingOptions::new()
                .with_delay(1000.0)
                .with_duration(1000.0)
                .with_fill(FillMode::Backwards),
        );
        let before = compute_timing(&backwards, Some(0.0), 1.0);
        assert_eq!(before.phase, Phase::Before);
        assert_eq!(before.active_time, Some(0.0));
        assert_eq!(before.progress, Some(0.0));
        assert_eq!(compute_timing(&backwards, Some(3000.0), 1.0).progress, None);
    }

    #[test]
    fn test_progress_snaps_to_one_at_end() {
        let t = timing(EffectTimingOptions::from(1000.0).with_fill(FillMode::Forwards));
        let computed = compute_timing(&t, Some(1000.0), 1.0);
        assert_eq!(computed.phase, Phase::After);
        assert_eq!(computed.iteration_progress, Some(1.0));
        assert_eq!(computed.current_iteration, Some(0.0));
        assert_eq!(computed.progress, Some(1.0));
    }

    #[test]
    fn test_fractional_iterations_end_mid_iteration() {
        let t = timing(
            EffectTimingOptions::from(1000.0)
                .with_iterations(2.5)
                .with_fill(FillMode::Forwards),
        );
        let computed = compute_timing(&t, Some(5000.0), 1.0);
        assert!(approx_eq(computed.iteration_progress.unwrap(), 0.5));
        assert_eq!(computed.current_iteration, Some(2.0));
    }

    #[test]
    fn test_zero_duration() {
        let t = timing(EffectTimingOptions::new().with_fill(FillMode::Both));
        let after = compute_timing(&t, Some(0.0), 1.0);
        assert_eq!(after.phase, Phase::After);
        assert_eq!(after.iteration_progress, Some(1.0));
        assert_eq!(after.current_iteration, Some(0.0));

        let before = compute_timing(&t, Some(0.0), -1.0);
        assert_eq!(before.phase, Phase::Before);
        assert_eq!(before.overall_progress, Some(0.0));
        assert_eq!(before.progress, Some(0.0));
    }

    #[test]
    fn test_directions() {
        let reverse = timing(EffectTimingOptions::from(1000.0).with_direction(PlaybackDirection::Reverse));
        assert_eq!(compute_timing(&reverse, Some(0.0), 1.0).progress, Some(1.0));
        assert!(approx_eq(compute_timing(&reverse, Some(250.0), 1.0).progress.unwrap(), 0.75));

        let alternate = timing(
            EffectTimingOptions::from(1000.0)
                .with_iterations(2.0)
                .with_direction(PlaybackDirection::Alternate),
        );
        let second = compute_timing(&alternate, Some(1250.0), 1.0);
        assert_eq!(second.current_iteration, Some(1.0));
        assert!(approx_eq(second.directed_progress.unwrap(), 0.75));

        let alternate_reverse = timing(
            EffectTimingOptions::from(1000.0)
                .with_iterations(2.0)
                .with_direction(PlaybackDirection::AlternateReverse),
        );
        assert!(approx_eq(compute_timing(&alternate_reverse, Some(250.0), 1.0).directed_progress.unwrap(), 0.75));
        assert!(approx_eq(compute_timing(&alternate_reverse, Some(1250.0), 1.0).directed_progress.unwrap(), 0.25));
    }

    #[test]
    fn test_iteration_start() {
        let t = timing(EffectTimingOptions::from(1000.0).with_iteration_start(0.5));
        let computed = compute_timing(&t, Some(250.0), 1.0);
        assert!(approx_eq(computed.overall_progress.unwrap(), 0.75));
        assert!(approx_eq(computed.progress.unwrap(), 0.75));
    }

    #[test]
    fn test_before_flag_selects_lower_step() {
        let t = timing(
            EffectTimingOptions::from(1000.0)
                .with_delay(1000.0)
                .with_fill(FillMode::Both)
                .with_easing("steps(1, jump-start)"),
        );
        assert_eq!(compute_timing(&t, Some(0.0), 1.0).progress, Some(0.0));
        assert_eq!(compute_timing(&t, Some(1000.0), 1.0).progress, Some(1.0));
    }

    #[test]
    fn test_validation() {
        let base = EffectTiming::default();
        assert_eq!(
            base.updated(&EffectTimingOptions::new().with_delay(f64::NAN)).unwrap_err().category(),
            crate::error::ErrorCategory::Option
        );
        assert_eq!(
            base.updated(&EffectTimingOptions::new().with_end_delay(f64::INFINITY)),
            Err(AnimationError::InvalidEndDelay(f64::INFINITY))
        );
        assert_eq!(
            base.updated(&EffectTimingOptions::new().with_duration(-1.0)),
            Err(AnimationError::InvalidDuration(-1.0))
        );
        assert_eq!(
            base.updated(&EffectTimingOptions::new().with_iterations(-2.0)),
            Err(AnimationError::InvalidIterations(-2.0))
        );
        assert_eq!(
            base.updated(&EffectTimingOptions::new().with_iteration_start(-0.5)),
            Err(AnimationError::InvalidIterationStart(-0.5))
        );
        assert_eq!(
            base.updated(&EffectTimingOptions::new().with_easing("wobble")),
            Err(AnimationError::InvalidEasing("wobble".into()))
        );
    }

    #[test]
    fn test_update_keeps_unset_fields() {
        let t = timing(EffectTimingOptions::from(800.0).with_fill(FillMode::Forwards));
        let updated = t.updated(&EffectTimingOptions::new().with_delay(50.0)).unwrap();
        assert_eq!(updated.delay, 50.0);
        assert_eq!(updated.duration, EffectDuration::Millis(800.0));
        assert_eq!(updated.fill, FillMode::Forwards);
    }

    #[test]
    fn test_keyword_parsing() {
        assert_eq!("alternate-reverse".parse::<PlaybackDirection>(), Ok(PlaybackDirection::AlternateReverse));
        assert_eq!(
            "sideways".parse::<PlaybackDirection>(),
            Err(AnimationError::InvalidDirection("sideways".into()))
        );
        assert_eq!("both".parse::<FillMode>(), Ok(FillMode::Both));
        assert_eq!("always".parse::<FillMode>(), Err(AnimationError::InvalidFill("always".into())));
        assert_eq!(FillMode::Auto.resolve(), FillMode::None);
        assert_eq!(PlaybackDirection::Alternate.to_string(), "alternate");
    }

    #[test]
    fn test_options_deserialization() {
        let json = r#"{
            "duration": { "millis": 500 },
            "delay": 100,
            "iterations": { "type": "infinite" },
            "direction": "alternate-reverse",
            "fill": "both",
            "easing": "ease-in"
        }"#;
        let options: EffectTimingOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.duration, Some(EffectDuration::Millis(500.0)));
        assert_eq!(options.iterations, Some(IterationCount::Infinite));
        assert_eq!(options.direction, Some(PlaybackDirection::AlternateReverse));

        let t = EffectTiming::from_options(&options).unwrap();
        assert_eq!(t.easing, EasingFunction::EaseIn);
        assert_eq!(t.iterations, f64::INFINITY);

        let auto: EffectTimingOptions = serde_json::from_str(r#"{ "duration": "auto" }"#).unwrap();
        assert_eq!(auto.duration, Some(EffectDuration::Auto));
    }

    #[test]
    fn test_options_fall_back_to_defaults() {
        let defaults = EffectTimingOptions::from(300.0).with_easing("ease");
        let merged = EffectTimingOptions::new().with_delay(10.0).or(&defaults);
        assert_eq!(merged.delay, Some(10.0));
        assert_eq!(merged.duration, Some(EffectDuration::Millis(300.0)));
        assert_eq!(merged.easing, Some(EasingInput::from("ease")));
    }
}
