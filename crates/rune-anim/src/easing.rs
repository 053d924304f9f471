//! Easing functions for animation timing.
//!
//! This module implements CSS-compatible timing functions:
//! - Linear
//! - Ease, EaseIn, EaseOut, EaseInOut (standard CSS curves)
//! - CubicBezier (custom bezier curves, solved by bisection)
//! - Steps (stepped animations, aware of the timing model's before flag)
//!
//! # Usage
//!
//! ```
//! use rune_anim::easing::{EasingFunction, StepPosition};
//!
//! let ease: EasingFunction = "ease".parse().unwrap();
//! let progress = ease.evaluate(0.5, false);
//! assert!(progress > 0.5);
//!
//! let steps = EasingFunction::steps(4, StepPosition::End).unwrap();
//! assert_eq!(steps.evaluate(0.3, false), 0.25);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AnimationError, Result};

/// Tolerance for the bezier x(t) bisection.
const BISECTION_EPSILON: f64 = 1e-7;
/// Upper bound on bisection steps; the interval halves each step.
const MAX_BISECTION_STEPS: usize = 64;

/// Position for stepped animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPosition {
    /// Jump at the start of each interval (CSS `jump-start` / `start`).
    Start,
    /// Jump at the end of each interval (CSS `jump-end` / `end`).
    End,
    /// Jump at both start and end (CSS `jump-both`).
    Both,
    /// No jump at start or end (CSS `jump-none`).
    None,
}

impl Default for StepPosition {
    fn default() -> Self {
        Self::End
    }
}

impl StepPosition {
    fn keyword(self) -> &'static str {
        match self {
            Self::Start => "jump-start",
            Self::End => "jump-end",
            Self::Both => "jump-both",
            Self::None => "jump-none",
        }
    }
}

impl FromStr for StepPosition {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "start" | "jump-start" => Ok(Self::Start),
            "end" | "jump-end" => Ok(Self::End),
            "jump-both" => Ok(Self::Both),
            "jump-none" => Ok(Self::None),
            other => Err(AnimationError::InvalidEasing(other.to_string())),
        }
    }
}

/// Easing function for animation timing.
///
/// Easing functions map a linear progress value to an eased output value.
/// Inputs outside `[0, 1]` are extrapolated rather than clamped, since
/// keyframe easings can receive overshooting progress from a bezier effect
/// easing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    /// Linear interpolation (no easing).
    Linear,

    /// CSS `ease`, equivalent to `cubic-bezier(0.25, 0.1, 0.25, 1.0)`.
    Ease,

    /// CSS `ease-in`, equivalent to `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,

    /// CSS `ease-out`, equivalent to `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,

    /// CSS `ease-in-out`, equivalent to `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,

    /// Custom cubic bezier curve.
    /// x values must be in [0, 1], y values can be any finite number.
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },

    /// Stepped animation with discrete jumps.
    Steps { count: u32, position: StepPosition },
}

impl Default for EasingFunction {
    fn default() -> Self {
        Self::Linear
    }
}

impl EasingFunction {
    /// Evaluate the easing function at the given progress.
    ///
    /// `before_flag` is only consulted by step easings: when progress lands
    /// exactly on a step boundary while the timing model reports the sample
    /// as coming from the before side, the lower step is selected.
    pub fn evaluate(&self, progress: f64, before_flag: bool) -> f64 {
        match *self {
            Self::Linear => progress,
            Self::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, progress),
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, progress),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, progress),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, progress),
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(x1, y1, x2, y2, progress),
            Self::Steps { count, position } => stepped(count, position, progress, before_flag),
        }
    }

    /// Create a custom cubic bezier easing function.
    ///
    /// Fails if either x control value lies outside `[0, 1]` or any value is
    /// not finite.
    pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        let finite = [x1, y1, x2, y2].iter().all(|v| v.is_finite());
        if !finite || !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
            return Err(AnimationError::InvalidEasing(format!(
                "cubic-bezier({x1}, {y1}, {x2}, {y2})"
            )));
        }
        Ok(Self::CubicBezier { x1, y1, x2, y2 })
    }

    /// Create a stepped easing function.
    ///
    /// `jump-none` needs at least two steps, every other position at least one.
    pub fn steps(count: u32, position: StepPosition) -> Result<Self> {
        let minimum = if position == StepPosition::None { 2 } else { 1 };
        if count < minimum {
            return Err(AnimationError::InvalidEasing(format!(
                "steps({count}, {})",
                position.keyword()
            )));
        }
        Ok(Self::Steps { count, position })
    }

    fn validated(self) -> Result<Self> {
        match self {
            Self::CubicBezier { x1, y1, x2, y2 } => Self::cubic_bezier(x1, y1, x2, y2),
            Self::Steps { count, position } => Self::steps(count, position),
            other => Ok(other),
        }
    }

    /// Whether this easing maps progress to itself.
    pub fn is_linear(&self) -> bool {
        match *self {
            Self::Linear => true,
            Self::CubicBezier { x1, y1, x2, y2 } => x1 == y1 && x2 == y2,
            _ => false,
        }
    }
}

impl FromStr for EasingFunction {
    type Err = AnimationError;

    fn from_str(input: &str) -> Result<Self> {
        let s = input.trim();
        match s {
            "linear" => return Ok(Self::Linear),
            "ease" => return Ok(Self::Ease),
            "ease-in" => return Ok(Self::EaseIn),
            "ease-out" => return Ok(Self::EaseOut),
            "ease-in-out" => return Ok(Self::EaseInOut),
            "step-start" | "jump-start" => return Self::steps(1, StepPosition::Start),
            "step-end" | "jump-end" => return Self::steps(1, StepPosition::End),
            _ => {}
        }

        let invalid = || AnimationError::InvalidEasing(input.to_string());

        if let Some(args) = function_arguments(s, "cubic-bezier") {
            let values = args
                .iter()
                .map(|arg| arg.parse::<f64>().map_err(|_| invalid()))
                .collect::<Result<Vec<_>>>()?;
            if let [x1, y1, x2, y2] = values[..] {
                return Self::cubic_bezier(x1, y1, x2, y2);
            }
            return Err(invalid());
        }

        if let Some(args) = function_arguments(s, "steps") {
            let (count, position) = match args.as_slice() {
                [count] => (*count, StepPosition::End),
                [count, position] => (*count, position.parse()?),
                _ => return Err(invalid()),
            };
            let count = count.parse::<u32>().map_err(|_| invalid())?;
            return Self::steps(count, position);
        }

        Err(invalid())
    }
}

impl fmt::Display for EasingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("linear"),
            Self::Ease => f.write_str("ease"),
            Self::EaseIn => f.write_str("ease-in"),
            Self::EaseOut => f.write_str("ease-out"),
            Self::EaseInOut => f.write_str("ease-in-out"),
            Self::CubicBezier { x1, y1, x2, y2 } => {
                write!(f, "cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
            Self::Steps { count, position } => write!(f, "steps({count}, {})", position.keyword()),
        }
    }
}

/// Easing as supplied by a caller: either a name/syntax string still to be
/// parsed, or an already constructed function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EasingInput {
    Name(String),
    Function(EasingFunction),
}

impl EasingInput {
    /// Resolve to a concrete easing function.
    ///
    /// Deserialized functions go through the same checks as parsed syntax.
    pub fn resolve(&self) -> Result<EasingFunction> {
        match self {
            Self::Name(name) => name.parse(),
            Self::Function(function) => function.validated(),
        }
    }
}

impl From<EasingFunction> for EasingInput {
    fn from(function: EasingFunction) -> Self {
        Self::Function(function)
    }
}

impl From<&str> for EasingInput {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Split `name(a, b, ...)` into its trimmed arguments.
fn function_arguments<'a>(s: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let inner = s
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    Some(inner.split(',').map(str::trim).collect())
}

/// Evaluate a cubic bezier curve at the given progress.
///
/// Inside `[0, 1]` the curve parameter is found by bisecting x(t), then y is
/// evaluated at that parameter. Outside `[0, 1]` the curve is extended along
/// the tangent at the nearest end point.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, progress: f64) -> f64 {
    if x1 == y1 && x2 == y2 {
        return progress;
    }

    if progress < 0.0 {
        let slope = if x1 > 0.0 {
            y1 / x1
        } else if y1 == 0.0 && x2 > 0.0 {
            y2 / x2
        } else {
            0.0
        };
        return slope * progress;
    }

    if progress > 1.0 {
        let slope = if x2 < 1.0 {
            (y2 - 1.0) / (x2 - 1.0)
        } else if y2 == 1.0 && x1 < 1.0 {
            (y1 - 1.0) / (x1 - 1.0)
        } else {
            0.0
        };
        return 1.0 + slope * (progress - 1.0);
    }

    if progress == 0.0 || progress == 1.0 {
        return progress;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_component(y1, y2, t)
}

/// Find t in `[0, 1]` with x(t) == target by bisection. x(t) is monotonic
/// because both x control values are in `[0, 1]`.
fn solve_bezier_x(x1: f64, x2: f64, target_x: f64) -> f64 {
    let mut low = 0.0;
    let mut high = 1.0;
    let mut t = target_x;

    for _ in 0..MAX_BISECTION_STEPS {
        let x = bezier_component(x1, x2, t);
        if (x - target_x).abs() < BISECTION_EPSILON {
            break;
        }
        if x < target_x {
            low = t;
        } else {
            high = t;
        }
        t = (low + high) / 2.0;
    }

    t
}

/// One coordinate of the bezier with end points 0 and 1.
/// B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_component(p1: f64, p2: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;

    3.0 * mt * mt * t * p1 + 3.0 * mt * t2 * p2 + t3
}

/// Evaluate a stepped easing function.
fn stepped(steps: u32, position: StepPosition, progress: f64, before_flag: bool) -> f64 {
    let steps_f = f64::from(steps);
    let scaled = progress * steps_f;
    let mut current_step = scaled.floor();

    if matches!(position, StepPosition::Start | StepPosition::Both) {
        current_step += 1.0;
    }

    // Sampling exactly on a boundary from the before side stays on the
    // lower step.
    if before_flag && scaled % 1.0 == 0.0 {
        current_step -= 1.0;
    }

    if progress >= 0.0 && current_step < 0.0 {
        current_step = 0.0;
    }

    let jumps = match position {
        StepPosition::Both => steps_f + 1.0,
        StepPosition::None => steps_f - 1.0,
        StepPosition::Start | StepPosition::End => steps_f,
    };

    if progress <= 1.0 && current_step > jumps {
        current_step = jumps;
    }

    current_step / jumps
}
