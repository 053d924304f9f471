//! Error types for the animation engine.

use thiserror::Error;

/// Result type for animation operations.
pub type Result<T> = std::result::Result<T, AnimationError>;

/// Broad grouping of [`AnimationError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// An invalid timing option was supplied.
    Option,
    /// Keyframe input could not be validated or sampled.
    Keyframe,
    /// The requested playback transition is not possible in the current state.
    PlaybackState,
}

/// Errors returned synchronously by the animation engine.
///
/// Every operation checks its input before touching any state, so an `Err`
/// always means nothing was changed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// `delay` was NaN or infinite.
    #[error("delay must be a finite number, got {0}")]
    InvalidDelay(f64),

    /// `end_delay` was NaN or infinite.
    #[error("end delay must be a finite number, got {0}")]
    InvalidEndDelay(f64),

    /// `duration` was negative or NaN.
    #[error("duration must be a non-negative number or \"auto\", got {0}")]
    InvalidDuration(f64),

    /// `iterations` was negative or NaN.
    #[error("iterations must be a non-negative number, got {0}")]
    InvalidIterations(f64),

    /// `iteration_start` was negative or not finite.
    #[error("iteration start must be a finite non-negative number, got {0}")]
    InvalidIterationStart(f64),

    /// Unknown playback direction keyword.
    #[error("invalid direction keyword: {0:?}")]
    InvalidDirection(String),

    /// Unknown fill keyword.
    #[error("invalid fill keyword: {0:?}")]
    InvalidFill(String),

    /// An easing name or function syntax that does not resolve.
    #[error("invalid easing: {0:?}")]
    InvalidEasing(String),

    /// A keyframe offset outside `[0, 1]`.
    #[error("keyframe offset {0} is outside [0, 1]")]
    OffsetOutOfRange(f64),

    /// A keyframe offset that is neither a number nor a numeric string.
    #[error("keyframe offset {0:?} is not a number")]
    InvalidOffset(String),

    /// Explicit offsets decrease somewhere in the list.
    #[error("keyframe offsets are not sorted: {offset} at index {index} follows {previous}")]
    OffsetsNotOrdered {
        index: usize,
        offset: f64,
        previous: f64,
    },

    /// Columnar keyframes whose sequences cannot be lined up.
    #[error("partial keyframes: {0}")]
    PartialKeyframes(String),

    /// A `#` color literal with an unsupported number of hex digits.
    #[error("unparsable color literal: {0:?}")]
    InvalidColor(String),

    /// An implicit boundary keyframe needed the target's computed value,
    /// but the target does not have one.
    #[error("no computed value available for implicit keyframe of property {0:?}")]
    UnresolvableBoundary(String),

    /// `finish()` with a zero playback rate.
    #[error("cannot finish an animation with a playback rate of 0")]
    FinishWithZeroRate,

    /// `finish()` forwards when the effect never ends.
    #[error("cannot finish an animation with an infinite end time")]
    FinishInfinite,

    /// `play()` in reverse when the effect never ends.
    #[error("cannot play in reverse an animation with an infinite end time")]
    PlayReverseInfinite,

    /// `pause()` in reverse with no current time when the effect never ends.
    #[error("cannot pause in reverse an animation with an infinite end time and no current time")]
    PauseReverseInfinite,

    /// `reverse()` without a timeline.
    #[error("cannot reverse an animation that has no timeline")]
    NoTimeline,

    /// Attempt to make a resolved current time unresolved.
    #[error("cannot set the current time of a playing or paused animation to an unresolved value")]
    UnresolvedCurrentTime,
}

impl AnimationError {
    /// Which part of the taxonomy this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDelay(_)
            | Self::InvalidEndDelay(_)
            | Self::InvalidDuration(_)
            | Self::InvalidIterations(_)
            | Self::InvalidIterationStart(_)
            | Self::InvalidDirection(_)
            | Self::InvalidFill(_)
            | Self::InvalidEasing(_) => ErrorCategory::Option,
            Self::OffsetOutOfRange(_)
            | Self::InvalidOffset(_)
            | Self::OffsetsNotOrdered { .. }
            | Self::PartialKeyframes(_)
            | Self::InvalidColor(_)
            | Self::UnresolvableBoundary(_) => ErrorCategory::Keyframe,
            Self::FinishWithZeroRate
            | Self::FinishInfinite
            | Self::PlayReverseInfinite
            | Self::PauseReverseInfinite
            | Self::NoTimeline
            | Self::UnresolvedCurrentTime => ErrorCategory::PlaybackState,
        }
    }
}

/// Rejection reason delivered through `ready` and `finished` when an
/// animation is canceled. Never returned from an operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("the animation was aborted")]
pub struct AbortError;
