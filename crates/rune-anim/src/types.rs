//! Core animation types and data structures.
//!
//! This module defines the fundamental types shared across the engine:
//! - `AnimatedValue`: a value a property can take (number or text template)
//! - `KeyframeValue`: a value as written in a keyframe, optionally detailed
//! - `PropertyDescriptor` / `SetterKind`: how a property reaches its target
//! - `AnimationId`, `EffectId`, `TargetId`: identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an animation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimationId(pub u64);

impl AnimationId {
    /// Generate a new unique animation ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for AnimationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a keyframe effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectId(pub u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of an animated target, owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A value an animated property can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnimatedValue {
    /// Plain number (opacity, scroll offset, ...).
    Number(f64),
    /// Text with embedded numbers (`"10px"`, `"translate(4px, 2px)"`, `"#f00"`).
    Text(String),
}

impl AnimatedValue {
    /// Try to extract a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    /// Try to extract text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for AnimatedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for AnimatedValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for AnimatedValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AnimatedValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// How a property value is written onto (and read back from) its target.
///
/// Each setter kind pairs with the getter of the same kind when the engine
/// samples a target's computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetterKind {
    /// A named attribute on the target.
    Attribute,
    /// A direct property of the target object.
    Property,
    /// An inline style declaration.
    #[default]
    Style,
}

/// How two keyframe values are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationKind {
    /// `from + (to - from) * t` on plain numbers.
    Numeric,
    /// Slot-wise interpolation of numbers embedded in text.
    Template,
    /// No blending: the value flips from `from` to `to` halfway.
    Discrete,
}

impl InterpolationKind {
    /// Pick a kind for a pair of values when none was requested.
    pub fn infer(from: &AnimatedValue, to: &AnimatedValue) -> Self {
        match (from, to) {
            (AnimatedValue::Number(_), AnimatedValue::Number(_)) => Self::Numeric,
            _ => Self::Template,
        }
    }
}

/// A property value as written in keyframe input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyframeValue {
    /// A bare value.
    Plain(AnimatedValue),
    /// A value with an explicit interpolation and/or setter.
    Detailed {
        value: AnimatedValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interpolate: Option<InterpolationKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        set: Option<SetterKind>,
    },
}

impl KeyframeValue {
    pub fn value(&self) -> &AnimatedValue {
        match self {
            Self::Plain(value) | Self::Detailed { value, .. } => value,
        }
    }

    pub fn interpolation(&self) -> Option<InterpolationKind> {
        match self {
            Self::Plain(_) => None,
            Self::Detailed { interpolate, .. } => *interpolate,
        }
    }

    pub fn setter(&self) -> Option<SetterKind> {
        match self {
            Self::Plain(_) => None,
            Self::Detailed { set, .. } => *set,
        }
    }
}

impl From<AnimatedValue> for KeyframeValue {
    fn from(value: AnimatedValue) -> Self {
        Self::Plain(value)
    }
}

impl From<f64> for KeyframeValue {
    fn from(value: f64) -> Self {
        Self::Plain(value.into())
    }
}

impl From<&str> for KeyframeValue {
    fn from(value: &str) -> Self {
        Self::Plain(value.into())
    }
}

/// An animated property together with the way it reaches its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub setter: SetterKind,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, setter: SetterKind) -> Self {
        Self {
            name: name.into(),
            setter,
        }
    }

    pub fn style(name: impl Into<String>) -> Self {
        Self::new(name, SetterKind::Style)
    }
}

/// Which way playback is heading, derived from the sign of the playback rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationDirection {
    Forwards,
    Backwards,
}

impl AnimationDirection {
    pub fn from_rate(playback_rate: f64) -> Self {
        if playback_rate < 0.0 {
            Self::Backwards
        } else {
            Self::Forwards
        }
    }
}

impl FromStr for SetterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attribute" => Ok(Self::Attribute),
            "property" => Ok(Self::Property),
            "style" => Ok(Self::Style),
            other => Err(format!("unknown setter kind {other:?}")),
        }
    }
}
