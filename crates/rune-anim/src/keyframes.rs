//! Keyframe input, validation and resolution.
//!
//! Two encodings are accepted:
//! - a list of keyframe records, each carrying some property values plus an
//!   optional `offset` and `easing`;
//! - a columnar record mapping each property name to its own sequence of
//!   values, with `offset` and `easing` given as scalars or sequences.
//!
//! Both resolve to a [`KeyframeSet`]: an ordered list of
//! [`ComputedKeyframe`]s whose offsets are all resolved, non-decreasing and
//! unique. Keyframes landing on the same offset are merged.
//!
//! # Example
//!
//! ```
//! use rune_anim::keyframes::{KeyframeInput, KeyframeSet};
//!
//! let input: KeyframeInput = serde_json::from_str(
//!     r#"[{ "opacity": 0 }, { "opacity": 0.8 }, { "opacity": 1 }]"#,
//! ).unwrap();
//! let set = KeyframeSet::resolve(&input).unwrap();
//! let offsets: Vec<f64> = set.frames().iter().map(|kf| kf.computed_offset).collect();
//! assert_eq!(offsets, vec![0.0, 0.5, 1.0]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::easing::{EasingFunction, EasingInput};
use crate::error::{AnimationError, Result};
use crate::interpolate::{interpolate_values, Template};
use crate::types::{AnimatedValue, InterpolationKind, KeyframeValue, PropertyDescriptor, SetterKind};

/// A keyframe offset as supplied: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OffsetInput {
    Number(f64),
    Text(String),
}

impl OffsetInput {
    /// Parse and range-check the offset.
    pub fn resolve(&self) -> Result<f64> {
        let value = match self {
            Self::Number(n) if n.is_nan() => {
                return Err(AnimationError::InvalidOffset(n.to_string()));
            }
            Self::Number(n) => *n,
            Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| !n.is_nan())
                .ok_or_else(|| AnimationError::InvalidOffset(text.clone()))?,
        };
        if !(0.0..=1.0).contains(&value) {
            return Err(AnimationError::OffsetOutOfRange(value));
        }
        Ok(value)
    }
}

impl From<f64> for OffsetInput {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// A scalar shared by every keyframe, or one entry per keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn as_slice(&self) -> &[T] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }
}

/// One keyframe record of the list encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawKeyframe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<OffsetInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<EasingInput>,
    #[serde(flatten)]
    pub values: BTreeMap<String, KeyframeValue>,
}

impl RawKeyframe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin this keyframe to an explicit offset.
    pub fn offset(mut self, offset: impl Into<OffsetInput>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    /// Set the easing used from this keyframe to the next.
    pub fn easing(mut self, easing: impl Into<EasingInput>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    /// Set a property value for this keyframe.
    pub fn set(mut self, property: impl Into<String>, value: impl Into<KeyframeValue>) -> Self {
        self.values.insert(property.into(), value.into());
        self
    }
}

/// The columnar encoding: one value sequence per property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnarKeyframes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<OneOrMany<Option<OffsetInput>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<OneOrMany<EasingInput>>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, OneOrMany<KeyframeValue>>,
}

impl ColumnarKeyframes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property with its value sequence.
    pub fn property(mut self, name: impl Into<String>, values: Vec<KeyframeValue>) -> Self {
        self.properties.insert(name.into(), OneOrMany::Many(values));
        self
    }

    /// Set the offset sequence.
    pub fn offsets(mut self, offsets: Vec<Option<f64>>) -> Self {
        let offsets = offsets.into_iter().map(|o| o.map(OffsetInput::Number)).collect();
        self.offset = Some(OneOrMany::Many(offsets));
        self
    }

    /// Set the easing sequence.
    pub fn easings(mut self, easings: Vec<EasingInput>) -> Self {
        self.easing = Some(OneOrMany::Many(easings));
        self
    }
}

/// Keyframes in either accepted encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyframeInput {
    List(Vec<RawKeyframe>),
    Columnar(ColumnarKeyframes),
}

impl KeyframeInput {
    /// Parse keyframes from JSON (an array or an object).
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<Vec<RawKeyframe>> for KeyframeInput {
    fn from(frames: Vec<RawKeyframe>) -> Self {
        Self::List(frames)
    }
}

impl From<ColumnarKeyframes> for KeyframeInput {
    fn from(columns: ColumnarKeyframes) -> Self {
        Self::Columnar(columns)
    }
}

/// A keyframe after offset and easing normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedKeyframe {
    /// The explicit offset, if one was given.
    pub offset: Option<f64>,
    /// The resolved position in `[0, 1]`.
    pub computed_offset: f64,
    /// Easing applied from this keyframe to the next one.
    pub easing: EasingFunction,
    pub values: BTreeMap<String, KeyframeValue>,
}

impl ComputedKeyframe {
    pub fn get(&self, property: &str) -> Option<&KeyframeValue> {
        self.values.get(property)
    }
}

/// A resolved, ordered keyframe list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframeSet {
    frames: Vec<ComputedKeyframe>,
}

/// One property-specific keyframe used while sampling.
#[derive(Debug, Clone)]
struct PropertyFrame {
    offset: f64,
    value: AnimatedValue,
    easing: EasingFunction,
    interpolate: Option<InterpolationKind>,
}

/// A per-property entry before merging.
struct Entry {
    explicit: Option<f64>,
    computed: f64,
    easing: Option<EasingFunction>,
    values: Vec<(String, KeyframeValue)>,
}

impl KeyframeSet {
    /// Validate and normalize keyframe input.
    ///
    /// Text values are tokenized up front so malformed colors fail here
    /// rather than on every sample.
    pub fn resolve(input: &KeyframeInput) -> Result<Self> {
        let entries = match input {
            KeyframeInput::List(frames) => resolve_list(frames)?,
            KeyframeInput::Columnar(columns) => resolve_columnar(columns)?,
        };
        for entry in &entries {
            for (_, value) in &entry.values {
                check_text(value)?;
            }
        }
        Ok(Self {
            frames: merge_entries(entries),
        })
    }

    pub fn frames(&self) -> &[ComputedKeyframe] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Get all properties animated by these keyframes, in first-seen order.
    pub fn animated_properties(&self) -> Vec<String> {
        let mut props: Vec<String> = Vec::new();
        for frame in &self.frames {
            for name in frame.values.keys() {
                if !props.contains(name) {
                    props.push(name.clone());
                }
            }
        }
        props
    }

    /// Describe every animated property. The first detailed value carrying a
    /// setter decides that property's setter kind.
    pub fn descriptors(&self, default_setter: SetterKind) -> Vec<PropertyDescriptor> {
        self.animated_properties()
            .into_iter()
            .map(|name| {
                let setter = self
                    .frames
                    .iter()
                    .filter_map(|frame| frame.get(&name).and_then(KeyframeValue::setter))
                    .next()
                    .unwrap_or(default_setter);
                PropertyDescriptor::new(name, setter)
            })
            .collect()
    }

    /// Whether `property` needs a synthesized keyframe at offset 0 or 1.
    pub fn needs_implicit_boundary(&self, property: &str) -> bool {
        let offsets: Vec<f64> = self
            .frames
            .iter()
            .filter(|frame| frame.values.contains_key(property))
            .map(|frame| frame.computed_offset)
            .collect();
        match (offsets.first(), offsets.last()) {
            (Some(first), Some(last)) => *first != 0.0 || *last != 1.0,
            _ => false,
        }
    }

    /// Get the value of a property at the given iteration progress.
    ///
    /// `base` is the target's underlying value, used to synthesize the
    /// implicit keyframes at offsets 0 and 1 when the property has none.
    /// Returns `Ok(None)` when the property is not animated.
    pub fn value_at(
        &self,
        property: &str,
        progress: f64,
        base: Option<&AnimatedValue>,
        precision: u32,
    ) -> Result<Option<AnimatedValue>> {
        let mut frames: Vec<PropertyFrame> = self
            .frames
            .iter()
            .filter_map(|frame| {
                frame.get(property).map(|value| PropertyFrame {
                    offset: frame.computed_offset,
                    value: value.value().clone(),
                    easing: frame.easing,
                    interpolate: value.interpolation(),
                })
            })
            .collect();

        let (Some(first), Some(last)) = (frames.first(), frames.last()) else {
            return Ok(None);
        };
        let needs_start = first.offset != 0.0;
        let needs_end = last.offset != 1.0;

        if needs_start || needs_end {
            let base = base.ok_or_else(|| AnimationError::UnresolvableBoundary(property.to_string()))?;
            let implicit = |offset| PropertyFrame {
                offset,
                value: base.clone(),
                easing: EasingFunction::Linear,
                interpolate: None,
            };
            if needs_start {
                frames.insert(0, implicit(0.0));
            }
            if needs_end {
                frames.push(implicit(1.0));
            }
        }

        let Some((start, end)) = find_interval(&frames, progress) else {
            return Ok(frames.first().map(|frame| frame.value.clone()));
        };
        let (from, to) = (&frames[start], &frames[end]);

        let span = to.offset - from.offset;
        let distance = if span > 0.0 {
            (progress - from.offset) / span
        } else {
            0.0
        };
        let eased = from.easing.evaluate(distance, false);
        let kind = from
            .interpolate
            .or(to.interpolate)
            .unwrap_or_else(|| InterpolationKind::infer(&from.value, &to.value));

        interpolate_values(&from.value, &to.value, eased, kind, precision).map(Some)
    }
}

/// Discrete values are swapped whole and never tokenized.
fn check_text(value: &KeyframeValue) -> Result<()> {
    match (value.value(), value.interpolation()) {
        (_, Some(InterpolationKind::Discrete)) | (AnimatedValue::Number(_), _) => Ok(()),
        (AnimatedValue::Text(text), _) => Template::parse(text).map(|_| ()),
    }
}

/// Find the pair of property keyframes bracketing `progress`.
///
/// Progress below 0 uses the first interval, progress at or above 1 the
/// last one, so overshooting easings extrapolate.
fn find_interval(frames: &[PropertyFrame], progress: f64) -> Option<(usize, usize)> {
    let n = frames.len();
    if n < 2 {
        return None;
    }
    if progress < 0.0 {
        return Some((0, 1));
    }
    if progress >= 1.0 {
        return Some((n - 2, n - 1));
    }
    let start = frames
        .iter()
        .rposition(|frame| frame.offset <= progress && frame.offset < 1.0)
        .unwrap_or(0);
    Some((start, (start + 1).min(n - 1)))
}

/// Resolve explicit offsets in order, enforcing range and order.
fn resolve_explicit_offsets<'a>(
    offsets: impl Iterator<Item = Option<&'a OffsetInput>>,
) -> Result<Vec<Option<f64>>> {
    let mut previous: Option<f64> = None;
    let mut resolved = Vec::new();
    for (index, offset) in offsets.enumerate() {
        let value = offset.map(OffsetInput::resolve).transpose()?;
        if let Some(offset) = value {
            if let Some(previous) = previous.filter(|previous| offset < *previous) {
                return Err(AnimationError::OffsetsNotOrdered {
                    index,
                    offset,
                    previous,
                });
            }
            previous = Some(offset);
        }
        resolved.push(value);
    }
    Ok(resolved)
}

/// Fill in missing offsets.
///
/// Explicit offsets are kept. With more than one keyframe the first defaults
/// to 0 and the last to 1; a lone keyframe defaults to 1. Runs of missing
/// interior offsets are spaced evenly between their resolved neighbours.
pub fn distribute_offsets(explicit: &[Option<f64>]) -> Vec<f64> {
    let n = explicit.len();
    match n {
        0 => return Vec::new(),
        1 => return vec![explicit[0].unwrap_or(1.0)],
        _ => {}
    }

    let mut offsets = explicit.to_vec();
    offsets[0].get_or_insert(0.0);
    offsets[n - 1].get_or_insert(1.0);

    let mut previous = 0;
    for index in 1..n {
        let Some(end) = offsets[index] else {
            continue;
        };
        let gap = index - previous;
        if gap > 1 {
            let start = offsets[previous].unwrap_or(0.0);
            for k in 1..gap {
                offsets[previous + k] = Some(start + (end - start) * k as f64 / gap as f64);
            }
        }
        previous = index;
    }

    offsets.into_iter().map(|o| o.unwrap_or(0.0)).collect()
}

fn resolve_list(frames: &[RawKeyframe]) -> Result<Vec<Entry>> {
    let easings = frames
        .iter()
        .map(|frame| frame.easing.as_ref().map(EasingInput::resolve).transpose())
        .collect::<Result<Vec<_>>>()?;
    let explicit = resolve_explicit_offsets(frames.iter().map(|frame| frame.offset.as_ref()))?;
    let computed = distribute_offsets(&explicit);

    Ok(frames
        .iter()
        .zip(easings)
        .zip(explicit.into_iter().zip(computed))
        .map(|((frame, easing), (explicit, computed))| Entry {
            explicit,
            computed,
            easing,
            values: frame.values.clone().into_iter().collect(),
        })
        .collect())
}

fn resolve_columnar(columns: &ColumnarKeyframes) -> Result<Vec<Entry>> {
    let easings = match &columns.easing {
        Some(easing) => easing
            .as_slice()
            .iter()
            .map(EasingInput::resolve)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    let offsets = match &columns.offset {
        Some(offset) => resolve_explicit_offsets(offset.as_slice().iter().map(Option::as_ref))?,
        None => Vec::new(),
    };

    if columns.offset.is_some() && offsets.is_empty() {
        return Err(AnimationError::PartialKeyframes(
            "offset sequence is empty".to_string(),
        ));
    }
    if columns.easing.is_some() && easings.is_empty() {
        return Err(AnimationError::PartialKeyframes(
            "easing sequence is empty".to_string(),
        ));
    }

    let mut entries = Vec::new();
    for (name, values) in &columns.properties {
        let values = values.as_slice();
        let n = values.len();
        if n == 0 {
            return Err(AnimationError::PartialKeyframes(format!(
                "property {name:?} has no values"
            )));
        }

        let explicit = align_offsets(&offsets, n);
        let computed = distribute_offsets(&explicit);
        for (index, value) in values.iter().enumerate() {
            entries.push(Entry {
                explicit: explicit[index],
                computed: computed[index],
                easing: distributed(&easings, index, n).copied(),
                values: vec![(name.clone(), value.clone())],
            });
        }
    }
    Ok(entries)
}

/// Line an offset sequence up with `n` property values: a longer sequence is
/// truncated, a shorter one is spread evenly across the values with the
/// gaps left for [`distribute_offsets`].
fn align_offsets(offsets: &[Option<f64>], n: usize) -> Vec<Option<f64>> {
    let m = offsets.len();
    if m >= n {
        return offsets[..n].to_vec();
    }
    let mut aligned = vec![None; n];
    if m == 1 {
        aligned[0] = offsets[0];
        return aligned;
    }
    for (j, offset) in offsets.iter().enumerate() {
        let index = (j * (n - 1) + (m - 1) / 2) / (m - 1);
        aligned[index] = *offset;
    }
    aligned
}

/// Pick the entry of a (possibly shorter) sequence for keyframe `index` of
/// `n`, spreading the sequence evenly. A single entry applies to all.
fn distributed<T>(items: &[T], index: usize, n: usize) -> Option<&T> {
    match items.len() {
        0 => None,
        m if m >= n => items.get(index),
        m => items.get(index * m / n),
    }
}

/// Stable-sort entries by computed offset and merge those sharing one.
fn merge_entries(mut entries: Vec<Entry>) -> Vec<ComputedKeyframe> {
    entries.sort_by(|a, b| a.computed.total_cmp(&b.computed));

    let mut merged: Vec<ComputedKeyframe> = Vec::new();
    for entry in entries {
        match merged.last_mut() {
            Some(frame) if frame.computed_offset == entry.computed => {
                // Later values and explicit easings win.
                if let Some(easing) = entry.easing {
                    frame.easing = easing;
                }
                if frame.offset.is_none() {
                    frame.offset = entry.explicit;
                }
                frame.values.extend(entry.values);
            }
            _ => merged.push(ComputedKeyframe {
                offset: entry.explicit,
                computed_offset: entry.computed,
                easing: entry.easing.unwrap_or_default(),
                values: entry.values.into_iter().collect(),
            }),
        }
    }
    merged
}
