//! The mutation sink: where sampled values land.
//!
//! Effects never write to targets directly. They stage values through a
//! [`MutationSink`], which commits every staged write at once when the
//! scheduler flushes at the end of a tick. The sink also keeps, per effect,
//! a snapshot of the values the effect first touched so that canceling or
//! finishing without fill can put them back.
//!
//! [`TargetTable`] is the in-memory implementation used by the driver and
//! the tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::types::{AnimatedValue, EffectId, PropertyDescriptor, SetterKind, TargetId};

/// Receives sampled values and owns the per-target write buffer.
pub trait MutationSink {
    /// Snapshot the current values of `properties` on `target` for `effect`.
    /// Properties already captured for that effect keep their first snapshot.
    fn set_initial(&mut self, effect: EffectId, target: &TargetId, properties: &[PropertyDescriptor]);

    /// Stage a write. Not visible until [`flush`](MutationSink::flush).
    fn apply(&mut self, target: &TargetId, property: &PropertyDescriptor, value: AnimatedValue);

    /// Commit all staged writes.
    fn flush(&mut self);

    /// Put back everything `effect` snapshotted and drop its staged writes.
    fn restore(&mut self, effect: EffectId);

    /// The target's current externally visible value, if it has one.
    fn computed_value(&self, target: &TargetId, property: &PropertyDescriptor) -> Option<AnimatedValue>;
}

/// A sink shared by every animation of a context.
pub type SharedSink = Rc<RefCell<dyn MutationSink>>;

type PropertyKey = (SetterKind, String);

fn key_of(property: &PropertyDescriptor) -> PropertyKey {
    (property.setter, property.name.clone())
}

#[derive(Debug, Default)]
struct TargetState {
    committed: BTreeMap<PropertyKey, AnimatedValue>,
    staged: BTreeMap<PropertyKey, AnimatedValue>,
}

#[derive(Debug)]
struct Snapshot {
    target: TargetId,
    values: Vec<(PropertyKey, Option<AnimatedValue>)>,
}

/// In-memory targets, each with attribute, property and style values.
#[derive(Debug, Default)]
pub struct TargetTable {
    targets: HashMap<TargetId, TargetState>,
    snapshots: HashMap<EffectId, Snapshot>,
    flush_count: usize,
}

impl TargetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the table for use as a context's sink.
    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// Add a target with no values.
    pub fn insert_target(&mut self, target: impl Into<TargetId>) {
        self.targets.entry(target.into()).or_default();
    }

    /// Write a value directly, as the host would.
    pub fn set(&mut self, target: &TargetId, property: &PropertyDescriptor, value: impl Into<AnimatedValue>) {
        self.targets
            .entry(target.clone())
            .or_default()
            .committed
            .insert(key_of(property), value.into());
    }

    /// Committed value of a property.
    pub fn get(&self, target: &TargetId, property: &PropertyDescriptor) -> Option<&AnimatedValue> {
        self.targets.get(target)?.committed.get(&key_of(property))
    }

    /// Staged, not yet flushed value of a property.
    pub fn staged(&self, target: &TargetId, property: &PropertyDescriptor) -> Option<&AnimatedValue> {
        self.targets.get(target)?.staged.get(&key_of(property))
    }

    pub fn has_snapshot(&self, effect: EffectId) -> bool {
        self.snapshots.contains_key(&effect)
    }

    /// Number of flushes that committed at least one write.
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }
}

impl MutationSink for TargetTable {
    fn set_initial(&mut self, effect: EffectId, target: &TargetId, properties: &[PropertyDescriptor]) {
        let current = self.targets.entry(target.clone()).or_default();
        let snapshot = self.snapshots.entry(effect).or_insert_with(|| Snapshot {
            target: target.clone(),
            values: Vec::new(),
        });
        for property in properties {
            let key = key_of(property);
            if snapshot.values.iter().any(|(captured, _)| *captured == key) {
                continue;
            }
            let value = current.committed.get(&key).cloned();
            snapshot.values.push((key, value));
        }
    }

    fn apply(&mut self, target: &TargetId, property: &PropertyDescriptor, value: AnimatedValue) {
        self.targets
            .entry(target.clone())
            .or_default()
            .staged
            .insert(key_of(property), value);
    }

    fn flush(&mut self) {
        let mut written = 0;
        for state in self.targets.values_mut() {
            written += state.staged.len();
            let staged = std::mem::take(&mut state.staged);
            state.committed.extend(staged);
        }
        if written > 0 {
            self.flush_count += 1;
            log::trace!("flushed {written} staged writes");
        }
    }

    fn restore(&mut self, effect: EffectId) {
        let Some(snapshot) = self.snapshots.remove(&effect) else {
            return;
        };
        let Some(state) = self.targets.get_mut(&snapshot.target) else {
            return;
        };
        log::debug!(
            "restoring {} properties of {} for effect {}",
            snapshot.values.len(),
            snapshot.target,
            effect.0
        );
        for (key, value) in snapshot.values {
            state.staged.remove(&key);
            match value {
                Some(value) => state.committed.insert(key, value),
                None => state.committed.remove(&key),
            };
        }
    }

    fn computed_value(&self, target: &TargetId, property: &PropertyDescriptor) -> Option<AnimatedValue> {
        self.get(target, property).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opacity() -> PropertyDescriptor {
        PropertyDescriptor::style("opacity")
    }

    #[test]
    fn test_writes_are_batched_until_flush() {
        let mut table = TargetTable::new();
        let box_a = TargetId::from("box");
        table.set(&box_a, &opacity(), 1.0);

        table.apply(&box_a, &opacity(), AnimatedValue::Number(0.5));
        assert_eq!(table.get(&box_a, &opacity()), Some(&AnimatedValue::Number(1.0)));
        assert_eq!(table.staged(&box_a, &opacity()), Some(&AnimatedValue::Number(0.5)));

        table.flush();
        assert_eq!(table.get(&box_a, &opacity()), Some(&AnimatedValue::Number(0.5)));
        assert_eq!(table.staged(&box_a, &opacity()), None);
        assert_eq!(table.flush_count(), 1);

        table.flush();
        assert_eq!(table.flush_count(), 1);
    }

    #[test]
    fn test_restore_reverts_to_first_snapshot() {
        let mut table = TargetTable::new();
        let target = TargetId::from("box");
        let effect = EffectId::new();
        table.set(&target, &opacity(), 1.0);

        table.set_initial(effect, &target, &[opacity()]);
        table.apply(&target, &opacity(), AnimatedValue::Number(0.2));
        table.flush();

        // A second call does not overwrite the first snapshot.
        table.set_initial(effect, &target, &[opacity()]);
        table.apply(&target, &opacity(), AnimatedValue::Number(0.4));

        table.restore(effect);
        assert_eq!(table.get(&target, &opacity()), Some(&AnimatedValue::Number(1.0)));
        assert_eq!(table.staged(&target, &opacity()), None);
        assert!(!table.has_snapshot(effect));
    }

    #[test]
    fn test_restore_removes_values_that_did_not_exist() {
        let mut table = TargetTable::new();
        let target = TargetId::from("box");
        let effect = EffectId::new();
        let width = PropertyDescriptor::new("width", SetterKind::Attribute);

        table.set_initial(effect, &target, &[width.clone()]);
        table.apply(&target, &width, AnimatedValue::from("10px"));
        table.flush();
        assert!(table.get(&target, &width).is_some());

        table.restore(effect);
        assert_eq!(table.get(&target, &width), None);
    }

    #[test]
    fn test_setter_kinds_are_separate_slots() {
        let mut table = TargetTable::new();
        let target = TargetId::from("path");
        table.set(&target, &PropertyDescriptor::new("d", SetterKind::Attribute), "M0 0");

        assert!(table.computed_value(&target, &PropertyDescriptor::style("d")).is_none());
        assert_eq!(
            table.computed_value(&target, &PropertyDescriptor::new("d", SetterKind::Attribute)),
            Some(AnimatedValue::from("M0 0"))
        );
    }

    #[test]
    fn test_last_writer_wins_within_a_flush() {
        let mut table = TargetTable::new();
        let target = TargetId::from("box");
        table.apply(&target, &opacity(), AnimatedValue::Number(0.1));
        table.apply(&target, &opacity(), AnimatedValue::Number(0.9));
        table.flush();
        assert_eq!(table.get(&target, &opacity()), Some(&AnimatedValue::Number(0.9)));
    }
}
