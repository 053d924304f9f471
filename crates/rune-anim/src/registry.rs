//! Registry of live animations.
//!
//! The registry answers two questions the per-animation scheduling path
//! cannot: which animation currently plays a given effect, and which
//! animations hang off a given timeline (for bulk ticking). It holds weak
//! handles only; dropped animations are pruned whenever one is added and
//! before bulk ticking.

use std::rc::Rc;

use crate::animation::{Animation, WeakAnimation};
use crate::scheduler::FrameTask;
use crate::timeline::Timeline;
use crate::types::{AnimationId, EffectId};

struct RegistryEntry {
    id: AnimationId,
    animation: WeakAnimation,
    tick: FrameTask,
}

#[derive(Default)]
pub struct AnimationRegistry {
    entries: Vec<RegistryEntry>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `animation`. Adding the same animation twice is a no-op.
    /// Entries of dropped animations are discarded on the way.
    pub fn add(&mut self, animation: &Animation) {
        self.entries.retain(|entry| entry.animation.is_live());
        let id = animation.id();
        if self.entries.iter().any(|entry| entry.id == id) {
            return;
        }
        self.entries.push(RegistryEntry {
            id,
            animation: animation.downgrade(),
            tick: animation.tick_task(),
        });
    }

    pub fn remove(&mut self, id: AnimationId) {
        self.entries.retain(|entry| entry.id != id);
    }

    pub fn get(&self, id: AnimationId) -> Option<Animation> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .and_then(|entry| entry.animation.upgrade())
    }

    /// The live animation whose effect has the given id.
    pub fn find_by_effect(&self, effect: EffectId) -> Option<Animation> {
        self.entries
            .iter()
            .filter_map(|entry| entry.animation.upgrade())
            .find(|animation| animation.effect().is_some_and(|e| e.id() == effect))
    }

    /// Tick functions of every live animation attached to `timeline`, in
    /// registration order.
    pub fn ticks_for(&mut self, timeline: &Rc<Timeline>) -> Vec<FrameTask> {
        self.prune();
        self.entries
            .iter()
            .filter(|entry| {
                entry
                    .animation
                    .upgrade()
                    .and_then(|animation| animation.timeline())
                    .is_some_and(|attached| Rc::ptr_eq(&attached, timeline))
            })
            .map(|entry| Rc::clone(&entry.tick))
            .collect()
    }

    /// Drop entries whose animation is gone. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.animation.is_live());
        let removed = before - self.entries.len();
        if removed > 0 {
            log::debug!("pruned {removed} dropped animations");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
