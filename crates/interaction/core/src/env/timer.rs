use std::collections::BTreeMap;

use crate::state::{InteractableId, InteractorId};

/// Handle of a scheduled one-shot timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimerHandle(pub u64);

/// What a timer is for. An entity holds at most one timer per kind.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum TimerKind {
    /// Interaction progress.
    Interaction,
    /// Lifetime of paused progress.
    ProgressExpiration,
    Cooldown,
    /// Gap allowed between two mash presses.
    Keystroke,
    /// Next poll of a trace interactor.
    Trace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimerOwner {
    Interactable(InteractableId),
    Interactor(InteractorId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimerPurpose {
    pub owner: TimerOwner,
    pub kind: TimerKind,
}

/// A timer that reached its deadline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimerFired {
    pub handle: TimerHandle,
    pub purpose: TimerPurpose,
    /// World time of the deadline.
    pub at: f32,
}

/// One-shot timer scheduling on the world clock.
///
/// Callbacks are not stored here. The owner pops due timers and dispatches on
/// their [`TimerPurpose`], which keeps the service free of borrows into the
/// world.
pub trait TimerService {
    /// Current world time in seconds.
    fn now(&self) -> f32;

    fn schedule(&mut self, duration: f32, purpose: TimerPurpose) -> TimerHandle;

    fn cancel(&mut self, handle: TimerHandle);

    fn pause(&mut self, handle: TimerHandle);

    fn resume(&mut self, handle: TimerHandle);

    /// Scheduled and not paused.
    fn is_active(&self, handle: TimerHandle) -> bool;

    fn is_paused(&self, handle: TimerHandle) -> bool;

    /// Seconds run so far, `None` for unknown handles.
    fn elapsed(&self, handle: TimerHandle) -> Option<f32>;

    /// Full duration the timer was scheduled with.
    fn duration(&self, handle: TimerHandle) -> Option<f32>;

    /// Removes the earliest running timer due at or before `until` and moves
    /// the clock to its deadline.
    fn pop_due(&mut self, until: f32) -> Option<TimerFired>;

    /// Moves the clock forward. Never moves it backwards.
    fn advance_to(&mut self, time: f32);
}

#[derive(Clone, Debug)]
struct TimerEntry {
    purpose: TimerPurpose,
    duration: f32,
    /// Seconds left when the timer was last resumed or paused.
    remaining: f32,
    resumed_at: f32,
    paused: bool,
}

impl TimerEntry {
    fn deadline(&self) -> f32 {
        self.resumed_at + self.remaining
    }

    fn remaining_at(&self, now: f32) -> f32 {
        if self.paused {
            self.remaining
        } else {
            (self.deadline() - now).max(0.0)
        }
    }
}

/// Deterministic in-process [`TimerService`] driven by explicit clock advances.
#[derive(Clone, Debug, Default)]
pub struct TimerManager {
    now: f32,
    next_handle: u64,
    entries: BTreeMap<TimerHandle, TimerEntry>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TimerService for TimerManager {
    fn now(&self) -> f32 {
        self.now
    }

    fn schedule(&mut self, duration: f32, purpose: TimerPurpose) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        let duration = duration.max(0.0);
        self.entries.insert(
            handle,
            TimerEntry {
                purpose,
                duration,
                remaining: duration,
                resumed_at: self.now,
                paused: false,
            },
        );
        tracing::trace!(?handle, kind = %purpose.kind, duration, "timer scheduled");
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if self.entries.remove(&handle).is_some() {
            tracing::trace!(?handle, "timer canceled");
        }
    }

    fn pause(&mut self, handle: TimerHandle) {
        let now = self.now;
        if let Some(entry) = self.entries.get_mut(&handle) {
            if !entry.paused {
                entry.remaining = entry.remaining_at(now);
                entry.paused = true;
            }
        }
    }

    fn resume(&mut self, handle: TimerHandle) {
        let now = self.now;
        if let Some(entry) = self.entries.get_mut(&handle) {
            if entry.paused {
                entry.resumed_at = now;
                entry.paused = false;
            }
        }
    }

    fn is_active(&self, handle: TimerHandle) -> bool {
        self.entries.get(&handle).is_some_and(|entry| !entry.paused)
    }

    fn is_paused(&self, handle: TimerHandle) -> bool {
        self.entries.get(&handle).is_some_and(|entry| entry.paused)
    }

    fn elapsed(&self, handle: TimerHandle) -> Option<f32> {
        self.entries
            .get(&handle)
            .map(|entry| entry.duration - entry.remaining_at(self.now))
    }

    fn duration(&self, handle: TimerHandle) -> Option<f32> {
        self.entries.get(&handle).map(|entry| entry.duration)
    }

    fn pop_due(&mut self, until: f32) -> Option<TimerFired> {
        let (handle, deadline) = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.paused && entry.deadline() <= until)
            .map(|(handle, entry)| (*handle, entry.deadline()))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))?;

        let entry = self.entries.remove(&handle)?;
        self.now = self.now.max(deadline);
        Some(TimerFired {
            handle,
            purpose: entry.purpose,
            at: deadline,
        })
    }

    fn advance_to(&mut self, time: f32) {
        self.now = self.now.max(time);
    }
}

/// Per-entity timer slots, one per [`TimerKind`].
///
/// Starting a timer in an occupied slot cancels the previous one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimerSlots {
    slots: BTreeMap<TimerKind, TimerHandle>,
}

impl TimerSlots {
    pub fn start(
        &mut self,
        timers: &mut dyn TimerService,
        owner: TimerOwner,
        kind: TimerKind,
        duration: f32,
    ) -> TimerHandle {
        if let Some(previous) = self.slots.remove(&kind) {
            timers.cancel(previous);
        }
        let handle = timers.schedule(duration, TimerPurpose { owner, kind });
        self.slots.insert(kind, handle);
        handle
    }

    pub fn get(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.slots.get(&kind).copied()
    }

    pub fn cancel(&mut self, timers: &mut dyn TimerService, kind: TimerKind) {
        if let Some(handle) = self.slots.remove(&kind) {
            timers.cancel(handle);
        }
    }

    pub fn cancel_all(&mut self, timers: &mut dyn TimerService) {
        for (_, handle) in core::mem::take(&mut self.slots) {
            timers.cancel(handle);
        }
    }

    /// Clears the slot if it still holds `handle`. Returns false for stale handles.
    pub fn take_fired(&mut self, kind: TimerKind, handle: TimerHandle) -> bool {
        if self.slots.get(&kind) == Some(&handle) {
            self.slots.remove(&kind);
            return true;
        }
        false
    }

    pub fn is_active(&self, timers: &dyn TimerService, kind: TimerKind) -> bool {
        self.get(kind).is_some_and(|handle| timers.is_active(handle))
    }

    pub fn is_paused(&self, timers: &dyn TimerService, kind: TimerKind) -> bool {
        self.get(kind).is_some_and(|handle| timers.is_paused(handle))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purpose(kind: TimerKind) -> TimerPurpose {
        TimerPurpose {
            owner: TimerOwner::Interactable(InteractableId(1)),
            kind,
        }
    }

    #[test]
    fn fires_at_deadline_in_order() {
        let mut timers = TimerManager::new();
        let late = timers.schedule(2.0, purpose(TimerKind::Cooldown));
        let early = timers.schedule(1.0, purpose(TimerKind::Interaction));

        let first = timers.pop_due(5.0).expect("first timer");
        assert_eq!(first.handle, early);
        assert_eq!(first.at, 1.0);
        assert_eq!(timers.now(), 1.0);

        let second = timers.pop_due(5.0).expect("second timer");
        assert_eq!(second.handle, late);
        assert!(timers.pop_due(5.0).is_none());
    }

    #[test]
    fn paused_timer_keeps_progress() {
        let mut timers = TimerManager::new();
        let handle = timers.schedule(3.0, purpose(TimerKind::Interaction));
        timers.advance_to(1.0);
        timers.pause(handle);
        timers.advance_to(10.0);

        assert!(timers.pop_due(10.0).is_none());
        assert_eq!(timers.elapsed(handle), Some(1.0));
        assert!(!timers.is_active(handle));
        assert!(timers.is_paused(handle));

        timers.resume(handle);
        let fired = timers.pop_due(20.0).expect("resumed timer fires");
        assert_eq!(fired.at, 12.0);
    }

    #[test]
    fn slot_restart_cancels_previous() {
        let mut timers = TimerManager::new();
        let mut slots = TimerSlots::default();
        let owner = TimerOwner::Interactor(InteractorId(3));

        let first = slots.start(&mut timers, owner, TimerKind::Trace, 1.0);
        let second = slots.start(&mut timers, owner, TimerKind::Trace, 1.0);

        assert_ne!(first, second);
        assert!(!timers.is_active(first));
        assert_eq!(timers.len(), 1);
        assert!(!slots.take_fired(TimerKind::Trace, first));
        assert!(slots.take_fired(TimerKind::Trace, second));
    }
}
