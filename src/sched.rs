//! Timed-action scheduler on a virtual millisecond clock
//!
//! Every repeating or one-shot behaviour in both games (drop cadence, firing,
//! movement steps, blink and respawn delays) is a scheduled action. The owner
//! advances the clock once per frame and then pops due actions one at a time,
//! so a cancellation made while handling one action is honoured by every
//! action that would have fired later in the same frame.
//!
//! Actions are plain data (`A`), not closures: the owner matches on them and
//! applies the effect to its own state.

/// Opaque handle to a scheduled action.
///
/// Handles carry a generation so a stale handle never cancels a newer timer
/// that happens to reuse the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    slot: u32,
    generation: u32,
}

/// An action that came due
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<A> {
    pub handle: TimerHandle,
    /// Virtual time (ms) at which the action was due
    pub at_ms: u64,
    pub action: A,
}

#[derive(Debug, Clone)]
struct Entry<A> {
    due_ms: u64,
    /// `Some` for repeating timers
    interval_ms: Option<u64>,
    /// Issue order, breaks ties between timers due at the same instant
    seq: u64,
    action: A,
}

#[derive(Debug, Clone)]
struct Slot<A> {
    generation: u32,
    entry: Option<Entry<A>>,
}

/// Deterministic scheduler of repeating and one-shot actions
#[derive(Debug, Clone)]
pub struct Scheduler<A> {
    now_ms: u64,
    horizon_ms: u64,
    slots: Vec<Slot<A>>,
    free: Vec<u32>,
    next_seq: u64,
}

impl<A: Clone> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Clone> Scheduler<A> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            horizon_ms: 0,
            slots: Vec::new(),
            free: Vec::new(),
            next_seq: 0,
        }
    }

    /// Current virtual time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of pending actions
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Schedule `action` every `interval_ms` until cancelled.
    ///
    /// A zero interval is treated as 1 ms so a repeating timer can never
    /// starve the frame.
    pub fn schedule(&mut self, interval_ms: u64, action: A) -> TimerHandle {
        let interval = interval_ms.max(1);
        self.insert(self.now_ms + interval, Some(interval), action)
    }

    /// Schedule `action` once after `delay_ms`.
    pub fn schedule_once(&mut self, delay_ms: u64, action: A) -> TimerHandle {
        self.insert(self.now_ms + delay_ms, None, action)
    }

    /// Cancel a pending action. Returns whether anything was cancelled;
    /// cancelling a fired, cancelled or unknown handle is a no-op.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.slot as usize) else {
            return false;
        };
        if slot.generation != handle.generation || slot.entry.is_none() {
            return false;
        }
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.slot);
        true
    }

    /// Take the handle out of `slot` (if any) and cancel it.
    pub fn cancel_slot(&mut self, slot: &mut Option<TimerHandle>) {
        if let Some(handle) = slot.take() {
            self.cancel(handle);
        }
    }

    /// Whether the handle still refers to a pending action
    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.slots
            .get(handle.slot as usize)
            .is_some_and(|s| s.generation == handle.generation && s.entry.is_some())
    }

    /// Whether an optional handle slot holds a pending action
    pub fn slot_active(&self, slot: &Option<TimerHandle>) -> bool {
        slot.is_some_and(|h| self.is_active(h))
    }

    /// Cancel everything and rewind the clock.
    pub fn clear(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(i as u32);
            }
        }
        self.now_ms = 0;
        self.horizon_ms = 0;
    }

    /// Open a window of `dt_ms` for [`Scheduler::pop_due`].
    pub fn advance(&mut self, dt_ms: u64) {
        self.horizon_ms = self.horizon_ms.max(self.now_ms) + dt_ms;
    }

    /// Pop the earliest action due within the current window.
    ///
    /// Repeating actions are re-armed before being returned. When nothing
    /// else is due the clock settles at the end of the window.
    pub fn pop_due(&mut self) -> Option<Fired<A>> {
        let mut best: Option<(usize, u64, u64)> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = &slot.entry {
                if entry.due_ms > self.horizon_ms {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((_, due, seq)) => (entry.due_ms, entry.seq) < (due, seq),
                };
                if better {
                    best = Some((i, entry.due_ms, entry.seq));
                }
            }
        }

        let Some((index, due_ms, _)) = best else {
            self.now_ms = self.horizon_ms;
            return None;
        };

        self.now_ms = due_ms;
        let seq = self.next_seq;
        let slot = &mut self.slots[index];
        let handle = TimerHandle {
            slot: index as u32,
            generation: slot.generation,
        };
        let entry = slot.entry.as_mut()?;
        let action = entry.action.clone();
        let interval_ms = entry.interval_ms;

        match interval_ms {
            Some(interval) => {
                entry.due_ms = due_ms + interval;
                entry.seq = seq;
                self.next_seq += 1;
            }
            None => {
                slot.entry = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }

        Some(Fired {
            handle,
            at_ms: due_ms,
            action,
        })
    }

    /// Advance by `dt_ms` and collect every action that fired, in order.
    pub fn drain(&mut self, dt_ms: u64) -> Vec<Fired<A>> {
        self.advance(dt_ms);
        let mut fired = Vec::new();
        while let Some(f) = self.pop_due() {
            fired.push(f);
        }
        fired
    }

    fn insert(&mut self, due_ms: u64, interval_ms: Option<u64>, action: A) -> TimerHandle {
        let entry = Entry {
            due_ms,
            interval_ms,
            seq: self.next_seq,
            action,
        };
        self.next_seq += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            TimerHandle {
                slot: index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            TimerHandle {
                slot: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn actions(fired: Vec<Fired<&'static str>>) -> Vec<&'static str> {
        fired.into_iter().map(|f| f.action).collect()
    }

    #[test]
    fn test_default_is_empty_at_zero() {
        let mut sched: Scheduler<&'static str> = Scheduler::default();
        assert!(sched.is_empty());
        assert_eq!(sched.now_ms(), 0);
        sched.schedule_once(5, "go");
        assert_eq!(actions(sched.drain(5)), vec!["go"]);
    }

    #[test]
    fn test_repeating_fires_each_interval() {
        let mut sched = Scheduler::new();
        sched.schedule(100, "drop");

        assert!(sched.drain(99).is_empty());
        assert_eq!(actions(sched.drain(1)), vec!["drop"]);
        assert_eq!(actions(sched.drain(250)), vec!["drop", "drop"]);
        assert_eq!(sched.now_ms(), 350);
    }

    #[test]
    fn test_once_fires_once() {
        let mut sched = Scheduler::new();
        let handle = sched.schedule_once(50, "respawn");
        assert!(sched.is_active(handle));

        assert_eq!(actions(sched.drain(60)), vec!["respawn"]);
        assert!(!sched.is_active(handle));
        assert!(sched.drain(1000).is_empty());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut sched = Scheduler::new();
        let handle = sched.schedule(10, "fire");
        assert!(sched.cancel(handle));
        assert!(!sched.cancel(handle));
        assert!(sched.drain(100).is_empty());
    }

    #[test]
    fn test_stale_handle_does_not_cancel_reused_slot() {
        let mut sched = Scheduler::new();
        let old = sched.schedule_once(10, "old");
        sched.drain(10);

        let new = sched.schedule_once(10, "new");
        assert!(!sched.cancel(old));
        assert!(sched.is_active(new));
        assert_eq!(actions(sched.drain(10)), vec!["new"]);
    }

    #[test]
    fn test_same_deadline_fires_in_issue_order() {
        let mut sched = Scheduler::new();
        sched.schedule_once(20, "a");
        sched.schedule_once(20, "b");
        sched.schedule_once(10, "c");
        assert_eq!(actions(sched.drain(20)), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_cancel_during_dispatch_suppresses_later_firing() {
        let mut sched = Scheduler::new();
        sched.schedule_once(10, "kill");
        let victim = sched.schedule(15, "move");

        sched.advance(40);
        let first = sched.pop_due().map(|f| f.action);
        assert_eq!(first, Some("kill"));
        sched.cancel(victim);
        assert!(sched.pop_due().is_none());
        assert_eq!(sched.now_ms(), 40);
    }

    #[test]
    fn test_scheduling_during_dispatch_uses_current_time() {
        let mut sched = Scheduler::new();
        sched.schedule_once(30, "first");
        sched.advance(100);
        let fired = sched.pop_due();
        assert_eq!(fired.map(|f| f.at_ms), Some(30));

        sched.schedule_once(20, "second");
        let fired = sched.pop_due();
        assert_eq!(fired.map(|f| (f.action, f.at_ms)), Some(("second", 50)));
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut sched = Scheduler::new();
        let h = sched.schedule(10, "x");
        sched.schedule_once(10, "y");
        sched.clear();
        assert!(sched.is_empty());
        assert!(!sched.is_active(h));
        assert_eq!(sched.now_ms(), 0);
    }

    proptest! {
        #[test]
        fn prop_cancelled_timers_never_fire(
            delays in proptest::collection::vec(1u64..500, 1..20),
            cancel_mask in proptest::collection::vec(any::<bool>(), 20),
        ) {
            let mut sched = Scheduler::new();
            let handles: Vec<_> = delays
                .iter()
                .enumerate()
                .map(|(i, d)| (i, sched.schedule_once(*d, i)))
                .collect();

            for (i, h) in &handles {
                if cancel_mask[*i] {
                    sched.cancel(*h);
                }
            }

            let fired: Vec<usize> = sched.drain(1000).into_iter().map(|f| f.action).collect();
            for (i, _) in &handles {
                prop_assert_eq!(fired.contains(i), !cancel_mask[*i]);
            }
        }
    }
}
