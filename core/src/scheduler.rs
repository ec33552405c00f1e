//! The future scheduler: per-component delay queues implementing the TIA's
//! pervasive "this register write takes effect N color clocks from now"
//! semantics.
//!
//! Each TIA subcomponent (a sprite, the HMOVE latch, ...) owns one
//! `FutureScheduler`. Events are identified by a `label` naming the semantic
//! slot they occupy (`"START"`, `"RESPx"`, ...); at most one event may be
//! pending per label at a time, so scheduling into an occupied slot restarts
//! its countdown (the documented `push` behavior) rather than creating a
//! second, competing event. This mirrors a delay-queue rather than a
//! pending-latch field on each register, which is what makes concurrent
//! pending changes (HMOVE *and* a reset both in flight during HBLANK)
//! representable without special-casing their interaction.

/// One pending one-shot event.
#[derive(Debug, Clone, Copy)]
struct Slot<A> {
    label: &'static str,
    action: A,
    /// Color clocks remaining before this event fires. Exactly 0 means "fires
    /// on this tick".
    remaining: i32,
    /// The delay this event was most recently (re)started with; used to
    /// answer `about_to_end`/`just_started`.
    total: i32,
    paused: bool,
}

/// A per-component delay queue of named one-shot events.
#[derive(Debug, Clone)]
pub struct FutureScheduler<A> {
    slots: Vec<Slot<A>>,
}

impl<A: Copy> Default for FutureScheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Copy> FutureScheduler<A> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    fn index_of(&self, label: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.label == label)
    }

    /// Schedule `action` to fire in `ticks` color clocks. If `label` already
    /// has a pending event, its countdown is restarted (`push`) and its
    /// action replaced, rather than queuing a second event.
    pub fn schedule(&mut self, label: &'static str, ticks: u32, action: A) {
        let ticks = ticks as i32;
        if let Some(i) = self.index_of(label) {
            self.slots[i].remaining = ticks;
            self.slots[i].total = ticks;
            self.slots[i].action = action;
            self.slots[i].paused = false;
        } else {
            self.slots.push(Slot {
                label,
                action,
                remaining: ticks,
                total: ticks,
                paused: false,
            });
        }
    }

    /// Advance every live (unpaused) event by one color clock. Returns the
    /// actions that fired this tick, in the order their slots were created.
    pub fn tick(&mut self) -> Vec<(&'static str, A)> {
        let mut fired = Vec::new();
        let mut i = 0;
        while i < self.slots.len() {
            if !self.slots[i].paused {
                self.slots[i].remaining -= 1;
            }
            if self.slots[i].remaining <= 0 && !self.slots[i].paused {
                let slot = self.slots.remove(i);
                fired.push((slot.label, slot.action));
            } else {
                i += 1;
            }
        }
        fired
    }

    pub fn is_pending(&self, label: &str) -> bool {
        self.index_of(label).is_some()
    }

    pub fn pause(&mut self, label: &str) {
        if let Some(i) = self.index_of(label) {
            self.slots[i].paused = true;
        }
    }

    pub fn resume(&mut self, label: &str) {
        if let Some(i) = self.index_of(label) {
            self.slots[i].paused = false;
        }
    }

    /// Restart the countdown for a pending event from its original delay.
    pub fn push(&mut self, label: &str) {
        if let Some(i) = self.index_of(label) {
            let total = self.slots[i].total;
            self.slots[i].remaining = total;
            self.slots[i].paused = false;
        }
    }

    /// Fire an event immediately, removing it from the queue and returning
    /// its action.
    pub fn force(&mut self, label: &str) -> Option<A> {
        self.index_of(label).map(|i| self.slots.remove(i).action)
    }

    /// Cancel a pending event without firing it, returning its action for the
    /// caller to discard or inspect.
    pub fn drop_event(&mut self, label: &str) -> Option<A> {
        self.index_of(label).map(|i| self.slots.remove(i).action)
    }

    pub fn remaining_cycles(&self, label: &str) -> Option<i32> {
        self.index_of(label).map(|i| self.slots[i].remaining)
    }

    /// True if the event for `label` fired on the most recent `tick()` call,
    /// i.e. it was scheduled exactly one tick ago. Callers typically check
    /// this right after scheduling to special-case same-cycle overlaps.
    pub fn just_started(&self, label: &str) -> bool {
        self.index_of(label)
            .map(|i| self.slots[i].remaining == self.slots[i].total - 1)
            .unwrap_or(false)
    }

    /// True if the event is within one tick of firing.
    pub fn about_to_end(&self, label: &str) -> bool {
        self.index_of(label)
            .map(|i| self.slots[i].remaining <= 1)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_n_ticks() {
        let mut s: FutureScheduler<u8> = FutureScheduler::new();
        s.schedule("START", 3, 42);
        assert!(s.tick().is_empty());
        assert!(s.tick().is_empty());
        let fired = s.tick();
        assert_eq!(fired, vec![("START", 42)]);
        assert!(!s.is_pending("START"));
    }

    #[test]
    fn scheduling_same_label_restarts_countdown() {
        let mut s: FutureScheduler<u8> = FutureScheduler::new();
        s.schedule("RESPx", 4, 1);
        s.tick();
        s.tick();
        s.schedule("RESPx", 4, 2);
        assert_eq!(s.remaining_cycles("RESPx"), Some(4));
        for _ in 0..3 {
            assert!(s.tick().is_empty());
        }
        assert_eq!(s.tick(), vec![("RESPx", 2)]);
    }

    #[test]
    fn pause_halts_countdown_until_resumed() {
        let mut s: FutureScheduler<u8> = FutureScheduler::new();
        s.schedule("X", 2, 7);
        s.pause("X");
        assert!(s.tick().is_empty());
        assert!(s.tick().is_empty());
        assert_eq!(s.remaining_cycles("X"), Some(2));
        s.resume("X");
        s.tick();
        assert_eq!(s.tick(), vec![("X", 7)]);
    }

    #[test]
    fn force_fires_immediately() {
        let mut s: FutureScheduler<u8> = FutureScheduler::new();
        s.schedule("X", 10, 9);
        assert_eq!(s.force("X"), Some(9));
        assert!(!s.is_pending("X"));
    }

    #[test]
    fn drop_discards_without_firing() {
        let mut s: FutureScheduler<u8> = FutureScheduler::new();
        s.schedule("X", 1, 9);
        assert_eq!(s.drop_event("X"), Some(9));
        assert!(s.tick().is_empty());
    }
}
