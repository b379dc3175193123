//! Per-visitor countdowns.
//!
//! Each visitor owns at most one live countdown. Scheduling again replaces
//! the previous one; its handle becomes stale and is never reported by
//! `poll`. Handles carry a generation so a consumer can tell a fresh expiry
//! from one that was superseded between polling and handling.

use crate::scene::VisitorId;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    pub visitor: VisitorId,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    deadline: Duration,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: HashMap<VisitorId, PendingTimer>,
    next_generation: u64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a countdown of uniformly random length in `[min, max]`
    /// (millisecond resolution), replacing any pending one for `visitor`.
    pub fn schedule<R: Rng + ?Sized>(
        &mut self,
        now: Duration,
        visitor: VisitorId,
        min: Duration,
        max: Duration,
        rng: &mut R,
    ) -> TimerHandle {
        let lo = min.as_millis() as u64;
        let hi = (max.as_millis() as u64).max(lo);
        let delay = Duration::from_millis(rng.gen_range(lo..=hi));
        self.schedule_after(now, visitor, delay)
    }

    pub fn schedule_after(
        &mut self,
        now: Duration,
        visitor: VisitorId,
        delay: Duration,
    ) -> TimerHandle {
        self.next_generation += 1;
        let generation = self.next_generation;
        let previous = self.timers.insert(
            visitor,
            PendingTimer {
                deadline: now + delay,
                generation,
            },
        );
        if previous.is_some() {
            log::debug!("Visitor {} countdown replaced", visitor);
        }
        TimerHandle {
            visitor,
            generation,
        }
    }

    /// Returns whether a pending countdown was removed.
    pub fn cancel(&mut self, visitor: VisitorId) -> bool {
        self.timers.remove(&visitor).is_some()
    }

    pub fn is_armed(&self, visitor: VisitorId) -> bool {
        self.timers.contains_key(&visitor)
    }

    #[cfg(test)]
    pub fn is_current(&self, handle: TimerHandle) -> bool {
        self.timers
            .get(&handle.visitor)
            .is_some_and(|timer| timer.generation == handle.generation)
    }

    #[cfg(test)]
    pub fn deadline(&self, visitor: VisitorId) -> Option<Duration> {
        self.timers.get(&visitor).map(|timer| timer.deadline)
    }

    #[cfg(test)]
    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }

    /// Removes and returns every countdown due at `now`, earliest first.
    pub fn poll(&mut self, now: Duration) -> Vec<TimerHandle> {
        let mut due: Vec<(Duration, TimerHandle)> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .map(|(&visitor, timer)| {
                (
                    timer.deadline,
                    TimerHandle {
                        visitor,
                        generation: timer.generation,
                    },
                )
            })
            .collect();
        due.sort_by_key(|(deadline, handle)| (*deadline, handle.visitor));
        for (_, handle) in &due {
            self.timers.remove(&handle.visitor);
        }
        due.into_iter().map(|(_, handle)| handle).collect()
    }
}
