//! Simulation clock and timer queue
//!
//! Every delayed action in the simulation (spawn cycle, restart-prompt
//! fallback, deferred sound cues) is a [`TimerTask`] in one queue ordered by
//! fire time, ties broken by scheduling order. Nothing sleeps: the session
//! walks the clock forward each frame and fires whatever came due.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use super::events::SoundCue;

/// Handle returned by [`Clock::schedule_at`], used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Work a timer performs when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Spawn one obstacle pair and schedule the next
    Spawn,
    /// Force the restart prompt visible for the given run, if still hidden
    RestartFallback { run: u32 },
    /// Play a cue slightly after the event that caused it, unless the run
    /// has been reset since
    Sound { cue: SoundCue, run: u32 },
}

#[derive(Debug)]
struct Entry {
    at: f64,
    seq: u64,
    task: TimerTask,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the max-heap pops the earliest (then oldest) entry first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Simulation time (seconds) plus pending timers
#[derive(Debug, Default)]
pub struct Clock {
    now: f64,
    next_seq: u64,
    queue: BinaryHeap<Entry>,
    live: HashSet<u64>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation time in seconds
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedule `task` at absolute time `at` (never earlier than now)
    pub fn schedule_at(&mut self, at: f64, task: TimerTask) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Entry {
            at: at.max(self.now),
            seq,
            task,
        });
        self.live.insert(seq);
        TimerHandle(seq)
    }

    /// Schedule `task` after `delay` seconds
    pub fn schedule_in(&mut self, delay: f64, task: TimerTask) -> TimerHandle {
        self.schedule_at(self.now + delay.max(0.0), task)
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.live.remove(&handle.0)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.live.contains(&handle.0)
    }

    /// Number of timers still waiting to fire
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    /// Fire time of the earliest live timer due at or before `until`
    pub fn next_due(&mut self, until: f64) -> Option<f64> {
        self.discard_cancelled();
        self.queue.peek().map(|e| e.at).filter(|&at| at <= until)
    }

    /// Pop the earliest live timer due at or before `until`, moving the clock
    /// to its fire time.
    pub fn pop_due(&mut self, until: f64) -> Option<(f64, TimerTask)> {
        self.next_due(until)?;
        let entry = self.queue.pop()?;
        self.live.remove(&entry.seq);
        self.now = self.now.max(entry.at);
        Some((entry.at, entry.task))
    }

    /// Move the clock forward without firing anything
    pub fn advance_to(&mut self, t: f64) {
        self.now = self.now.max(t);
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.queue.peek() {
            if self.live.contains(&top.seq) {
                break;
            }
            self.queue.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_time_order() {
        let mut clock = Clock::new();
        clock.schedule_at(2.0, TimerTask::Spawn);
        clock.schedule_at(1.0, TimerTask::RestartFallback { run: 1 });
        clock.schedule_at(1.0, TimerTask::Sound { cue: SoundCue::Die, run: 1 });

        assert_eq!(
            clock.pop_due(5.0),
            Some((1.0, TimerTask::RestartFallback { run: 1 }))
        );
        assert_eq!(clock.pop_due(5.0), Some((1.0, TimerTask::Sound { cue: SoundCue::Die, run: 1 })));
        assert_eq!(clock.now(), 1.0);
        assert_eq!(clock.pop_due(1.5), None);
        assert_eq!(clock.pop_due(5.0), Some((2.0, TimerTask::Spawn)));
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_cancel_by_handle() {
        let mut clock = Clock::new();
        let a = clock.schedule_in(1.0, TimerTask::Spawn);
        let b = clock.schedule_in(2.0, TimerTask::Spawn);
        assert!(clock.cancel(a));
        assert!(!clock.cancel(a));
        assert!(!clock.is_pending(a));
        assert!(clock.is_pending(b));

        assert_eq!(clock.pop_due(10.0), Some((2.0, TimerTask::Spawn)));
        assert!(!clock.is_pending(b));
        assert_eq!(clock.pop_due(10.0), None);
    }

    #[test]
    fn test_past_schedule_fires_now() {
        let mut clock = Clock::new();
        clock.advance_to(3.0);
        clock.schedule_at(1.0, TimerTask::Spawn);
        assert_eq!(clock.next_due(3.0), Some(3.0));
        clock.advance_to(2.0);
        assert_eq!(clock.now(), 3.0);
    }
}
