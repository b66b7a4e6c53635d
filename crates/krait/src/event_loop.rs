//! Event loop queues.
//!
//! Two queues coexist: a FIFO microtask queue (promise reactions), drained to
//! empty between any two macrotasks, and a min-heap of timers ordered by
//! `(due, id)` where the monotonically increasing id provides the FIFO
//! tie-break. Time is a virtual monotonic millisecond clock owned by the
//! loop: draining a timer advances the clock to its due time, so `run` never
//! sleeps and ordering is deterministic.

use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, VecDeque},
};

use ahash::AHashSet;

use crate::{heap::HeapId, types::PromiseReaction, value::Value};

/// A queued microtask.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Job {
    /// A promise reaction with the settled value/reason.
    Reaction { reaction: PromiseReaction, value: Value },
}

/// A scheduled timer.
#[derive(Debug, Clone)]
pub(crate) struct TimerEntry {
    pub due: u64,
    pub id: u64,
    pub callback: Value,
    pub args: Vec<Value>,
    /// `setInterval` period; the loop re-enqueues after each fire.
    pub interval: Option<u64>,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.id == other.id
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.id).cmp(&(other.due, other.id))
    }
}

/// The scheduler state.
#[derive(Debug, Default)]
pub(crate) struct EventLoop {
    microtasks: VecDeque<Job>,
    timers: BinaryHeap<Reverse<TimerEntry>>,
    cancelled: AHashSet<u64>,
    next_timer_id: u64,
    /// Virtual monotonic clock, milliseconds.
    pub now_ms: u64,
    /// Promises that rejected with no handler attached yet.
    pub pending_rejections: Vec<HeapId>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_micro(&mut self, job: Job) {
        self.microtasks.push_back(job);
    }

    pub fn pop_micro(&mut self) -> Option<Job> {
        self.microtasks.pop_front()
    }

    /// Schedules a timer; returns its id.
    pub fn set_timer(&mut self, callback: Value, args: Vec<Value>, delay_ms: u64, interval: Option<u64>) -> u64 {
        self.next_timer_id += 1;
        let id = self.next_timer_id;
        self.timers.push(Reverse(TimerEntry {
            due: self.now_ms + delay_ms,
            id,
            callback,
            args,
            interval,
        }));
        id
    }

    /// Drops a pending timer; an in-heap entry is skipped when popped.
    pub fn clear_timer(&mut self, id: u64) {
        self.cancelled.insert(id);
    }

    /// Pops the next live timer, advancing the clock to its due time.
    pub fn pop_due_timer(&mut self) -> Option<TimerEntry> {
        while let Some(Reverse(entry)) = self.timers.pop() {
            if self.cancelled.contains(&entry.id) {
                continue;
            }
            self.now_ms = self.now_ms.max(entry.due);
            return Some(entry);
        }
        None
    }

    /// Re-enqueues an interval timer after a fire, keeping its id.
    pub fn requeue_interval(&mut self, entry: &TimerEntry) {
        let Some(period) = entry.interval else { return };
        if self.cancelled.contains(&entry.id) {
            return;
        }
        self.timers.push(Reverse(TimerEntry {
            due: self.now_ms + period.max(1),
            id: entry.id,
            callback: entry.callback,
            args: entry.args.clone(),
            interval: entry.interval,
        }));
    }

    pub fn has_microtasks(&self) -> bool {
        !self.microtasks.is_empty()
    }

    pub fn has_timers(&self) -> bool {
        self.timers.iter().any(|Reverse(e)| !self.cancelled.contains(&e.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_by_due_then_insertion() {
        let mut el = EventLoop::new();
        let a = el.set_timer(Value::Undefined, Vec::new(), 5, None);
        let b = el.set_timer(Value::Undefined, Vec::new(), 5, None);
        let c = el.set_timer(Value::Undefined, Vec::new(), 1, None);
        assert_eq!(el.pop_due_timer().unwrap().id, c);
        assert_eq!(el.pop_due_timer().unwrap().id, a);
        assert_eq!(el.pop_due_timer().unwrap().id, b);
        assert!(el.pop_due_timer().is_none());
        assert_eq!(el.now_ms, 5);
    }

    #[test]
    fn cancelled_timer_is_skipped() {
        let mut el = EventLoop::new();
        let a = el.set_timer(Value::Undefined, Vec::new(), 1, None);
        let b = el.set_timer(Value::Undefined, Vec::new(), 2, None);
        el.clear_timer(a);
        assert_eq!(el.pop_due_timer().unwrap().id, b);
    }
}
