// src/schedule.rs - Delayed state transitions driven by the frame clock

/// Transitions waiting for their due time.
///
/// Nothing runs on its own: the owner calls [`Scheduler::drain_due`] once
/// per frame and applies whatever came due. Clearing the queue cancels
/// everything still pending, so a restarted session never sees callbacks
/// from the previous one.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    entries: Vec<Entry<T>>,
    next_seq: u64,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    due_ms: f64,
    seq: u64,
    item: T,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, due_ms: f64, item: T) {
        self.entries.push(Entry {
            due_ms,
            seq: self.next_seq,
            item,
        });
        self.next_seq += 1;
    }

    /// Removes and returns everything due at `now_ms`, earliest first.
    /// Entries due at the same time come out in the order they were added.
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<T> {
        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|entry| entry.due_ms <= now_ms);
        self.entries = pending;

        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|entry| entry.item).collect()
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_due_before_time() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(100.0, "a");
        assert!(scheduler.drain_due(99.9).is_empty());
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.drain_due(100.0), vec!["a"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_due_items_come_out_in_time_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(300.0, "late");
        scheduler.schedule(100.0, "early");
        scheduler.schedule(100.0, "early-second");
        scheduler.schedule(900.0, "future");
        assert_eq!(
            scheduler.drain_due(500.0),
            vec!["early", "early-second", "late"]
        );
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.drain_due(900.0), vec!["future"]);
    }

    #[test]
    fn test_cancel_all_drops_pending() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(10.0, 1);
        scheduler.schedule(20.0, 2);
        scheduler.cancel_all();
        assert!(scheduler.drain_due(1000.0).is_empty());
        assert!(scheduler.is_empty());
    }
}
