#![forbid(unsafe_code)]

use std::collections::VecDeque;

use aulos_core::Event;

/// A pending event keyed by the absolute byte cursor at which it fires.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledEvent {
    pub cursor: u64,
    pub event: Event,
}

/// Cursor-ordered queue of pending stream events.
///
/// Events fire when the (drift-compensated) play cursor passes their byte
/// cursor. Dispatch never reorders events relative to each other or to the
/// playback position; that is the engine's main observable correctness
/// guarantee.
///
/// Scheduling is O(1) in the common case: append batches carry
/// monotonically growing cursors, so insertion lands at the tail. An
/// out-of-order cursor falls back to a sorted insert, keeping the ordering
/// invariant for any caller.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<ScheduledEvent>,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event at `cursor`, preserving cursor order.
    ///
    /// Equal cursors keep insertion order, so events scheduled together
    /// dispatch together, in the order they were scheduled.
    pub fn schedule(&mut self, cursor: u64, event: Event) {
        let entry = ScheduledEvent { cursor, event };
        match self.pending.back() {
            Some(last) if last.cursor > cursor => {
                let at = self
                    .pending
                    .partition_point(|pending| pending.cursor <= cursor);
                self.pending.insert(at, entry);
            }
            _ => self.pending.push_back(entry),
        }
    }

    /// Pop every event whose cursor is `<= cursor`, in order.
    pub fn dispatch_up_to(&mut self, cursor: u64) -> Vec<ScheduledEvent> {
        let ready = self
            .pending
            .partition_point(|pending| pending.cursor <= cursor);
        self.pending.drain(..ready).collect()
    }

    /// Cursor of the next pending event, if any.
    #[must_use]
    pub fn next_cursor(&self) -> Option<u64> {
        self.pending.front().map(|pending| pending.cursor)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop all pending events (used by `clear()` on the player).
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use aulos_core::EventKind;
    use rstest::rstest;

    use super::*;

    fn marker(name: &str) -> Event {
        Event::marker(name, 0.0)
    }

    fn names(dispatched: &[ScheduledEvent]) -> Vec<String> {
        dispatched
            .iter()
            .map(|entry| match &entry.event.kind {
                EventKind::Marker(name) => name.clone(),
                other => panic!("unexpected event kind: {other:?}"),
            })
            .collect()
    }

    #[test]
    fn dispatch_returns_events_in_cursor_order() {
        let mut queue = EventQueue::new();
        for (cursor, name) in [(100, "a"), (200, "b"), (300, "c")] {
            queue.schedule(cursor, marker(name));
        }

        let ready = queue.dispatch_up_to(250);
        assert_eq!(names(&ready), ["a", "b"]);
        assert_eq!(queue.next_cursor(), Some(300));
    }

    /// Order must be independent of how many dispatch calls partition the
    /// cursor range.
    #[rstest]
    #[case(vec![1000])]
    #[case(vec![100, 400, 1000])]
    #[case(vec![50, 150, 250, 350, 450, 1000])]
    fn dispatch_order_is_stable_across_partitions(#[case] stops: Vec<u64>) {
        let cursors = [100u64, 200, 300, 400];
        let mut queue = EventQueue::new();
        for (index, cursor) in cursors.into_iter().enumerate() {
            queue.schedule(cursor, marker(&format!("e{index}")));
        }

        let mut seen = Vec::new();
        for stop in stops {
            seen.extend(names(&queue.dispatch_up_to(stop)));
        }
        assert_eq!(seen, ["e0", "e1", "e2", "e3"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn out_of_order_schedule_keeps_sorted_order() {
        let mut queue = EventQueue::new();
        queue.schedule(300, marker("late"));
        queue.schedule(100, marker("early"));
        queue.schedule(200, marker("middle"));

        let ready = queue.dispatch_up_to(u64::MAX);
        assert_eq!(names(&ready), ["early", "middle", "late"]);
    }

    #[test]
    fn equal_cursors_keep_insertion_order() {
        let mut queue = EventQueue::new();
        queue.schedule(100, marker("first"));
        queue.schedule(100, marker("second"));

        let ready = queue.dispatch_up_to(100);
        assert_eq!(names(&ready), ["first", "second"]);
    }

    #[test]
    fn dispatch_is_inclusive() {
        let mut queue = EventQueue::new();
        queue.schedule(100, marker("edge"));
        assert!(queue.dispatch_up_to(99).is_empty());
        assert_eq!(queue.dispatch_up_to(100).len(), 1);
    }

    #[test]
    fn clear_drops_pending_events() {
        let mut queue = EventQueue::new();
        queue.schedule(100, marker("gone"));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.next_cursor(), None);
    }
}
