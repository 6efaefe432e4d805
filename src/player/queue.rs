use std::collections::VecDeque;

use rand::seq::SliceRandom;

use crate::protocol::Track;

/// Pending tracks plus the current and previous slots.
///
/// A track added while nothing is current is promoted straight into
/// `current`, so a non-empty queue never sits idle with an empty slot.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    pending: VecDeque<Track>,
    current: Option<Track>,
    previous: Option<Track>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&Track> {
        self.previous.as_ref()
    }

    /// Number of pending tracks, not counting `current`.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.pending.iter()
    }

    /// Seconds of pending tracks plus the current one.
    pub fn total_duration(&self) -> u64 {
        self.current.iter().chain(self.pending.iter()).map(|t| t.duration).sum()
    }

    pub fn add(&mut self, tracks: impl IntoIterator<Item = Track>) {
        let mut tracks = tracks.into_iter();
        if self.current.is_none() {
            let Some(mut first) = tracks.next() else { return };
            first.stream_position = 0;
            self.current = Some(first);
        }
        self.pending.extend(tracks);
    }

    /// Removes and returns the head of the pending list.
    pub fn shift(&mut self) -> Option<Track> {
        self.pending.pop_front()
    }

    /// Drops every pending track. `current` and `previous` are kept.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn shuffle(&mut self) {
        self.pending.make_contiguous().shuffle(&mut rand::thread_rng());
    }

    pub(crate) fn set_current(&mut self, track: Option<Track>) {
        self.current = track;
    }

    pub(crate) fn set_previous(&mut self, track: Option<Track>) {
        self.previous = track;
    }

    pub(crate) fn take_current(&mut self) -> Option<Track> {
        self.current.take()
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut Track> {
        self.current.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(url: &str) -> Track {
        Track {
            duration: 60,
            ..Track::new(url)
        }
    }

    fn urls(queue: &Queue) -> Vec<&str> {
        queue.iter().map(|t| t.url.as_str()).collect()
    }

    #[test]
    fn add_to_empty_queue_promotes_first_track() {
        let mut queue = Queue::new();
        let mut first = track("a");
        first.stream_position = 42;

        queue.add(vec![first, track("b"), track("c")]);

        let current = queue.current().unwrap();
        assert_eq!(current.url, "a");
        assert_eq!(current.stream_position, 0);
        assert_eq!(urls(&queue), ["b", "c"]);
    }

    #[test]
    fn add_with_current_appends_in_order() {
        let mut queue = Queue::new();
        queue.add(vec![track("a")]);
        queue.add(vec![track("b")]);
        queue.add(vec![track("c"), track("d")]);

        assert_eq!(queue.current().unwrap().url, "a");
        assert_eq!(urls(&queue), ["b", "c", "d"]);
        assert_eq!(queue.total_duration(), 240);
    }

    #[test]
    fn add_nothing_leaves_queue_untouched() {
        let mut queue = Queue::new();
        queue.add(Vec::new());
        assert!(queue.current().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn shift_pops_the_head() {
        let mut queue = Queue::new();
        queue.add(vec![track("a"), track("b"), track("c")]);

        assert_eq!(queue.shift().unwrap().url, "b");
        assert_eq!(queue.shift().unwrap().url, "c");
        assert!(queue.shift().is_none());
        assert_eq!(queue.current().unwrap().url, "a");
    }

    #[test]
    fn clear_keeps_current_and_previous() {
        let mut queue = Queue::new();
        queue.add(vec![track("a"), track("b")]);
        queue.set_previous(Some(track("z")));

        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.current().unwrap().url, "a");
        assert_eq!(queue.previous().unwrap().url, "z");
    }

    #[test]
    fn shuffle_permutes_only_pending() {
        let mut queue = Queue::new();
        let all: Vec<Track> = (0..50).map(|i| track(&i.to_string())).collect();
        queue.add(all);

        queue.shuffle();

        assert_eq!(queue.current().unwrap().url, "0");
        let mut seen: Vec<u32> = queue.iter().map(|t| t.url.parse().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..50).collect::<Vec<_>>());
    }
}
