//! Breadth-first crawl frontier bounded by depth.

use std::collections::{HashSet, VecDeque};

/// FIFO queue of discovered-but-not-yet-processed URLs. Membership is
/// checked before enqueue, so no URL enters the queue twice within a
/// run and traversal always terminates.
pub struct Frontier {
    queue: VecDeque<(String, u8)>,
    seen: HashSet<String>,
    max_depth: u8,
}

impl Frontier {
    pub fn new(max_depth: u8) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            max_depth,
        }
    }

    /// Enqueues a URL at the given depth. Returns false when the URL
    /// was already scheduled or lies beyond the depth bound.
    pub fn push(&mut self, url: &str, depth: u8) -> bool {
        if depth > self.max_depth {
            return false;
        }
        if !self.seen.insert(url.to_string()) {
            return false;
        }
        self.queue.push_back((url.to_string(), depth));
        true
    }

    pub fn pop(&mut self) -> Option<(String, u8)> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Unique URLs scheduled so far this run.
    pub fn discovered(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_rejected() {
        let mut frontier = Frontier::new(2);
        assert!(frontier.push("https://w.example.com/a/", 0));
        assert!(!frontier.push("https://w.example.com/a/", 1));
        assert_eq!(frontier.pending(), 1);
        assert_eq!(frontier.discovered(), 1);
    }

    #[test]
    fn depth_bound_is_enforced_at_enqueue() {
        let mut frontier = Frontier::new(1);
        assert!(frontier.push("https://w.example.com/a/", 1));
        assert!(!frontier.push("https://w.example.com/b/", 2));
    }

    #[test]
    fn traversal_is_fifo() {
        let mut frontier = Frontier::new(4);
        frontier.push("https://w.example.com/a/", 0);
        frontier.push("https://w.example.com/b/", 0);
        assert_eq!(frontier.pop().map(|(u, _)| u), Some("https://w.example.com/a/".to_string()));
        assert_eq!(frontier.pop().map(|(u, _)| u), Some("https://w.example.com/b/".to_string()));
        assert_eq!(frontier.pop(), None);
    }
}
