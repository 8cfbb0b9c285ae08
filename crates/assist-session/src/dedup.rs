//! Bounded memory of frame fingerprints.

use std::collections::{HashSet, VecDeque};

use assist_core::Fingerprint;

/// The most recent `capacity` fingerprints, oldest evicted first.
#[derive(Debug)]
pub struct FingerprintWindow {
    capacity: usize,
    set: HashSet<Fingerprint>,
    order: VecDeque<Fingerprint>,
}

impl FingerprintWindow {
    /// Empty window. A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            set: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Record `fingerprint`. Returns `false` if it is still in the window.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        if !self.set.insert(fingerprint.clone()) {
            return false;
        }
        self.order.push_back(fingerprint);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                let _ = self.set.remove(&oldest);
            }
        }
        true
    }

    /// Fingerprints currently remembered.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Nothing remembered yet.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assist_core::Frame;
    use chrono::DateTime;

    use super::*;

    fn fp(ms: i64) -> Fingerprint {
        let at = DateTime::from_timestamp_millis(ms).unwrap();
        Frame::at(r#"{"task_id":"t"}"#, at).fingerprint(20)
    }

    #[test]
    fn repeats_inside_the_window_are_rejected() {
        let mut window = FingerprintWindow::new(4);
        assert!(window.insert(fp(1)));
        assert!(window.insert(fp(2)));
        assert!(!window.insert(fp(1)));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn oldest_is_evicted_at_capacity() {
        let mut window = FingerprintWindow::new(2);
        assert!(window.insert(fp(1)));
        assert!(window.insert(fp(2)));
        assert!(window.insert(fp(3)));
        assert_eq!(window.len(), 2);

        assert!(!window.insert(fp(3)));
        assert!(!window.insert(fp(2)));
        // Fell out of the window, so it counts as new again.
        assert!(window.insert(fp(1)));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn zero_capacity_still_remembers_the_last_one() {
        let mut window = FingerprintWindow::new(0);
        assert!(window.insert(fp(1)));
        assert!(!window.insert(fp(1)));
        assert!(window.insert(fp(2)));
        assert!(window.insert(fp(1)));
    }
}
