// Coalescing timer for bursty event sources
//
// Keeps only the latest value; it becomes due `window` after the most recent
// push. Time is passed in explicitly so callers (and tests) own the clock.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Coalescer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Coalescer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replace any pending value and restart the window
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    /// When the pending value becomes due
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending value if its window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(due) if due <= now => self.flush(),
            _ => None,
        }
    }

    /// Take the pending value regardless of the window
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(100);

    #[test]
    fn test_burst_collapses_to_latest() {
        let start = Instant::now();
        let mut coalescer = Coalescer::new(WINDOW);

        coalescer.push("R", start);
        coalescer.push("RS", start + Duration::from_millis(30));
        coalescer.push("RSI", start + Duration::from_millis(60));

        // Window restarts on every push
        assert_eq!(coalescer.poll(start + Duration::from_millis(120)), None);
        assert_eq!(
            coalescer.deadline(),
            Some(start + Duration::from_millis(160))
        );
        assert_eq!(coalescer.poll(start + Duration::from_millis(160)), Some("RSI"));
        assert!(!coalescer.is_pending());
    }

    #[test]
    fn test_poll_without_pending() {
        let mut coalescer: Coalescer<u8> = Coalescer::new(WINDOW);
        assert_eq!(coalescer.poll(Instant::now()), None);
        assert_eq!(coalescer.deadline(), None);
    }

    #[test]
    fn test_flush_and_cancel() {
        let now = Instant::now();
        let mut coalescer = Coalescer::new(WINDOW);

        coalescer.push(1, now);
        assert_eq!(coalescer.flush(), Some(1));

        coalescer.push(2, now);
        coalescer.cancel();
        assert_eq!(coalescer.poll(now + WINDOW * 2), None);
    }
}
