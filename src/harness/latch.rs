//! Count-down latch used as start gate and completion barrier.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Blocks waiters until the count reaches zero.
///
/// With a count of one it is a start gate: every actor waits, a single
/// `count_down` releases them all at once. With a count of `n` it is a
/// completion barrier the harness waits on with a deadline.
#[derive(Debug)]
pub struct Latch {
    remaining: Mutex<usize>,
    zero: Condvar,
}

impl Latch {
    /// Creates a latch that opens after `count` calls to [`count_down`](Self::count_down).
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    /// Decrements the count, waking every waiter when it reaches zero.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            return;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.zero.notify_all();
        }
    }

    /// Current count.
    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }

    /// Blocks until the count reaches zero.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.zero.wait(&mut remaining);
        }
    }

    /// Blocks until the count reaches zero or `timeout` elapses.
    ///
    /// Returns `true` if the latch opened.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self.zero.wait_until(&mut remaining, deadline).timed_out() {
                return *remaining == 0;
            }
        }
        true
    }
}

/// Counts a latch down when dropped, so a panicking actor still reports
/// completion.
pub(crate) struct CountDownOnDrop<'a>(pub(crate) &'a Latch);

impl Drop for CountDownOnDrop<'_> {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_count_is_open() {
        let latch = Latch::new(0);
        latch.wait();
        assert!(latch.wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn test_count_down_saturates() {
        let latch = Latch::new(1);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.remaining(), 0);
    }

    #[test]
    fn test_timeout_when_not_released() {
        let latch = Latch::new(2);
        latch.count_down();
        assert!(!latch.wait_timeout(Duration::from_millis(20)));
        assert_eq!(latch.remaining(), 1);
    }

    #[test]
    fn test_gate_releases_all_waiters() {
        let gate = Arc::new(Latch::new(1));
        let done = Arc::new(Latch::new(8));
        let mut handles = vec![];

        for _ in 0..8 {
            let gate = Arc::clone(&gate);
            let done = Arc::clone(&done);
            handles.push(thread::spawn(move || {
                let _done = CountDownOnDrop(&done);
                gate.wait();
            }));
        }

        assert!(!done.wait_timeout(Duration::from_millis(20)));
        gate.count_down();
        assert!(done.wait_timeout(Duration::from_secs(10)));

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_count_down_on_panic() {
        let done = Arc::new(Latch::new(1));
        let latch = Arc::clone(&done);
        let handle = thread::spawn(move || {
            let _done = CountDownOnDrop(&latch);
            panic!("actor failure");
        });

        assert!(done.wait_timeout(Duration::from_secs(10)));
        assert!(handle.join().is_err());
    }
}
