use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Process-wide minimum interval between accepted broadcast calls. One timer
/// shared by every caller; no per-category or per-user granularity. In a
/// multi-instance deployment this belongs in a shared store.
pub struct SendCooldown {
    window: Duration,
    last_send: Mutex<Option<Instant>>,
}

impl SendCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_send: Mutex::new(None),
        }
    }

    /// Time left until the next call is allowed, if any. Read-only peek; a
    /// concurrent `arm` between peek and dispatch is an accepted race.
    pub fn remaining(&self) -> Option<Duration> {
        let last = self.last_send.lock().unwrap_or_else(|e| e.into_inner());
        last.and_then(|at| self.window.checked_sub(at.elapsed()))
            .filter(|left| !left.is_zero())
    }

    /// Marks the window as started. Called once per accepted broadcast, after
    /// the recipient set has been resolved.
    pub fn arm(&self) {
        let mut last = self.last_send.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_open() {
        let cooldown = SendCooldown::new(Duration::from_secs(5));
        assert!(cooldown.remaining().is_none());
    }

    #[test]
    fn arming_closes_the_window() {
        let cooldown = SendCooldown::new(Duration::from_secs(5));
        cooldown.arm();
        let remaining = cooldown.remaining().expect("window must be closed");
        assert!(remaining <= Duration::from_secs(5));
        assert!(remaining > Duration::from_secs(3));
    }

    #[test]
    fn window_reopens_after_elapsing() {
        let cooldown = SendCooldown::new(Duration::from_millis(10));
        cooldown.arm();
        std::thread::sleep(Duration::from_millis(25));
        assert!(cooldown.remaining().is_none());
    }
}
