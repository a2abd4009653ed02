use std::time::{Duration, Instant};

pub const DEFAULT_PAGINATION_DEBOUNCE_MS: u64 = 20;
pub const DEFAULT_PAGINATION_DELAY: Duration =
    Duration::from_millis(DEFAULT_PAGINATION_DEBOUNCE_MS);

/// Single-shot deadline timer. Scheduling again replaces the pending deadline.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once per deadline, when `now` has reached it.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_PAGINATION_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_delay() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(50));
        d.schedule(start);
        assert!(!d.poll(start + Duration::from_millis(49)));
        assert!(d.poll(start + Duration::from_millis(50)));
        assert!(!d.poll(start + Duration::from_millis(100)));
    }

    #[test]
    fn schedule_restarts_the_deadline() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(50));
        d.schedule(start);
        d.schedule(start + Duration::from_millis(40));
        assert!(!d.poll(start + Duration::from_millis(60)));
        assert!(d.poll(start + Duration::from_millis(90)));
    }

    #[test]
    fn cancel_drops_pending_request() {
        let start = Instant::now();
        let mut d = Debouncer::default();
        d.schedule(start);
        d.cancel();
        assert!(!d.is_pending());
        assert!(!d.poll(start + Duration::from_secs(1)));
    }

    #[test]
    fn default_delay_matches_default_settings() {
        let settings = crate::settings::schema::Settings::default();
        assert_eq!(
            Duration::from_millis(settings.editor.pagination_debounce_ms),
            Debouncer::default().delay()
        );
    }
}
