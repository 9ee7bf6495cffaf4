use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Latest published data for one resource kind plus its refresh history.
///
/// `data` is only ever replaced as a whole; a failed refresh touches the
/// metadata and leaves the previous data in place.
#[derive(Debug)]
pub struct RuntimeSnapshot<T> {
    pub data: Option<Arc<T>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl<T> Default for RuntimeSnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            last_success_at: None,
            last_attempt_at: None,
            last_error: None,
            last_error_at: None,
            consecutive_failures: 0,
        }
    }
}

// Manual impl: cloning shares `data`, so `T` need not be `Clone`.
impl<T> Clone for RuntimeSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            last_success_at: self.last_success_at,
            last_attempt_at: self.last_attempt_at,
            last_error: self.last_error.clone(),
            last_error_at: self.last_error_at,
            consecutive_failures: self.consecutive_failures,
        }
    }
}

impl<T> RuntimeSnapshot<T> {
    pub fn publish(&mut self, data: T, at: DateTime<Utc>) {
        self.data = Some(Arc::new(data));
        self.last_success_at = Some(at);
        self.last_attempt_at = Some(at);
        self.last_error = None;
        self.consecutive_failures = 0;
    }

    /// Record a failed refresh (data remains intact).
    pub fn mark_error(&mut self, message: String, at: DateTime<Utc>) {
        self.last_attempt_at = Some(at);
        self.last_error = Some(message);
        self.last_error_at = Some(at);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn is_cold(&self) -> bool {
        self.data.is_none()
    }

    /// Stale when the latest attempt failed or the last success is too old.
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        if self.consecutive_failures > 0 {
            return true;
        }
        match self.last_success_at {
            Some(ts) => (now - ts).to_std().map(|age| age > stale_after).unwrap_or(false),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn failure_keeps_data_and_marks_stale() {
        let t0 = Utc::now();
        let mut snap = RuntimeSnapshot::default();
        snap.publish(vec![1, 2, 3], t0);
        let before = snap.data.clone().unwrap();

        snap.mark_error("list nodes: connection refused".into(), t0 + ChronoDuration::seconds(10));
        snap.mark_error("list nodes: connection refused".into(), t0 + ChronoDuration::seconds(20));

        let after = snap.data.clone().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(*after, vec![1, 2, 3]);
        assert_eq!(snap.consecutive_failures, 2);
        assert_eq!(snap.last_success_at, Some(t0));
        assert!(snap.is_stale(t0 + ChronoDuration::seconds(21), Duration::from_secs(30)));
    }

    #[test]
    fn success_after_failure_clears_error() {
        let t0 = Utc::now();
        let mut snap = RuntimeSnapshot::default();
        snap.mark_error("boom".into(), t0);
        assert!(snap.is_cold());

        snap.publish("ok", t0 + ChronoDuration::seconds(5));

        assert!(!snap.is_cold());
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.last_error, None);
        assert_eq!(snap.last_error_at, Some(t0));
        assert!(!snap.is_stale(t0 + ChronoDuration::seconds(6), Duration::from_secs(30)));
    }

    #[test]
    fn old_success_is_stale_even_without_errors() {
        let t0 = Utc::now();
        let mut snap = RuntimeSnapshot::default();
        snap.publish(1u8, t0);

        assert!(!snap.is_stale(t0 + ChronoDuration::seconds(30), Duration::from_secs(30)));
        assert!(snap.is_stale(t0 + ChronoDuration::seconds(31), Duration::from_secs(30)));
    }
}
