//! Per-request context: target namespace and optional deadline.

use std::time::{Duration, Instant};

/// Carries the namespace and caller deadline into every store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    namespace: String,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            deadline: None,
        }
    }

    /// Sets the deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Time left before the deadline. `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::RequestContext;
    use std::time::{Duration, Instant};

    #[test]
    fn no_deadline_never_expires() {
        let ctx = RequestContext::new("default");
        assert!(!ctx.is_expired());
        assert!(ctx.remaining().is_none());
        assert_eq!(ctx.namespace(), "default");
    }

    #[test]
    fn past_deadline_is_expired() {
        let ctx = RequestContext::new("default").with_deadline(Instant::now());
        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));

        let ctx = RequestContext::new("default").with_timeout(Duration::from_secs(60));
        assert!(!ctx.is_expired());
    }
}
