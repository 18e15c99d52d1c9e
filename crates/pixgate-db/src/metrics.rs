//! Query timing side channel.
//!
//! Every store operation is wrapped in a [`QueryTimer`] that emits one
//! timing event, tagged with the operation name, when it goes out of
//! scope. Events go to the `pixgate_db::timing` tracing target so a
//! subscriber can forward them to whatever metrics pipeline the service
//! runs; nothing in the store depends on them being consumed.

use std::time::Instant;

/// Drop guard that reports how long an operation took.
#[must_use = "the timer reports on drop; binding it to _ discards the measurement"]
pub struct QueryTimer {
    operation: &'static str,
    started: Instant,
}

impl QueryTimer {
    /// Start timing the named operation.
    pub fn start(operation: &'static str) -> Self {
        Self {
            operation,
            started: Instant::now(),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        let elapsed_us = self.started.elapsed().as_micros() as u64;
        tracing::debug!(
            target: "pixgate_db::timing",
            operation = self.operation,
            elapsed_us,
            "query timing"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_reports_on_drop() {
        // The guard must be droppable without a subscriber installed.
        let timer = QueryTimer::start("test_op");
        assert_eq!(timer.operation, "test_op");
        drop(timer);
    }
}
