//! Domain hook supplied by every specialized queue.

/// Capability every queue built on [`LinkedQueue`](crate::LinkedQueue) must provide.
///
/// The generic container knows nothing about its payload; a specialization
/// names itself and supplies the domain callback run by [`run_maintenance`].
pub trait QueueHook {
    /// Short name of the queue kind, used in log fields.
    fn kind(&self) -> &'static str;

    /// Domain-specific callback.
    fn special_operation(&self);
}

/// Run the domain callback of every queue, in order. Returns the kinds visited.
pub fn run_maintenance(queues: &[&dyn QueueHook]) -> Vec<&'static str> {
    queues
        .iter()
        .map(|queue| {
            let kind = queue.kind();
            tracing::debug!(kind, "Running queue maintenance");
            queue.special_operation();
            kind
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Counting {
        kind: &'static str,
        calls: Cell<usize>,
    }

    impl QueueHook for Counting {
        fn kind(&self) -> &'static str {
            self.kind
        }

        fn special_operation(&self) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    #[test]
    fn maintenance_visits_each_queue_once() {
        let a = Counting { kind: "a", calls: Cell::new(0) };
        let b = Counting { kind: "b", calls: Cell::new(0) };
        assert_eq!(run_maintenance(&[&a, &b, &a]), vec!["a", "b", "a"]);
        assert_eq!(a.calls.get(), 2);
        assert_eq!(b.calls.get(), 1);
        assert!(run_maintenance(&[]).is_empty());
    }
}
