//! Process-wide call-id allocation.
//!
//! Every accepted agent-call directive gets a monotonically increasing
//! `ac-N` token, unique within the process.  The same id doubles as the
//! outer identifier of the worker execution it triggers.  No persistence:
//! the counter restarts with the process.

use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Allocate the next call id (`ac-1`, `ac-2`, ...).
pub fn next_call_id() -> String {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst) + 1;
    format!("ac-{n}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_monotonic() {
        let a = next_call_id();
        let b = next_call_id();
        assert_ne!(a, b);

        let na: u64 = a.strip_prefix("ac-").unwrap().parse().unwrap();
        let nb: u64 = b.strip_prefix("ac-").unwrap().parse().unwrap();
        assert!(nb > na);
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..100).map(|_| next_call_id()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate call id allocated");
            }
        }
    }
}
