//! Shared audio utilities.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique id from the current time in nanoseconds plus a process-local counter.
/// Used to name short-lived temp audio files.
#[inline]
pub(crate) fn gen_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{:x}_{}_{}", nanos, std::process::id(), seq)
}

#[cfg(test)]
mod tests {
    use super::gen_id;

    #[test]
    fn ids_do_not_repeat() {
        let a = gen_id();
        let b = gen_id();
        assert_ne!(a, b);
    }
}
