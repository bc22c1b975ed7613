//! Defensive invariant checks.
//!
//! A violated pool invariant means the lease/heap bookkeeping is already
//! corrupt. With `debug_assertions` on, the violation is logged and the
//! process aborts on the spot. Release builds skip it silently and hand
//! the result back; callers that would corrupt state by continuing leave
//! the operation undone.

/// Check `holds`; on failure abort (debug) or return `false` (release).
///
/// `what` names the violated invariant for the log line.
#[inline]
pub fn invariant(holds: bool, what: &str) -> bool {
    if holds {
        return true;
    }
    if cfg!(debug_assertions) {
        log::error!("buffer pool invariant violated: {what}");
        std::process::abort();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holding_invariant_passes() {
        assert!(invariant(true, "always"));
    }
}
