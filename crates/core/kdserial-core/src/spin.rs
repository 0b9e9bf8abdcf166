//! Busy-wait helpers.
//!
//! The debugger transport runs with scheduling and interrupts disabled, so
//! every wait is an active spin in the calling thread. Two shapes exist:
//! [`spin_until`] never gives up, [`spin_until_bounded`] samples the
//! condition a fixed number of times.

/// Error returned when a bounded spin runs out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinExhausted {
    /// Number of times the condition was sampled.
    pub attempts: u32,
}

/// Spins until `ready` returns `true`.
#[inline]
pub fn spin_until(mut ready: impl FnMut() -> bool) {
    while !ready() {
        core::hint::spin_loop();
    }
}

/// Samples `ready` at most `budget` times.
///
/// Returns the zero-based attempt on which the condition held.
///
/// # Errors
///
/// Returns [`SpinExhausted`] after exactly `budget` samples without success.
pub fn spin_until_bounded(budget: u32, mut ready: impl FnMut() -> bool) -> Result<u32, SpinExhausted> {
    for attempt in 0..budget {
        if ready() {
            return Ok(attempt);
        }
        core::hint::spin_loop();
    }
    Err(SpinExhausted { attempts: budget })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_reports_attempt() {
        let mut n = 0;
        let result = spin_until_bounded(10, || {
            n += 1;
            n == 4
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn bounded_samples_exactly_budget_times() {
        let mut samples = 0;
        let result = spin_until_bounded(25, || {
            samples += 1;
            false
        });
        assert_eq!(result, Err(SpinExhausted { attempts: 25 }));
        assert_eq!(samples, 25);
    }

    #[test]
    fn unbounded_returns_once_ready() {
        let mut n = 0;
        spin_until(|| {
            n += 1;
            n > 100
        });
        assert_eq!(n, 101);
    }
}
