//! Cooperative polling primitives.
//!
//! The station has exactly one thread of control.  "Waiting" means calling
//! a caller-supplied [`Probe`] in a tight loop until a deadline passes or the
//! probe reports success; there is no timer interrupt and no yielding to
//! another task.
//!
//! ```text
//!   poll_until_deadline ── probe(t) every tick, ignore result ── until elapsed >= duration
//!   poll_until_success  ── probe(t) every tick ── true ⇒ return true
//!                                              └─ elapsed >= timeout ⇒ return false
//! ```
//!
//! Both loops check the clock *after* calling the probe, so the probe is
//! always invoked at least once and may see a negative remaining time on
//! its last call.  Use [`display_remaining`] before showing it to a human.

use log::debug;

/// Monotonic millisecond counter (time since boot).
pub trait MonotonicClock {
    fn elapsed_ms(&self) -> u64;
}

/// Which quantity the probe receives on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBasis {
    /// `horizon - elapsed` (may go negative on the last tick).
    Remaining,
    /// Time since the wait started.
    Elapsed,
}

impl TimeBasis {
    fn quantity(self, horizon_ms: u64, elapsed_ms: u64) -> i64 {
        match self {
            Self::Remaining => horizon_ms as i64 - elapsed_ms as i64,
            Self::Elapsed => elapsed_ms as i64,
        }
    }
}

/// Callback invoked on every polling tick.
///
/// Receives the time quantity selected by [`TimeBasis`] (milliseconds) and
/// returns whether it succeeded.  [`poll_until_deadline`] ignores the
/// return value.
pub trait Probe {
    fn probe(&mut self, time_ms: i64) -> bool;
}

impl<F> Probe for F
where
    F: FnMut(i64) -> bool,
{
    fn probe(&mut self, time_ms: i64) -> bool {
        self(time_ms)
    }
}

/// Clamp a possibly-negative remaining time for display.
pub fn display_remaining(remaining_ms: i64) -> u64 {
    remaining_ms.max(0) as u64
}

/// Call `probe` on every tick for a fixed `duration_ms`.
///
/// Not cancelable: the probe's return value is ignored.  Returns the number
/// of ticks executed (always ≥ 1).
pub fn poll_until_deadline<C, P>(clock: &C, duration_ms: u64, basis: TimeBasis, probe: &mut P) -> u32
where
    C: MonotonicClock + ?Sized,
    P: Probe + ?Sized,
{
    let start = clock.elapsed_ms();
    let mut ticks: u32 = 0;
    debug!("Scheduler: fixed wait {} ms", duration_ms);

    loop {
        let elapsed = clock.elapsed_ms().saturating_sub(start);
        probe.probe(basis.quantity(duration_ms, elapsed));
        ticks = ticks.saturating_add(1);

        if clock.elapsed_ms().saturating_sub(start) >= duration_ms {
            break;
        }
    }

    debug!("Scheduler: fixed wait done after {} ticks", ticks);
    ticks
}

/// Call `probe` until it returns `true` or `timeout_ms` has elapsed.
///
/// Returns `true` on success, `false` when the timeout is exhausted.
pub fn poll_until_success<C, P>(clock: &C, timeout_ms: u64, basis: TimeBasis, probe: &mut P) -> bool
where
    C: MonotonicClock + ?Sized,
    P: Probe + ?Sized,
{
    let start = clock.elapsed_ms();
    debug!("Scheduler: waiting up to {} ms for success", timeout_ms);

    loop {
        let elapsed = clock.elapsed_ms().saturating_sub(start);
        if probe.probe(basis.quantity(timeout_ms, elapsed)) {
            debug!("Scheduler: probe succeeded after {} ms", elapsed);
            return true;
        }

        if clock.elapsed_ms().saturating_sub(start) >= timeout_ms {
            debug!("Scheduler: timed out after {} ms", timeout_ms);
            return false;
        }
    }
}
