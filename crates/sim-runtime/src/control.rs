//! Caller-side run control: pause/resume, stop and pacing between years.
//!
//! The engine itself never blocks. [`run`] is the driving loop and only
//! checks the control between whole years, so no partial year is ever
//! observable.

use crate::simulation::Simulation;
use sim_core::YearSnapshot;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Shared control token. Wrap in an `Arc` to drive it from another thread.
#[derive(Debug)]
pub struct RunControl {
    paused: AtomicBool,
    stop_requested: AtomicBool,
    /// Delay after each year in milliseconds.
    year_delay_ms: AtomicU64,
    poll_interval: Duration,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl RunControl {
    /// Control that checks the pause flag every `poll_interval` while paused.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            paused: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            year_delay_ms: AtomicU64::new(0),
            poll_interval,
        }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    /// Flip the pause flag. Returns the new state.
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Ask the loop to stop before the next year. Also releases a pause.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Set the pause between years. Returns the previous delay.
    pub fn set_year_delay(&self, delay: Duration) -> Duration {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(self.year_delay_ms.swap(ms, Ordering::AcqRel))
    }

    pub fn year_delay(&self) -> Duration {
        Duration::from_millis(self.year_delay_ms.load(Ordering::Acquire))
    }

    /// Block while paused. Returns `false` if a stop was requested.
    fn wait_until_runnable(&self) -> bool {
        while self.is_paused() {
            if self.is_stop_requested() {
                return false;
            }
            thread::sleep(self.poll_interval);
        }
        !self.is_stop_requested()
    }
}

/// How a driven run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// All configured years were simulated.
    Completed { years: u32 },
    /// A stop was requested after `years` years.
    Cancelled { years: u32 },
}

/// Drive `sim` until it has stepped its configured number of years or a stop
/// is requested. `on_year` sees every finished snapshot.
pub fn run<F>(sim: &mut Simulation, control: &RunControl, mut on_year: F) -> RunOutcome
where
    F: FnMut(&Simulation, &YearSnapshot),
{
    while !sim.is_finished() {
        if !control.wait_until_runnable() {
            warn!(years = sim.years_completed(), "run cancelled");
            return RunOutcome::Cancelled {
                years: sim.years_completed(),
            };
        }
        let snapshot = sim.run_year();
        on_year(sim, &snapshot);
        let delay = control.year_delay();
        if !delay.is_zero() && !sim.is_finished() {
            debug!(?delay, "pacing");
            thread::sleep(delay);
        }
    }
    RunOutcome::Completed {
        years: sim.years_completed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::SimConfig;
    use std::sync::Arc;

    fn sim(years: u32) -> Simulation {
        let mut config = SimConfig::testing();
        config.simulation_years = years;
        Simulation::create(config).expect("valid config")
    }

    #[test]
    fn completes_configured_years() {
        let mut s = sim(4);
        let mut seen = Vec::new();
        let outcome = run(&mut s, &RunControl::default(), |_, snap| seen.push(snap.year));
        assert_eq!(outcome, RunOutcome::Completed { years: 4 });
        assert_eq!(seen, [1, 2, 3, 4]);
    }

    #[test]
    fn stop_from_callback_cancels_before_next_year() {
        let mut s = sim(10);
        let control = RunControl::default();
        let outcome = run(&mut s, &control, |sim, _| {
            if sim.years_completed() == 3 {
                control.request_stop();
            }
        });
        assert_eq!(outcome, RunOutcome::Cancelled { years: 3 });
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn toggle_flips_pause() {
        let control = RunControl::default();
        assert!(control.toggle_pause());
        assert!(control.is_paused());
        assert!(!control.toggle_pause());
        assert!(!control.is_paused());
    }

    #[test]
    fn set_year_delay_returns_previous() {
        let control = RunControl::default();
        assert_eq!(control.set_year_delay(Duration::from_millis(250)), Duration::ZERO);
        assert_eq!(control.year_delay(), Duration::from_millis(250));
    }

    #[test]
    fn paused_run_resumes_from_another_thread() {
        let mut s = sim(2);
        let control = Arc::new(RunControl::new(Duration::from_millis(5)));
        control.pause();
        let remote = Arc::clone(&control);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.resume();
        });
        let outcome = run(&mut s, &control, |_, _| {});
        handle.join().expect("resume thread");
        assert_eq!(outcome, RunOutcome::Completed { years: 2 });
    }

    #[test]
    fn stop_while_paused_cancels() {
        let mut s = sim(2);
        let control = RunControl::new(Duration::from_millis(1));
        control.pause();
        control.request_stop();
        assert_eq!(run(&mut s, &control, |_, _| {}), RunOutcome::Cancelled { years: 0 });
    }
}
