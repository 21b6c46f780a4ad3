use std::time::Duration;

/// Run `job` every `interval`, `max_runs` times or forever when `None`.
/// `Some(0)` runs nothing.
///
/// The job receives the 1-based run number. Errors are logged and the loop
/// carries on. Returns how many runs failed.
pub fn run_periodically<F, E>(interval: Duration, max_runs: Option<usize>, mut job: F) -> usize
where
    F: FnMut(usize) -> Result<(), E>,
    E: std::fmt::Display,
{
    let mut failures = 0;
    let mut run = 0usize;

    loop {
        if max_runs.is_some_and(|max| run >= max) {
            return failures;
        }
        if run > 0 {
            tracing::debug!(secs = interval.as_secs(), "sleeping until next run");
            std::thread::sleep(interval);
        }

        run += 1;
        tracing::info!(run, "scheduled clean starting");
        if let Err(e) = job(run) {
            failures += 1;
            tracing::error!(run, error = %e, "scheduled clean failed");
        }
    }
}
