// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Equity calculator runs orchestration.
use log::{error, info};
use parking_lot::{Condvar, Mutex};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle, ThreadId},
    time::Instant,
};

use crate::{
    aggregate::{Aggregate, MIN_BATCHES, Totals},
    config::{RunPlan, SimulationConfig},
    error::EquityError,
    results::{ResultsSnapshot, StopReason},
    worker::Worker,
};

/// Progress callback type.
type Callback = Box<dyn FnMut(&ResultsSnapshot) + Send>;

/// Run cancellation signal, the first reason raised wins.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    raised: AtomicBool,
    reason: Mutex<Option<StopReason>>,
    cond: Condvar,
}

impl Signal {
    /// Raises the signal, returns false if it was already raised.
    pub fn raise(&self, reason: StopReason) -> bool {
        let mut current = self.reason.lock();
        if current.is_some() {
            return false;
        }

        *current = Some(reason);
        self.raised.store(true, Ordering::Release);
        self.cond.notify_all();
        true
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.reason.lock()
    }

    fn reset(&self) {
        let mut reason = self.reason.lock();
        *reason = None;
        self.raised.store(false, Ordering::Release);
    }

    /// Sleeps until the deadline, returns true if the signal is raised.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut reason = self.reason.lock();
        while reason.is_none() {
            if self.cond.wait_until(&mut reason, deadline).timed_out() {
                break;
            }
        }

        reason.is_some()
    }
}

/// A handle that stops the calculator current run.
///
/// The handle can be moved into the progress callback or another thread.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<Signal>);

impl StopHandle {
    /// Stops the current run, further calls have no effect.
    pub fn stop(&self) {
        self.0.raise(StopReason::UserStopped);
    }
}

/// The calculator state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run has been started.
    #[default]
    Idle,
    /// A run is active.
    Running,
    /// The last run completed.
    Finished(StopReason),
    /// The last run failed because a worker or the progress callback panicked
    /// or because the workers could not deal the players hole cards.
    Failed,
}

#[derive(Debug, Default)]
struct Shared {
    state: RunState,
    latest: Option<ResultsSnapshot>,
    monitor: Option<ThreadId>,
}

/// Monte Carlo equity calculator.
///
/// A run is started with [EquityCalculator::start] that spawns the worker
/// threads and a monitor thread and returns. The monitor calls the progress
/// callback every update interval and stops the run when the standard error of
/// the first seat equity drops below the target or when the time limit
/// elapses, the run can also be stopped with [EquityCalculator::stop] or with a
/// [StopHandle] from the callback.
///
/// ```no_run
/// # use riverline_equity::*;
/// # fn main() -> Result<(), EquityError> {
/// let config = SimulationConfig::new(["AhAd".parse()?, CardRange::RANDOM]);
///
/// let calc = EquityCalculator::new();
/// calc.start(&config, |r| println!("{:.4} {:?}", r.equity[0], r.progress))?;
/// calc.wait()?;
///
/// let results = calc.results()?;
/// println!("AA equity {}", results.equity_split(0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct EquityCalculator {
    signal: Arc<Signal>,
    shared: Arc<Mutex<Shared>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl EquityCalculator {
    /// Creates an idle calculator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle that stops the current run.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.signal.clone())
    }

    /// Validates the configuration and starts a run.
    ///
    /// The callback is called from the monitor thread with a new snapshot
    /// every update interval and once more with the final snapshot after the
    /// workers have exited. Returns an error and spawns no thread if the
    /// configuration is not valid.
    pub fn start<F>(&self, config: &SimulationConfig, callback: F) -> Result<(), EquityError>
    where
        F: FnMut(&ResultsSnapshot) + Send + 'static,
    {
        if self.on_monitor_thread() {
            return Err(EquityError::runtime(
                "cannot start a run from the progress callback",
            ));
        }

        let plan = Arc::new(config.validate()?);

        let mut monitor = self.monitor.lock();
        if self.state() == RunState::Running {
            return Err(EquityError::runtime("a run is already active"));
        }

        // The previous run is finished but it was not waited.
        if let Some(handle) = monitor.take() {
            let _ = handle.join();
        }

        self.signal.reset();
        {
            let mut shared = self.shared.lock();
            shared.state = RunState::Running;
            shared.latest = None;
        }

        info!(
            "Starting equity run: {} players, {} threads, board '{}', dead '{}', stdev target {:e}, time limit {:?}",
            plan.players(),
            plan.threads,
            plan.board,
            plan.dead,
            plan.stdev_target,
            plan.time_limit,
        );

        let aggregate = Arc::new(Aggregate::new(plan.players()));
        let started = Instant::now();

        let mut workers = Vec::with_capacity(plan.threads);
        for id in 0..plan.threads {
            let worker = Worker::new(id, plan.clone(), aggregate.clone(), self.signal.clone());
            let spawned = thread::Builder::new()
                .name(format!("equity-worker-{id}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    self.signal.raise(StopReason::UserStopped);
                    workers.into_iter().for_each(|h| {
                        let _ = h.join();
                    });
                    self.shared.lock().state = RunState::Failed;
                    return Err(EquityError::runtime(format!("cannot spawn worker: {e}")));
                }
            }
        }

        let task = Monitor {
            plan,
            aggregate,
            signal: self.signal.clone(),
            shared: self.shared.clone(),
            workers,
            started,
            callback: Box::new(callback),
        };

        let spawned = thread::Builder::new()
            .name("equity-monitor".to_string())
            .spawn(move || task.run());

        match spawned {
            Ok(handle) => {
                *monitor = Some(handle);
                Ok(())
            }
            Err(e) => {
                // The workers exit on their own once the signal is raised.
                self.signal.raise(StopReason::UserStopped);
                self.shared.lock().state = RunState::Failed;
                Err(EquityError::runtime(format!("cannot spawn monitor: {e}")))
            }
        }
    }

    /// Blocks until the current run has finished and all its threads have
    /// exited.
    pub fn wait(&self) -> Result<(), EquityError> {
        if self.on_monitor_thread() {
            return Err(EquityError::runtime(
                "cannot wait from the progress callback",
            ));
        }

        let mut monitor = self.monitor.lock();
        match monitor.take() {
            Some(handle) => {
                if handle.join().is_err() {
                    error!("Equity monitor thread panicked");
                    self.shared.lock().state = RunState::Failed;
                }

                Ok(())
            }
            None if self.state() == RunState::Idle => {
                Err(EquityError::runtime("no run has been started"))
            }
            None => Ok(()),
        }
    }

    /// Stops the current run, the run results remain valid.
    pub fn stop(&self) {
        self.signal.raise(StopReason::UserStopped);
    }

    /// Returns the final results of the last run.
    pub fn results(&self) -> Result<ResultsSnapshot, EquityError> {
        let shared = self.shared.lock();
        match shared.state {
            RunState::Finished(_) => shared
                .latest
                .clone()
                .ok_or_else(|| EquityError::runtime("missing run results")),
            RunState::Idle => Err(EquityError::runtime("no run has been started")),
            RunState::Running => Err(EquityError::runtime("the run has not finished")),
            RunState::Failed => Err(EquityError::runtime("the run failed")),
        }
    }

    /// Returns the latest snapshot of the current or last run.
    pub fn snapshot(&self) -> Option<ResultsSnapshot> {
        self.shared.lock().latest.clone()
    }

    /// Returns the calculator state.
    pub fn state(&self) -> RunState {
        self.shared.lock().state
    }

    fn on_monitor_thread(&self) -> bool {
        self.shared.lock().monitor == Some(thread::current().id())
    }
}

impl Drop for EquityCalculator {
    fn drop(&mut self) {
        self.stop();

        if let Some(handle) = self.monitor.get_mut().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// The task that drives a run from the monitor thread.
struct Monitor {
    plan: Arc<RunPlan>,
    aggregate: Arc<Aggregate>,
    signal: Arc<Signal>,
    shared: Arc<Mutex<Shared>>,
    workers: Vec<JoinHandle<()>>,
    started: Instant,
    callback: Callback,
}

impl Monitor {
    fn run(mut self) {
        self.shared.lock().monitor = Some(thread::current().id());

        let deadline = self.plan.time_limit.map(|t| self.started + t);
        let mut previous = None;
        let mut failed = false;

        loop {
            let tick = Instant::now() + self.plan.update_interval;
            if self.signal.wait_until(deadline.map_or(tick, |d| d.min(tick))) {
                break;
            }

            // Workers only return after the signal is raised.
            if self.workers.iter().any(JoinHandle::is_finished) {
                error!("Equity worker exited before the run stopped");
                failed = true;
                self.signal.raise(StopReason::UserStopped);
                break;
            }

            let totals = self.aggregate.totals();
            if !self.dealing(&totals) {
                failed = true;
                self.signal.raise(StopReason::UserStopped);
                break;
            }

            let snapshot = self.snapshot(&totals, previous.as_ref());
            self.shared.lock().latest = Some(snapshot.clone());

            if !self.notify(&snapshot) {
                failed = true;
                self.signal.raise(StopReason::UserStopped);
                break;
            }

            if self.signal.is_raised() {
                break;
            }

            if totals.batches >= MIN_BATCHES && totals.stdev() <= self.plan.stdev_target {
                self.signal.raise(StopReason::Converged);
                break;
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                self.signal.raise(StopReason::TimedOut);
                break;
            }

            previous = Some(snapshot);
        }

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Equity worker panicked");
                failed = true;
            }
        }

        let totals = self.aggregate.totals();
        if !failed && !self.dealing(&totals) {
            failed = true;
        }

        let reason = self.signal.reason().unwrap_or(StopReason::UserStopped);
        let last = self
            .snapshot(&totals, previous.as_ref())
            .finish(reason);

        info!(
            "Equity run {reason}: {} hands in {:.3}s, {:.2} Meval/s, stdev {:.2e}",
            last.hands,
            last.time,
            last.speed * 1e-6,
            last.stdev,
        );

        {
            let mut shared = self.shared.lock();
            shared.latest = Some(last.clone());
            shared.state = if failed {
                RunState::Failed
            } else {
                RunState::Finished(reason)
            };
        }

        if !failed {
            self.notify(&last);
        }
    }

    fn snapshot(
        &self,
        totals: &Totals,
        previous: Option<&ResultsSnapshot>,
    ) -> ResultsSnapshot {
        ResultsSnapshot::new(
            totals,
            self.started.elapsed(),
            previous,
            self.plan.stdev_target,
            self.plan.time_limit,
        )
    }

    /// Returns false if a worker completed a batch without dealing any trial.
    fn dealing(&self, totals: &Totals) -> bool {
        if totals.empty_batches == 0 {
            return true;
        }

        error!(
            "Equity workers cannot deal the players hole cards, {} empty batches",
            totals.empty_batches
        );
        false
    }

    /// Calls the progress callback, returns false if it panicked.
    fn notify(&mut self, snapshot: &ResultsSnapshot) -> bool {
        let callback = &mut self.callback;
        match panic::catch_unwind(AssertUnwindSafe(|| callback(snapshot))) {
            Ok(()) => true,
            Err(_) => {
                error!("Equity progress callback panicked");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::parse_range;
    use riverline_cards::CardMask;
    use std::{sync::atomic::AtomicUsize, time::Duration};

    fn config(ranges: &[&str], board: &str) -> SimulationConfig {
        let mut config = SimulationConfig::new(
            ranges
                .iter()
                .map(|r| parse_range(r, CardMask::EMPTY).unwrap()),
        );
        config.board = board.parse().unwrap();
        config.update_interval = Duration::from_millis(5);
        config.time_limit = Some(Duration::from_secs(60));
        config
    }

    fn run(config: &SimulationConfig) -> ResultsSnapshot {
        let calc = EquityCalculator::new();
        calc.start(config, |_| {}).unwrap();
        calc.wait().unwrap();
        calc.results().unwrap()
    }

    fn assert_consistent(r: &ResultsSnapshot) {
        assert!(r.hands > 0);
        assert!((r.equity.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        for seat in 0..r.players {
            assert!(r.wins[seat] + r.ties[seat] <= r.hands);
        }
        assert_eq!(r.wins_by_mask.iter().sum::<u64>(), r.hands);
        assert_eq!(r.evaluations, r.hands * r.players as u64);
    }

    #[test]
    fn royal_flush_equity() {
        let r = run(&config(&["AsKs", "2h2d"], "QsJsTs"));

        assert_consistent(&r);
        assert_eq!(r.equity[0], 1.0);
        assert_eq!(r.wins[0], r.hands);
        assert_eq!(r.stop_reason, Some(StopReason::Converged));
        assert!(r.finished);
    }

    #[test]
    fn pair_vs_overcards() {
        let mut config = config(&["7c7d", "AhKs"], "");
        config.stdev_target = 1e-3;

        // Exact equity by enumeration is 0.5538812.
        let r = run(&config);
        assert_consistent(&r);
        assert!((r.equity[0] - 0.55388).abs() < 0.005, "equity={}", r.equity[0]);

        let split = r.equity_split(0);
        assert!((split.win - 0.55247).abs() < 0.005);
        assert!((split.tie - 0.00282).abs() < 0.002);
    }

    #[test]
    fn aces_vs_random() {
        let mut config = config(&["AhAd", "random"], "");
        config.stdev_target = 1e-3;

        let r = run(&config);
        assert_consistent(&r);
        assert!((r.equity[0] - 0.85204).abs() < 0.005, "equity={}", r.equity[0]);
    }

    #[test]
    fn multiway_equities_sum() {
        let mut config = config(&["AhKh@2,QsQd", "random", "JcTc", "random"], "2h7h");
        config.stdev_target = 2e-3;
        config.dead = "9s".parse().unwrap();

        let r = run(&config);
        assert_consistent(&r);
        assert_eq!(r.players, 4);
    }

    #[test]
    fn invalid_configuration() {
        let calc = EquityCalculator::new();
        let config = config(&["AhKh", "AhKh"], "");

        assert!(matches!(
            calc.start(&config, |_| {}),
            Err(EquityError::Configuration(_))
        ));
        assert_eq!(calc.state(), RunState::Idle);
        assert!(matches!(calc.wait(), Err(EquityError::Runtime(_))));
    }

    #[test]
    fn calls_out_of_sequence() {
        let calc = EquityCalculator::new();
        assert!(matches!(calc.wait(), Err(EquityError::Runtime(_))));
        assert!(matches!(calc.results(), Err(EquityError::Runtime(_))));
        assert!(calc.snapshot().is_none());

        // Stopping an idle calculator does not affect the next run.
        calc.stop();

        let config = config(&["AsKs", "2h2d"], "QsJsTs");
        calc.start(&config, |_| {}).unwrap();
        calc.wait().unwrap();
        assert_eq!(calc.state(), RunState::Finished(StopReason::Converged));

        // Waiting twice is fine.
        assert!(calc.wait().is_ok());
    }

    #[test]
    fn stop_from_callback() {
        let calc = EquityCalculator::new();
        let handle = calc.stop_handle();
        let finals = Arc::new(AtomicUsize::new(0));
        let stopped_at = Arc::new(Mutex::new(None));

        let mut config = config(&["7c7d", "random", "random"], "");
        config.stdev_target = 1e-9;
        config.batch_size = 256;

        let counter = finals.clone();
        let stopped = stopped_at.clone();
        calc.start(&config, move |r| {
            if r.finished {
                counter.fetch_add(1, Ordering::SeqCst);
            } else if r.hands > 0 {
                stopped.lock().get_or_insert_with(Instant::now);
                handle.stop();
            }
        })
        .unwrap();

        calc.wait().unwrap();
        let returned = Instant::now();

        // Wait returns within one update interval plus a batch.
        let stopped_at = stopped_at.lock().unwrap();
        let latency = returned.duration_since(stopped_at);
        assert!(
            latency < config.update_interval + Duration::from_millis(250),
            "latency={latency:?}"
        );

        assert_eq!(finals.load(Ordering::SeqCst), 1);
        assert_eq!(calc.state(), RunState::Finished(StopReason::UserStopped));

        let r = calc.results().unwrap();
        assert_consistent(&r);
        assert_eq!(r.stop_reason, Some(StopReason::UserStopped));
        assert_eq!(calc.snapshot(), Some(r));
    }

    #[test]
    fn time_limit() {
        let mut config = config(&["7c7d", "random"], "");
        config.stdev_target = 1e-9;
        config.time_limit = Some(Duration::from_millis(100));

        let r = run(&config);
        assert_consistent(&r);
        assert_eq!(r.stop_reason, Some(StopReason::TimedOut));
        assert_eq!(r.progress, Some(1.0));
        assert!(r.time >= 0.1);
    }

    #[test]
    fn looser_target_runs_less() {
        let mut config = config(&["7c7d", "AhKs"], "");
        config.update_interval = Duration::from_millis(1);

        config.stdev_target = 5e-2;
        let loose = run(&config);

        config.stdev_target = 5e-4;
        let tight = run(&config);

        assert_eq!(loose.stop_reason, Some(StopReason::Converged));
        assert_eq!(tight.stop_reason, Some(StopReason::Converged));
        assert!(loose.hands <= tight.hands);
        // Batches merged after the convergence check can move the estimate.
        assert!(tight.stdev < 6e-4, "stdev={}", tight.stdev);
    }

    #[test]
    fn converged_runs_are_accurate() {
        // Short update intervals must not stop a run on a handful of batches.
        let mut config = config(&["7c7d", "AhKs"], "");
        config.threads = 1;
        config.stdev_target = 1e-3;
        config.update_interval = Duration::from_micros(100);

        for seed in 0..10 {
            config.seed = Some(seed);
            let r = run(&config);
            assert_consistent(&r);

            if r.stop_reason != Some(StopReason::Converged) {
                continue;
            }

            assert!(r.batches >= MIN_BATCHES);
            assert!(r.hands >= MIN_BATCHES * config.batch_size as u64);

            // Binomial standard error of the merged trials.
            let true_stdev = (0.25 / r.hands as f64).sqrt();
            assert!(true_stdev <= 2e-3, "seed={seed} hands={}", r.hands);
            assert!(
                (r.equity[0] - 0.55388).abs() < 0.01,
                "seed={seed} equity={}",
                r.equity[0]
            );
        }
    }

    #[test]
    fn undealable_ranges_fail_run() {
        // The heavy pair always collides with the other seat aces.
        let mut config = config(&["AhKh@1e6,QsQd@1e-6", "AhAd"], "");
        config.threads = 1;
        config.batch_size = 64;
        config.time_limit = None;

        let calc = EquityCalculator::new();
        calc.start(&config, |_| {}).unwrap();
        calc.wait().unwrap();

        assert_eq!(calc.state(), RunState::Failed);
        assert!(matches!(calc.results(), Err(EquityError::Runtime(_))));
    }

    #[test]
    fn seeded_single_thread() {
        let mut config = config(&["AhAd", "random"], "");
        config.threads = 1;
        config.seed = Some(7);
        config.stdev_target = 5e-3;

        let r = run(&config);
        assert_consistent(&r);
        assert_eq!(r.stop_reason, Some(StopReason::Converged));
    }

    #[test]
    fn restart_and_busy() {
        let calc = EquityCalculator::new();
        let mut config = config(&["7c7d", "random"], "");
        config.stdev_target = 1e-9;

        calc.start(&config, |_| {}).unwrap();
        assert_eq!(calc.state(), RunState::Running);
        assert!(matches!(
            calc.start(&config, |_| {}),
            Err(EquityError::Runtime(_))
        ));
        assert!(matches!(calc.results(), Err(EquityError::Runtime(_))));

        calc.stop();
        calc.wait().unwrap();
        assert_eq!(calc.state(), RunState::Finished(StopReason::UserStopped));

        // A finished run that was not waited is joined by the next start.
        calc.start(&config, |_| {}).unwrap();
        calc.stop();
        while calc.state() == RunState::Running {
            thread::sleep(Duration::from_millis(1));
        }

        calc.start(&config, |_| {}).unwrap();
        calc.stop();
        calc.wait().unwrap();
        assert_eq!(calc.state(), RunState::Finished(StopReason::UserStopped));
    }

    #[test]
    fn panicking_callback_fails_run() {
        let calc = EquityCalculator::new();
        let mut config = config(&["7c7d", "random"], "");
        config.stdev_target = 1e-9;

        calc.start(&config, |_| panic!("callback failure")).unwrap();
        calc.wait().unwrap();

        assert_eq!(calc.state(), RunState::Failed);
        assert!(matches!(calc.results(), Err(EquityError::Runtime(_))));
    }

    #[test]
    fn drop_stops_run() {
        let mut config = config(&["7c7d", "random"], "");
        config.stdev_target = 1e-9;
        config.time_limit = None;

        let calc = EquityCalculator::new();
        calc.start(&config, |_| {}).unwrap();
        thread::sleep(Duration::from_millis(20));
        drop(calc);
    }
}
