//! Per-account polling loop
//!
//! One cycle is: fetch profile, fetch task list, claim each task with a jitter
//! delay after every claim, then sleep a jitter delay. A failed call is logged
//! and treated as "this step produced nothing"; it never ends the loop.
//!
//! The loop checks the shutdown flag after every remote call and races it
//! against every delay, so a shutdown request stops it at the next suspension
//! point.

use std::time::Duration;

use log::debug;
use tokio::sync::watch;

use crate::journal::{AccountLog, EventKind};
use crate::remote::{Task, TaskApi};
use crate::schedule::Jitter;

#[derive(Debug, Clone, Default)]
pub struct PollingConfig {
    pub jitter: Jitter,
    /// Stop after this many complete cycles; `None` runs until shutdown
    pub max_cycles: Option<u64>,
}

impl PollingConfig {
    pub fn new(jitter: Jitter) -> Self {
        Self { jitter, max_cycles: None }
    }

    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }
}

/// Counters for one account's run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub cycles: u64,
    pub profile_calls: u64,
    pub profile_failures: u64,
    pub list_calls: u64,
    pub list_failures: u64,
    pub claims: u64,
    pub claim_failures: u64,
    pub stopped_by_shutdown: bool,
}

impl LoopReport {
    /// Number of remote calls attempted
    pub fn call_attempts(&self) -> u64 {
        self.profile_calls + self.list_calls + self.claims + self.claim_failures
    }
}

enum Step {
    Continue,
    Stop,
}

/// Drives one account forever (or until shutdown / `max_cycles`)
pub struct PollingLoop<A: TaskApi> {
    api: A,
    log: AccountLog,
    config: PollingConfig,
    shutdown: watch::Receiver<bool>,
}

impl<A: TaskApi> PollingLoop<A> {
    pub fn new(api: A, log: AccountLog, config: PollingConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            api,
            log,
            config,
            shutdown,
        }
    }

    pub async fn run(mut self) -> LoopReport {
        let mut report = LoopReport::default();

        loop {
            if self.config.max_cycles.is_some_and(|max| report.cycles >= max) {
                break;
            }
            if self.is_shutdown() {
                report.stopped_by_shutdown = true;
                break;
            }
            if let Step::Stop = self.run_cycle(&mut report).await {
                report.stopped_by_shutdown = true;
                break;
            }
        }

        self.log.info(
            EventKind::Lifecycle,
            format!("Stopped after {} cycles", report.cycles),
        );
        report
    }

    async fn run_cycle(&mut self, report: &mut LoopReport) -> Step {
        report.profile_calls += 1;
        match self.api.fetch_profile().await {
            Ok(profile) => self.log.info(EventKind::Profile, format!("Profile info | {}", profile)),
            Err(e) => {
                report.profile_failures += 1;
                self.log.warn(EventKind::Profile, format!("Failed to fetch profile info: {}", e));
            }
        }
        if self.is_shutdown() {
            return Step::Stop;
        }

        report.list_calls += 1;
        let tasks = match self.api.list_tasks().await {
            Ok(tasks) => {
                self.log
                    .info(EventKind::TaskList, format!("Found {} claimable tasks", tasks.len()));
                tasks
            }
            Err(e) => {
                report.list_failures += 1;
                self.log.warn(EventKind::TaskList, format!("Failed to fetch task list: {}", e));
                Vec::new()
            }
        };
        if self.is_shutdown() {
            return Step::Stop;
        }

        if let Step::Stop = self.claim_all(&tasks, report).await {
            return Step::Stop;
        }

        report.cycles += 1;
        if self.config.max_cycles.is_some_and(|max| report.cycles >= max) {
            self.log.info(EventKind::Cycle, "Cycle complete");
            return Step::Continue;
        }

        let wait = self.config.jitter.sample();
        self.log.info(
            EventKind::Cycle,
            format!("Cycle complete, waiting {} seconds...", wait.as_secs()),
        );
        self.pause(wait).await
    }

    async fn claim_all(&mut self, tasks: &[Task], report: &mut LoopReport) -> Step {
        for task in tasks {
            match self.api.claim_task(&task.id).await {
                Ok(()) => {
                    report.claims += 1;
                    self.log.info(EventKind::Claim, format!("Claimed task {}", task.id));
                }
                Err(e) => {
                    report.claim_failures += 1;
                    self.log
                        .warn(EventKind::Claim, format!("Failed to claim task {}: {}", task.id, e));
                }
            }
            if self.is_shutdown() {
                return Step::Stop;
            }

            let wait = self.config.jitter.sample();
            debug!("[{}] waiting {}s before next claim", self.log.tag(), wait.as_secs());
            if let Step::Stop = self.pause(wait).await {
                return Step::Stop;
            }
        }
        Step::Continue
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn pause(&mut self, duration: Duration) -> Step {
        if !duration.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = shutdown_requested(&mut self.shutdown) => {}
            }
        }
        if self.is_shutdown() { Step::Stop } else { Step::Continue }
    }
}

/// Resolves once shutdown is flagged; never resolves if the sender is gone
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
