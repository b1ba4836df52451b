//! Account supervisor
//!
//! Launches one polling loop per account as an independent tokio task. Each task
//! runs behind its own recover/log boundary: a panic inside one account's loop is
//! logged under that account and ends only that task.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::credentials::CredentialPair;
use crate::error::{PinpollError, Result};
use crate::journal::{AccountLog, AccountTag, EventKind, LogSink};
use crate::polling::{LoopReport, PollingConfig, PollingLoop};
use crate::remote::{DEFAULT_BASE_URL, RemoteClient, TaskApi};
use crate::session::{AccountSession, HttpSettings};

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub base_url: String,
    pub http: HttpSettings,
    pub polling: PollingConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http: HttpSettings::default(),
            polling: PollingConfig::default(),
        }
    }
}

/// How one account's task ended
#[derive(Debug, Clone)]
pub struct AccountOutcome {
    pub tag: AccountTag,
    /// `None` when the loop panicked or the task was aborted
    pub report: Option<LoopReport>,
}

/// Cloneable trigger for stopping every loop from outside the supervisor
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    log: AccountLog,
}

impl ShutdownHandle {
    /// Ask every loop to stop at its next suspension point
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            self.log.info(EventKind::Lifecycle, "Shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

struct RunningAccount {
    tag: AccountTag,
    handle: JoinHandle<Option<LoopReport>>,
}

pub struct Supervisor {
    config: SupervisorConfig,
    log: AccountLog,
    shutdown_tx: Arc<watch::Sender<bool>>,
    running: Vec<RunningAccount>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, sink: Arc<dyn LogSink>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            log: AccountLog::system(sink),
            shutdown_tx: Arc::new(shutdown_tx),
            running: Vec::new(),
        }
    }

    /// Build a session and HTTP client for every pair and launch its loop.
    ///
    /// Returns the number of accounts launched. Accounts without a proxy, or whose
    /// session cannot be built, are logged and skipped.
    pub fn start(&mut self, pairs: &[CredentialPair]) -> Result<usize> {
        if pairs.is_empty() {
            return Err(PinpollError::Configuration("no accounts to start".to_string()));
        }

        let mut launched = 0;
        for pair in pairs {
            let tag = AccountTag::Account(pair.index);
            let log = self.log.for_tag(tag);
            log.info(EventKind::Lifecycle, format!("Starting bot for Account {}", pair.index + 1));

            let session = match AccountSession::create(pair.index, &pair.token, pair.proxy.as_deref(), &self.config.http) {
                Ok(Some(session)) => session,
                Ok(None) => {
                    log.warn(
                        EventKind::Lifecycle,
                        format!("No proxy assigned for Account {}, skipping...", pair.index + 1),
                    );
                    continue;
                }
                Err(e) => {
                    log.error(EventKind::Lifecycle, format!("Cannot create session, skipping: {}", e));
                    continue;
                }
            };

            log.info(
                EventKind::Lifecycle,
                format!("Account {} -> Proxy: {}", pair.index + 1, session.proxy()),
            );
            let client = RemoteClient::new(session, self.config.base_url.clone());
            self.spawn_account(tag, client);
            launched += 1;
        }

        self.log.info(
            EventKind::Lifecycle,
            format!("Launched {} of {} accounts", launched, pairs.len()),
        );
        Ok(launched)
    }

    /// Launch a polling loop for `api` under `tag` behind the per-account boundary.
    pub fn spawn_account<A: TaskApi + 'static>(&mut self, tag: AccountTag, api: A) {
        let log = self.log.for_tag(tag);
        let polling = PollingLoop::new(api, log.clone(), self.config.polling.clone(), self.shutdown_tx.subscribe());

        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(polling.run()).catch_unwind().await {
                Ok(report) => Some(report),
                Err(panic) => {
                    log.error(
                        EventKind::Lifecycle,
                        format!("Account loop crashed: {}", panic_message(panic.as_ref())),
                    );
                    None
                }
            }
        });

        self.running.push(RunningAccount { tag, handle });
    }

    /// Number of launched account tasks
    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
            log: self.log.clone(),
        }
    }

    /// Ask every loop to stop at its next suspension point
    pub fn shutdown(&self) {
        self.shutdown_handle().trigger();
    }

    /// Wait for every account task to finish
    pub async fn join(self) -> Vec<AccountOutcome> {
        let mut outcomes = Vec::with_capacity(self.running.len());

        for account in self.running {
            let report = match account.handle.await {
                Ok(report) => report,
                Err(e) => {
                    self.log
                        .error(EventKind::Lifecycle, format!("Task for {} ended abnormally: {}", account.tag, e));
                    None
                }
            };
            outcomes.push(AccountOutcome {
                tag: account.tag,
                report,
            });
        }

        outcomes
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
