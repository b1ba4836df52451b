//! Multi-account supervision integration tests
//!
//! Runs several accounts against mock task services and checks that accounts
//! stay independent of each other.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use pinpoll::credentials::{self, ProxyPolicy};
use pinpoll::error::{PinpollError, Result};
use pinpoll::journal::{AccountTag, EventKind, FileSink, LogSink, MemorySink};
use pinpoll::polling::PollingConfig;
use pinpoll::remote::{ProfileSnapshot, Task, TaskApi, TaskId};
use pinpoll::schedule::Jitter;
use pinpoll::supervisor::{Supervisor, SupervisorConfig};
use tempfile::TempDir;

/// Every call fails as if the proxy were dead
#[derive(Default)]
struct DeadTransport {
    calls: AtomicU64,
}

#[async_trait]
impl TaskApi for DeadTransport {
    async fn fetch_profile(&self) -> Result<ProfileSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PinpollError::transport("profile", "proxy connection refused"))
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PinpollError::transport("task list", "proxy connection refused"))
    }

    async fn claim_task(&self, _id: &TaskId) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PinpollError::transport("claim", "proxy connection refused"))
    }
}

/// Healthy service offering two tasks every cycle
#[derive(Default)]
struct WorkingService {
    claims: AtomicU64,
}

#[async_trait]
impl TaskApi for WorkingService {
    async fn fetch_profile(&self) -> Result<ProfileSnapshot> {
        Ok(ProfileSnapshot {
            name: Some("dana".to_string()),
            checked_in_today: true,
            level: Some("2".to_string()),
            points: Some("100".to_string()),
        })
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(vec![Task { id: TaskId::new("1") }, Task { id: TaskId::new("2") }])
    }

    async fn claim_task(&self, _id: &TaskId) -> Result<()> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn bounded_config(cycles: u64) -> SupervisorConfig {
    SupervisorConfig {
        polling: PollingConfig::new(Jitter::none()).with_max_cycles(cycles),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_dead_account_does_not_block_sibling() {
    let sink = Arc::new(MemorySink::new());
    let dead = Arc::new(DeadTransport::default());
    let working = Arc::new(WorkingService::default());

    let mut supervisor = Supervisor::new(bounded_config(20), sink.clone());
    supervisor.spawn_account(AccountTag::Account(0), Arc::clone(&dead));
    supervisor.spawn_account(AccountTag::Account(1), Arc::clone(&working));
    assert_eq!(supervisor.len(), 2);

    let outcomes = supervisor.join().await;

    let dead_report = outcomes[0].report.clone().unwrap();
    assert_eq!(dead_report.cycles, 20);
    assert_eq!(dead_report.profile_failures, 20);
    assert_eq!(dead_report.list_failures, 20);
    assert_eq!(dead.calls.load(Ordering::SeqCst), 40);

    let working_report = outcomes[1].report.clone().unwrap();
    assert_eq!(working_report.cycles, 20);
    assert_eq!(working_report.claims, 40);
    assert_eq!(working.claims.load(Ordering::SeqCst), 40);

    let dead_warnings = sink
        .records_for(AccountTag::Account(0))
        .into_iter()
        .filter(|r| r.kind.is_call() && r.level == log::Level::Warn)
        .count();
    assert_eq!(dead_warnings, 40);
    assert!(
        sink.records_for(AccountTag::Account(1))
            .iter()
            .all(|r| r.level != log::Level::Warn)
    );
}

#[tokio::test]
async fn test_empty_token_list_fails_before_any_launch() {
    let temp_dir = TempDir::new().unwrap();
    let tokens = temp_dir.path().join("token.txt");
    let proxies = temp_dir.path().join("proxy.txt");
    std::fs::write(&tokens, "\n\n").unwrap();
    std::fs::write(&proxies, "127.0.0.1:8080\n").unwrap();

    let err = credentials::load_files(&tokens, &proxies, ProxyPolicy::Skip).unwrap_err();
    assert!(matches!(err, PinpollError::Configuration(_)));

    let sink = Arc::new(MemorySink::new());
    let mut supervisor = Supervisor::new(bounded_config(1), sink.clone());
    let err = supervisor.start(&[]).unwrap_err();
    assert!(err.is_fatal());
    assert!(supervisor.is_empty());
    assert!(sink.records().iter().all(|r| !r.kind.is_call()));
}

#[tokio::test]
async fn test_strict_policy_rejects_mismatch() {
    let err = credentials::load("t1\nt2\nt3", "p1:1\np2:2", ProxyPolicy::Strict).unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_start_launches_only_accounts_with_proxy() {
    let sink = Arc::new(MemorySink::new());
    let pairs = credentials::load("t1\nt2\nt3", "127.0.0.1:9\n127.0.0.1:9", ProxyPolicy::Skip).unwrap();

    let mut supervisor = Supervisor::new(
        SupervisorConfig {
            base_url: "http://pin.test".to_string(),
            polling: PollingConfig::new(Jitter::new(3600, 3600).unwrap()),
            ..Default::default()
        },
        sink.clone(),
    );
    let launched = supervisor.start(&pairs).unwrap();
    assert_eq!(launched, 2);

    supervisor.shutdown();
    let outcomes = tokio::time::timeout(std::time::Duration::from_secs(60), supervisor.join())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].tag, AccountTag::Account(0));
    assert_eq!(outcomes[1].tag, AccountTag::Account(1));

    let skipped: Vec<_> = sink
        .records_for(AccountTag::Account(2))
        .into_iter()
        .filter(|r| r.kind == EventKind::Lifecycle && r.message.contains("No proxy assigned"))
        .collect();
    assert_eq!(skipped.len(), 1);
}

#[tokio::test]
async fn test_file_sink_keeps_one_file_per_account() {
    let temp_dir = TempDir::new().unwrap();
    let sink: Arc<dyn LogSink> = Arc::new(FileSink::new(temp_dir.path()).unwrap());

    let mut supervisor = Supervisor::new(bounded_config(3), sink);
    supervisor.spawn_account(AccountTag::Account(0), WorkingService::default());
    supervisor.spawn_account(AccountTag::Account(1), DeadTransport::default());
    supervisor.join().await;

    let first = std::fs::read_to_string(temp_dir.path().join("account_1.log")).unwrap();
    let second = std::fs::read_to_string(temp_dir.path().join("account_2.log")).unwrap();
    assert!(first.lines().all(|l| l.contains("[account_1]")));
    assert!(second.lines().all(|l| l.contains("[account_2]")));
    assert_eq!(first.lines().filter(|l| l.contains("Claimed task")).count(), 6);
    assert_eq!(second.lines().filter(|l| l.contains("Failed to fetch profile info")).count(), 3);
}
