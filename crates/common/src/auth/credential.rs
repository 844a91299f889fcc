//! Credential cache and the blocking and cooperative refresh gates.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

/// Current credential string; empty means none obtained yet.
#[derive(Debug, Default)]
pub struct CredentialCache {
    value: RwLock<String>,
}

impl CredentialCache {
    /// Empty cache; the first request goes straight to a refresh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache seeded with a credential obtained elsewhere.
    pub fn with_value(value: impl Into<String>) -> Self {
        Self { value: RwLock::new(value.into()) }
    }

    /// Snapshot of the cached credential.
    pub fn current(&self) -> String {
        self.value.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.value.read().is_empty()
    }

    /// Replace the cached credential as a whole.
    pub fn install(&self, value: String) {
        *self.value.write() = value;
    }

    /// Credential installed since `observed` was read, if any.
    ///
    /// Only meaningful while holding the refresh gate.
    fn replaced(&self, observed: &str) -> Option<String> {
        let current = self.value.read();
        (current.as_str() != observed).then(|| current.clone())
    }
}

/// What a caller holding the permit does next.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    /// Another caller refreshed while this one waited.
    Reuse(String),
    /// The rejected credential is still cached; this caller refreshes.
    Refresh,
}

/// Refresh protocol state shared by both gates.
///
/// The gates only differ in how they wait for the permit and how they call
/// `send` and `refresh`; every decision is taken here.
#[derive(Debug, Default)]
struct RefreshCore {
    cache: CredentialCache,
    refreshes: AtomicU64,
}

impl RefreshCore {
    /// Credential for the first send; empty skips straight to the gate.
    fn observe(&self) -> String {
        self.cache.current()
    }

    /// Whether a first-send outcome can be returned as is.
    fn accepts(&self, rejected: bool) -> bool {
        if rejected {
            debug!("credential rejected, waiting for refresh gate");
        }
        !rejected
    }

    /// Decide under the permit whether to reuse or refresh.
    fn step(&self, observed: &str) -> Step {
        match self.cache.replaced(observed) {
            Some(current) => {
                debug!("credential refreshed by another caller");
                Step::Reuse(current)
            }
            None => {
                info!("refreshing credential");
                Step::Refresh
            }
        }
    }

    /// Install a refreshed credential and hand it back for the retry.
    fn refreshed(&self, fresh: String) -> String {
        self.cache.install(fresh.clone());
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        fresh
    }

    fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }
}

/// Refresh gate for callers on OS threads.
#[derive(Debug, Default)]
pub struct RefreshGate {
    core: RefreshCore,
    permit: Mutex<()>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.core.cache
    }

    /// Number of refreshes performed so far.
    pub fn refreshes(&self) -> u64 {
        self.core.refreshes()
    }

    /// Send through the refresh protocol.
    ///
    /// `send` receives the credential to attach, `rejected` recognizes an
    /// authentication failure and `refresh` obtains a new credential. The
    /// request is retried at most once.
    pub fn run<T, E, S, R, F>(&self, mut send: S, rejected: R, refresh: F) -> Result<T, E>
    where
        S: FnMut(String) -> Result<T, E>,
        R: Fn(&T) -> bool,
        F: FnOnce() -> Result<String, E>,
    {
        let observed = self.core.observe();
        if !observed.is_empty() {
            let outcome = send(observed.clone())?;
            if self.core.accepts(rejected(&outcome)) {
                return Ok(outcome);
            }
        }

        let credential = {
            let _permit = self.permit.lock();
            match self.core.step(&observed) {
                Step::Reuse(current) => current,
                Step::Refresh => self.core.refreshed(refresh()?),
            }
        };

        send(credential)
    }
}

/// Refresh gate for tokio tasks.
///
/// The permit is an async mutex so waiting callers suspend instead of
/// blocking their worker thread.
#[derive(Debug, Default)]
pub struct AsyncRefreshGate {
    core: RefreshCore,
    permit: tokio::sync::Mutex<()>,
}

impl AsyncRefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.core.cache
    }

    pub fn refreshes(&self) -> u64 {
        self.core.refreshes()
    }

    /// Cooperative twin of [`RefreshGate::run`].
    pub async fn run<T, E, S, SFut, R, F, FFut>(
        &self,
        mut send: S,
        rejected: R,
        refresh: F,
    ) -> Result<T, E>
    where
        S: FnMut(String) -> SFut,
        SFut: Future<Output = Result<T, E>>,
        R: Fn(&T) -> bool,
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<String, E>>,
    {
        let observed = self.core.observe();
        if !observed.is_empty() {
            let outcome = send(observed.clone()).await?;
            if self.core.accepts(rejected(&outcome)) {
                return Ok(outcome);
            }
        }

        let credential = {
            let _permit = self.permit.lock().await;
            match self.core.step(&observed) {
                Step::Reuse(current) => current,
                Step::Refresh => self.core.refreshed(refresh().await?),
            }
        };

        send(credential).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use super::*;

    const FRESH: &str = "Bearer fresh";
    const OK: u16 = 200;
    const UNAUTHORIZED: u16 = 401;

    fn respond(credential: &str) -> Result<u16, String> {
        Ok(if credential == FRESH { OK } else { UNAUTHORIZED })
    }

    #[test]
    fn core_refreshes_only_when_observed_credential_is_current() {
        let core = RefreshCore::default();
        core.cache.install("Bearer stale".to_string());

        assert_eq!(core.step("Bearer stale"), Step::Refresh);
        assert_eq!(core.refreshed(FRESH.to_string()), FRESH);
        assert_eq!(core.refreshes(), 1);

        // A caller that saw the stale value now reuses the fresh one.
        assert_eq!(core.step("Bearer stale"), Step::Reuse(FRESH.to_string()));
        assert_eq!(core.refreshes(), 1);
        assert!(core.accepts(false));
        assert!(!core.accepts(true));
    }

    /// Validates the fast path never takes the gate or refreshes.
    ///
    /// Assertions:
    /// - An accepted credential is sent once.
    /// - No refresh happens.
    #[test]
    fn accepted_credential_skips_refresh() {
        let gate = RefreshGate::new();
        gate.cache().install(FRESH.to_string());
        let mut sends = 0;

        let status = gate
            .run(
                |credential| {
                    sends += 1;
                    respond(&credential)
                },
                |status: &u16| *status == UNAUTHORIZED,
                || Err("refresh must not run".to_string()),
            )
            .unwrap();

        assert_eq!(status, OK);
        assert_eq!(sends, 1);
        assert_eq!(gate.refreshes(), 0);
    }

    /// Validates an empty cache goes straight to refresh.
    ///
    /// Assertions:
    /// - The first send already carries the refreshed credential.
    #[test]
    fn empty_cache_refreshes_before_first_send() {
        let gate = RefreshGate::new();
        let mut seen = Vec::new();

        let status = gate
            .run(
                |credential| {
                    seen.push(credential.clone());
                    respond(&credential)
                },
                |status: &u16| *status == UNAUTHORIZED,
                || Ok(FRESH.to_string()),
            )
            .unwrap();

        assert_eq!(status, OK);
        assert_eq!(seen, vec![FRESH.to_string()]);
        assert_eq!(gate.cache().current(), FRESH);
    }

    /// Validates a second rejection is surfaced, not looped on.
    ///
    /// Assertions:
    /// - Exactly two sends and one refresh happen.
    /// - The rejected outcome is returned to the caller.
    #[test]
    fn second_rejection_is_returned() {
        let gate = RefreshGate::new();
        gate.cache().install("Bearer stale".to_string());
        let mut sends = 0;

        let status = gate
            .run(
                |_| {
                    sends += 1;
                    Ok::<_, String>(UNAUTHORIZED)
                },
                |status: &u16| *status == UNAUTHORIZED,
                || Ok("Bearer still-bad".to_string()),
            )
            .unwrap();

        assert_eq!(status, UNAUTHORIZED);
        assert_eq!(sends, 2);
        assert_eq!(gate.refreshes(), 1);
    }

    /// Validates a failed refresh propagates and leaves the cache untouched.
    #[test]
    fn refresh_failure_propagates() {
        let gate = RefreshGate::new();
        gate.cache().install("Bearer stale".to_string());

        let result = gate.run(
            |credential| respond(&credential),
            |status: &u16| *status == UNAUTHORIZED,
            || Err("token endpoint down".to_string()),
        );

        assert_eq!(result, Err("token endpoint down".to_string()));
        assert_eq!(gate.cache().current(), "Bearer stale");
    }

    /// Validates single-flight refresh across threads.
    ///
    /// Assertions:
    /// - 10 threads rejected with a stale credential trigger one refresh.
    /// - Every thread ends with an accepted response.
    #[test]
    fn concurrent_threads_share_one_refresh() {
        let gate = Arc::new(RefreshGate::new());
        gate.cache().install("Bearer stale".to_string());
        let refresh_calls = Arc::new(AtomicU32::new(0));
        let barrier = Arc::new(Barrier::new(10));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let refresh_calls = Arc::clone(&refresh_calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    gate.run(
                        |credential| respond(&credential),
                        |status: &u16| *status == UNAUTHORIZED,
                        || {
                            refresh_calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(FRESH.to_string())
                        },
                    )
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(OK));
        }
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.refreshes(), 1);
    }

    /// Validates single-flight refresh across tokio tasks.
    ///
    /// Assertions:
    /// - 10 tasks starting from an empty cache trigger one refresh.
    /// - Every task ends with an accepted response.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tasks_share_one_refresh() {
        let gate = Arc::new(AsyncRefreshGate::new());
        let refresh_calls = Arc::new(AtomicU32::new(0));
        let barrier = Arc::new(tokio::sync::Barrier::new(10));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let refresh_calls = Arc::clone(&refresh_calls);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    gate.run(
                        |credential| async move { respond(&credential) },
                        |status: &u16| *status == UNAUTHORIZED,
                        move || async move {
                            refresh_calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(FRESH.to_string())
                        },
                    )
                    .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(OK));
        }
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.refreshes(), 1);
    }
}
