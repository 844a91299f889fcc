//! Integration tests for the auth module
//!
//! Drives the refresh gates with many concurrent callers against a fake
//! server that accepts only the freshly issued credential.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use cloudsdk_common::auth::{AsyncRefreshGate, RefreshGate};

const CALLERS: usize = 10;

/// Fake server: accepts the current credential, rejects anything else.
#[derive(Default)]
struct FakeServer {
    issued: AtomicU32,
    sends: AtomicU32,
}

impl FakeServer {
    fn credential(generation: u32) -> String {
        format!("Bearer token-{generation}")
    }

    fn send(&self, credential: &str) -> Result<u16, String> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let current = Self::credential(self.issued.load(Ordering::SeqCst));
        Ok(if credential == current { 200 } else { 401 })
    }

    fn issue(&self) -> String {
        Self::credential(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Validates single-flight refresh for threads.
///
/// # Test Steps
/// 1. Cache a credential the server no longer accepts
/// 2. Release 10 threads at once through the gate
/// 3. Verify one refresh and 10 accepted responses
#[test]
fn test_threads_share_one_refresh() {
    let server = Arc::new(FakeServer::default());
    let gate = Arc::new(RefreshGate::new());
    gate.cache().install("Bearer expired".to_string());
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let (server, gate, barrier) =
                (Arc::clone(&server), Arc::clone(&gate), Arc::clone(&barrier));
            thread::spawn(move || {
                barrier.wait();
                gate.run(
                    |credential| server.send(&credential),
                    |status: &u16| *status == 401,
                    || {
                        thread::sleep(Duration::from_millis(20));
                        Ok(server.issue())
                    },
                )
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(200));
    }
    assert_eq!(server.issued.load(Ordering::SeqCst), 1);
    assert_eq!(gate.refreshes(), 1);
    assert_eq!(gate.cache().current(), FakeServer::credential(1));
}

/// Validates single-flight refresh for tokio tasks.
///
/// # Test Steps
/// 1. Start from an empty cache
/// 2. Spawn 10 tasks on a multi-thread runtime
/// 3. Verify one refresh and 10 accepted responses
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tasks_share_one_refresh() {
    let server = Arc::new(FakeServer::default());
    let gate = Arc::new(AsyncRefreshGate::new());

    let tasks: Vec<_> = (0..CALLERS)
        .map(|_| {
            let (server, gate) = (Arc::clone(&server), Arc::clone(&gate));
            tokio::spawn(async move {
                gate.run(
                    |credential| {
                        let server = Arc::clone(&server);
                        async move { server.send(&credential) }
                    },
                    |status: &u16| *status == 401,
                    || {
                        let server = Arc::clone(&server);
                        async move {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(server.issue())
                        }
                    },
                )
                .await
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), Ok(200));
    }
    assert_eq!(server.issued.load(Ordering::SeqCst), 1);
    assert_eq!(gate.refreshes(), 1);
}

/// Validates accepted traffic never waits on a refresh in progress.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_accepted_traffic_bypasses_the_gate() {
    let gate = Arc::new(AsyncRefreshGate::new());
    gate.cache().install("Bearer good".to_string());

    let stuck = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            gate.run(
                |_| async { Ok::<_, String>(401) },
                |status: &u16| *status == 401,
                || async {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Ok("Bearer next".to_string())
                },
            )
            .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fast = tokio::time::timeout(
        Duration::from_millis(100),
        gate.run(
            |_| async { Ok::<_, String>(200) },
            |status: &u16| *status == 401,
            || async { Err("no refresh expected".to_string()) },
        ),
    )
    .await;

    assert_eq!(fast.unwrap(), Ok(200));
    assert_eq!(stuck.await.unwrap(), Ok(401));
}
