//! Host-provided execution environment.
//!
//! The engine runs a whole test loop inside an injected `Sandbox` capability:
//! a bounded-time execution context that may run the work on a worker thread
//! and forcibly abandon it on timeout. Cooperative cancellation is not
//! assumed; an abandoned worker keeps running detached while the run is
//! reported as timed out, which is why the step list lives behind a mutex
//! shared with the worker.
//!
//! `StaticStateGuard` is the scoped mutation guard around reference-side
//! global state: snapshot on acquire, restore on drop, on every exit path.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::handle::ImplementationHandle;
use crate::value::Value;

/// Isolated execution capability. Returns `true` iff the work completed
/// within the limit.
pub trait Sandbox: Send + Sync {
    fn run(&self, time_limit: Option<Duration>, work: Box<dyn FnOnce() + Send + 'static>) -> bool;
}

/// Runs work inline with no isolation and no time limit. The default for
/// trusted callers and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineSandbox;

impl Sandbox for InlineSandbox {
    fn run(&self, _time_limit: Option<Duration>, work: Box<dyn FnOnce() + Send + 'static>) -> bool {
        work();
        true
    }
}

/// Runs work on a worker thread and abandons it when the limit elapses. The
/// abandoned thread is detached, not interrupted; the host process must
/// tolerate it running to completion in the background.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSandbox;

impl Sandbox for ThreadSandbox {
    fn run(&self, time_limit: Option<Duration>, work: Box<dyn FnOnce() + Send + 'static>) -> bool {
        let Some(limit) = time_limit else {
            work();
            return true;
        };

        let (done_tx, done_rx) = mpsc::channel::<()>();
        thread::spawn(move || {
            work();
            let _ = done_tx.send(());
        });
        match done_rx.recv_timeout(limit) {
            Ok(()) => true,
            // A dropped sender means the worker ended without reporting;
            // the work is no longer running, so the limit was respected.
            Err(mpsc::RecvTimeoutError::Disconnected) => true,
            Err(mpsc::RecvTimeoutError::Timeout) => false,
        }
    }
}

/// The environment one run executes in.
#[derive(Clone)]
pub struct TestEnvironment {
    pub sandbox: Arc<dyn Sandbox>,
}

impl TestEnvironment {
    /// Inline execution, no isolation. Mirrors running trusted code directly.
    pub fn unsecured() -> Self {
        Self {
            sandbox: Arc::new(InlineSandbox),
        }
    }

    /// Worker-thread execution with abandon-on-timeout.
    pub fn threaded() -> Self {
        Self {
            sandbox: Arc::new(ThreadSandbox),
        }
    }

    pub fn with_sandbox(sandbox: Arc<dyn Sandbox>) -> Self {
        Self { sandbox }
    }
}

/// Scoped snapshot of an implementation's mutable static state. Restores the
/// snapshot when dropped so repeated runs against different candidates stay
/// independent even when a run mutated reference-side globals.
pub struct StaticStateGuard<'a> {
    handle: &'a ImplementationHandle,
    snapshot: Option<BTreeMap<String, Value>>,
}

impl<'a> StaticStateGuard<'a> {
    pub fn acquire(handle: &'a ImplementationHandle) -> Self {
        Self {
            snapshot: Some(handle.snapshot_statics()),
            handle,
        }
    }
}

impl Drop for StaticStateGuard<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.handle.restore_statics(snapshot);
        }
    }
}
