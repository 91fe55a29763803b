//! Cross-thread execution bridge.
//!
//! A [`Bridge`] owns one named background thread driving a single-threaded
//! tokio runtime. Ordinary blocking code hands it async units through
//! [`Bridge::submit`] and waits for the result, so callers never need to
//! own a runtime of their own. All sessions built with the same handle
//! share this one scheduler.
//!
//! The host application owns the lifecycle: [`Bridge::start`] spawns the
//! thread, [`Bridge::shutdown`] stops and joins it. Dropping the last handle
//! stops the thread without joining.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::thread::{JoinHandle, ThreadId};

use tokio::sync::oneshot;

use crate::error::FetchError;

/// Default name of the scheduler thread.
pub const DEFAULT_THREAD_NAME: &str = "vantage-bridge";

/// Cheaply cloneable handle to the shared scheduler.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    runtime: tokio::runtime::Handle,
    thread_id: ThreadId,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Bridge {
    /// Start a scheduler on a thread named [`DEFAULT_THREAD_NAME`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Bridge`] if the thread or runtime cannot be created.
    pub fn start() -> Result<Self, FetchError> {
        Self::start_named(DEFAULT_THREAD_NAME)
    }

    /// Start a scheduler on a thread with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Bridge`] if the thread or runtime cannot be created.
    pub fn start_named(name: &str) -> Result<Self, FetchError> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(runtime.handle().clone()));
                runtime.block_on(async {
                    let _ = stop_rx.await;
                });
                tracing::debug!("bridge scheduler stopped");
            })
            .map_err(|e| FetchError::Bridge(format!("failed to spawn scheduler thread: {e}")))?;

        let runtime = ready_rx
            .recv()
            .map_err(|_| FetchError::Bridge("scheduler thread exited during startup".into()))?
            .map_err(|e| FetchError::Bridge(format!("failed to build scheduler runtime: {e}")))?;

        tracing::debug!(thread = name, "bridge scheduler started");

        Ok(Self {
            inner: Arc::new(BridgeInner {
                runtime,
                thread_id: thread.thread().id(),
                stop_tx: Mutex::new(Some(stop_tx)),
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    /// Whether the scheduler is still accepting work.
    pub fn is_running(&self) -> bool {
        self.inner
            .stop_tx
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|tx| !tx.is_closed()))
            .unwrap_or(false)
    }

    /// Run `unit` on the scheduler and block the calling thread until it finishes.
    ///
    /// The unit's own error is returned unchanged.
    ///
    /// Must not be called from the scheduler thread itself (that would wait
    /// on work only this thread can drive). From other async code, prefer
    /// awaiting the unit directly over blocking a worker.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Bridge`] if the scheduler has stopped, if called
    /// from the scheduler thread, or if the unit panicked or was dropped
    /// before completing.
    pub fn submit<F, T>(&self, unit: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
        T: Send + 'static,
    {
        if std::thread::current().id() == self.inner.thread_id {
            return Err(FetchError::Bridge(
                "submit called from the scheduler thread; await the unit instead".into(),
            ));
        }
        if !self.is_running() {
            return Err(FetchError::Bridge("scheduler is not running".into()));
        }

        let (result_tx, result_rx) = std::sync::mpsc::sync_channel(1);
        self.inner.runtime.spawn(async move {
            let _ = result_tx.send(unit.await);
        });

        result_rx.recv().map_err(|_| {
            FetchError::Bridge("unit did not complete (panicked or scheduler stopped)".into())
        })?
    }

    /// Stop the scheduler and wait for its thread to exit.
    ///
    /// Units still in flight are dropped. Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        self.inner.signal_stop();
        if std::thread::current().id() == self.inner.thread_id {
            return;
        }
        let thread = self.inner.thread.lock().ok().and_then(|mut t| t.take());
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::warn!("bridge scheduler thread panicked");
            }
        }
    }
}

impl BridgeInner {
    fn signal_stop(&self) {
        let stop = self.stop_tx.lock().ok().and_then(|mut tx| tx.take());
        if let Some(stop) = stop {
            let _ = stop.send(());
        }
    }
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
