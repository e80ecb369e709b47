//! Operator interrupt notification.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

pub type InterruptFut<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Resolves when the operator asks to cancel the run.
///
/// `wait` may be called more than once; every call must observe an
/// interrupt that already happened.
pub trait Interrupt: Send + Sync {
    fn wait(&self) -> InterruptFut<'_>;

    /// Whether an interrupt has already happened.
    fn fired(&self) -> bool;
}

/// Listen for SIGINT for the rest of the process lifetime.
///
/// The handler is registered before this returns, replacing the default
/// disposition, so the runner survives Ctrl+C long enough to clean up.
/// Must be called from inside a tokio runtime.
#[cfg(unix)]
pub fn ctrl_c() -> std::io::Result<ManualInterrupt> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let interrupt = ManualInterrupt::new();
    let handle = interrupt.handle();
    tokio::spawn(async move {
        while sigint.recv().await.is_some() {
            tracing::info!("Received interrupt");
            handle.trigger();
        }
    });
    Ok(interrupt)
}

/// Never fires.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterrupt;

impl Interrupt for NoInterrupt {
    fn wait(&self) -> InterruptFut<'_> {
        Box::pin(std::future::pending())
    }

    fn fired(&self) -> bool {
        false
    }
}

/// Fired programmatically through [`InterruptHandle::trigger`].
#[derive(Debug, Default, Clone)]
pub struct ManualInterrupt {
    inner: Arc<ManualInner>,
}

#[derive(Debug, Default)]
struct ManualInner {
    fired: AtomicBool,
    notify: Notify,
}

/// Cloneable trigger for a [`ManualInterrupt`].
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    inner: Arc<ManualInner>,
}

impl ManualInterrupt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn handle(&self) -> InterruptHandle {
        InterruptHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl InterruptHandle {
    pub fn trigger(&self) {
        self.inner.fired.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }
}

impl Interrupt for ManualInterrupt {
    fn wait(&self) -> InterruptFut<'_> {
        Box::pin(async move {
            loop {
                let notified = self.inner.notify.notified();
                if self.inner.fired.load(Ordering::SeqCst) {
                    return;
                }
                notified.await;
            }
        })
    }

    fn fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }
}
