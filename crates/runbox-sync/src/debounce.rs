use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// Runs an action once input has been quiet for `delay`.
///
/// Every [`trigger`](Self::trigger) pushes the deadline back; the timer is
/// replaced, never stacked. The action is awaited before the next timer can
/// start, so two runs never overlap. Triggers that arrive while the action is
/// running start a fresh window once it settles.
#[derive(Debug)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl Debouncer {
    pub fn spawn<F, Fut>(delay: Duration, mut action: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let task = tokio::spawn(async move {
            // idle until the first trigger
            while rx.recv().await.is_some() {
                let timer = tokio::time::sleep(delay);
                tokio::pin!(timer);
                let mut closed = false;
                loop {
                    tokio::select! {
                        _ = &mut timer => break,
                        msg = rx.recv() => match msg {
                            Some(()) => {
                                trace!("debounce rearmed");
                                timer.as_mut().reset(Instant::now() + delay);
                            }
                            None => {
                                closed = true;
                                break;
                            }
                        },
                    }
                }
                action().await;
                if closed {
                    break;
                }
            }
        });
        Self { tx, task }
    }

    /// Restart the quiet window.
    pub fn trigger(&self) {
        // the task only ends once every sender is gone
        let _ = self.tx.send(());
    }

    /// Stop accepting triggers. A pending window fires immediately.
    pub async fn flush(self) {
        let Self { tx, task } = self;
        drop(tx);
        let _ = task.await;
    }
}
