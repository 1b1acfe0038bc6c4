use std::{future::Future, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

/// Wait used for speech triggered by a message that is still streaming in.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Runs an action once its input has been quiet for a while.
///
/// Each [`Debouncer::call`] replaces the pending input and restarts the wait. When the wait
/// elapses the action runs with the latest input, unless that input equals the one it last ran
/// with. Dropping the debouncer cancels anything pending.
#[derive(Debug)]
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: PartialEq + Clone + Send + 'static,
{
    /// Spawns the debounce task on the current tokio runtime.
    pub fn new<F, Fut>(wait: Duration, action: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx, wait, action));
        Self { tx, task }
    }

    /// Schedules `value`, replacing whatever was pending.
    pub fn call(&self, value: T) {
        // Only fails once the task is gone, i.e. while dropping.
        let _ = self.tx.send(value);
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T, F, Fut>(mut rx: mpsc::UnboundedReceiver<T>, wait: Duration, mut action: F)
where
    T: PartialEq + Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut last: Option<T> = None;
    while let Some(mut value) = rx.recv().await {
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(next) => value = next,
                    None => return,
                },
                () = tokio::time::sleep(wait) => break,
            }
        }

        if last.as_ref() == Some(&value) {
            debug!("skipping input identical to the last one processed");
            continue;
        }
        action(value.clone()).await;
        last = Some(value);
    }
}
