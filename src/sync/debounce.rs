//! Debounced push of the learning document
//!
//! Bursts of local writes collapse into one push: every write replaces the pending
//! snapshot and restarts the quiet-period timer. A push already in flight is never
//! aborted; a write that arrives during it schedules the next one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use super::{SyncNotifier, SyncTarget};
use crate::storage::LearningData;

/// Messages to control the debounced sync task
#[derive(Debug)]
enum DebounceMessage {
    /// A new document was saved; replaces any pending snapshot and restarts the timer
    Changed(Box<LearningData>),
    /// Push the pending snapshot now
    Flush(oneshot::Sender<()>),
    /// Push the pending snapshot, then stop
    Shutdown(oneshot::Sender<()>),
}

/// Handle for the debounced sync task
///
/// Local writes call [`SyncNotifier::notify`]; once no write has happened for the
/// configured delay, the latest snapshot is pushed to the target exactly once.
pub struct SyncDebouncer {
    sender: mpsc::UnboundedSender<DebounceMessage>,
}

impl SyncDebouncer {
    /// Push any pending snapshot immediately and wait for the push to finish
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(DebounceMessage::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Flush and stop the task
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(DebounceMessage::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

impl SyncNotifier for SyncDebouncer {
    fn notify(&self, data: &LearningData) {
        if self
            .sender
            .send(DebounceMessage::Changed(Box::new(data.clone())))
            .is_err()
        {
            log::debug!("Sync: debouncer stopped, dropping change notification");
        }
    }
}

/// Start the debounced sync task.
///
/// Must be called from within a tokio runtime.
pub fn start_debounced_sync(target: Arc<dyn SyncTarget>, delay: Duration) -> SyncDebouncer {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        debounce_loop(target, delay, rx).await;
    });

    SyncDebouncer { sender: tx }
}

async fn push(target: &dyn SyncTarget, data: &LearningData) {
    match target.push(data).await {
        Ok(report) => {
            log::info!(
                "Sync: pushed to {} (deleted={}, created={})",
                target.name(),
                report.deleted,
                report.created,
            );
        }
        Err(e) => {
            log::error!("Sync: push to {} failed: {}", target.name(), e);
        }
    }
}

/// Main debounce loop
async fn debounce_loop(
    target: Arc<dyn SyncTarget>,
    delay: Duration,
    mut receiver: mpsc::UnboundedReceiver<DebounceMessage>,
) {
    log::debug!("Sync: debouncer started with {:?} delay", delay);

    let mut pending: Option<Box<LearningData>> = None;
    let mut deadline = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline), if pending.is_some() => {
                // A push in flight is never aborted; new changes queue behind it.
                if let Some(data) = pending.take() {
                    push(target.as_ref(), &data).await;
                }
            }

            msg = receiver.recv() => {
                match msg {
                    Some(DebounceMessage::Changed(data)) => {
                        pending = Some(data);
                        deadline = Instant::now() + delay;
                    }
                    Some(DebounceMessage::Flush(done)) => {
                        if let Some(data) = pending.take() {
                            push(target.as_ref(), &data).await;
                        }
                        let _ = done.send(());
                    }
                    Some(DebounceMessage::Shutdown(done)) => {
                        if let Some(data) = pending.take() {
                            push(target.as_ref(), &data).await;
                        }
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        if let Some(data) = pending.take() {
                            push(target.as_ref(), &data).await;
                        }
                        break;
                    }
                }
            }
        }
    }

    log::debug!("Sync: debouncer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Topic;
    use crate::sync::{SyncError, SyncReport};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTarget {
        pushes: Mutex<Vec<usize>>,
        fail: bool,
    }

    #[async_trait]
    impl SyncTarget for RecordingTarget {
        fn name(&self) -> &str {
            "recording"
        }

        async fn push(&self, data: &LearningData) -> Result<SyncReport, SyncError> {
            self.pushes.lock().unwrap().push(data.topics.len());
            if self.fail {
                return Err(SyncError::NotConfigured("always fails".into()));
            }
            Ok(SyncReport {
                deleted: 0,
                created: data.topics.len(),
            })
        }
    }

    fn snapshot(topics: usize) -> LearningData {
        let mut data = LearningData::default();
        for i in 0..topics {
            data.topics.push(Topic::new(format!("topic {}", i), String::new()));
        }
        data
    }

    fn pushes(target: &RecordingTarget) -> Vec<usize> {
        target.pushes.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_push() {
        let target = Arc::new(RecordingTarget::default());
        let debouncer = start_debounced_sync(target.clone(), Duration::from_secs(5));

        debouncer.notify(&snapshot(1));
        debouncer.notify(&snapshot(2));
        debouncer.notify(&snapshot(3));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(pushes(&target), vec![3]);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(pushes(&target), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_write_resets_the_timer() {
        let target = Arc::new(RecordingTarget::default());
        let debouncer = start_debounced_sync(target.clone(), Duration::from_secs(5));

        debouncer.notify(&snapshot(1));
        tokio::time::sleep(Duration::from_secs(3)).await;
        debouncer.notify(&snapshot(2));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(pushes(&target).is_empty());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(pushes(&target), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_pushes_immediately() {
        let target = Arc::new(RecordingTarget::default());
        let debouncer = start_debounced_sync(target.clone(), Duration::from_secs(5));

        debouncer.flush().await;
        assert!(pushes(&target).is_empty());

        debouncer.notify(&snapshot(4));
        debouncer.flush().await;
        assert_eq!(pushes(&target), vec![4]);

        debouncer.shutdown().await;
        debouncer.notify(&snapshot(5));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(pushes(&target), vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_push_is_not_retried() {
        let target = Arc::new(RecordingTarget {
            fail: true,
            ..Default::default()
        });
        let debouncer = start_debounced_sync(target.clone(), Duration::from_secs(5));

        debouncer.notify(&snapshot(1));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(pushes(&target), vec![1]);
    }
}
