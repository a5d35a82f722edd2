use std::future::Future;
use std::sync::Mutex;
use tokio::task::JoinHandle;

/// Registry of in-flight background writes. Telemetry writes (time-taken on
/// navigation) are abortable; answer saves are critical and are awaited on
/// shutdown so a "leaving with unsaved work" guard can be built on top.
#[derive(Default)]
pub struct PendingWrites {
    telemetry: Mutex<Vec<JoinHandle<()>>>,
    critical: Mutex<Vec<JoinHandle<()>>>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_telemetry<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handles = self.telemetry.lock().unwrap();
        handles.retain(|h| !h.is_finished());
        handles.push(tokio::spawn(fut));
    }

    pub fn spawn_critical<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handles = self.critical.lock().unwrap();
        handles.retain(|h| !h.is_finished());
        handles.push(tokio::spawn(fut));
    }

    pub fn has_critical_in_flight(&self) -> bool {
        self.critical
            .lock()
            .unwrap()
            .iter()
            .any(|h| !h.is_finished())
    }

    /// Abort telemetry, await critical writes.
    pub async fn shutdown(&self) {
        for handle in self.telemetry.lock().unwrap().drain(..) {
            handle.abort();
        }
        let critical: Vec<_> = self.critical.lock().unwrap().drain(..).collect();
        for handle in critical {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!("Pending write panicked during shutdown: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_awaits_critical_writes() {
        let pending = PendingWrites::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        pending.spawn_critical(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
        });
        assert!(pending.has_critical_in_flight());
        pending.shutdown().await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_aborts_telemetry_writes() {
        let pending = PendingWrites::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        pending.spawn_telemetry(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            flag.store(true, Ordering::SeqCst);
        });
        pending.shutdown().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!done.load(Ordering::SeqCst));
    }
}
