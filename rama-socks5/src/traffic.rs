//! Traffic accounting (§3 `TrafficCounters`, §9 "callback into UI").

use std::sync::Arc;

use parking_lot::Mutex;

/// The injected "traffic UI" capability (§6): called after every accounting
/// update with the new running totals.
///
/// The contract is non-blocking: the counters' mutex is held across the
/// call (see [`TrafficCounters`]), so a blocking observer would stall every
/// worker touching traffic accounting.
pub trait TrafficObserver: Send + Sync {
    fn report_traffic(&self, upload_total: u64, download_total: u64);
}

impl<F> TrafficObserver for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn report_traffic(&self, upload_total: u64, download_total: u64) {
        self(upload_total, download_total)
    }
}

struct Inner {
    upload: u64,
    download: u64,
    observer: Option<Arc<dyn TrafficObserver>>,
}

/// Two monotonically non-decreasing counters, updated under a single mutex
/// so that a reported total is always internally consistent.
pub struct TrafficCounters {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for TrafficCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TrafficCounters")
            .field("upload", &inner.upload)
            .field("download", &inner.download)
            .finish()
    }
}

impl Default for TrafficCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficCounters {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                upload: 0,
                download: 0,
                observer: None,
            }),
        }
    }

    #[must_use]
    pub fn with_observer(observer: impl TrafficObserver + 'static) -> Self {
        Self {
            inner: Mutex::new(Inner {
                upload: 0,
                download: 0,
                observer: Some(Arc::new(observer)),
            }),
        }
    }

    /// Credit `n` bytes read from the client to upload.
    pub fn add_upload(&self, n: u64) {
        self.add(n, 0);
    }

    /// Credit `n` bytes read from the target to download.
    pub fn add_download(&self, n: u64) {
        self.add(0, n);
    }

    fn add(&self, upload: u64, download: u64) {
        let mut inner = self.inner.lock();
        inner.upload += upload;
        inner.download += download;
        if let Some(observer) = inner.observer.clone() {
            observer.report_traffic(inner.upload, inner.download);
        }
    }

    /// The current `(upload, download)` totals.
    #[must_use]
    pub fn snapshot(&self) -> (u64, u64) {
        let inner = self.inner.lock();
        (inner.upload, inner.download)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn counters_start_at_zero() {
        let counters = TrafficCounters::new();
        assert_eq!(counters.snapshot(), (0, 0));
    }

    #[test]
    fn counters_are_monotonically_non_decreasing() {
        let counters = TrafficCounters::new();
        counters.add_upload(10);
        counters.add_download(3);
        counters.add_upload(5);
        assert_eq!(counters.snapshot(), (15, 3));
    }

    #[test]
    fn observer_sees_running_totals() {
        let last_upload = Arc::new(AtomicU64::new(0));
        let last_upload2 = last_upload.clone();
        let counters = TrafficCounters::with_observer(move |up: u64, _down: u64| {
            last_upload2.store(up, Ordering::SeqCst);
        });
        counters.add_upload(42);
        assert_eq!(last_upload.load(Ordering::SeqCst), 42);
    }
}
