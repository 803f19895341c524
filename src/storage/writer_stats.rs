use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the writer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Writers ever opened.
    pub opened: u64,
    /// Writers currently holding an open disk handle.
    pub active: u64,
    /// Writers closed or dropped.
    pub closed: u64,
}

#[derive(Debug, Default)]
pub struct WriterCounters {
    opened: AtomicU64,
    active: AtomicU64,
    closed: AtomicU64,
}

impl WriterCounters {
    pub fn on_open(&self) {
        self.opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_activate(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_deactivate(&self) {
        let prev = self.active.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(prev > 0, "active writer count underflow");
    }

    pub fn on_close(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WriterStats {
        WriterStats {
            opened: self.opened.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
        }
    }
}
