use serde::Serialize;
use tracing::trace;

/// Coalesces redraw requests so at most one is pending per display refresh.
#[derive(Debug, Default)]
pub struct RedrawScheduler {
    pending: bool,
    stats: SchedulerStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub requested: u64,
    pub coalesced: u64,
    pub frames: u64,
    pub cancelled: u64,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when this call scheduled a redraw, `false` when one was
    /// already pending and the request was dropped.
    pub fn request(&mut self) -> bool {
        self.stats.requested += 1;
        if self.pending {
            self.stats.coalesced += 1;
            trace!("redraw already pending; request coalesced");
            return false;
        }
        self.pending = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending redraw at a display refresh.
    pub fn take(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;
        self.stats.frames += 1;
        true
    }

    pub fn cancel(&mut self) {
        if self.pending {
            self.pending = false;
            self.stats.cancelled += 1;
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_collapse_into_one_frame() {
        let mut scheduler = RedrawScheduler::new();
        assert!(scheduler.request());
        assert!(!scheduler.request());
        assert!(!scheduler.request());
        assert!(scheduler.take());
        assert!(!scheduler.take());

        assert!(scheduler.request());
        assert!(scheduler.take());
        assert_eq!(
            scheduler.stats(),
            SchedulerStats {
                requested: 4,
                coalesced: 2,
                frames: 2,
                cancelled: 0,
            }
        );
    }

    #[test]
    fn cancel_drops_pending_redraw() {
        let mut scheduler = RedrawScheduler::new();
        scheduler.request();
        scheduler.cancel();
        assert!(!scheduler.is_pending());
        assert!(!scheduler.take());
        assert_eq!(scheduler.stats().cancelled, 1);
    }
}
