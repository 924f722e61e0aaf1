use inkfolio_core::Direction;

/// Hover timer. Holding the pointer over a zone for the delay fires that
/// zone once; leaving before then cancels it.
///
/// Edge zones fire a [`Direction`] to turn; the viewer also keys one by page
/// index to expand the image under the pointer.
#[derive(Debug, Clone)]
pub struct HoverDwell<Z = Direction> {
    delay_ms: u64,
    pending: Option<Pending<Z>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending<Z> {
    zone: Z,
    fires_at_ms: u64,
}

impl<Z: Copy + PartialEq> HoverDwell<Z> {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Arms the timer for `zone`, restarting any pending one.
    pub fn enter(&mut self, zone: Z, now_ms: u64) {
        self.pending = Some(Pending {
            zone,
            fires_at_ms: now_ms.saturating_add(self.delay_ms),
        });
    }

    pub fn leave(&mut self) {
        self.pending = None;
    }

    /// Arms the timer unless `zone` is already pending, so repeated pointer
    /// moves inside one zone do not restart it.
    pub fn hover(&mut self, zone: Z, now_ms: u64) {
        if self.pending_zone() != Some(zone) {
            self.enter(zone, now_ms);
        }
    }

    pub fn pending_zone(&self) -> Option<Z> {
        self.pending.map(|p| p.zone)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fraction of the delay elapsed, for hover feedback.
    pub fn charge(&self, now_ms: u64) -> f32 {
        let Some(pending) = self.pending else {
            return 0.0;
        };
        if self.delay_ms == 0 {
            return 1.0;
        }
        let remaining = pending.fires_at_ms.saturating_sub(now_ms);
        1.0 - (remaining as f32 / self.delay_ms as f32).clamp(0.0, 1.0)
    }

    pub fn poll(&mut self, now_ms: u64) -> Option<Z> {
        let pending = self.pending?;
        if now_ms < pending.fires_at_ms {
            return None;
        }
        self.pending = None;
        Some(pending.zone)
    }
}
