//! Attempt counters, the interrupt flag and the per-session winner state.

use crate::registry::Capable;
use flicker_core::{OpenCapability, OpenSubtitlesCapability};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Which attempt counter a snapshot was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpochKind {
    /// Advances on every open attempt.
    Open,
    /// Advances on every open attempt and every item switch.
    Item,
}

/// Shared cancellation state of one handler.
///
/// Everything is atomic so a UI thread can cancel while the session thread
/// dispatches. Counters only ever grow.
#[derive(Debug, Default)]
pub struct SessionGuard {
    open_epoch: AtomicU64,
    item_epoch: AtomicU64,
    interrupt: AtomicBool,
    released: AtomicBool,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, kind: EpochKind) -> &AtomicU64 {
        match kind {
            EpochKind::Open => &self.open_epoch,
            EpochKind::Item => &self.item_epoch,
        }
    }

    pub fn snapshot(&self, kind: EpochKind) -> u64 {
        self.counter(kind).load(Ordering::SeqCst)
    }

    pub fn snapshot_open_epoch(&self) -> u64 {
        self.snapshot(EpochKind::Open)
    }

    pub fn snapshot_item_epoch(&self) -> u64 {
        self.snapshot(EpochKind::Item)
    }

    /// An open attempt supersedes both open- and item-level work.
    pub fn bump_open(&self) {
        self.open_epoch.fetch_add(1, Ordering::SeqCst);
        self.item_epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn bump_item_switch(&self) {
        self.item_epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_stale(&self, snapshot: u64, kind: EpochKind) -> bool {
        self.snapshot(kind) != snapshot
    }

    pub fn set_interrupt(&self, interrupt: bool) {
        self.interrupt.store(interrupt, Ordering::SeqCst);
    }

    pub fn interrupt(&self) {
        self.set_interrupt(true);
    }

    pub fn clear_interrupt(&self) {
        self.set_interrupt(false);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Marks the providers as released. Returns false if they already were.
    pub fn release(&self) -> bool {
        !self.released.swap(true, Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Captures the current value of `kind` for a dispatch that starts now.
    pub fn token(self: &Arc<Self>, kind: EpochKind) -> CancelToken {
        CancelToken {
            epoch: self.snapshot(kind),
            guard: Arc::clone(self),
            kind,
        }
    }
}

/// Epoch snapshot plus the shared interrupt flag, checked as one predicate.
#[derive(Debug, Clone)]
pub struct CancelToken {
    guard: Arc<SessionGuard>,
    kind: EpochKind,
    epoch: u64,
}

impl CancelToken {
    pub fn kind(&self) -> EpochKind {
        self.kind
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True once a newer attempt bumped the counter this token was taken from.
    pub fn is_superseded(&self) -> bool {
        self.guard.is_stale(self.epoch, self.kind)
    }

    /// Interrupted, superseded, or the providers were already released.
    pub fn is_cancelled(&self) -> bool {
        self.guard.is_interrupted() || self.guard.is_released() || self.is_superseded()
    }
}

/// Which providers won the open dispatches of the current attempt.
///
/// Owned by the caller and threaded through `open`/`open_item`; the lifecycle
/// events clear it. Winners belong to the handler that wrote them; another
/// handler sees an empty session.
#[derive(Clone, Default)]
pub struct Session {
    handler: Option<u64>,
    pub(crate) opened: Option<Capable<dyn OpenCapability>>,
    pub(crate) opened_subtitles: Option<Capable<dyn OpenSubtitlesCapability>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the handler whose winners this session holds.
    pub fn handler(&self) -> Option<u64> {
        self.handler
    }

    /// Takes the session over for `handler`, dropping winners of any other.
    pub(crate) fn claim(&mut self, handler: u64) {
        if self.handler != Some(handler) {
            self.clear();
            self.handler = Some(handler);
        }
    }

    pub(crate) fn opened_by(&self, handler: u64) -> Option<&Capable<dyn OpenCapability>> {
        self.opened.as_ref().filter(|_| self.handler == Some(handler))
    }

    pub fn opened_provider(&self) -> Option<&str> {
        self.opened.as_ref().map(|winner| winner.name())
    }

    pub fn opened_subtitles_provider(&self) -> Option<&str> {
        self.opened_subtitles.as_ref().map(|winner| winner.name())
    }

    pub fn clear(&mut self) {
        self.handler = None;
        self.opened = None;
        self.opened_subtitles = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("handler", &self.handler)
            .field("opened", &self.opened_provider())
            .field("opened_subtitles", &self.opened_subtitles_provider())
            .finish()
    }
}
