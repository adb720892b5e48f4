//! Overlay session lifecycle: polling tick, document hooks, teardown.
//!
//! # Responsibility
//! - Own the per-session state: store, renderer, controller, watcher.
//! - Poll the host transform every tick; resync visuals only on change.
//! - Intercept the host document save/load lifecycle.
//!
//! # Invariants
//! - The tick skips all work when no notes exist.
//! - Startup polls host readiness within a bounded retry budget, then gives
//!   up silently; nothing propagates a failure into the host.
//! - Restore always clears the previous note set first, and is deferred
//!   until the rendering surface is confirmed ready after a load.
//! - Teardown releases every visual and wiring exactly once.

use crate::interact::controller::InteractionController;
use crate::interact::events::InputEvent;
use crate::model::geometry::ViewPoint;
use crate::model::note::NoteId;
use crate::persist::{self, NoteRecord};
use crate::render::overlay::{OverlayRenderer, OverlaySurface};
use crate::store::note_store::{NoteDraft, NoteStore};
use crate::transform::{TransformProvider, TransformWatcher};
use log::{debug, info, warn};
use serde_json::{Map, Value};

/// Ticks the session keeps polling for host readiness before giving up.
pub const STARTUP_RETRY_BUDGET: u32 = 120;

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    /// Waiting for the host transform and rendering surface.
    Starting { retries_left: u32 },
    Running,
    /// Retry budget exhausted; the subsystem stays inert.
    Failed,
}

/// One overlay session over a host canvas.
///
/// Constructed once when the host document opens the overlay, torn down
/// with it. The process-wide singletons (store, selection, clipboard,
/// creation flag) all live here as per-session state.
pub struct OverlaySession<P: TransformProvider, S: OverlaySurface> {
    provider: P,
    store: NoteStore,
    renderer: OverlayRenderer<S>,
    controller: InteractionController,
    watcher: TransformWatcher,
    phase: SessionPhase,
    pending_restore: Option<(Vec<NoteRecord>, u32)>,
}

impl<P: TransformProvider, S: OverlaySurface> OverlaySession<P, S> {
    pub fn new(provider: P, surface: S) -> Self {
        debug!("event=session_new module=session status=ok");
        Self {
            provider,
            store: NoteStore::new(),
            renderer: OverlayRenderer::new(surface),
            controller: InteractionController::new(),
            watcher: TransformWatcher::new(),
            phase: SessionPhase::Starting {
                retries_left: STARTUP_RETRY_BUDGET,
            },
            pending_restore: None,
        }
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn renderer(&self) -> &OverlayRenderer<S> {
        &self.renderer
    }

    /// Mutable renderer access for host glue that owns the surface state.
    pub fn renderer_mut(&mut self) -> &mut OverlayRenderer<S> {
        &mut self.renderer
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn is_failed(&self) -> bool {
        self.phase == SessionPhase::Failed
    }

    /// Updates the view-space center used as the paste anchor.
    pub fn set_view_center(&mut self, center: ViewPoint) {
        self.controller.set_view_center(center);
    }

    /// Routes one host input event through the interaction controller.
    ///
    /// Dropped while the host transform is unavailable; placement math
    /// would be meaningless without it.
    pub fn handle_input(&mut self, event: InputEvent) {
        let Some(transform) = self.provider.current() else {
            return;
        };
        self.controller
            .handle_event(event, &mut self.store, &mut self.renderer, transform);
    }

    /// Creates a note programmatically, the host's menu-command path.
    ///
    /// Returns `None` while the host transform is unavailable.
    pub fn create_note(&mut self, draft: NoteDraft) -> Option<NoteId> {
        let transform = self.provider.current()?;
        Some(
            self.controller
                .spawn_note(draft, &mut self.store, &mut self.renderer, transform),
        )
    }

    /// One scheduled recurrence, aligned by the host glue to its frame or
    /// timer callback.
    pub fn tick(&mut self) {
        match self.phase {
            SessionPhase::Failed => {}
            SessionPhase::Starting { retries_left } => {
                if self.provider.current().is_some() && self.renderer.is_ready() {
                    self.phase = SessionPhase::Running;
                    self.watcher.reset();
                    info!("event=overlay_ready module=session status=ok");
                    self.running_tick();
                } else if retries_left == 0 {
                    self.phase = SessionPhase::Failed;
                    warn!("event=overlay_start module=session status=error reason=host_unavailable");
                } else {
                    self.phase = SessionPhase::Starting {
                        retries_left: retries_left - 1,
                    };
                }
            }
            SessionPhase::Running => self.running_tick(),
        }
    }

    fn running_tick(&mut self) {
        let Some(transform) = self.provider.current() else {
            return;
        };
        self.controller
            .flush_pending_commit(&mut self.store, &mut self.renderer, transform);
        self.apply_pending_restore();
        if self.store.is_empty() {
            return;
        }
        if self.watcher.observe(transform) {
            self.renderer.sync_all(&self.store, transform);
        }
    }

    /// Host hook: a document load is about to replace the current one.
    pub fn document_will_load(&mut self) {
        self.clear_all();
    }

    /// Host hook: the document finished loading. Notes are restored on a
    /// later tick, once the rendering surface is confirmed ready.
    ///
    /// Absent/empty reserved key: silently nothing to restore.
    pub fn document_loaded(&mut self, extra: &Map<String, Value>) {
        self.pending_restore = persist::read_slot(extra)
            .map(|records| (records, STARTUP_RETRY_BUDGET));
    }

    /// Host hook: the document is being saved. Writes the note projection
    /// under the reserved key, leaving sibling keys untouched.
    pub fn document_saving(&self, extra: &mut Map<String, Value>) {
        persist::write_slot(extra, &persist::serialize(&self.store));
    }

    fn apply_pending_restore(&mut self) {
        let Some((records, retries_left)) = self.pending_restore.take() else {
            return;
        };
        if !self.renderer.is_ready() {
            if retries_left == 0 {
                warn!(
                    "event=notes_restore module=session status=error reason=surface_unavailable dropped={}",
                    records.len()
                );
                return;
            }
            self.pending_restore = Some((records, retries_left - 1));
            return;
        }

        // Stale notes from the previous document must never survive a load.
        self.clear_all();
        let Some(transform) = self.provider.current() else {
            self.pending_restore = Some((records, retries_left));
            return;
        };
        let created = persist::deserialize(&mut self.store, &records);
        for id in &created {
            self.controller.register(*id);
        }
        self.renderer.sync_all(&self.store, transform);
        self.watcher.reset();
        info!(
            "event=notes_restore module=session status=ok count={}",
            created.len()
        );
    }

    fn clear_all(&mut self) {
        self.store.clear();
        self.controller.release_all();
        self.renderer.destroy_all();
    }

    /// Tears the session down, releasing every visual and wiring.
    pub fn teardown(&mut self) {
        self.clear_all();
        self.pending_restore = None;
        debug!("event=session_teardown module=session status=ok");
    }
}
