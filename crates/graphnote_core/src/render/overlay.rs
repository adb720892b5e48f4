//! Overlay visuals kept in lock-step with the note store and transform.
//!
//! # Responsibility
//! - Maintain one positioned, sized, styled visual per live note.
//! - Reconcile visuals against store content after bulk operations.
//! - Isolate the host rendering surface behind a narrow trait.
//!
//! # Invariants
//! - A visual exists exactly while its note is live; detach happens once.
//! - Placement multiplies world coordinates through the live transform, so
//!   visuals pan and zoom in lock-step with the host canvas.
//! - Size is communicated as intrinsic box dimensions plus a uniform scale
//!   factor, keeping content reflow stable during continuous zoom.
//! - Surface failures are absorbed and logged, never propagated to the host.

use crate::model::geometry::ViewPoint;
use crate::model::note::{InteractionState, Note, NoteId, PaletteColor};
use crate::render::markdown;
use crate::store::note_store::NoteStore;
use crate::transform::ViewTransform;
use log::warn;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Failure reported by a host surface implementation.
#[derive(Debug)]
pub enum SurfaceError {
    /// The host rendering surface is not available yet.
    NotReady,
    /// The handle does not reference an attached visual.
    UnknownHandle(SurfaceHandle),
    /// Backend-specific failure, carried as text.
    Backend(String),
}

impl Display for SurfaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotReady => write!(f, "overlay surface not ready"),
            Self::UnknownHandle(handle) => write!(f, "unknown visual handle: {}", handle.0),
            Self::Backend(message) => write!(f, "surface backend failure: {message}"),
        }
    }
}

impl Error for SurfaceError {}

/// Opaque identifier for one attached visual on the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u64);

/// View-space placement for one visual.
///
/// `width`/`height` stay in intrinsic world units; the surface applies
/// `scale` uniformly on top instead of recomputing box dimensions per zoom
/// level.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualFrame {
    pub origin: ViewPoint,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub color: PaletteColor,
    pub selected: bool,
}

/// Content shown inside one visual.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteContent {
    /// Rendered markup for view mode.
    View { markup: String },
    /// Raw source for edit mode; the surface auto-selects the full text
    /// when entering it.
    Edit { source: String },
}

/// Host seam for the overlay surface.
///
/// Implemented by host glue; the attached visual carries the header, resize
/// handle, palette picker and close control, which the glue reports back as
/// input events.
pub trait OverlaySurface {
    /// Whether the host rendering surface can accept visuals right now.
    fn is_ready(&self) -> bool;
    fn attach(&mut self, note_id: NoteId) -> SurfaceResult<SurfaceHandle>;
    fn place(&mut self, handle: SurfaceHandle, frame: &VisualFrame) -> SurfaceResult<()>;
    fn present(&mut self, handle: SurfaceHandle, content: &NoteContent) -> SurfaceResult<()>;
    fn detach(&mut self, handle: SurfaceHandle) -> SurfaceResult<()>;
}

/// Keeps host-surface visuals matching store content and the live transform.
pub struct OverlayRenderer<S: OverlaySurface> {
    surface: S,
    visuals: BTreeMap<NoteId, SurfaceHandle>,
    /// Live drag override: the gesture's current view-space origin, applied
    /// instead of the transformed world position until the drag ends.
    view_overrides: BTreeMap<NoteId, ViewPoint>,
}

impl<S: OverlaySurface> OverlayRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            visuals: BTreeMap::new(),
            view_overrides: BTreeMap::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn is_ready(&self) -> bool {
        self.surface.is_ready()
    }

    /// Returns whether a visual is currently attached for the note.
    pub fn has_visual(&self, id: NoteId) -> bool {
        self.visuals.contains_key(&id)
    }

    /// Creates the visual for a freshly created or restored note and issues
    /// its initial frame and content.
    pub fn materialize(&mut self, note: &Note, transform: ViewTransform) {
        if self.visuals.contains_key(&note.id) {
            return;
        }
        match self.surface.attach(note.id) {
            Ok(handle) => {
                self.visuals.insert(note.id, handle);
                self.sync(note, transform);
                self.refresh_content(note);
            }
            Err(err) => {
                warn!(
                    "event=visual_attach module=overlay status=error note_id={} reason={err}",
                    note.id
                );
            }
        }
    }

    /// Repositions/resizes/recolors one visual from current note state and
    /// transform. No-op when the note has no visual.
    pub fn sync(&mut self, note: &Note, transform: ViewTransform) {
        let Some(&handle) = self.visuals.get(&note.id) else {
            return;
        };
        let origin = self
            .view_overrides
            .get(&note.id)
            .copied()
            .unwrap_or_else(|| transform.to_view(note.position));
        let frame = VisualFrame {
            origin,
            width: note.size.width,
            height: note.size.height,
            scale: transform.scale,
            color: note.color,
            selected: note.state != InteractionState::Idle,
        };
        if let Err(err) = self.surface.place(handle, &frame) {
            warn!(
                "event=visual_place module=overlay status=error note_id={} reason={err}",
                note.id
            );
        }
    }

    /// Re-presents the note's content: rendered markup in view mode, raw
    /// source while editing.
    pub fn refresh_content(&mut self, note: &Note) {
        let Some(&handle) = self.visuals.get(&note.id) else {
            return;
        };
        let content = if note.is_editing() {
            NoteContent::Edit {
                source: note.text.clone(),
            }
        } else {
            NoteContent::View {
                markup: markdown::render(&note.text),
            }
        };
        if let Err(err) = self.surface.present(handle, &content) {
            warn!(
                "event=visual_present module=overlay status=error note_id={} reason={err}",
                note.id
            );
        }
    }

    /// Reconciles every visual against store content, then re-places all of
    /// them with the given transform. Invoked by the polling tick on
    /// transform change and after bulk operations.
    pub fn sync_all(&mut self, store: &NoteStore, transform: ViewTransform) {
        let stale: Vec<NoteId> = self
            .visuals
            .keys()
            .copied()
            .filter(|id| store.find(*id).is_none())
            .collect();
        for id in stale {
            self.destroy(id);
        }
        for note in store.all() {
            if self.visuals.contains_key(&note.id) {
                self.sync(note, transform);
            } else {
                self.materialize(note, transform);
            }
        }
    }

    /// Applies a live drag's current view-space origin to one visual.
    pub fn set_view_override(&mut self, id: NoteId, origin: ViewPoint) {
        self.view_overrides.insert(id, origin);
    }

    /// Drops the drag override so placement follows world position again.
    pub fn clear_view_override(&mut self, id: NoteId) {
        self.view_overrides.remove(&id);
    }

    /// Detaches and releases one visual. No-op for unknown ids; a visual is
    /// detached at most once.
    pub fn destroy(&mut self, id: NoteId) {
        self.view_overrides.remove(&id);
        if let Some(handle) = self.visuals.remove(&id) {
            if let Err(err) = self.surface.detach(handle) {
                warn!(
                    "event=visual_detach module=overlay status=error note_id={id} reason={err}"
                );
            }
        }
    }

    /// Releases every visual, used by bulk clear and session teardown.
    pub fn destroy_all(&mut self) {
        let ids: Vec<NoteId> = self.visuals.keys().copied().collect();
        for id in ids {
            self.destroy(id);
        }
    }
}

/// Record kept by [`InMemorySurface`] for one attached visual.
#[derive(Debug, Clone, Default)]
pub struct VisualRecord {
    pub frame: Option<VisualFrame>,
    pub content: Option<NoteContent>,
}

/// Reference surface implementation holding visuals in memory.
///
/// Used by tests and the smoke binary; host glue ships its own
/// implementation against the real canvas overlay.
#[derive(Debug, Default)]
pub struct InMemorySurface {
    ready: bool,
    next_handle: u64,
    place_calls: u64,
    visuals: BTreeMap<SurfaceHandle, (NoteId, VisualRecord)>,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self {
            ready: true,
            next_handle: 0,
            place_calls: 0,
            visuals: BTreeMap::new(),
        }
    }

    /// Creates a surface that reports not-ready until `set_ready(true)`.
    pub fn unready() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn attached_count(&self) -> usize {
        self.visuals.len()
    }

    /// Total `place` calls observed, for asserting resync activity.
    pub fn place_count(&self) -> u64 {
        self.place_calls
    }

    /// Returns the last frame placed for a note's visual.
    pub fn frame_of(&self, note_id: NoteId) -> Option<&VisualFrame> {
        self.record_of(note_id).and_then(|rec| rec.frame.as_ref())
    }

    /// Returns the last content presented for a note's visual.
    pub fn content_of(&self, note_id: NoteId) -> Option<&NoteContent> {
        self.record_of(note_id).and_then(|rec| rec.content.as_ref())
    }

    fn record_of(&self, note_id: NoteId) -> Option<&VisualRecord> {
        self.visuals
            .values()
            .find(|(id, _)| *id == note_id)
            .map(|(_, record)| record)
    }
}

impl OverlaySurface for InMemorySurface {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn attach(&mut self, note_id: NoteId) -> SurfaceResult<SurfaceHandle> {
        if !self.ready {
            return Err(SurfaceError::NotReady);
        }
        let handle = SurfaceHandle(self.next_handle);
        self.next_handle += 1;
        self.visuals
            .insert(handle, (note_id, VisualRecord::default()));
        Ok(handle)
    }

    fn place(&mut self, handle: SurfaceHandle, frame: &VisualFrame) -> SurfaceResult<()> {
        let (_, record) = self
            .visuals
            .get_mut(&handle)
            .ok_or(SurfaceError::UnknownHandle(handle))?;
        self.place_calls += 1;
        record.frame = Some(frame.clone());
        Ok(())
    }

    fn present(&mut self, handle: SurfaceHandle, content: &NoteContent) -> SurfaceResult<()> {
        let (_, record) = self
            .visuals
            .get_mut(&handle)
            .ok_or(SurfaceError::UnknownHandle(handle))?;
        record.content = Some(content.clone());
        Ok(())
    }

    fn detach(&mut self, handle: SurfaceHandle) -> SurfaceResult<()> {
        self.visuals
            .remove(&handle)
            .map(|_| ())
            .ok_or(SurfaceError::UnknownHandle(handle))
    }
}
