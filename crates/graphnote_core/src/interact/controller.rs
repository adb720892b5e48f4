//! Interaction controller: gesture state machines and global shortcuts.
//!
//! # Responsibility
//! - Drive each note's Idle/Selected/Editing/Dragging/Resizing lifecycle.
//! - Handle document-global input: creation mode, clipboard, delete.
//! - Mutate the store first, then trigger the matching visual resync.
//!
//! # Invariants
//! - Each note's gesture state lives in its own wiring; concurrent
//!   interaction never shares mutable gesture state between notes.
//! - During a drag only the visual's view position moves; the world position
//!   is recomputed once, at release, from the final view origin.
//! - Resize deltas are divided by the current scale and clamped to the
//!   minimum dimensions before they touch the note.
//! - Cancel reverts to the pre-gesture (or pre-edit) value.
//! - Events referencing ids no longer in the store are guarded no-ops.
//! - Shortcuts are suppressed while an editable region holds input focus.

use crate::interact::events::{InputEvent, KeyInput, NoteRegion, PointerTarget};
use crate::model::geometry::{Size, ViewPoint, WorldPoint};
use crate::model::note::{
    InteractionState, Note, NoteId, PaletteColor, MIN_NOTE_HEIGHT, MIN_NOTE_WIDTH,
};
use crate::render::overlay::{OverlayRenderer, OverlaySurface};
use crate::store::note_store::{NoteDraft, NoteStore};
use crate::transform::ViewTransform;
use log::debug;
use std::collections::BTreeMap;

/// World-space displacement applied between a duplicated note and its
/// source.
pub const DUPLICATE_OFFSET: (f64, f64) = (24.0, 24.0);

/// Clipboard payload: everything about a note except identity and position.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSnapshot {
    pub size: Size,
    pub text: String,
    pub color: PaletteColor,
}

impl NoteSnapshot {
    fn of(note: &Note) -> Self {
        Self {
            size: note.size,
            text: note.text.clone(),
            color: note.color,
        }
    }
}

/// Per-note gesture state machine.
#[derive(Debug, Clone, PartialEq, Default)]
enum GestureState {
    #[default]
    Idle,
    /// Header pointer-down seen; promotes to `Dragging` on first movement.
    ArmedDrag {
        pointer_start: ViewPoint,
        origin_view: ViewPoint,
    },
    Dragging {
        pointer_start: ViewPoint,
        origin_view: ViewPoint,
    },
    Resizing {
        pointer_start: ViewPoint,
        origin_size: Size,
    },
}

/// Interaction wiring owned by exactly one note, acquired at materialization
/// and released exactly once at removal.
#[derive(Debug, Default)]
struct NoteWiring {
    gesture: GestureState,
}

/// Live text-editing session for one note.
#[derive(Debug)]
struct EditSession {
    id: NoteId,
    /// Pre-edit text, restored on cancel.
    original_text: String,
}

/// How an editing session ends.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CommitKind {
    /// Keep the current buffer (confirm, blur, implicit commit).
    Save,
    /// Restore the pre-edit text (cancel).
    Revert,
}

/// Per-session input state: wirings, clipboard, creation mode, editing.
///
/// Constructed once per overlay session and torn down with it; this is the
/// only writer of the note store besides the persistence adapter.
#[derive(Debug, Default)]
pub struct InteractionController {
    wirings: BTreeMap<NoteId, NoteWiring>,
    clipboard: Option<NoteSnapshot>,
    creation_armed: bool,
    editing: Option<EditSession>,
    /// Blur-triggered commit deferred to the next tick, so same-tick
    /// interactions (palette click, re-entry) can claim the edit first.
    pending_blur_commit: Option<NoteId>,
    view_center: ViewPoint,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the view-space center used as the paste anchor.
    pub fn set_view_center(&mut self, center: ViewPoint) {
        self.view_center = center;
    }

    /// Whether the creation-mode key is currently held.
    pub fn is_creation_armed(&self) -> bool {
        self.creation_armed
    }

    /// Note currently holding an editing session, when one exists.
    pub fn editing_id(&self) -> Option<NoteId> {
        self.editing.as_ref().map(|session| session.id)
    }

    pub fn clipboard(&self) -> Option<&NoteSnapshot> {
        self.clipboard.as_ref()
    }

    pub fn has_wiring(&self, id: NoteId) -> bool {
        self.wirings.contains_key(&id)
    }

    /// Acquires interaction wiring for a note that already exists in the
    /// store (restored from a document, for example).
    pub fn register(&mut self, id: NoteId) {
        self.wirings.entry(id).or_default();
    }

    /// Releases every wiring and live session, used by bulk clear and
    /// session teardown.
    pub fn release_all(&mut self) {
        self.wirings.clear();
        self.editing = None;
        self.pending_blur_commit = None;
    }

    /// Routes one input event, mutating the store and resyncing visuals.
    pub fn handle_event<S: OverlaySurface>(
        &mut self,
        event: InputEvent,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        match event {
            InputEvent::PointerDown { target, position } => {
                self.on_pointer_down(target, position, store, renderer, transform);
            }
            InputEvent::PointerMove { position } => {
                self.on_pointer_move(position, store, renderer, transform);
            }
            InputEvent::PointerUp { position } => {
                self.on_pointer_up(position, store, renderer, transform);
            }
            InputEvent::DoubleActivate { id } => {
                self.on_double_activate(id, store, renderer, transform);
            }
            InputEvent::KeyDown(key) => self.on_key_down(key, store, renderer, transform),
            InputEvent::KeyUp(key) => self.on_key_up(key),
            InputEvent::EditorInput { id, text } => self.on_editor_input(id, text, store),
            InputEvent::EditorBlur { id } => self.on_editor_blur(id),
            InputEvent::FocusLost => self.creation_armed = false,
        }
    }

    /// Applies a blur-deferred commit. Invoked once per session tick.
    pub fn flush_pending_commit<S: OverlaySurface>(
        &mut self,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        let Some(pending) = self.pending_blur_commit.take() else {
            return;
        };
        if self.editing_id() == Some(pending) {
            self.commit_edit(CommitKind::Save, store, renderer, transform);
        }
    }

    fn on_pointer_down<S: OverlaySurface>(
        &mut self,
        target: PointerTarget,
        position: ViewPoint,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        // A pointer-down anywhere but the live editor commits the edit
        // before the new interaction proceeds.
        if let Some(session) = &self.editing {
            let inside_editor = matches!(
                target,
                PointerTarget::Note { id, region: NoteRegion::Body } if id == session.id
            );
            if inside_editor {
                // Focus returned to the live editor; drop any pending blur
                // commit so the edit keeps going.
                self.pending_blur_commit = None;
                return;
            }
            self.commit_edit(CommitKind::Save, store, renderer, transform);
        }

        match target {
            PointerTarget::Canvas => {
                if self.creation_armed {
                    let world = transform.to_world(position);
                    self.spawn_note(NoteDraft::at(world), store, renderer, transform);
                } else {
                    store.deselect();
                    renderer.sync_all(store, transform);
                }
            }
            PointerTarget::Note { id, region } => {
                if store.find(id).is_none() {
                    return;
                }
                let previous = store.selected_id();
                store.select(id);
                if previous != Some(id) {
                    renderer.sync_all(store, transform);
                }
                match region {
                    NoteRegion::Header => self.arm_drag(id, position, store, transform),
                    NoteRegion::ResizeHandle => self.begin_resize(id, position, store, renderer, transform),
                    NoteRegion::PaletteSwatch(color) => {
                        if let Some(note) = store.find_mut(id) {
                            note.color = color;
                        }
                        if let Some(note) = store.find(id) {
                            renderer.sync(note, transform);
                        }
                    }
                    NoteRegion::CloseControl => {
                        self.remove_if_deletable(id, store, renderer);
                    }
                    NoteRegion::Body => {}
                }
            }
        }
    }

    fn arm_drag(
        &mut self,
        id: NoteId,
        position: ViewPoint,
        store: &NoteStore,
        transform: ViewTransform,
    ) {
        let Some(note) = store.find(id) else {
            return;
        };
        let Some(wiring) = self.wirings.get_mut(&id) else {
            return;
        };
        wiring.gesture = GestureState::ArmedDrag {
            pointer_start: position,
            origin_view: transform.to_view(note.position),
        };
    }

    fn begin_resize<S: OverlaySurface>(
        &mut self,
        id: NoteId,
        position: ViewPoint,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        let Some(note) = store.find_mut(id) else {
            return;
        };
        let origin_size = note.size;
        note.state = InteractionState::Resizing;
        let Some(wiring) = self.wirings.get_mut(&id) else {
            return;
        };
        wiring.gesture = GestureState::Resizing {
            pointer_start: position,
            origin_size,
        };
        if let Some(note) = store.find(id) {
            renderer.sync(note, transform);
        }
    }

    fn on_pointer_move<S: OverlaySurface>(
        &mut self,
        position: ViewPoint,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        let active: Vec<NoteId> = self
            .wirings
            .iter()
            .filter(|(_, wiring)| wiring.gesture != GestureState::Idle)
            .map(|(id, _)| *id)
            .collect();

        for id in active {
            if store.find(id).is_none() {
                continue;
            }
            let Some(wiring) = self.wirings.get_mut(&id) else {
                continue;
            };
            match wiring.gesture.clone() {
                GestureState::ArmedDrag {
                    pointer_start,
                    origin_view,
                } => {
                    wiring.gesture = GestureState::Dragging {
                        pointer_start,
                        origin_view,
                    };
                    if let Some(note) = store.find_mut(id) {
                        note.state = InteractionState::Dragging;
                    }
                    Self::apply_drag(id, pointer_start, origin_view, position, store, renderer, transform);
                }
                GestureState::Dragging {
                    pointer_start,
                    origin_view,
                } => {
                    Self::apply_drag(id, pointer_start, origin_view, position, store, renderer, transform);
                }
                GestureState::Resizing {
                    pointer_start,
                    origin_size,
                } => {
                    let world_dx = (position.x - pointer_start.x) / transform.scale;
                    let world_dy = (position.y - pointer_start.y) / transform.scale;
                    if let Some(note) = store.find_mut(id) {
                        note.size = Size::new(
                            origin_size.width + world_dx,
                            origin_size.height + world_dy,
                        )
                        .clamped_to(MIN_NOTE_WIDTH, MIN_NOTE_HEIGHT);
                    }
                    if let Some(note) = store.find(id) {
                        renderer.sync(note, transform);
                    }
                }
                GestureState::Idle => {}
            }
        }
    }

    fn apply_drag<S: OverlaySurface>(
        id: NoteId,
        pointer_start: ViewPoint,
        origin_view: ViewPoint,
        position: ViewPoint,
        store: &NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        let origin = origin_view.offset_by(
            position.x - pointer_start.x,
            position.y - pointer_start.y,
        );
        renderer.set_view_override(id, origin);
        if let Some(note) = store.find(id) {
            renderer.sync(note, transform);
        }
    }

    fn on_pointer_up<S: OverlaySurface>(
        &mut self,
        position: ViewPoint,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        let active: Vec<NoteId> = self
            .wirings
            .iter()
            .filter(|(_, wiring)| wiring.gesture != GestureState::Idle)
            .map(|(id, _)| *id)
            .collect();

        for id in active {
            let Some(wiring) = self.wirings.get_mut(&id) else {
                continue;
            };
            match std::mem::take(&mut wiring.gesture) {
                GestureState::Dragging {
                    pointer_start,
                    origin_view,
                } => {
                    // One world-space write per drag, from the final view
                    // origin, so repeated incremental updates never
                    // accumulate floating error.
                    let final_origin = origin_view.offset_by(
                        position.x - pointer_start.x,
                        position.y - pointer_start.y,
                    );
                    let world = transform.to_world(final_origin);
                    if let Some(note) = store.find_mut(id) {
                        if world.is_finite() {
                            note.position = world;
                        }
                        note.state = InteractionState::Selected;
                    }
                    renderer.clear_view_override(id);
                    if let Some(note) = store.find(id) {
                        renderer.sync(note, transform);
                    }
                }
                GestureState::Resizing { .. } => {
                    if let Some(note) = store.find_mut(id) {
                        note.state = InteractionState::Selected;
                    }
                    if let Some(note) = store.find(id) {
                        renderer.sync(note, transform);
                    }
                }
                GestureState::ArmedDrag { .. } | GestureState::Idle => {}
            }
        }
    }

    fn on_double_activate<S: OverlaySurface>(
        &mut self,
        id: NoteId,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        if self.editing_id() == Some(id) {
            // Already editing this note; reclaim it from any pending blur.
            self.pending_blur_commit = None;
            return;
        }
        let Some(note) = store.find_mut(id) else {
            return;
        };
        if note.state != InteractionState::Selected {
            return;
        }
        self.pending_blur_commit = None;
        self.editing = Some(EditSession {
            id,
            original_text: note.text.clone(),
        });
        note.state = InteractionState::Editing;
        if let Some(note) = store.find(id) {
            renderer.refresh_content(note);
            renderer.sync(note, transform);
        }
    }

    fn on_key_down<S: OverlaySurface>(
        &mut self,
        key: KeyInput,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        if self.editing.is_some() {
            // The editable region holds focus: everything except the edit
            // lifecycle keys belongs to ordinary typing.
            match key {
                KeyInput::Confirm => {
                    self.commit_edit(CommitKind::Save, store, renderer, transform);
                }
                KeyInput::Cancel => {
                    self.commit_edit(CommitKind::Revert, store, renderer, transform);
                }
                _ => {}
            }
            return;
        }

        match key {
            KeyInput::CreationModifier => self.creation_armed = true,
            KeyInput::Delete => {
                if let Some(id) = store.selected_id() {
                    self.remove_if_deletable(id, store, renderer);
                }
            }
            KeyInput::Copy => {
                if let Some(note) = store.selected() {
                    self.clipboard = Some(NoteSnapshot::of(note));
                }
            }
            KeyInput::Paste => {
                if let Some(snapshot) = self.clipboard.clone() {
                    let world = transform.to_world(self.view_center);
                    self.spawn_from_snapshot(world, &snapshot, store, renderer, transform);
                }
            }
            KeyInput::Duplicate => {
                let Some(source) = store.selected() else {
                    return;
                };
                let snapshot = NoteSnapshot::of(source);
                let world = source
                    .position
                    .offset_by(DUPLICATE_OFFSET.0, DUPLICATE_OFFSET.1);
                self.clipboard = Some(snapshot.clone());
                let id = self.spawn_from_snapshot(world, &snapshot, store, renderer, transform);
                store.select(id);
                renderer.sync_all(store, transform);
            }
            KeyInput::Cancel => self.cancel_gestures(store, renderer, transform),
            KeyInput::Confirm | KeyInput::InsertNewline => {}
        }
    }

    fn on_key_up(&mut self, key: KeyInput) {
        if key == KeyInput::CreationModifier {
            self.creation_armed = false;
        }
    }

    fn on_editor_input(&mut self, id: NoteId, text: String, store: &mut NoteStore) {
        if self.editing_id() != Some(id) {
            return;
        }
        if let Some(note) = store.find_mut(id) {
            note.text = text;
        }
    }

    fn on_editor_blur(&mut self, id: NoteId) {
        if self.editing_id() == Some(id) {
            self.pending_blur_commit = Some(id);
        }
    }

    fn cancel_gestures<S: OverlaySurface>(
        &mut self,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        let active: Vec<NoteId> = self
            .wirings
            .iter()
            .filter(|(_, wiring)| wiring.gesture != GestureState::Idle)
            .map(|(id, _)| *id)
            .collect();

        for id in active {
            let Some(wiring) = self.wirings.get_mut(&id) else {
                continue;
            };
            match std::mem::take(&mut wiring.gesture) {
                GestureState::ArmedDrag { .. } | GestureState::Dragging { .. } => {
                    renderer.clear_view_override(id);
                    if let Some(note) = store.find_mut(id) {
                        note.state = InteractionState::Selected;
                    }
                }
                GestureState::Resizing { origin_size, .. } => {
                    if let Some(note) = store.find_mut(id) {
                        note.size = origin_size;
                        note.state = InteractionState::Selected;
                    }
                }
                GestureState::Idle => {}
            }
            if let Some(note) = store.find(id) {
                renderer.sync(note, transform);
            }
        }
    }

    fn commit_edit<S: OverlaySurface>(
        &mut self,
        kind: CommitKind,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) {
        let Some(session) = self.editing.take() else {
            return;
        };
        self.pending_blur_commit = None;
        let is_selected = store.selected_id() == Some(session.id);
        let Some(note) = store.find_mut(session.id) else {
            return;
        };
        if kind == CommitKind::Revert {
            note.text = session.original_text;
        }
        note.state = if is_selected {
            InteractionState::Selected
        } else {
            InteractionState::Idle
        };
        if let Some(note) = store.find(session.id) {
            renderer.refresh_content(note);
            renderer.sync(note, transform);
        }
    }

    /// Creates a note, acquires its wiring and materializes its visual.
    ///
    /// Creation does not change the selection; only duplicate re-selects.
    pub fn spawn_note<S: OverlaySurface>(
        &mut self,
        draft: NoteDraft,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) -> NoteId {
        let id = store.create(draft);
        self.wirings.insert(id, NoteWiring::default());
        if let Some(note) = store.find(id) {
            renderer.materialize(note, transform);
        }
        debug!("event=note_created module=interact status=ok note_id={id}");
        id
    }

    fn spawn_from_snapshot<S: OverlaySurface>(
        &mut self,
        position: WorldPoint,
        snapshot: &NoteSnapshot,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
        transform: ViewTransform,
    ) -> NoteId {
        let draft = NoteDraft {
            size: Some(snapshot.size),
            text: Some(snapshot.text.clone()),
            color: Some(snapshot.color),
            ..NoteDraft::at(position)
        };
        self.spawn_note(draft, store, renderer, transform)
    }

    fn remove_if_deletable<S: OverlaySurface>(
        &mut self,
        id: NoteId,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
    ) {
        match store.find(id) {
            Some(note) if note.is_deletable() => {}
            _ => return,
        }
        self.release_note(id, store, renderer);
    }

    /// Removes one note, releasing its visual and wiring exactly once.
    pub fn release_note<S: OverlaySurface>(
        &mut self,
        id: NoteId,
        store: &mut NoteStore,
        renderer: &mut OverlayRenderer<S>,
    ) -> Option<Note> {
        let removed = store.remove(id)?;
        renderer.destroy(id);
        self.wirings.remove(&id);
        if self.editing_id() == Some(id) {
            self.editing = None;
        }
        if self.pending_blur_commit == Some(id) {
            self.pending_blur_commit = None;
        }
        debug!("event=note_removed module=interact status=ok note_id={id}");
        Some(removed)
    }
}
