//! In-memory note store and selection singleton.
//!
//! # Responsibility
//! - Provide create/remove/find/list/clear over the live note set.
//! - Enforce single-selection semantics.
//!
//! # Invariants
//! - `all()` iterates in creation order (ids are monotonic).
//! - Selecting a new id implicitly deselects the previous one.
//! - Removing the selected note clears the selection; removing any other
//!   note leaves it untouched.
//! - All mutation is synchronous; the store holds no derived state.

use crate::model::geometry::{Size, WorldPoint};
use crate::model::note::{
    now_epoch_ms, InteractionState, Note, NoteId, PaletteColor, DEFAULT_NOTE_SIZE,
    MIN_NOTE_HEIGHT, MIN_NOTE_WIDTH,
};
use std::collections::BTreeMap;

/// Creation parameters for one note; everything but the position defaults.
#[derive(Debug, Clone)]
pub struct NoteDraft {
    /// World-space anchor for the new note.
    pub position: WorldPoint,
    /// World-space size; `DEFAULT_NOTE_SIZE` when omitted.
    pub size: Option<Size>,
    /// Markdown source; empty when omitted.
    pub text: Option<String>,
    /// Palette key; default palette color when omitted.
    pub color: Option<PaletteColor>,
    /// Epoch milliseconds; current wall clock when omitted.
    pub created_at: Option<i64>,
}

impl NoteDraft {
    /// Creates a draft with defaults for everything but the position.
    pub fn at(position: WorldPoint) -> Self {
        Self {
            position,
            size: None,
            text: None,
            color: None,
            created_at: None,
        }
    }
}

/// Owner of the live note set, id allocation and selection.
#[derive(Debug, Default)]
pub struct NoteStore {
    notes: BTreeMap<NoteId, Note>,
    next_id: u64,
    selected: Option<NoteId>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a note from a draft, allocating the next id.
    ///
    /// The size is clamped to the minimum dimensions even when supplied, so
    /// the size invariant holds from the first frame.
    pub fn create(&mut self, draft: NoteDraft) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        self.insert_from_draft(id, draft)
    }

    /// Creates a note under a caller-provided id, used by the restore path
    /// where identity already exists in the persisted document.
    ///
    /// Keeps the id invariant intact: the allocator is advanced past the
    /// restored id, and a colliding id falls back to fresh allocation.
    pub fn restore(&mut self, id: NoteId, draft: NoteDraft) -> NoteId {
        if self.notes.contains_key(&id) {
            return self.create(draft);
        }
        self.next_id = self.next_id.max(id.0 + 1);
        self.insert_from_draft(id, draft)
    }

    fn insert_from_draft(&mut self, id: NoteId, draft: NoteDraft) -> NoteId {
        let size = draft
            .size
            .unwrap_or(DEFAULT_NOTE_SIZE)
            .clamped_to(MIN_NOTE_WIDTH, MIN_NOTE_HEIGHT);
        let note = Note {
            id,
            position: draft.position,
            size,
            text: draft.text.unwrap_or_default(),
            color: draft.color.unwrap_or_default(),
            created_at: draft.created_at.unwrap_or_else(now_epoch_ms),
            state: InteractionState::Idle,
        };
        self.notes.insert(id, note);
        id
    }

    /// Removes one note, returning it. No-op for unknown ids.
    ///
    /// Clears the selection when it referenced the removed note.
    pub fn remove(&mut self, id: NoteId) -> Option<Note> {
        let removed = self.notes.remove(&id);
        if removed.is_some() && self.selected == Some(id) {
            self.selected = None;
        }
        removed
    }

    pub fn find(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }

    pub fn find_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.get_mut(&id)
    }

    /// Iterates live notes in creation order.
    pub fn all(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Removes every note and clears the selection, returning the drained
    /// set so callers can release visuals and wiring.
    pub fn clear(&mut self) -> Vec<Note> {
        self.selected = None;
        let drained = std::mem::take(&mut self.notes);
        drained.into_values().collect()
    }

    /// Selects one note, implicitly deselecting the previous one.
    ///
    /// Returns `false` without touching the current selection when the id is
    /// not live.
    pub fn select(&mut self, id: NoteId) -> bool {
        if !self.notes.contains_key(&id) {
            return false;
        }
        if self.selected == Some(id) {
            return true;
        }
        self.deselect();
        if let Some(note) = self.notes.get_mut(&id) {
            note.state = InteractionState::Selected;
        }
        self.selected = Some(id);
        true
    }

    /// Clears the selection, returning the previously selected note to
    /// `Idle`.
    pub fn deselect(&mut self) {
        if let Some(previous) = self.selected.take() {
            if let Some(note) = self.notes.get_mut(&previous) {
                note.state = InteractionState::Idle;
            }
        }
    }

    pub fn selected_id(&self) -> Option<NoteId> {
        self.selected
    }

    /// Returns the selected note, when one exists.
    pub fn selected(&self) -> Option<&Note> {
        self.selected.and_then(|id| self.notes.get(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteDraft, NoteStore};
    use crate::model::geometry::{Size, WorldPoint};
    use crate::model::note::{InteractionState, MIN_NOTE_HEIGHT, MIN_NOTE_WIDTH};

    fn draft() -> NoteDraft {
        NoteDraft::at(WorldPoint::new(10.0, 20.0))
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut store = NoteStore::new();
        let first = store.create(draft());
        let second = store.create(draft());
        store.remove(first);
        let third = store.create(draft());
        assert!(second > first);
        assert!(third > second);
    }

    #[test]
    fn restore_preserves_id_and_advances_allocator() {
        let mut store = NoteStore::new();
        let restored = store.restore(crate::model::note::NoteId(41), draft());
        assert_eq!(restored, crate::model::note::NoteId(41));
        let fresh = store.create(draft());
        assert_eq!(fresh, crate::model::note::NoteId(42));
    }

    #[test]
    fn restore_with_colliding_id_falls_back_to_fresh_allocation() {
        let mut store = NoteStore::new();
        let first = store.create(draft());
        let second = store.restore(first, draft());
        assert_ne!(second, first);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn undersized_draft_is_clamped_at_creation() {
        let mut store = NoteStore::new();
        let id = store.create(NoteDraft {
            size: Some(Size::new(1.0, 1.0)),
            ..draft()
        });
        let note = store.find(id).expect("created note");
        assert_eq!(note.size, Size::new(MIN_NOTE_WIDTH, MIN_NOTE_HEIGHT));
    }

    #[test]
    fn selection_is_a_singleton() {
        let mut store = NoteStore::new();
        let a = store.create(draft());
        let b = store.create(draft());
        assert!(store.select(a));
        assert!(store.select(b));
        assert_eq!(store.selected_id(), Some(b));
        assert_eq!(
            store.find(a).expect("note a").state,
            InteractionState::Idle
        );
        assert_eq!(
            store.find(b).expect("note b").state,
            InteractionState::Selected
        );
    }

    #[test]
    fn removing_selected_note_clears_selection_only_for_it() {
        let mut store = NoteStore::new();
        let a = store.create(draft());
        let b = store.create(draft());
        store.select(a);
        store.remove(b);
        assert_eq!(store.selected_id(), Some(a));
        store.remove(a);
        assert_eq!(store.selected_id(), None);
    }

    #[test]
    fn selecting_dead_id_leaves_selection_unchanged() {
        let mut store = NoteStore::new();
        let a = store.create(draft());
        let b = store.create(draft());
        store.select(a);
        store.remove(b);
        assert!(!store.select(b));
        assert_eq!(store.selected_id(), Some(a));
    }

    #[test]
    fn clear_drains_everything_and_selection() {
        let mut store = NoteStore::new();
        let a = store.create(draft());
        store.create(draft());
        store.select(a);
        let drained = store.clear();
        assert_eq!(drained.len(), 2);
        assert!(store.is_empty());
        assert_eq!(store.selected_id(), None);
    }
}
