//! Persistence adapter: note projections in the host document.
//!
//! # Responsibility
//! - Project the note store into plain records at save time.
//! - Rebuild the store from records at load time, tolerating bad input.
//! - Read/write the reserved slot inside the host document's extra-data
//!   section without disturbing sibling keys.
//!
//! # Invariants
//! - `serialize` is a fresh read-only projection, never cached.
//! - A record with a missing or non-finite position is skipped alone; its
//!   siblings still load.
//! - The store is cleared before every restore, so stale notes never
//!   survive a document switch.

use crate::model::geometry::{Size, WorldPoint};
use crate::model::note::{NoteId, PaletteColor};
use crate::store::note_store::{NoteDraft, NoteStore};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved key inside the host document's extra-data section.
pub const EXTRA_DATA_KEY: &str = "graphnote";

/// Plain persisted shape for one note.
///
/// `x`/`y` are mandatory for a record to load; everything else falls back
/// to the documented defaults. The color travels as its palette key string
/// and unknown keys decode to the default palette color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Serialized as `createdAt` to match the persisted document schema.
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<i64>,
}

/// Projects the live note set into plain records, in creation order.
pub fn serialize(store: &NoteStore) -> Vec<NoteRecord> {
    store
        .all()
        .map(|note| NoteRecord {
            id: note.id.0,
            x: note.position.x,
            y: note.position.y,
            width: Some(note.size.width),
            height: Some(note.size.height),
            text: Some(note.text.clone()),
            color: Some(note.color.as_key().to_string()),
            created_at: Some(note.created_at),
        })
        .collect()
}

/// Restores notes from records into an already-cleared store.
///
/// Returns the ids created, in record order. Records with a non-finite
/// position are skipped with a warning; nothing aborts the batch.
pub fn deserialize(store: &mut NoteStore, records: &[NoteRecord]) -> Vec<NoteId> {
    let mut created = Vec::new();
    for record in records {
        let position = WorldPoint::new(record.x, record.y);
        if !position.is_finite() {
            warn!(
                "event=record_skipped module=persist status=error record_id={} reason=non_finite_position",
                record.id
            );
            continue;
        }
        let size = match (record.width, record.height) {
            (Some(width), Some(height)) if width.is_finite() && height.is_finite() => {
                Some(Size::new(width, height))
            }
            _ => None,
        };
        let draft = NoteDraft {
            size,
            text: record.text.clone(),
            color: record.color.as_deref().map(PaletteColor::from_key),
            created_at: record.created_at,
            ..NoteDraft::at(position)
        };
        created.push(store.restore(NoteId(record.id), draft));
    }
    debug!(
        "event=notes_restored module=persist status=ok loaded={} skipped={}",
        created.len(),
        records.len() - created.len()
    );
    created
}

/// Writes the record set under the reserved key, leaving sibling keys of
/// the extra-data section untouched.
pub fn write_slot(extra: &mut Map<String, Value>, records: &[NoteRecord]) {
    match serde_json::to_value(records) {
        Ok(value) => {
            extra.insert(EXTRA_DATA_KEY.to_string(), value);
        }
        Err(err) => {
            // Serializing plain numbers/strings cannot fail in practice;
            // absorb rather than disturb the host's save.
            warn!("event=slot_write module=persist status=error reason={err}");
        }
    }
}

/// Reads the record set from the reserved key.
///
/// Returns `None` when the key is absent, empty or not an array. Array
/// entries that do not decode as records are skipped individually.
pub fn read_slot(extra: &Map<String, Value>) -> Option<Vec<NoteRecord>> {
    let entries = extra.get(EXTRA_DATA_KEY)?.as_array()?;
    if entries.is_empty() {
        return None;
    }
    let records: Vec<NoteRecord> = entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("event=record_decode module=persist status=error reason={err}");
                None
            }
        })
        .collect();
    if records.is_empty() {
        return None;
    }
    Some(records)
}
