use crate::model::{Note, NoteDraft};
use crate::store::live::{Change, LiveNotes, Pending, StoreHandle};

/// Pass-through over the storage worker. Keeps the state holder independent
/// of the storage handle type.
#[derive(Debug, Clone)]
pub struct NoteRepository {
    store: StoreHandle,
}

impl NoteRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Live sequence of all notes, newest first.
    pub fn all_notes(&self) -> LiveNotes {
        self.store.subscribe()
    }

    pub fn insert(&self, draft: NoteDraft) -> Pending<Change> {
        self.store.insert(draft)
    }

    pub fn update(&self, note: Note) -> Pending<Change> {
        self.store.update(note)
    }

    pub fn delete(&self, note: Note) -> Pending<Change> {
        self.store.delete(note)
    }

    pub fn get_by_id(&self, id: i64) -> Pending<Option<Note>> {
        self.store.get(id)
    }
}
