//! Application state holder.
//!
//! `NotesState` owns everything the presentation layer renders: the latest
//! note list, dialog visibility, and the edit buffer. Intents mutate this
//! state directly and hand storage work to the repository without waiting;
//! [`NotesState::poll`] folds finished work and new snapshots back in on the
//! next tick of the event loop.

use log::{error, info};

use crate::error::{JotError, Result};
use crate::model::{Note, NoteDraft, now_millis};
use crate::store::live::{Change, LiveNotes, Pending};
use crate::store::repository::NoteRepository;

/// The note being edited. The timestamp is kept so saving does not move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditTarget {
    pub id: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Both fields were empty after trimming; nothing was written.
    Skipped,
    Inserted,
    Updated,
}

#[derive(Debug)]
pub struct NotesState {
    repository: NoteRepository,
    live: LiveNotes,
    notes: Vec<Note>,
    dialog_visible: bool,
    title: String,
    description: String,
    editing: Option<EditTarget>,
    in_flight: Vec<Pending<Change>>,
    last_error: Option<String>,
}

impl NotesState {
    /// Subscribe to the repository's live list. The first snapshot arrives
    /// on a later [`poll`](Self::poll) or [`wait_for_snapshot`](Self::wait_for_snapshot).
    pub fn new(repository: NoteRepository) -> Self {
        let live = repository.all_notes();
        Self {
            repository,
            live,
            notes: Vec::new(),
            dialog_visible: false,
            title: String::new(),
            description: String::new(),
            editing: None,
            in_flight: Vec::new(),
            last_error: None,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn dialog_visible(&self) -> bool {
        self.dialog_visible
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn editing(&self) -> Option<EditTarget> {
        self.editing
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn open_for_create(&mut self) {
        self.editing = None;
        self.title.clear();
        self.description.clear();
        self.dialog_visible = true;
    }

    pub fn open_for_edit(&mut self, note: &Note) {
        self.editing = Some(EditTarget {
            id: note.id,
            timestamp: note.timestamp,
        });
        self.title = note.title.clone();
        self.description = note.description.clone();
        self.dialog_visible = true;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Direct access to the buffers for character-level editing.
    pub fn title_mut(&mut self) -> &mut String {
        &mut self.title
    }

    pub fn description_mut(&mut self) -> &mut String {
        &mut self.description
    }

    pub fn dismiss(&mut self) {
        self.dialog_visible = false;
    }

    pub fn save(&mut self) -> SaveOutcome {
        self.save_at(now_millis())
    }

    /// Save the edit buffer, stamping new notes with `now_ms`.
    pub fn save_at(&mut self, now_ms: i64) -> SaveOutcome {
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();

        if title.is_empty() && description.is_empty() {
            info!("event=save_skipped module=state reason=empty");
            self.dismiss();
            return SaveOutcome::Skipped;
        }

        let outcome = match self.editing {
            Some(target) => {
                let note = Note {
                    id: target.id,
                    title,
                    description,
                    timestamp: target.timestamp,
                };
                self.in_flight.push(self.repository.update(note));
                SaveOutcome::Updated
            }
            None => {
                let draft = NoteDraft {
                    id: None,
                    title,
                    description,
                    timestamp: now_ms,
                };
                self.in_flight.push(self.repository.insert(draft));
                SaveOutcome::Inserted
            }
        };

        self.dismiss();
        outcome
    }

    /// Delete immediately; there is no confirmation step.
    pub fn delete(&mut self, note: &Note) {
        self.in_flight.push(self.repository.delete(note.clone()));
    }

    /// Non-blocking: collect finished writes, then adopt the newest snapshot.
    pub fn poll(&mut self) {
        let mut running = Vec::with_capacity(self.in_flight.len());
        for pending in std::mem::take(&mut self.in_flight) {
            match pending.poll() {
                None => running.push(pending),
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    error!("event=write_failed module=state error={err}");
                    self.last_error = Some(err.to_string());
                }
            }
        }
        self.in_flight = running;
        self.adopt_latest();
    }

    /// Block until every in-flight write has finished. Returns the completed
    /// changes, or the first failure.
    pub fn settle(&mut self) -> Result<Vec<Change>> {
        let mut changes = Vec::new();
        let mut first_err: Option<JotError> = None;

        for pending in std::mem::take(&mut self.in_flight) {
            match pending.wait() {
                Ok(change) => changes.push(change),
                Err(err) => {
                    error!("event=write_failed module=state error={err}");
                    self.last_error = Some(err.to_string());
                    first_err.get_or_insert(err);
                }
            }
        }

        self.adopt_latest();

        match first_err {
            Some(err) => Err(err),
            None => Ok(changes),
        }
    }

    /// Block for the next published snapshot and adopt it.
    pub fn wait_for_snapshot(&mut self) -> Result<()> {
        self.notes = self.live.recv()?;
        self.adopt_latest();
        Ok(())
    }

    /// Take the newest queued snapshot. A failed read keeps the previous list.
    fn adopt_latest(&mut self) {
        match self.live.latest() {
            Some(Ok(snapshot)) => self.notes = snapshot,
            Some(Err(err)) => {
                error!("event=snapshot_failed module=state error={err}");
                self.last_error = Some(err.to_string());
            }
            None => {}
        }
    }
}
