use crate::error::{JotError, Result};
use crate::output::{self, Format};
use crate::state::{NotesState, SaveOutcome};
use crate::store::repository::NoteRepository;

/// Edit a note in place. Fields left as `None` keep their current value and
/// the creation timestamp never changes.
pub fn run(
    repo: &NoteRepository,
    id: i64,
    title: Option<String>,
    description: Option<String>,
    format: Format,
) -> Result<()> {
    let note = repo.get_by_id(id).wait()?.ok_or(JotError::NoteNotFound(id))?;

    let mut state = NotesState::new(repo.clone());
    state.open_for_edit(&note);
    if let Some(t) = title {
        state.set_title(t);
    }
    if let Some(d) = description {
        state.set_description(d);
    }

    if state.save() == SaveOutcome::Skipped {
        eprintln!("nothing to save: title and description are both empty");
        return Ok(());
    }
    state.settle()?;

    let updated = repo.get_by_id(id).wait()?.ok_or(JotError::NoteNotFound(id))?;
    output::print_note(&updated, format)?;
    Ok(())
}
