use crate::error::{JotError, Result};
use crate::output::{self, Format};
use crate::state::NotesState;
use crate::store::repository::NoteRepository;

pub fn run(repo: &NoteRepository, id: i64, format: Format) -> Result<()> {
    let note = repo.get_by_id(id).wait()?.ok_or(JotError::NoteNotFound(id))?;

    let mut state = NotesState::new(repo.clone());
    state.delete(&note);
    state.settle()?;

    output::print_note(&note, format)?;
    Ok(())
}
