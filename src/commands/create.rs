use crate::error::Result;
use crate::output::{self, Format};
use crate::state::{NotesState, SaveOutcome};
use crate::store::live::Change;
use crate::store::repository::NoteRepository;

/// Create a note through the same save path the dialog uses, so the
/// both-empty guard applies.
pub fn run(
    repo: &NoteRepository,
    title: Option<String>,
    description: Option<String>,
    format: Format,
) -> Result<()> {
    let mut state = NotesState::new(repo.clone());
    state.open_for_create();
    state.set_title(title.unwrap_or_default());
    state.set_description(description.unwrap_or_default());

    if state.save() == SaveOutcome::Skipped {
        eprintln!("nothing to save: title and description are both empty");
        return Ok(());
    }

    for change in state.settle()? {
        if let Change::Inserted(note) = change {
            output::print_note(&note, format)?;
        }
    }
    Ok(())
}
