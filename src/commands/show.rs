use crate::error::{JotError, Result};
use crate::output::{self, Format};
use crate::store::repository::NoteRepository;

pub fn run(repo: &NoteRepository, id: i64, format: Format) -> Result<()> {
    let note = repo.get_by_id(id).wait()?.ok_or(JotError::NoteNotFound(id))?;
    output::print_note(&note, format)?;
    Ok(())
}
