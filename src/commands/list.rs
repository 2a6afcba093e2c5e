use crate::error::Result;
use crate::output::{self, Format};
use crate::store::repository::NoteRepository;

pub fn run(repo: &NoteRepository, format: Format) -> Result<()> {
    let notes = repo.all_notes().recv()?;
    output::print_notes(&notes, format)?;
    Ok(())
}
