use clap::ValueEnum;
use colored::Colorize;

use crate::error::Result;
use crate::model::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

pub fn print_note(note: &Note, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(note)?),
        Format::Pretty => {
            println!(
                "[{}] {}  {}",
                note.id,
                note.display_title().bold(),
                note.created_label().as_str().dimmed()
            );
            for line in note.description.lines() {
                println!("  {}", line);
            }
        }
        Format::Minimal => println!("{}", minimal_row(note)),
    }
    Ok(())
}

pub fn print_notes(notes: &[Note], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(notes)?),
        Format::Pretty => {
            if notes.is_empty() {
                println!("No notes yet. Run `jotter add` to create one.");
            }
            for note in notes {
                print_note(note, Format::Pretty)?;
                println!();
            }
        }
        Format::Minimal => {
            println!("{:>4} {:20} {:16} DESCRIPTION", "ID", "TITLE", "CREATED");
            println!("{}", "-".repeat(60));
            for note in notes {
                println!("{}", minimal_row(note));
            }
        }
    }
    Ok(())
}

fn minimal_row(note: &Note) -> String {
    let first_line = note.description.lines().next().unwrap_or("");
    format!(
        "{:>4} {:20} {:16} {}",
        note.id,
        truncate_title(note.display_title(), 20),
        note.created_label(),
        truncate_title(first_line, 30)
    )
}

pub fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() > max_len {
        let truncated: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        title.to_string()
    }
}
