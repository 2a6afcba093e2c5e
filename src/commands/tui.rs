use std::io;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::info;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::error::Result;
use crate::model::Note;
use crate::state::NotesState;
use crate::store::repository::NoteRepository;

const TICK_RATE: Duration = Duration::from_millis(100);
const PREVIEW_LINES: usize = 3;
const PREVIEW_LINE_CHARS: usize = 96;
const EMPTY_STATE: &str = "No notes yet. Press 'a' to add one!";
const CURSOR: &str = "▌";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogField {
    Title,
    Description,
}

impl DialogField {
    fn toggle(self) -> Self {
        match self {
            Self::Title => Self::Description,
            Self::Description => Self::Title,
        }
    }
}

#[derive(Debug)]
struct NotesTuiApp {
    state: NotesState,
    selected: usize,
    query: String,
    search_mode: bool,
    help_visible: bool,
    field: DialogField,
    tick_rate: Duration,
}

impl NotesTuiApp {
    fn new(state: NotesState) -> Self {
        Self {
            state,
            selected: 0,
            query: String::new(),
            search_mode: false,
            help_visible: false,
            field: DialogField::Title,
            tick_rate: TICK_RATE,
        }
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }

        if self.state.dialog_visible() {
            self.handle_dialog_key(key);
            return false;
        }

        if self.search_mode {
            self.handle_search_key(key);
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('?') => self.help_visible = !self.help_visible,
            KeyCode::Char('/') => self.search_mode = true,
            KeyCode::Char('c') => {
                self.query.clear();
                self.normalize_selection();
            }
            KeyCode::Char('a') | KeyCode::Char('n') => {
                self.state.clear_error();
                self.state.open_for_create();
                self.field = DialogField::Title;
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(note) = self.selected_note().cloned() {
                    self.state.clear_error();
                    self.state.open_for_edit(&note);
                    self.field = DialogField::Title;
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(note) = self.selected_note().cloned() {
                    info!("event=delete_requested module=tui id={}", note.id);
                    self.state.delete(&note);
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => {
                self.selected = self.filtered_indices().len().saturating_sub(1);
            }
            _ => {}
        }
        false
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.state.dismiss(),
            KeyCode::Char('s') if ctrl => {
                self.state.save();
            }
            KeyCode::Tab | KeyCode::BackTab => self.field = self.field.toggle(),
            KeyCode::Enter => match self.field {
                DialogField::Title => self.field = DialogField::Description,
                DialogField::Description => self.state.description_mut().push('\n'),
            },
            KeyCode::Backspace => {
                self.active_buffer().pop();
            }
            KeyCode::Char(ch) => {
                if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) {
                    self.active_buffer().push(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.search_mode = false,
            KeyCode::Backspace => {
                self.query.pop();
            }
            KeyCode::Char(ch) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                {
                    self.query.push(ch);
                }
            }
            _ => {}
        }
        self.normalize_selection();
    }

    fn active_buffer(&mut self) -> &mut String {
        match self.field {
            DialogField::Title => self.state.title_mut(),
            DialogField::Description => self.state.description_mut(),
        }
    }

    fn query_tokens(&self) -> Vec<String> {
        self.query
            .split_whitespace()
            .map(|token| token.to_lowercase())
            .collect()
    }

    fn filtered_indices(&self) -> Vec<usize> {
        let tokens = self.query_tokens();
        self.state
            .notes()
            .iter()
            .enumerate()
            .filter(|(_, note)| {
                let haystack = format!("{} {}", note.title, note.description);
                contains_all_tokens(&haystack, &tokens)
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    fn selected_note(&self) -> Option<&Note> {
        let indices = self.filtered_indices();
        let pos = pick_selected(indices.len(), self.selected)?;
        self.state.notes().get(indices[pos])
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.filtered_indices().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        if delta.is_negative() {
            self.selected = self.selected.saturating_sub(delta.unsigned_abs());
        } else {
            self.selected = self
                .selected
                .saturating_add(delta as usize)
                .min(len - 1);
        }
    }

    fn normalize_selection(&mut self) {
        let len = self.filtered_indices().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn tick(&mut self) {
        self.state.poll();
        self.normalize_selection();
    }

    fn controls_line(&self) -> Line<'static> {
        if let Some(err) = self.state.last_error() {
            return Line::from(Span::styled(
                format!("error: {err}"),
                Style::default().fg(Color::Red),
            ));
        }
        let text = if self.state.dialog_visible() {
            "Tab switch field | Enter next/newline | Ctrl+S save | Esc cancel".to_string()
        } else if self.search_mode {
            format!("filter: type to edit | Enter/Esc done | current: {}", self.query)
        } else {
            "a add | Enter/e edit | x delete | ↑/↓ or j/k select | / filter | c clear | ? help | q quit"
                .to_string()
        };
        Line::from(text)
    }

    fn render(&self, frame: &mut Frame) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(frame.area());

        let mut header = vec![Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )];
        header.push(Span::raw(format!("  ({})", self.state.notes().len())));
        if !self.query.is_empty() {
            header.push(Span::raw(format!("  filter: {}", self.query)));
        }
        frame.render_widget(
            Paragraph::new(Line::from(header))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("jotter")),
            outer[0],
        );

        self.render_list(frame, outer[1]);

        frame.render_widget(
            Paragraph::new(self.controls_line())
                .block(Block::default().borders(Borders::ALL).title(
                    if self.search_mode {
                        "Filter"
                    } else {
                        "Controls"
                    },
                ))
                .wrap(Wrap { trim: true }),
            outer[2],
        );

        if self.state.dialog_visible() {
            self.render_dialog(frame);
        } else if self.help_visible {
            let popup = centered_rect(70, 60, frame.area());
            frame.render_widget(Clear, popup);
            frame.render_widget(
                Paragraph::new(
                    "jotter controls\n\n\
                     Notes:\n\
                     - a: add a note\n\
                     - Enter / e: edit the selected note\n\
                     - x / Delete: delete the selected note\n\
                     - Up/Down, j/k, Home/End: move selection\n\n\
                     Dialog:\n\
                     - Tab: switch between title and description\n\
                     - Enter: next field, or newline in description\n\
                     - Ctrl+S: save\n\
                     - Esc: cancel\n\n\
                     Other:\n\
                     - /: filter notes, c: clear filter\n\
                     - ?: toggle this help\n\
                     - q: quit",
                )
                .block(Block::default().borders(Borders::ALL).title("Help"))
                .wrap(Wrap { trim: true }),
                popup,
            );
        }
    }

    fn render_list(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL);

        if self.state.notes().is_empty() {
            let vertical = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Percentage(45),
                    Constraint::Length(1),
                    Constraint::Min(0),
                ])
                .split(block.inner(area));
            frame.render_widget(block, area);
            frame.render_widget(
                Paragraph::new(EMPTY_STATE).alignment(Alignment::Center),
                vertical[1],
            );
            return;
        }

        let indices = self.filtered_indices();
        if indices.is_empty() {
            frame.render_widget(
                Paragraph::new(format!("No notes match filter: {:?}", self.query))
                    .block(block)
                    .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        let notes = self.state.notes();
        let items = indices
            .iter()
            .map(|&idx| note_card(&notes[idx]))
            .collect::<Vec<_>>();

        let mut state = ListState::default();
        state.select(pick_selected(indices.len(), self.selected));

        frame.render_stateful_widget(
            List::new(items)
                .block(block)
                .highlight_style(Style::default().fg(Color::Cyan))
                .highlight_symbol("❯ "),
            area,
            &mut state,
        );
    }

    fn render_dialog(&self, frame: &mut Frame) {
        let popup = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, popup);

        let title = if self.state.editing().is_some() {
            "Edit Note"
        } else {
            "Add Note"
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_alignment(Alignment::Center);
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(inner);

        frame.render_widget(
            self.field_widget("Title", self.state.title(), DialogField::Title),
            rows[0],
        );
        frame.render_widget(
            self.field_widget(
                "Description",
                self.state.description(),
                DialogField::Description,
            ),
            rows[1],
        );
        frame.render_widget(
            Paragraph::new("Esc Cancel   Ctrl+S Save").alignment(Alignment::Right),
            rows[2],
        );
    }

    fn field_widget<'a>(&self, label: &'a str, value: &str, field: DialogField) -> Paragraph<'a> {
        let active = self.field == field;
        let mut text = value.to_string();
        if active {
            text.push_str(CURSOR);
        }
        let border = if active {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(label),
            )
            .wrap(Wrap { trim: false })
    }
}

fn note_card(note: &Note) -> ListItem<'static> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            truncate_display(note.display_title(), PREVIEW_LINE_CHARS),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", note.created_label()),
            Style::default().fg(Color::DarkGray),
        ),
    ])];
    let preview = preview_text(&note.description, PREVIEW_LINES, PREVIEW_LINE_CHARS);
    for line in preview.lines() {
        lines.push(Line::from(format!("  {line}")));
    }
    lines.push(Line::from(""));
    ListItem::new(lines)
}

pub fn run(repo: &NoteRepository) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = NotesTuiApp::new(NotesState::new(repo.clone()));
    let run_result = run_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Let pending writes land before the store shuts down.
    let settle_result = app.state.settle().map(|_| ());
    run_result.and(settle_result)
}

fn run_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut NotesTuiApp) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        app.tick();
        terminal
            .draw(|frame| app.render(frame))
            .map_err(|err| std::io::Error::other(err.to_string()))?;

        let timeout = app.tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && app.handle_key(key)
        {
            break;
        }

        if last_tick.elapsed() >= app.tick_rate {
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn contains_all_tokens(candidate: &str, tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return true;
    }

    let normalized = candidate.to_lowercase();
    tokens.iter().all(|token| normalized.contains(token))
}

fn truncate_display(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let mut output = String::new();

    for _ in 0..max_chars {
        if let Some(ch) = chars.next() {
            output.push(ch);
        } else {
            return output;
        }
    }

    if chars.next().is_some() {
        output.push('…');
    }

    output
}

fn preview_text(value: &str, max_lines: usize, max_line_chars: usize) -> String {
    if value.trim().is_empty() {
        return String::new();
    }

    let lines = value.lines().collect::<Vec<_>>();
    let mut preview = lines
        .iter()
        .take(max_lines)
        .map(|line| truncate_display(line, max_line_chars))
        .collect::<Vec<_>>();

    if lines.len() > max_lines
        && let Some(last) = preview.last_mut()
        && !last.ends_with('…')
    {
        last.push('…');
    }

    preview.join("\n")
}

fn pick_selected(len: usize, candidate: usize) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(candidate.min(len - 1))
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    use ratatui::backend::TestBackend;

    use crate::store::live::NoteStore;

    fn app() -> (NoteStore, NotesTuiApp) {
        let store = NoteStore::open_memory().unwrap();
        let mut state = NotesState::new(NoteRepository::new(store.handle()));
        state.wait_for_snapshot().unwrap();
        (store, NotesTuiApp::new(state))
    }

    fn press(app: &mut NotesTuiApp, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::from(code))
    }

    fn type_text(app: &mut NotesTuiApp, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn ctrl_s(app: &mut NotesTuiApp) {
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
    }

    fn add_note(app: &mut NotesTuiApp, title: &str, description: &str) {
        press(app, KeyCode::Char('a'));
        type_text(app, title);
        press(app, KeyCode::Tab);
        type_text(app, description);
        ctrl_s(app);
        app.state.settle().unwrap();
        app.normalize_selection();
    }

    fn screen_text(app: &NotesTuiApp) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn empty_state_is_rendered() {
        let (_store, app) = app();
        assert!(screen_text(&app).contains(EMPTY_STATE));
    }

    #[test]
    fn add_dialog_collects_fields_and_saves() {
        let (_store, mut app) = app();

        press(&mut app, KeyCode::Char('a'));
        assert!(app.state.dialog_visible());
        assert!(screen_text(&app).contains("Add Note"));

        type_text(&mut app, "Buy milk");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.field, DialogField::Description);
        type_text(&mut app, "2%");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "skim");
        assert_eq!(app.state.title(), "Buy milk");
        assert_eq!(app.state.description(), "2%\nskim");

        ctrl_s(&mut app);
        assert!(!app.state.dialog_visible());
        app.state.settle().unwrap();

        assert_eq!(app.state.notes().len(), 1);
        assert!(screen_text(&app).contains("Buy milk"));
    }

    #[test]
    fn quit_key_is_ignored_inside_dialog() {
        let (_store, mut app) = app();
        press(&mut app, KeyCode::Char('a'));
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert_eq!(app.state.title(), "q");

        press(&mut app, KeyCode::Esc);
        assert!(!app.state.dialog_visible());
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn empty_dialog_save_adds_nothing() {
        let (_store, mut app) = app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "  ");
        ctrl_s(&mut app);

        assert!(!app.state.dialog_visible());
        app.state.settle().unwrap();
        assert!(app.state.notes().is_empty());
    }

    #[test]
    fn edit_selected_note_preserves_timestamp() {
        let (_store, mut app) = app();
        add_note(&mut app, "Buy milk", "2%");
        let original = app.state.notes()[0].clone();

        press(&mut app, KeyCode::Enter);
        assert!(app.state.dialog_visible());
        assert!(screen_text(&app).contains("Edit Note"));
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "Whole");
        ctrl_s(&mut app);
        app.state.settle().unwrap();

        let edited = &app.state.notes()[0];
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.timestamp, original.timestamp);
        assert_eq!(edited.description, "Whole");
    }

    #[test]
    fn delete_key_removes_selected_note() {
        let (_store, mut app) = app();
        add_note(&mut app, "first", "");
        add_note(&mut app, "second", "");
        assert_eq!(app.state.notes()[0].title, "second");

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('x'));
        app.state.settle().unwrap();
        app.normalize_selection();

        let titles: Vec<&str> = app.state.notes().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["second"]);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn filter_narrows_selection() {
        let (_store, mut app) = app();
        add_note(&mut app, "Alpha", "groceries");
        add_note(&mut app, "Beta", "phone call");

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "groc");
        press(&mut app, KeyCode::Enter);
        assert!(!app.search_mode);

        let filtered = app.filtered_indices();
        assert_eq!(filtered.len(), 1);
        assert_eq!(app.selected_note().unwrap().title, "Alpha");

        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.filtered_indices().len(), 2);
    }

    #[test]
    fn untitled_placeholder_in_list() {
        let (_store, mut app) = app();
        add_note(&mut app, "", "only a body");
        let text = screen_text(&app);
        assert!(text.contains("Untitled"));
        assert!(text.contains("only a body"));
    }

    #[test]
    fn preview_text_limits_lines() {
        let preview = preview_text("line1\nline2\nline3\nline4", 2, 10);
        assert_eq!(preview, "line1\nline2…");
        assert_eq!(preview_text("   ", 3, 10), "");
    }

    #[test]
    fn truncate_display_marks_overflow() {
        assert_eq!(truncate_display("abcdef", 3), "abc…");
        assert_eq!(truncate_display("abc", 3), "abc");
    }
}
