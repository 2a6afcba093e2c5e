use chrono::{DateTime, Local, Utc};
use serde::Serialize;

/// A persisted note. `timestamp` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub timestamp: i64,
}

/// Insert-or-replace payload. `id: None` lets storage assign the next id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub timestamp: i64,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: description.into(),
            timestamp: now_millis(),
        }
    }
}

impl Note {
    /// Title for display; blank titles render as "Untitled".
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Local wall-clock rendering of the creation instant.
    pub fn created_label(&self) -> String {
        self.created_at()
            .map(|ts| {
                ts.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| "-".to_string())
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str) -> Note {
        Note {
            id: 1,
            title: title.into(),
            description: "body".into(),
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn note_serializes_flat_fields() {
        let json = serde_json::to_value(note("Buy milk")).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["title"], "Buy milk");
        assert_eq!(json["description"], "body");
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn blank_title_displays_placeholder() {
        assert_eq!(note("").display_title(), "Untitled");
        assert_eq!(note("   ").display_title(), "Untitled");
        assert_eq!(note("Groceries").display_title(), "Groceries");
    }

    #[test]
    fn created_at_converts_millis() {
        let ts = note("x").created_at().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn draft_gets_current_timestamp() {
        let before = now_millis();
        let draft = NoteDraft::new("a", "b");
        assert!(draft.id.is_none());
        assert!(draft.timestamp >= before);
    }
}
