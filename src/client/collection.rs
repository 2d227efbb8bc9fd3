use std::cmp::Ordering;
use std::str::FromStr;

use crate::database::models::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Created,
    Title,
    /// Raw content length, markup included.
    Length,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created" | "date" => Ok(SortKey::Created),
            "title" => Ok(SortKey::Title),
            "length" => Ok(SortKey::Length),
            other => Err(format!(
                "unknown sort key '{}', expected created, title or length",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// The signed-in user's notes as last fetched, plus local edits.
#[derive(Debug, Clone, Default)]
pub struct NoteCollection {
    notes: Vec<Note>,
}

impl NoteCollection {
    pub fn new(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Notes whose title or plain-text content contains `query`, ignoring
    /// case. A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Note> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.notes.iter().collect();
        }

        self.notes
            .iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&query)
                    || plain_text(&note.content).to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Search, then sort. Equal keys keep their fetched order.
    pub fn view(&self, query: &str, key: SortKey, direction: SortDirection) -> Vec<&Note> {
        let mut notes = self.search(query);
        notes.sort_by(|a, b| {
            let ordering = compare(a, b, key);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        notes
    }
}

fn compare(a: &Note, b: &Note, key: SortKey) -> Ordering {
    match key {
        SortKey::Created => a.created_at.cmp(&b.created_at),
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortKey::Length => a.content.chars().count().cmp(&b.content.chars().count()),
    }
}

/// Content with complete `<...>` tags removed and common entities decoded.
/// A `<` with no closing `>` after it is ordinary text.
pub fn plain_text(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                rest = &rest[open..];
                break;
            }
        }
    }
    text.push_str(rest);

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Plain-text preview of at most `max_chars` characters, with an ellipsis
/// when cut.
pub fn preview(content: &str, max_chars: usize) -> String {
    let text = plain_text(content);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= max_chars {
        return text;
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
