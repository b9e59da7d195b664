/// Tab-separated event streams: one `verb<TAB>argument<TAB>dependency`
/// triple per line.

use std::path::Path;

use super::event::{Event, RawEvent};

/// Parse an event stream. Blank lines and `#` comments are skipped.
///
/// Lines are never rejected here. A line with missing fields yields a
/// `RawEvent` with empty fields, and a line with extra fields keeps them in
/// its dependency. Either way validation fails downstream and the corpus
/// builder skips the line.
pub fn read_tsv(text: &str) -> Vec<RawEvent> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| {
            let mut fields = line.splitn(3, '\t');
            let verb = fields.next().unwrap_or_default();
            let argument = fields.next().unwrap_or_default();
            let dependency = fields.next().unwrap_or_default();
            RawEvent::new(verb, argument, dependency)
        })
        .collect()
}

/// Read an event stream file.
pub fn load_tsv(path: &Path) -> Result<Vec<RawEvent>, std::io::Error> {
    let contents = std::fs::read_to_string(path)?;
    Ok(read_tsv(&contents))
}

/// Serialize events in stream order.
pub fn write_tsv(events: &[Event]) -> String {
    let mut out = String::new();
    for event in events {
        out.push_str(&event.verb);
        out.push('\t');
        out.push_str(&event.argument);
        out.push('\t');
        out.push_str(event.dependency.name());
        out.push('\n');
    }
    out
}

/// Write events to a file in stream order.
pub fn save_tsv(events: &[Event], path: &Path) -> Result<(), std::io::Error> {
    std::fs::write(path, write_tsv(events))
}
