//! Located error messages, rendered against the text they point into.

#[cfg(test)]
mod test;

use std::{
    collections::HashMap,
    fmt::Write as FmtWrite,
    fs,
    io::{self, Write as IoWrite},
    path::PathBuf,
};

/// Where a checked program came from.
#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub enum Source {
    File { path: PathBuf },
    Interactive { label: String },
}

impl Source {
    pub fn label(&self) -> String {
        match self {
            Source::File { path } => path.display().to_string(),
            Source::Interactive { label } => label.clone(),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub struct Location {
    pub source: Source,
    pub offset: Option<usize>,
}

#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub struct Message {
    pub content: String,
    pub addendum: Option<String>,
}

pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /**
    Find the 1-indexed line and column of a byte offset.

    Offsets past the end of `text` are clamped to the end. The column counts
    characters, not bytes.
    */
    pub fn from_offset(text: &str, offset: usize) -> (Self, &str) {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line_start = text[..offset].rfind('\n').map_or(0, |ix| ix + 1);
        let line_end = text[offset..]
            .find('\n')
            .map_or(text.len(), |ix| offset + ix);
        let line = text[..line_start].matches('\n').count() + 1;
        let column = text[line_start..offset].chars().count() + 1;
        (Position { line, column }, &text[line_start..line_end])
    }
}

#[derive(Default)]
pub struct Diagnostic {
    items: Vec<Message>,
    located_items: Vec<(Location, Message)>,
}

impl Diagnostic {
    pub fn new() -> Self {
        Diagnostic {
            items: Vec::new(),
            located_items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.located_items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len() + self.located_items.len()
    }

    /// Items at the same offset keep the order they were added in.
    pub fn item(&mut self, location: Option<Location>, message: Message) {
        match location {
            None => self.items.push(message),
            Some(location) => {
                match self
                    .located_items
                    .binary_search_by_key(&location.offset, |i| i.0.offset)
                {
                    Err(ix) => self.located_items.insert(ix, (location, message)),
                    Ok(ix) => self.located_items.insert(ix + 1, (location, message)),
                }
            }
        }
    }

    pub fn report_error_heading(path: &str, position: Option<Position>, message: &str) -> String {
        let mut str = String::from(path);
        str.push(':');
        if let Some(position) = position {
            let _ = write!(str, "{}:{}:", position.line, position.column);
        }
        str.push_str(" error: ");
        str.push_str(message);
        str
    }

    pub fn report_located_message(
        line: usize,
        column: usize,
        path: &str,
        line_str: &str,
        message: &Message,
    ) -> String {
        let caret = format!("{}^", " ".repeat(column.saturating_sub(1)));
        let padding = " ".repeat(line.to_string().len());

        let mut result =
            Self::report_error_heading(path, Some(Position { line, column }), &message.content);
        let _ = write!(
            result,
            "\n{} |\n{} | {}\n{} | {}",
            padding, line, line_str, padding, caret
        );
        if let Some(addendum) = &message.addendum {
            result.push('\n');
            result.push_str(addendum);
        }
        result
    }

    fn render_unlocated(message: &Message) -> String {
        let mut result = format!("error: {}", message.content);
        if let Some(addendum) = &message.addendum {
            result.push('\n');
            result.push_str(addendum);
        }
        result
    }

    /**
    Render every item, in offset order.

    `contents` supplies the text of a source. When it returns `None` the item is
    rendered with a heading only.
    */
    pub fn render_with(self, mut contents: impl FnMut(&Source) -> Option<String>) -> Vec<String> {
        let mut cache: HashMap<Source, Option<String>> = HashMap::new();
        let mut rendered: Vec<String> = self.items.iter().map(Self::render_unlocated).collect();

        for (location, message) in self.located_items.into_iter() {
            let label = location.source.label();
            let text = cache
                .entry(location.source.clone())
                .or_insert_with(|| contents(&location.source));
            rendered.push(match (text, location.offset) {
                (Some(text), Some(offset)) => {
                    let (position, line_str) = Position::from_offset(text, offset);
                    Self::report_located_message(
                        position.line,
                        position.column,
                        &label,
                        line_str,
                        &message,
                    )
                }
                (None, Some(offset)) => {
                    let mut result = Self::report_error_heading(
                        &label,
                        Some(Position {
                            line: 1,
                            column: offset + 1,
                        }),
                        &message.content,
                    );
                    if let Some(addendum) = &message.addendum {
                        result.push('\n');
                        result.push_str(addendum);
                    }
                    result
                }
                (_, None) => {
                    let mut result = Self::report_error_heading(&label, None, &message.content);
                    if let Some(addendum) = &message.addendum {
                        result.push('\n');
                        result.push_str(addendum);
                    }
                    result
                }
            });
        }

        rendered
    }

    /// Write every item to stderr, reading file sources from disk.
    pub fn report_all(self) -> io::Result<()> {
        let rendered = self.render_with(|source| match source {
            Source::File { path } => fs::read_to_string(path).ok(),
            Source::Interactive { .. } => None,
        });
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        for item in rendered {
            handle.write_all(item.as_bytes())?;
            handle.write_all(b"\n")?;
        }
        Ok(())
    }
}
