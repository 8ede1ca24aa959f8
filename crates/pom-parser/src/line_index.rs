use lsp_async_stub::util::Mapper;
use text_size::{TextRange, TextSize};
use tower_lsp::lsp_types::{Position, Range};

use crate::xml::ByteRange;

/// Converts between byte offsets and LSP positions (UTF-16 columns).
pub struct LineIndex<'a> {
    text: &'a str,
    mapper: Mapper,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            mapper: Mapper::new_utf16(text, false),
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = self.char_boundary(offset);
        text_size(offset)
            .and_then(|size| self.mapper.position(size))
            .map(into_lsp_position)
            .unwrap_or_default()
    }

    pub fn range(&self, range: ByteRange) -> Range {
        let start = self.char_boundary(range.start);
        let end = self.char_boundary(range.end).max(start);
        match (text_size(start), text_size(end)) {
            (Some(start), Some(end)) => self
                .mapper
                .range(TextRange::new(start, end))
                .map(into_lsp_range)
                .unwrap_or_default(),
            _ => Range::default(),
        }
    }

    /// Byte offset of `position`, clamped to the line and to the text.
    pub fn offset(&self, position: Position) -> usize {
        let line = position.line as u64;
        let Some(line_start) = self.mapped_offset(line, 0) else {
            return self.text.len();
        };
        if let Some(offset) = self.mapped_offset(line, position.character as u64) {
            return offset;
        }

        let line_end = self
            .mapped_offset(line + 1, 0)
            .map(|next| next - 1)
            .unwrap_or(self.text.len())
            .max(line_start);
        let end_character = self.position(line_end).character;
        if position.character >= end_character {
            return line_end;
        }
        // inside a surrogate pair
        (0..position.character as u64)
            .rev()
            .find_map(|character| self.mapped_offset(line, character))
            .unwrap_or(line_start)
    }

    fn mapped_offset(&self, line: u64, character: u64) -> Option<usize> {
        self.mapper
            .offset(lsp_async_stub::util::Position::new(line, character))
            .map(|size| u32::from(size) as usize)
    }

    fn char_boundary(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

fn text_size(offset: usize) -> Option<TextSize> {
    TextSize::try_from(offset).ok()
}

fn into_lsp_position(position: lsp_async_stub::util::Position) -> Position {
    Position {
        line: position.line as u32,
        character: position.character as u32,
    }
}

fn into_lsp_range(range: lsp_async_stub::util::Range) -> Range {
    Range {
        start: into_lsp_position(range.start),
        end: into_lsp_position(range.end),
    }
}
