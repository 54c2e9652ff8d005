//! Source text with line/column bookkeeping for synthesized documents.

/// Captured line/column information (1-based, columns counted in characters).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

impl LineCol {
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for LineCol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Byte span into a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    #[must_use]
    pub fn contains(self, offset: usize) -> bool {
        offset >= self.start && offset < self.end.max(self.start + 1)
    }
}

/// Immutable document text with precomputed line starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceText {
    text: String,
    line_starts: Vec<usize>,
}

impl SourceText {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        Self { text, line_starts }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Line/column for a byte offset. Columns count characters, so multibyte
    /// text maps to the same coordinates the marker reader produces.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> Option<LineCol> {
        if offset > self.text.len() {
            return None;
        }
        let index = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = *self.line_starts.get(index)?;
        let column = self.text.get(line_start..offset)?.chars().count() + 1;
        Some(LineCol {
            line: index + 1,
            column,
        })
    }

    /// Byte offset of a 1-based line/column position.
    #[must_use]
    pub fn offset(&self, position: LineCol) -> Option<usize> {
        let (start, end) = self.line_bounds(position.line)?;
        let line = self.text.get(start..end)?;
        let mut offset = start;
        let mut column = 1;
        for ch in line.chars() {
            if column == position.column {
                return Some(offset);
            }
            offset += ch.len_utf8();
            column += 1;
        }
        (column == position.column).then_some(offset)
    }

    #[must_use]
    pub fn line(&self, line: usize) -> Option<&str> {
        let (start, end) = self.line_bounds(line)?;
        self.text.get(start..end)
    }

    /// Start and end byte offsets (exclusive) for a line.
    #[must_use]
    pub fn line_bounds(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line.saturating_sub(1))?;
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.text.len());
        Some((start, end))
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            starts.push(idx + ch.len_utf8());
        }
    }
    starts
}
