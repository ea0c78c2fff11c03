//! Offset <-> (line, column) conversion

/// Line-start table for one source text
///
/// Built once and reused for every diagnostic of a batch. Lines break on
/// `\n`; a `\r` before it stays part of the previous line.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, starts }
    }

    /// Number of lines (an empty text has one)
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// 1-based `(line, col)` of a byte offset
    ///
    /// `col` is the byte distance from the line start plus one. Offsets past
    /// the end clamp to the end of the text.
    #[must_use]
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = self.starts.partition_point(|&start| start <= offset);
        let col = offset - self.starts[line - 1] + 1;
        (line, col)
    }

    /// Byte offset of a 1-based `(line, col)` where `col` counts characters
    ///
    /// Out-of-range lines clamp to the first/last line, and columns past the
    /// end of a line clamp to its end.
    #[must_use]
    pub fn offset_of(&self, line: usize, col: usize) -> usize {
        let line = line.clamp(1, self.starts.len());
        let start = self.starts[line - 1];
        let end = self
            .starts
            .get(line)
            .map_or(self.text.len(), |next| next - 1);
        let line_text = &self.text[start..end];
        let within = line_text
            .char_indices()
            .nth(col.saturating_sub(1))
            .map_or(line_text.len(), |(i, _)| i);
        start + within
    }
}
