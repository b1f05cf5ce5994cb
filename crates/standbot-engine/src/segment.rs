//! Segmentation: packs one member's response into display-field sized chunks.
//!
//! Greedy and order preserving: lines are never split across segments, a line
//! longer than `line_limit` is cut and marked with [`TRUNCATION_MARKER`], and a
//! segment is closed as soon as the next line would push it past `segment_limit`.
//! Lines are concatenated without a separator.
//!
//! Lengths are counted in chars, not bytes.

/// Appended to every line cut at `line_limit`.
pub const TRUNCATION_MARKER: &str = "...";

pub const DEFAULT_LINE_LIMIT: usize = 350;
pub const DEFAULT_SEGMENT_LIMIT: usize = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segmenter {
    pub line_limit: usize,
    pub segment_limit: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            line_limit: DEFAULT_LINE_LIMIT,
            segment_limit: DEFAULT_SEGMENT_LIMIT,
        }
    }
}

impl Segmenter {
    pub fn new(line_limit: usize, segment_limit: usize) -> Self {
        Self {
            line_limit,
            segment_limit,
        }
    }

    /// Split `text` into ordered segments.
    ///
    /// Empty text produces no segments. A single line that is still longer than
    /// `segment_limit` after truncation becomes a segment of its own.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for raw in text.split('\n') {
            let line = self.truncate_line(raw);
            let line_len = line.chars().count();

            if !current.is_empty() && current_len + line_len > self.segment_limit {
                segments.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push_str(&line);
            current_len += line_len;
        }

        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    /// Cut a line to `line_limit` chars plus the marker; shorter lines pass through.
    pub fn truncate_line(&self, line: &str) -> String {
        match line.char_indices().nth(self.line_limit) {
            Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &line[..cut]),
            None => line.to_string(),
        }
    }
}
