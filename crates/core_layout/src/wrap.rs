//! Greedy word wrap against live font metrics.

/// Measures rendered text width in pixels.
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> i32;
}

/// Wrap `text` into lines no wider than `max_width`.
///
/// Each word is measured together with its trailing space and lines keep that
/// space. A new line starts as soon as the next word would make the running
/// width reach or exceed `max_width`. A word wider than `max_width` still gets
/// a line of its own rather than producing an empty line.
pub fn wrap_text<M: TextMeasure + ?Sized>(measure: &M, text: &str, max_width: i32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0;

    for word in text.split_whitespace() {
        let piece = format!("{} ", word);
        let piece_width = measure.text_width(&piece);

        if !current.is_empty() && width + piece_width >= max_width {
            lines.push(std::mem::take(&mut current));
            width = 0;
        }

        current.push_str(&piece);
        width += piece_width;
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
