//! Sentence-like segmentation of utterances
//!
//! Segments are the unit at which pause and stop take effect. The split is
//! deliberately naive: any `.`, `?` or `!` followed by a space ends a segment,
//! so "Dr. Smith" or "3. 5" split too.

const TERMINATORS: [char; 3] = ['.', '?', '!'];

/// Split `text` after every terminal punctuation mark followed by a space.
///
/// The space itself is consumed. Blank pieces are kept; callers skip them.
pub fn split_segments(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if TERMINATORS.contains(&c) && chars.peek() == Some(&' ') {
            chars.next();
            segments.push(std::mem::take(&mut current));
        }
    }
    segments.push(current);

    segments
}
