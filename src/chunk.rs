//! Fixed-window text chunker.
//!
//! Splits normalized text into overlapping character windows. Offsets
//! advance by at least one character per window, so the walk terminates
//! even when the requested overlap meets or exceeds the window size.

/// Split `text` into overlapping windows of at most `chunk_size` characters.
///
/// Line endings are normalized to `\n` and the input is trimmed before
/// windowing. `overlap` is clamped to `[0, chunk_size / 2]` so consecutive
/// windows always advance. Windows that trim to pure whitespace are
/// dropped rather than emitted as empty entries. Empty input yields an
/// empty vector, which callers must treat as "no ingestible content".
///
/// Given identical inputs the output is byte-identical and order-preserving.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size / 2);
    // Windows are sliced on char boundaries, not bytes.
    let chars: Vec<char> = trimmed.chars().collect();

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let piece = window.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        if end == chars.len() {
            break;
        }
        // The start + 1 floor keeps offsets strictly increasing even when
        // end - overlap would fall behind the current start.
        start = (end - overlap).max(start + 1);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 800, 80).is_empty());
    }

    #[test]
    fn whitespace_only_input_yields_no_chunks() {
        assert!(chunk_text("  \n\t  \r\n ", 800, 80).is_empty());
    }

    #[test]
    fn small_text_is_a_single_chunk() {
        let chunks = chunk_text("hello world. second paragraph.", 800, 80);
        assert_eq!(chunks, vec!["hello world. second paragraph.".to_string()]);
    }

    #[test]
    fn windows_overlap_and_cover_the_input() {
        let chunks = chunk_text("hello world", 5, 2);
        assert_eq!(chunks, vec!["hello", "lo wo", "world"]);
        // First window starts the text, last window ends it.
        assert!("hello world".starts_with(&chunks[0]));
        assert!("hello world".ends_with(chunks.last().unwrap().as_str()));
    }

    #[test]
    fn overlap_is_clamped_to_half_the_window() {
        // overlap 10 on chunk_size 4 clamps to 2; the walk must terminate.
        let chunks = chunk_text("abcdefghij", 4, 10);
        assert!(!chunks.is_empty());
        let rejoined: String = chunks.concat();
        assert!(rejoined.contains("abcd"));
        assert!(rejoined.contains("ij"));
    }

    #[test]
    fn crlf_line_endings_are_normalized() {
        let chunks = chunk_text("alpha\r\nbeta\rgamma", 800, 0);
        assert_eq!(chunks, vec!["alpha\nbeta\ngamma".to_string()]);
    }

    #[test]
    fn multibyte_text_slices_on_char_boundaries() {
        // Would panic on byte slicing; chars are the unit here.
        let chunks = chunk_text("héllo wörld ünïcode", 5, 2);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 5);
        }
    }

    #[test]
    fn whitespace_windows_are_dropped() {
        let chunks = chunk_text("ab        cd", 3, 0);
        assert!(chunks.iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn chunk_count_grows_as_window_shrinks() {
        let text = "the quick brown fox jumps over the lazy dog";
        let coarse = chunk_text(text, 40, 4).len();
        let fine = chunk_text(text, 10, 4).len();
        assert!(fine >= coarse);
    }

    #[test]
    fn output_is_deterministic() {
        let text = "alpha beta gamma delta epsilon zeta";
        let a = chunk_text(text, 9, 3);
        let b = chunk_text(text, 9, 3);
        assert_eq!(a, b);
    }
}
